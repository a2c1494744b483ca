//! Response formatting
//!
//! Renders reconciliation results as Telegram HTML. Everything that came from
//! users or the model is escaped; updates show only fields that changed.

use chrono::{DateTime, FixedOffset, Utc};

use crate::i18n::{params, I18n};
use crate::models::{MemberInfo, Priority, RoleInfo, Task};
use crate::services::reconciliation::{ReconciliationResult, TaskChange};
use crate::utils::helpers::{escape_html, format_deadline};

/// What the formatter needs besides the result itself
#[derive(Debug, Clone, Copy)]
pub struct FormatContext<'a> {
    pub members: &'a [MemberInfo],
    pub roles: &'a [RoleInfo],
    pub lang: &'a str,
    pub offset: FixedOffset,
}

#[derive(Clone)]
pub struct ResponseFormatter {
    i18n: I18n,
}

impl ResponseFormatter {
    pub fn new(i18n: I18n) -> Self {
        Self { i18n }
    }

    pub fn none_found(&self, lang: &str) -> String {
        self.i18n.t("tasks.none_found", lang, None)
    }

    /// Render a batch outcome; an empty batch renders the "no tasks found" text
    pub fn format(&self, result: &ReconciliationResult, ctx: &FormatContext<'_>) -> String {
        if result.is_empty() {
            return self.none_found(ctx.lang);
        }

        let mut sections = Vec::new();

        if !result.created.is_empty() {
            let mut lines = vec![self.i18n.t("tasks.created", ctx.lang, None)];
            for task in &result.created {
                lines.push(self.task_heading(task));
                lines.extend(self.task_details(task, result, ctx));
            }
            sections.push(lines.join("\n"));
        }

        if !result.updated.is_empty() {
            let mut lines = vec![self.i18n.t("tasks.updated", ctx.lang, None)];
            for change in &result.updated {
                lines.push(self.task_heading(&change.after));
                lines.extend(self.change_lines(change, result, ctx));
            }
            sections.push(lines.join("\n"));
        }

        let mut summary = Vec::new();
        if !result.roles_created.is_empty() {
            let names = result.roles_created.iter().map(|r| escape_html(&r.name)).collect::<Vec<_>>().join(", ");
            summary.push(self.i18n.t("tasks.roles_created", ctx.lang, Some(&params([("roles", names)]))));
        }
        if !result.roles_assigned.is_empty() {
            summary.push(self.i18n.tp("tasks.roles_assigned", ctx.lang, result.roles_assigned.len() as i64, None));
        }
        if !result.failures.is_empty() {
            summary.push(self.i18n.tp("tasks.failures", ctx.lang, result.failures.len() as i64, None));
        }
        if !summary.is_empty() {
            sections.push(summary.join("\n"));
        }

        sections.join("\n\n")
    }

    /// Render a scope's open tasks for `/tasks`
    pub fn format_task_list(&self, tasks: &[Task], ctx: &FormatContext<'_>) -> String {
        let open: Vec<&Task> = tasks.iter().filter(|t| !t.is_completed).collect();
        if open.is_empty() {
            return self.i18n.t("commands.tasks.empty", ctx.lang, None);
        }

        let empty = ReconciliationResult::default();
        let mut lines = vec![self.i18n.t("commands.tasks.header", ctx.lang, None)];
        for task in open {
            lines.push(self.task_heading(task));
            lines.extend(self.task_details(task, &empty, ctx));
        }
        lines.join("\n")
    }

    fn task_heading(&self, task: &Task) -> String {
        format!("• <b>{}</b> {}", escape_html(&task.label()), escape_html(&task.title))
    }

    fn field_line(&self, field: &str, value: &str, ctx: &FormatContext<'_>) -> String {
        let label = self.i18n.t(&format!("tasks.fields.{}", field), ctx.lang, None);
        format!("   {}: {}", label, value)
    }

    fn task_details(&self, task: &Task, result: &ReconciliationResult, ctx: &FormatContext<'_>) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(description) = &task.description {
            lines.push(self.field_line("description", &escape_html(description), ctx));
        }
        if task.priority != Priority::Medium {
            lines.push(self.field_line("priority", &self.priority_text(task.priority, ctx), ctx));
        }
        if let Some(deadline) = task.deadline {
            lines.push(self.field_line("deadline", &format_deadline(deadline, ctx.offset), ctx));
        }
        if let Some(user_id) = task.assigned_user_id {
            lines.push(self.field_line("assignee", &self.member_name(user_id, ctx), ctx));
        }
        if let Some(role_id) = task.assigned_role_id {
            lines.push(self.field_line("role", &self.role_name(role_id, result, ctx), ctx));
        }
        lines
    }

    fn change_lines(&self, change: &TaskChange, result: &ReconciliationResult, ctx: &FormatContext<'_>) -> Vec<String> {
        let (before, after) = (&change.before, &change.after);
        let none = self.i18n.t("tasks.none", ctx.lang, None);
        let mut lines = Vec::new();

        let mut diff = |field: &str, old: String, new: String| {
            if old != new {
                lines.push(self.field_line(field, &format!("{} → {}", old, new), ctx));
            }
        };

        diff("title", escape_html(&before.title), escape_html(&after.title));
        diff(
            "description",
            before.description.as_deref().map(escape_html).unwrap_or_else(|| none.clone()),
            after.description.as_deref().map(escape_html).unwrap_or_else(|| none.clone()),
        );
        diff("priority", self.priority_text(before.priority, ctx), self.priority_text(after.priority, ctx));
        diff("deadline", self.deadline_text(before.deadline, &none, ctx), self.deadline_text(after.deadline, &none, ctx));
        diff("status", self.status_text(before.is_completed, ctx), self.status_text(after.is_completed, ctx));
        diff(
            "assignee",
            before.assigned_user_id.map(|id| self.member_name(id, ctx)).unwrap_or_else(|| none.clone()),
            after.assigned_user_id.map(|id| self.member_name(id, ctx)).unwrap_or_else(|| none.clone()),
        );
        diff(
            "role",
            before.assigned_role_id.map(|id| self.role_name(id, result, ctx)).unwrap_or_else(|| none.clone()),
            after.assigned_role_id.map(|id| self.role_name(id, result, ctx)).unwrap_or_else(|| none.clone()),
        );

        lines
    }

    fn deadline_text(&self, deadline: Option<DateTime<Utc>>, none: &str, ctx: &FormatContext<'_>) -> String {
        deadline.map(|d| format_deadline(d, ctx.offset)).unwrap_or_else(|| none.to_string())
    }

    fn priority_text(&self, priority: Priority, ctx: &FormatContext<'_>) -> String {
        self.i18n.t(&format!("tasks.priority.{}", priority.as_str()), ctx.lang, None)
    }

    fn status_text(&self, completed: bool, ctx: &FormatContext<'_>) -> String {
        let key = if completed { "tasks.status.done" } else { "tasks.status.open" };
        self.i18n.t(key, ctx.lang, None)
    }

    fn member_name(&self, user_id: i64, ctx: &FormatContext<'_>) -> String {
        ctx.members
            .iter()
            .find(|m| m.user.id == user_id)
            .map(|m| escape_html(&m.user.display_name()))
            .unwrap_or_else(|| format!("#{}", user_id))
    }

    fn role_name(&self, role_id: i64, result: &ReconciliationResult, ctx: &FormatContext<'_>) -> String {
        ctx.roles
            .iter()
            .map(|info| &info.role)
            .chain(result.roles_created.iter())
            .find(|role| role.id == role_id)
            .map(|role| escape_html(&role.name))
            .unwrap_or_else(|| format!("#{}", role_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::models::TaskType;
    use crate::services::reconciliation::{FailureReason, ProposalFailure, ProposalKind};
    use crate::utils::helpers::display_offset;

    fn task(id: i64, title: &str) -> Task {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap();
        Task {
            id,
            readable_id: Some(format!("COR-{}", id)),
            title: title.to_string(),
            description: None,
            priority: Priority::Medium,
            deadline: None,
            is_completed: false,
            task_type: TaskType::Group,
            author_id: Some(1),
            chat_id: Some(1),
            assigned_user_id: None,
            assigned_role_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn ctx() -> FormatContext<'static> {
        FormatContext { members: &[], roles: &[], lang: "en", offset: display_offset(0) }
    }

    #[test]
    fn test_empty_result_renders_none_found() {
        let formatter = ResponseFormatter::new(I18n::embedded());
        let text = formatter.format(&ReconciliationResult::default(), &ctx());
        assert_eq!(text, "🤷 No tasks found in your message.");
    }

    #[test]
    fn test_update_shows_only_changed_fields() {
        let formatter = ResponseFormatter::new(I18n::embedded());
        let before = Task { deadline: Some(Utc.with_ymd_and_hms(2024, 6, 12, 10, 0, 0).unwrap()), ..task(7, "Build API") };
        let after = Task { deadline: Some(Utc.with_ymd_and_hms(2024, 6, 14, 18, 0, 0).unwrap()), ..before.clone() };
        let result = ReconciliationResult { updated: vec![TaskChange { before, after }], ..Default::default() };

        let text = formatter.format(&result, &ctx());
        assert!(text.contains("deadline: 12.06.2024 10:00 → 14.06.2024 18:00"));
        assert!(!text.contains("title:"));
        assert!(!text.contains("status:"));
    }

    #[test]
    fn test_created_task_is_escaped() {
        let formatter = ResponseFormatter::new(I18n::embedded());
        let result = ReconciliationResult { created: vec![task(1, "Fix <b> tags & stuff")], ..Default::default() };

        let text = formatter.format(&result, &ctx());
        assert!(text.contains("Fix &lt;b&gt; tags &amp; stuff"));
        assert!(text.contains("<b>COR-1</b>"));
    }

    #[test]
    fn test_partial_failure_is_counted() {
        let formatter = ResponseFormatter::new(I18n::embedded());
        let failure = ProposalFailure { kind: ProposalKind::TaskUpdate, reference: "99".into(), reason: FailureReason::NotFound };
        let result = ReconciliationResult {
            created: vec![task(1, "a"), task(2, "b")],
            failures: vec![failure],
            ..Default::default()
        };

        let text = formatter.format(&result, &ctx());
        assert!(text.contains("COR-2"));
        assert!(text.ends_with("⚠️ 1 operation could not be applied"));
    }
}
