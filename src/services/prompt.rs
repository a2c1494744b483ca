//! Prompt rendering
//!
//! A pure function of the conversation context. Each entity list renders as
//! one line per entry; an empty list renders as [`ABSENT`] so the model can
//! tell "no data" from "omitted".

use chrono::{DateTime, FixedOffset, Utc};

use crate::models::{MemberInfo, RoleInfo, Task};
use crate::services::context::ConversationContext;
use crate::utils::helpers::format_iso;

/// Placeholder for an empty entity list or a missing field
pub const ABSENT: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTemplate {
    /// Task extraction for a group chat, with members and roles
    Group,
    /// Personal assistant for a private chat
    Personal,
}

impl PromptTemplate {
    pub fn for_context(context: &ConversationContext) -> Self {
        if context.is_group() { PromptTemplate::Group } else { PromptTemplate::Personal }
    }
}

fn or_absent(value: Option<String>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or_else(|| ABSENT.to_string())
}

/// Quote free text for a `key="value"` line
fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', " "))
}

pub fn render_tasks(tasks: &[Task], offset: FixedOffset) -> String {
    if tasks.is_empty() {
        return ABSENT.to_string();
    }
    tasks
        .iter()
        .map(|task| {
            format!(
                "- id={} | readableId={} | title={} | description={} | priority={} | deadline={} | assignedUserId={} | assignedRoleId={} | completed={}",
                task.id,
                or_absent(task.readable_id.clone()),
                quoted(&task.title),
                task.description.as_deref().map(quoted).unwrap_or_else(|| ABSENT.to_string()),
                task.priority.as_str(),
                or_absent(task.deadline.map(|d| format_iso(d, offset))),
                or_absent(task.assigned_user_id.map(|id| id.to_string())),
                or_absent(task.assigned_role_id.map(|id| id.to_string())),
                task.is_completed,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_members(members: &[MemberInfo]) -> String {
    if members.is_empty() {
        return ABSENT.to_string();
    }
    members
        .iter()
        .map(|member| {
            format!(
                "- userId={} | firstName={} | username={} | role={}",
                member.user.id,
                or_absent(member.user.first_name.clone()),
                or_absent(member.user.username.clone()),
                or_absent(member.role_name.clone()),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_roles(roles: &[RoleInfo]) -> String {
    if roles.is_empty() {
        return ABSENT.to_string();
    }
    roles
        .iter()
        .map(|info| {
            let members = info.member_ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");
            format!("- roleId={} | name={} | memberIds={}", info.role.id, quoted(&info.role.name), or_absent(Some(members)))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_message(raw_text: Option<&str>) -> String {
    match raw_text {
        Some(text) => quoted(text),
        None => "(attached as audio; transcribe it first)".to_string(),
    }
}

const DEADLINE_RULES: &str = "\
- Write every deadline as ISO-8601 with an explicit UTC offset, e.g. 2024-06-14T18:00:00+03:00.
- Interpret relative dates (\"tomorrow\", \"on Friday\") against the current time above, in its offset.
- \"by X\" or \"until X\" includes day X: use 23:59 of that day when no time is given.
- \"before X\" excludes day X: use 23:59 of the previous day when no time is given.
- A date with no time of day and no boundary word means 23:59 of that day.
- Never invent a deadline the message does not mention. Use null in an update only to remove a deadline.";

/// Render the prompt for one message
pub fn render_prompt(
    template: PromptTemplate,
    context: &ConversationContext,
    raw_text: Option<&str>,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> String {
    let now = format_iso(now, offset);
    let author = context
        .author
        .as_ref()
        .map(|a| format!("userId={} | name={}", a.id, quoted(&a.display_name())))
        .unwrap_or_else(|| ABSENT.to_string());
    let tasks = render_tasks(&context.tasks, offset);
    let message = render_message(raw_text);

    match template {
        PromptTemplate::Personal => format!(
            r#"You are a personal task assistant. Read the user's message and decide which of their tasks to create or change.

Current time: {now}
User: {author}

Existing tasks:
{tasks}

Deadline rules:
{DEADLINE_RULES}

Reply with JSON only, no prose, in exactly this shape:
{{"newTasks": [{{"title": "...", "description": "...", "priority": "high|medium|low", "deadline": "..."}}],
 "updatedTasks": [{{"id": 0, "title": "...", "description": "...", "priority": "...", "deadline": "...", "isCompleted": true}}]}}
In updatedTasks include only the fields that change; "id" must be an id from the list above.
If the message is not about tasks, answer briefly in plain text in the user's language instead of JSON.

Message:
{message}"#
        ),
        PromptTemplate::Group => {
            let members = render_members(&context.members);
            let roles = render_roles(&context.roles);
            format!(
                r#"You manage the task list of a team chat. Read the message and decide which tasks to create or change, and which roles to define or assign.

Current time: {now}
Author: {author}

Members:
{members}

Roles:
{roles}

Existing tasks:
{tasks}

Deadline rules:
{DEADLINE_RULES}

Assignment rules:
- Assign a task to a person with "assignedUserId" (a userId above) or to a role with "assignedRoleId" (a roleId above), not both.
- If you only know a name, put it in "assignee" (person) or "role" (role) instead of an id.
- Use null for "assignedUserId" or "assignedRoleId" in an update only to remove the assignment.

Reply with JSON only, no prose, in exactly this shape:
{{"newTasks": [{{"title": "...", "description": "...", "priority": "high|medium|low", "deadline": "...", "assignedUserId": 0, "assignedRoleId": 0}}],
 "updatedTasks": [{{"id": 0, "title": "...", "description": "...", "deadline": "...", "isCompleted": true, "assignedUserId": 0, "assignedRoleId": 0}}],
 "newRoles": ["..."],
 "roleAssignments": [{{"userId": 0, "roleName": "..."}}]}}
In updatedTasks include only the fields that change; "id" must be an id from the list above.
If the message is not about tasks or roles, answer briefly in plain text in the author's language instead of JSON.

Message:
{message}"#
            )
        }
    }
}
