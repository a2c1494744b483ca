//! Reconciliation engine
//!
//! Applies extracted proposals to persisted tasks. Each proposal succeeds or
//! fails on its own; a batch holds its scope's lock for its whole duration.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::FixedOffset;
use serde::Serialize;
use tracing::{debug, warn};

use crate::database::Store;
use crate::models::{
    CreateTaskRequest, ExtractionResult, MalformedProposal, NewTaskProposal, Priority, Role, Scope, Task,
    TaskUpdateProposal, UpdateTaskRequest,
};

pub use crate::models::ProposalKind;
use crate::utils::errors::TaskMindError;
use crate::utils::helpers::{normalize_whitespace, parse_deadline};
use crate::utils::logging::log_reconciliation;

/// One mutex per task scope
#[derive(Debug, Default)]
pub struct ScopeLocks {
    locks: Mutex<HashMap<Scope, Arc<tokio::sync::Mutex<()>>>>,
}

impl ScopeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock serialising writes to a scope
    pub fn lock_for(&self, scope: Scope) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks.retain(|key, lock| *key == scope || Arc::strong_count(lock) > 1);
        locks.entry(scope).or_default().clone()
    }
}

/// Where a batch is written and how its raw values are interpreted
#[derive(Debug, Clone)]
pub struct ReconcileTarget {
    pub scope: Scope,
    pub author_id: Option<i64>,
    /// Prefix for readable IDs of tasks created in this batch
    pub readable_prefix: String,
    /// Offset applied to deadlines the model wrote without one
    pub offset: FixedOffset,
}

/// Before and after images of one updated task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskChange {
    pub before: Task,
    pub after: Task,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "detail", rename_all = "camelCase")]
pub enum FailureReason {
    NotFound,
    Invalid(String),
    Storage(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalFailure {
    pub kind: ProposalKind,
    /// Task ID, title or role name the proposal referred to
    pub reference: String,
    pub reason: FailureReason,
}

/// Role assignment that was applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    pub user_id: i64,
    pub role_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    pub created: Vec<Task>,
    pub updated: Vec<TaskChange>,
    pub roles_created: Vec<Role>,
    pub roles_assigned: Vec<RoleAssignment>,
    pub failures: Vec<ProposalFailure>,
}

impl ReconciliationResult {
    /// Nothing was applied and nothing failed
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
            && self.updated.is_empty()
            && self.roles_created.is_empty()
            && self.roles_assigned.is_empty()
            && self.failures.is_empty()
    }

    fn fail(&mut self, kind: ProposalKind, reference: impl Into<String>, reason: FailureReason) {
        let reference = reference.into();
        warn!(kind = ?kind, reference = %reference, reason = ?reason, "Proposal skipped");
        self.failures.push(ProposalFailure { kind, reference, reason });
    }
}

fn storage(error: TaskMindError) -> FailureReason {
    match error {
        TaskMindError::TaskNotFound { .. } => FailureReason::NotFound,
        other => FailureReason::Storage(other.to_string()),
    }
}

/// Assignment columns for a new task: user wins, personal tasks carry none
pub fn assignment_for_new(scope: &Scope, user_id: Option<i64>, role_id: Option<i64>) -> (Option<i64>, Option<i64>) {
    match scope {
        Scope::Personal { .. } => (None, None),
        Scope::Group { .. } => match (user_id, role_id) {
            (Some(user), _) => (Some(user), None),
            (None, role) => (None, role),
        },
    }
}

/// Assignment patch for an update under the single-assignment policy.
///
/// Setting a user clears the role, setting only a role clears the user,
/// explicit clears pass through, and absent fields stay absent.
pub fn assignment_patch(
    scope: &Scope,
    user: Option<Option<i64>>,
    role: Option<Option<i64>>,
) -> (Option<Option<i64>>, Option<Option<i64>>) {
    if let Scope::Personal { .. } = scope {
        return (None, None);
    }
    match (user, role) {
        (Some(Some(user)), _) => (Some(Some(user)), Some(None)),
        (_, Some(Some(role))) => (Some(None), Some(Some(role))),
        (user, role) => (user, role),
    }
}

fn clean_text(text: &str) -> Option<String> {
    let cleaned = normalize_whitespace(text);
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

fn parse_priority(raw: Option<&str>) -> Option<Priority> {
    let raw = raw?;
    match raw.parse::<Priority>() {
        Ok(priority) => Some(priority),
        Err(_) => {
            debug!(priority = %raw, "Ignoring unknown priority");
            None
        }
    }
}

#[derive(Clone)]
pub struct ReconciliationEngine {
    store: Arc<dyn Store>,
    locks: Arc<ScopeLocks>,
}

impl ReconciliationEngine {
    pub fn new(store: Arc<dyn Store>, locks: Arc<ScopeLocks>) -> Self {
        Self { store, locks }
    }

    /// Apply a batch: role operations, then new tasks, then updates
    pub async fn reconcile(&self, result: ExtractionResult, target: &ReconcileTarget) -> ReconciliationResult {
        let lock = self.locks.lock_for(target.scope);
        let _guard = lock.lock().await;

        let mut outcome = ReconciliationResult::default();
        self.record_malformed(&result.malformed, &target.scope, &mut outcome);

        if let Scope::Group { chat_id } = target.scope {
            self.apply_roles(chat_id, &result, &mut outcome).await;
        } else if !result.new_roles.is_empty() || !result.role_assignments.is_empty() {
            debug!(scope = %target.scope, "Ignoring role operations outside a group");
        }

        for proposal in &result.new_tasks {
            self.create(proposal, target, &mut outcome).await;
        }

        for proposal in &result.updated_tasks {
            self.update(proposal, target, &mut outcome).await;
        }

        log_reconciliation(
            &target.scope.to_string(),
            outcome.created.len(),
            outcome.updated.len(),
            outcome.failures.len(),
        );
        outcome
    }

    /// Elements the model wrote that never became proposals still count as failures
    fn record_malformed(&self, malformed: &[MalformedProposal], scope: &Scope, outcome: &mut ReconciliationResult) {
        for entry in malformed {
            let is_role_op = matches!(entry.kind, ProposalKind::NewRole | ProposalKind::RoleAssignment);
            if is_role_op && matches!(scope, Scope::Personal { .. }) {
                continue;
            }
            outcome.fail(entry.kind, entry.reference.clone(), FailureReason::Invalid(entry.error.clone()));
        }
    }

    async fn create(&self, proposal: &NewTaskProposal, target: &ReconcileTarget, outcome: &mut ReconciliationResult) {
        let Some(title) = clean_text(&proposal.title) else {
            outcome.fail(ProposalKind::NewTask, "", FailureReason::Invalid("empty title".to_string()));
            return;
        };

        let deadline = proposal.deadline.as_deref().and_then(|raw| {
            let parsed = parse_deadline(raw, target.offset);
            if parsed.is_none() {
                warn!(deadline = %raw, "Unparseable deadline on new task, leaving it unset");
            }
            parsed
        });

        let (assigned_user_id, assigned_role_id) =
            assignment_for_new(&target.scope, proposal.assigned_user_id, proposal.assigned_role_id);

        let (chat_id, author_id) = match target.scope {
            Scope::Personal { user_id } => (None, Some(user_id)),
            Scope::Group { chat_id } => (Some(chat_id), target.author_id),
        };

        let request = CreateTaskRequest {
            title: title.clone(),
            description: proposal.description.as_deref().and_then(clean_text),
            priority: parse_priority(proposal.priority.as_deref()).unwrap_or_default(),
            deadline,
            task_type: target.scope.task_type(),
            author_id,
            chat_id,
            assigned_user_id,
            assigned_role_id,
            readable_prefix: target.readable_prefix.clone(),
        };

        match self.store.create_task(request).await {
            Ok(task) => {
                debug!(task_id = task.id, readable_id = ?task.readable_id, "Task created");
                outcome.created.push(task);
            }
            Err(e) => outcome.fail(ProposalKind::NewTask, title, storage(e)),
        }
    }

    /// Translate a proposal into a partial update; `None` fields stay untouched.
    ///
    /// Also returns the raw deadline when one was supplied but could not be read.
    fn update_request(proposal: &TaskUpdateProposal, target: &ReconcileTarget) -> (UpdateTaskRequest, Option<String>) {
        let mut rejected_deadline = None;
        let deadline = match &proposal.deadline {
            None => None,
            Some(None) => Some(None),
            Some(Some(raw)) => match parse_deadline(raw, target.offset) {
                Some(parsed) => Some(Some(parsed)),
                None => {
                    rejected_deadline = Some(raw.clone());
                    None
                }
            },
        };

        let (assigned_user_id, assigned_role_id) =
            assignment_patch(&target.scope, proposal.assigned_user_id, proposal.assigned_role_id);

        let request = UpdateTaskRequest {
            title: proposal.title.as_deref().and_then(clean_text),
            description: proposal.description.as_ref().map(|d| d.as_deref().and_then(clean_text)),
            priority: parse_priority(proposal.priority.as_deref()),
            deadline,
            is_completed: proposal.is_completed,
            assigned_user_id,
            assigned_role_id,
        };
        (request, rejected_deadline)
    }

    async fn update(&self, proposal: &TaskUpdateProposal, target: &ReconcileTarget, outcome: &mut ReconciliationResult) {
        let Some(task_id) = proposal.id else {
            outcome.fail(ProposalKind::TaskUpdate, "", FailureReason::Invalid("missing task id".to_string()));
            return;
        };

        let before = match self.store.find_task(task_id).await {
            Ok(Some(task)) if task.belongs_to(&target.scope) => task,
            Ok(_) => {
                outcome.fail(ProposalKind::TaskUpdate, task_id.to_string(), FailureReason::NotFound);
                return;
            }
            Err(e) => {
                outcome.fail(ProposalKind::TaskUpdate, task_id.to_string(), storage(e));
                return;
            }
        };

        let (request, rejected_deadline) = Self::update_request(proposal, target);
        if let Some(raw) = rejected_deadline {
            debug!(task_id = task_id, deadline = %raw, "Unparseable deadline in update, leaving it unchanged");
            outcome.fail(
                ProposalKind::TaskUpdate,
                task_id.to_string(),
                FailureReason::Invalid("unparseable deadline".to_string()),
            );
        }
        if request.is_empty() {
            debug!(task_id = task_id, "Update proposal changes nothing");
            return;
        }

        match self.store.update_task(task_id, request).await {
            Ok(after) => outcome.updated.push(TaskChange { before, after }),
            Err(e) => outcome.fail(ProposalKind::TaskUpdate, task_id.to_string(), storage(e)),
        }
    }

    async fn apply_roles(&self, chat_id: i64, result: &ExtractionResult, outcome: &mut ReconciliationResult) {
        if result.new_roles.is_empty() && result.role_assignments.is_empty() {
            return;
        }

        let mut known: Vec<Role> = match self.store.list_roles(chat_id).await {
            Ok(roles) => roles.into_iter().map(|info| info.role).collect(),
            Err(e) => {
                warn!(chat_id = chat_id, error = %e, "Failed to load roles before role operations");
                Vec::new()
            }
        };

        for name in &result.new_roles {
            let Some(name) = clean_text(name) else { continue };
            if known.iter().any(|r| r.name.to_lowercase() == name.to_lowercase()) {
                continue;
            }
            match self.store.create_role(chat_id, &name).await {
                Ok(role) => {
                    known.push(role.clone());
                    outcome.roles_created.push(role);
                }
                Err(e) => outcome.fail(ProposalKind::NewRole, name, storage(e)),
            }
        }

        for assignment in &result.role_assignments {
            let reference = assignment.role_name.clone().unwrap_or_default();
            let Some(user_id) = assignment.user_id else {
                outcome.fail(ProposalKind::RoleAssignment, reference, FailureReason::Invalid("missing user id".to_string()));
                continue;
            };

            let role = match assignment.role_name.as_deref().and_then(clean_text) {
                None => None,
                Some(name) => match known.iter().find(|r| r.name.to_lowercase() == name.to_lowercase()).cloned() {
                    Some(role) => Some(role),
                    None => match self.store.create_role(chat_id, &name).await {
                        Ok(role) => {
                            known.push(role.clone());
                            outcome.roles_created.push(role.clone());
                            Some(role)
                        }
                        Err(e) => {
                            outcome.fail(ProposalKind::RoleAssignment, name, storage(e));
                            continue;
                        }
                    },
                },
            };

            match self.store.set_member_role(chat_id, user_id, role.as_ref().map(|r| r.id)).await {
                Ok(true) => outcome.roles_assigned.push(RoleAssignment {
                    user_id,
                    role_name: role.map(|r| r.name),
                }),
                Ok(false) => outcome.fail(ProposalKind::RoleAssignment, user_id.to_string(), FailureReason::NotFound),
                Err(e) => outcome.fail(ProposalKind::RoleAssignment, user_id.to_string(), storage(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUP: Scope = Scope::Group { chat_id: 1 };
    const PERSONAL: Scope = Scope::Personal { user_id: 1 };

    #[test]
    fn test_new_task_user_wins_over_role() {
        assert_eq!(assignment_for_new(&GROUP, Some(2), Some(3)), (Some(2), None));
        assert_eq!(assignment_for_new(&GROUP, None, Some(3)), (None, Some(3)));
        assert_eq!(assignment_for_new(&PERSONAL, Some(2), Some(3)), (None, None));
    }

    #[test]
    fn test_update_assignment_policy() {
        assert_eq!(assignment_patch(&GROUP, Some(Some(2)), None), (Some(Some(2)), Some(None)));
        assert_eq!(assignment_patch(&GROUP, None, Some(Some(3))), (Some(None), Some(Some(3))));
        assert_eq!(assignment_patch(&GROUP, Some(Some(2)), Some(Some(3))), (Some(Some(2)), Some(None)));
        assert_eq!(assignment_patch(&GROUP, Some(None), None), (Some(None), None));
        assert_eq!(assignment_patch(&GROUP, None, None), (None, None));
        assert_eq!(assignment_patch(&PERSONAL, Some(Some(2)), None), (None, None));
    }

    #[test]
    fn test_scope_locks_are_shared_per_scope() {
        let locks = ScopeLocks::new();
        let a = locks.lock_for(GROUP);
        let b = locks.lock_for(GROUP);
        let c = locks.lock_for(PERSONAL);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
