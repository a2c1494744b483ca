//! Best-effort name resolution for free-text assignees and roles
//!
//! Lossy by nature: matching is a case-insensitive substring test and the
//! first match wins. A miss leaves the proposal unassigned.

use crate::models::{ExtractionResult, MemberInfo, RoleInfo};

fn normalize(name: &str) -> String {
    name.trim().trim_start_matches('@').to_lowercase()
}

/// Match a name against members' first names, then usernames
pub fn resolve_member(name: &str, members: &[MemberInfo]) -> Option<i64> {
    let needle = normalize(name);
    if needle.is_empty() {
        return None;
    }

    members
        .iter()
        .find(|member| {
            let user = &member.user;
            user.first_name.as_deref().map(|n| n.to_lowercase().contains(&needle)).unwrap_or(false)
                || user.username.as_deref().map(|n| n.to_lowercase().contains(&needle)).unwrap_or(false)
        })
        .map(|member| member.user.id)
}

/// Match a role name, preferring an exact case-insensitive hit
pub fn resolve_role(name: &str, roles: &[RoleInfo]) -> Option<i64> {
    let needle = normalize(name);
    if needle.is_empty() {
        return None;
    }

    roles
        .iter()
        .find(|info| info.role.name.to_lowercase() == needle)
        .or_else(|| roles.iter().find(|info| info.role.name.to_lowercase().contains(&needle)))
        .map(|info| info.role.id)
}

/// Fill assignment IDs from free-text names where no ID was given
pub fn resolve_names(mut result: ExtractionResult, members: &[MemberInfo], roles: &[RoleInfo]) -> ExtractionResult {
    for proposal in &mut result.new_tasks {
        if proposal.assigned_user_id.is_none() {
            proposal.assigned_user_id = proposal.assignee.as_deref().and_then(|n| resolve_member(n, members));
        }
        if proposal.assigned_role_id.is_none() {
            proposal.assigned_role_id = proposal.role.as_deref().and_then(|n| resolve_role(n, roles));
        }
    }

    for proposal in &mut result.updated_tasks {
        if proposal.assigned_user_id.is_none() {
            if let Some(id) = proposal.assignee.as_deref().and_then(|n| resolve_member(n, members)) {
                proposal.assigned_user_id = Some(Some(id));
            }
        }
        if proposal.assigned_role_id.is_none() {
            if let Some(id) = proposal.role.as_deref().and_then(|n| resolve_role(n, roles)) {
                proposal.assigned_role_id = Some(Some(id));
            }
        }
    }

    result
}
