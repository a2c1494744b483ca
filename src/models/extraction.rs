//! Language model extraction payloads and proposals
//!
//! Proposals arrive from untrusted model output, so every field is optional or
//! lenient and the outcome is decided once at parse time. Each list element is
//! decoded on its own; one that does not fit is kept aside as malformed and
//! the rest of the batch survives.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// What the model sent back for one message
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    /// Parsed task operations
    Structured(ExtractionResult),
    /// Anything that is not the expected JSON, shown to the user as-is
    Freeform(String),
}

/// Message content attached next to the prompt
#[derive(Debug, Clone, PartialEq)]
pub enum MessagePayload {
    Text(String),
    Audio { bytes: Vec<u8>, mime_type: String },
}

impl MessagePayload {
    pub fn kind(&self) -> &'static str {
        match self {
            MessagePayload::Text(_) => "text",
            MessagePayload::Audio { .. } => "audio",
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            MessagePayload::Text(text) => Some(text),
            MessagePayload::Audio { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProposalKind {
    NewTask,
    TaskUpdate,
    NewRole,
    RoleAssignment,
}

/// A list element that could not be read as a proposal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedProposal {
    pub kind: ProposalKind,
    /// Task ID, title or role name if the element carried one
    pub reference: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawExtractionResult")]
pub struct ExtractionResult {
    pub new_tasks: Vec<NewTaskProposal>,
    pub updated_tasks: Vec<TaskUpdateProposal>,
    pub new_roles: Vec<String>,
    pub role_assignments: Vec<RoleAssignmentProposal>,
    #[serde(skip)]
    pub malformed: Vec<MalformedProposal>,
}

/// Top-level lists as the model wrote them; missing and `null` both end up `Null`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExtractionResult {
    #[serde(default)]
    new_tasks: Value,
    #[serde(default)]
    updated_tasks: Value,
    #[serde(default)]
    new_roles: Value,
    #[serde(default)]
    role_assignments: Value,
}

impl From<RawExtractionResult> for ExtractionResult {
    fn from(raw: RawExtractionResult) -> Self {
        let mut malformed = Vec::new();
        Self {
            new_tasks: decode_list(raw.new_tasks, ProposalKind::NewTask, &mut malformed),
            updated_tasks: decode_list(raw.updated_tasks, ProposalKind::TaskUpdate, &mut malformed),
            new_roles: decode_list(raw.new_roles, ProposalKind::NewRole, &mut malformed),
            role_assignments: decode_list(raw.role_assignments, ProposalKind::RoleAssignment, &mut malformed),
            malformed,
        }
    }
}

/// Decode each element independently; a lone object counts as a one-element list
fn decode_list<T: DeserializeOwned>(raw: Value, kind: ProposalKind, malformed: &mut Vec<MalformedProposal>) -> Vec<T> {
    let items = match raw {
        Value::Null => return Vec::new(),
        Value::Array(items) => items,
        other => vec![other],
    };

    items
        .into_iter()
        .filter_map(|item| {
            let reference = proposal_reference(&item);
            match serde_json::from_value::<T>(item) {
                Ok(proposal) => Some(proposal),
                Err(e) => {
                    warn!(kind = ?kind, reference = %reference, error = %e, "Dropping malformed proposal");
                    malformed.push(MalformedProposal { kind, reference, error: e.to_string() });
                    None
                }
            }
        })
        .collect()
}

fn proposal_reference(item: &Value) -> String {
    let scalar = |value: &Value| match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    };

    scalar(item)
        .or_else(|| ["id", "title", "roleName", "userId"].iter().find_map(|key| item.get(*key).and_then(scalar)))
        .unwrap_or_default()
}

impl ExtractionResult {
    /// Top-level keys that mark a JSON object as an extraction result
    pub const KNOWN_KEYS: [&'static str; 4] = ["newTasks", "updatedTasks", "newRoles", "roleAssignments"];

    /// No usable proposals; malformed elements are not counted
    pub fn is_empty(&self) -> bool {
        self.new_tasks.is_empty()
            && self.updated_tasks.is_empty()
            && self.new_roles.is_empty()
            && self.role_assignments.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTaskProposal {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "optional_id")]
    pub assigned_user_id: Option<i64>,
    #[serde(default, deserialize_with = "optional_id")]
    pub assigned_role_id: Option<i64>,
    /// Free-text assignee name, resolved against members when no ID is given
    #[serde(default)]
    pub assignee: Option<String>,
    /// Free-text role name, resolved against chat roles when no ID is given
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
}

/// Changes to one existing task; absent fields stay untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdateProposal {
    #[serde(default, deserialize_with = "optional_id")]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, alias = "completed", deserialize_with = "lenient_bool")]
    pub is_completed: Option<bool>,
    #[serde(default, deserialize_with = "patch_id")]
    pub assigned_user_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "patch_id")]
    pub assigned_role_id: Option<Option<i64>>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub deadline: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignmentProposal {
    #[serde(default, deserialize_with = "optional_id")]
    pub user_id: Option<i64>,
    /// `None` removes the member's role
    #[serde(default)]
    pub role_name: Option<String>,
}

/// An ID the model may write as a number, a numeric string or a readable ID
#[derive(Deserialize)]
#[serde(untagged)]
enum FlexibleId {
    Number(i64),
    Text(String),
}

impl FlexibleId {
    fn into_id(self) -> Option<i64> {
        match self {
            FlexibleId::Number(n) => Some(n),
            FlexibleId::Text(text) => {
                let text = text.trim().trim_start_matches('#');
                text.parse::<i64>().ok().or_else(|| {
                    text.rsplit_once('-')
                        .and_then(|(_, suffix)| suffix.parse::<i64>().ok())
                })
            }
        }
    }
}

fn optional_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<FlexibleId> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(FlexibleId::into_id))
}

/// Null clears; an unreadable ID is treated as absent rather than as a clear
fn patch_id<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<FlexibleId> = Option::deserialize(deserializer)?;
    Ok(match raw {
        None => Some(None),
        Some(id) => id.into_id().map(Some),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlexibleBool {
    Bool(bool),
    Text(String),
}

/// Accepts `true` as well as `"true"`; any other string is an error
fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<FlexibleBool>::deserialize(deserializer)? {
        None => Ok(None),
        Some(FlexibleBool::Bool(value)) => Ok(Some(value)),
        Some(FlexibleBool::Text(text)) => match text.trim().to_lowercase().as_str() {
            "true" | "yes" => Ok(Some(true)),
            "false" | "no" => Ok(Some(false)),
            other => Err(serde::de::Error::custom(format!("expected a boolean, got {:?}", other))),
        },
    }
}

/// Distinguishes an explicit `null` from a missing key
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
