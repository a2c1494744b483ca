//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod user;
pub mod chat;
pub mod task;
pub mod extraction;

// Re-export commonly used models
pub use user::{User, NotificationPreset, CreateUserRequest, UpdateUserRequest};
pub use chat::{Chat, ChatMember, Role, MemberInfo, RoleInfo, CreateChatRequest, UpdateChatRequest, UNKNOWN_GROUP_TITLE};
pub use task::{Task, TaskType, Priority, Scope, CreateTaskRequest, UpdateTaskRequest, readable_prefix, format_readable_id};
pub use extraction::{ExtractionOutcome, ExtractionResult, MalformedProposal, MessagePayload, NewTaskProposal, ProposalKind, TaskUpdateProposal, RoleAssignmentProposal};
