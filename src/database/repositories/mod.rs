//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod user;
pub mod chat;
pub mod role;
pub mod task;

// Re-export repositories
pub use user::UserRepository;
pub use chat::ChatRepository;
pub use role::RoleRepository;
pub use task::TaskRepository;
