//! Database module
//!
//! This module handles database connections and operations

pub mod connection;
pub mod repositories;
pub mod service;
pub mod store;

// Re-export commonly used database components
pub use connection::{DatabasePool, create_pool, run_migrations, health_check};
pub use repositories::{UserRepository, ChatRepository, RoleRepository, TaskRepository};
pub use service::DatabaseService;
pub use store::{IdentityStore, TaskStore, Store};
