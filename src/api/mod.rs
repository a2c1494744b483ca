//! HTTP API
//!
//! A small axum surface over the same pipeline the bot uses.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use router::{create_router, serve};
pub use state::AppState;
