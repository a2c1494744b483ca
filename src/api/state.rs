//! Application state shared across handlers

use crate::services::ServiceFactory;

#[derive(Clone)]
pub struct AppState {
    pub services: ServiceFactory,
    /// Largest accepted multipart body
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(services: ServiceFactory, max_upload_bytes: usize) -> Self {
        Self { services, max_upload_bytes }
    }
}
