use std::sync::Arc;

use crate::batch::BatchController;
use crate::config::Config;
use crate::store::RecordStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    /// Single-flight batch runner; one active job per process.
    pub controller: Arc<BatchController>,
    pub config: Config,
}
