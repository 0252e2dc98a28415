pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::jobs::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Resume text extraction
        .route(
            "/api/v1/resumes/extract",
            post(handlers::handle_extract_resume),
        )
        // Analysis jobs
        .route(
            "/api/v1/jobs",
            get(handlers::handle_list_jobs).post(handlers::handle_create_job),
        )
        .route(
            "/api/v1/jobs/:id",
            get(handlers::handle_get_job).delete(handlers::handle_delete_job),
        )
        .route("/api/v1/jobs/:id/stop", post(handlers::handle_stop_job))
        .with_state(state)
}
