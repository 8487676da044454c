pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analyses::handlers as analyses;
use crate::notify::handlers as notify;
use crate::queue::handlers as jobs;
use crate::requirements::handlers as requirements;
use crate::resumes::handlers as resumes;
use crate::state::AppState;

/// Room for the multipart framing and text fields around the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_size + MULTIPART_OVERHEAD;

    Router::new()
        .route("/health", get(health::health_handler))
        // Resumes
        .route(
            "/api/v1/resumes/upload",
            post(resumes::handle_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/v1/resumes", get(resumes::handle_list_resumes))
        .route("/api/v1/resumes/:id", get(resumes::handle_get_resume))
        .route("/api/v1/resumes/:id/analyze", post(resumes::handle_analyze))
        .route(
            "/api/v1/resumes/:id/analyze/async",
            post(resumes::handle_analyze_async),
        )
        .route("/api/v1/jobs/:id", get(jobs::handle_job_status))
        // Requirements
        .route(
            "/api/v1/requirements",
            post(requirements::handle_create_requirement)
                .get(requirements::handle_list_requirements),
        )
        .route(
            "/api/v1/requirements/:id",
            get(requirements::handle_get_requirement)
                .put(requirements::handle_update_requirement)
                .delete(requirements::handle_delete_requirement),
        )
        // Analyses
        .route("/api/v1/analyses", get(analyses::handle_list_analyses))
        .route(
            "/api/v1/analyses/statistics/summary",
            get(analyses::handle_analysis_summary),
        )
        .route("/api/v1/analyses/:id", get(analyses::handle_get_analysis))
        // Push notifications
        .route(
            "/ws/notifications/:user_id",
            get(notify::handle_notifications_ws),
        )
        .route(
            "/ws/notification-test/:user_id",
            post(notify::handle_notification_test),
        )
        .route("/ws/broadcast-test", post(notify::handle_broadcast_test))
        .with_state(state)
}
