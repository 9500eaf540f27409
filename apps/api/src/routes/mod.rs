pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::cv::handlers as screening;
use crate::matching::handlers as matching;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.body_limit();

    Router::new()
        .route("/", get(health::health_handler))
        .route("/health", get(health::health_handler))
        .route("/model-status", get(health::model_status_handler))
        .route("/config", get(health::config_handler))
        // Screening API
        .route("/validate_cv", post(screening::handle_validate_cv))
        .route("/extract_cv_info", post(screening::handle_extract_cv_info))
        .route("/match_cv_job", post(screening::handle_match_cv_job))
        // Matching API
        .route("/api/v1/health", get(matching::handle_matching_health))
        .route("/api/v1/upload-cv", post(matching::handle_upload_cv))
        .route(
            "/api/v1/cv/:cv_id",
            get(matching::handle_get_cv).delete(matching::handle_delete_cv),
        )
        .route("/api/v1/match-cvs", post(matching::handle_match_cvs))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
