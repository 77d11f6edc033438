pub mod health;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::generation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Workflow state
        .route("/api/v1/workflow", get(handlers::handle_get_workflow))
        .route("/api/v1/workflow/keyword", put(handlers::handle_set_keyword))
        // Title stage
        .route(
            "/api/v1/titles/generate",
            post(handlers::handle_generate_titles),
        )
        .route(
            "/api/v1/titles/:id/select",
            post(handlers::handle_select_title),
        )
        .route("/api/v1/titles/:id", patch(handlers::handle_edit_title))
        // Outline stage
        .route(
            "/api/v1/outlines/generate",
            post(handlers::handle_generate_all_outlines),
        )
        .route(
            "/api/v1/outlines/:slot/generate",
            post(handlers::handle_generate_outline),
        )
        .with_state(state)
}
