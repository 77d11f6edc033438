use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::TextGenerator;
use crate::models::workflow::SharedWorkflow;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Generation backend. `GeminiClient` in production, scripted in tests.
    pub llm: Arc<dyn TextGenerator>,
    /// The single in-session workflow: keyword, title board, selection, outline slots.
    pub workflow: SharedWorkflow,
    pub config: Config,
}
