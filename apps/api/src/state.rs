use std::sync::Arc;

use sqlx::PgPool;

use crate::interview::engine::InterviewEngine;
use crate::interview::store::SessionStore;
use crate::llm_client::CompletionProvider;
use crate::storage::ObjectStore;

/// Shared application state injected into all route handlers via Axum extractors.
/// External services sit behind traits so tests can swap in memory doubles.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub sessions: Arc<dyn SessionStore>,
    pub storage: Arc<dyn ObjectStore>,
    pub llm: Arc<dyn CompletionProvider>,
    /// Shares `llm`; carries the per-turn retry policy.
    pub engine: InterviewEngine,
}
