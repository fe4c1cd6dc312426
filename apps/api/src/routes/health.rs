use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::llm_client::{probe_key, KeyProbe};
use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "recruit-api"
    }))
}

/// GET /api/test-key
/// Sends a tiny completion to check that the configured API key works.
pub async fn test_key_handler(State(state): State<AppState>) -> Json<KeyProbe> {
    Json(probe_key(state.llm.as_ref()).await)
}
