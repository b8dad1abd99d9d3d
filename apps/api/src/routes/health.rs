use axum::Json;
use serde_json::{json, Value};

/// GET /health
/// Liveness check. Touches no collaborator.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
