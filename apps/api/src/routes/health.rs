use axum::Json;
use serde_json::{json, Value};

/// GET /
/// Identifies the service for anyone poking at the root path.
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "service": "bellhop-api",
        "message": "Hotel event quote extraction. POST /extract to get started."
    }))
}

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "bellhop-api"
    }))
}
