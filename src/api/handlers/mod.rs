use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

pub mod accounts;
pub mod books;
pub mod preferences;
pub mod ratings;
pub mod recommendations;

/// Service banner
pub async fn index() -> Json<Value> {
    Json(json!({
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

pub async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Resource not found" })),
    )
}
