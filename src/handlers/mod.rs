pub mod analytics;
pub mod metrics;

use axum::{http::StatusCode, Json};
use chrono::Utc;
use serde_json::json;

pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Inventory Analytics API is running" }))
}

pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "inventory-analytics",
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}

pub async fn test_endpoint() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "message": "Analytics service is running" }))
}
