// Handlers module
// HTTP handlers for the REST API

pub mod articles;
pub mod health;
pub mod users;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Root handler
/// GET /
pub async fn root() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "message": "Elasticsearch document API is running!" })),
    )
}
