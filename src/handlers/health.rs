// Health handlers
// Liveness of the service and of the Elasticsearch cluster behind it

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::{error::ApiError, service::DocumentService};

/// Service health check
/// GET /health
/// Answers 503 while the cluster is unreachable or red.
pub async fn health_check(
    State(service): State<Arc<DocumentService>>,
) -> Result<impl IntoResponse, ApiError> {
    if !service.elasticsearch_healthy().await {
        return Err(ApiError::ServiceUnavailable(
            "Elasticsearch is not healthy".to_string(),
        ));
    }

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "elasticsearch": "connected"
        })),
    ))
}

/// Elasticsearch-specific health check
/// GET /health/elasticsearch
/// Always 200, the body carries the verdict.
pub async fn elasticsearch_health(
    State(service): State<Arc<DocumentService>>,
) -> impl IntoResponse {
    let status = if service.elasticsearch_healthy().await {
        "healthy"
    } else {
        "unhealthy"
    };

    (StatusCode::OK, Json(json!({ "elasticsearch": status })))
}
