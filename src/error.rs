use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::elasticsearch::ElasticsearchError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Elasticsearch error: {0}")]
    Elasticsearch(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Elasticsearch(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error_code, message) = match self {
            ApiError::Elasticsearch(ref err) => {
                if err.contains("timed out") {
                    tracing::warn!("Elasticsearch operation timeout: {}", err);
                } else {
                    tracing::error!("Elasticsearch error: {}", err);
                }

                // Provide user-friendly message without exposing cluster details
                let user_message = if err.contains("timed out") {
                    "Search backend operation timed out, please try again"
                } else if err.contains("unavailable") || err.contains("connection") {
                    "Search backend is temporarily unavailable"
                } else {
                    "A search backend error occurred"
                };

                ("ELASTICSEARCH_ERROR", user_message.to_string())
            }
            ApiError::Validation(ref message) => {
                tracing::debug!("Validation error: {}", message);
                ("VALIDATION_ERROR", message.clone())
            }
            ApiError::NotFound(ref resource) => {
                tracing::debug!("Resource not found: {}", resource);
                ("NOT_FOUND", format!("{} not found", resource))
            }
            ApiError::Conflict(ref message) => {
                tracing::debug!("Document conflict: {}", message);
                ("CONFLICT", message.clone())
            }
            ApiError::ServiceUnavailable(ref message) => {
                tracing::warn!("Service unavailable: {}", message);
                ("SERVICE_UNAVAILABLE", message.clone())
            }
            ApiError::Internal(ref err) => {
                tracing::error!("Internal server error: {:#}", err);
                ("INTERNAL_ERROR", "An internal server error occurred".to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

// Elasticsearch error mapping
impl From<ElasticsearchError> for ApiError {
    fn from(err: ElasticsearchError) -> Self {
        match err {
            ElasticsearchError::AlreadyExists(ref id) => {
                tracing::debug!("Document id already taken: {}", id);
                ApiError::Conflict("Document already exists".to_string())
            }
            ElasticsearchError::Response { status: 409, .. } => {
                tracing::debug!("Elasticsearch version conflict: {}", err);
                ApiError::Conflict("Document was modified concurrently, please retry".to_string())
            }
            ElasticsearchError::Response { status: 400, ref error_type, ref reason } => {
                match error_type.as_deref() {
                    Some("mapper_parsing_exception")
                    | Some("document_parsing_exception")
                    | Some("illegal_argument_exception") => {
                        tracing::debug!("Elasticsearch rejected document: {}", reason);
                        ApiError::Validation(format!("Document rejected by index: {}", reason))
                    }
                    _ => {
                        tracing::error!("Unhandled Elasticsearch bad request: {}", err);
                        ApiError::Elasticsearch("Search request failed".to_string())
                    }
                }
            }
            ElasticsearchError::Response { status: 401 | 403, .. } => {
                tracing::error!("Elasticsearch access error: {}", err);
                ApiError::Elasticsearch("Search backend access denied".to_string())
            }
            ElasticsearchError::Response { status: 502..=504, .. } => {
                tracing::error!("Elasticsearch unavailable: {}", err);
                ApiError::Elasticsearch("Search backend unavailable".to_string())
            }
            ElasticsearchError::Timeout(_) => {
                tracing::warn!("Elasticsearch timeout: {}", err);
                ApiError::Elasticsearch("Search backend request timed out".to_string())
            }
            ElasticsearchError::Transport(_) => {
                tracing::error!("Elasticsearch transport error: {}", err);
                ApiError::Elasticsearch("Search backend connection unavailable".to_string())
            }
            ElasticsearchError::InvalidUrl(_) => {
                tracing::error!("Elasticsearch configuration error: {}", err);
                ApiError::Internal(anyhow::anyhow!(err))
            }
            _ => {
                tracing::error!("Unhandled Elasticsearch error: {}", err);
                ApiError::Elasticsearch("Search backend operation failed".to_string())
            }
        }
    }
}

// Result type alias for convenience
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn response_error(status: u16, error_type: &str) -> ElasticsearchError {
        ElasticsearchError::Response {
            status,
            error_type: Some(error_type.to_string()),
            reason: "reason".to_string(),
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::validation("bad").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::not_found("Article").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::conflict("dup").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::ServiceUnavailable("down".to_string()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::Elasticsearch("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_conflict_mapping() {
        let err = ApiError::from(response_error(409, "version_conflict_engine_exception"));
        assert!(matches!(err, ApiError::Conflict(ref m) if m.contains("modified concurrently")));

        let err = ApiError::from(ElasticsearchError::Response {
            status: 409,
            error_type: None,
            reason: "conflict".to_string(),
        });
        assert!(matches!(err, ApiError::Conflict(ref m) if m.contains("modified concurrently")));

        let err = ApiError::from(ElasticsearchError::AlreadyExists("a1".to_string()));
        assert!(matches!(err, ApiError::Conflict(ref m) if m == "Document already exists"));
    }

    #[test]
    fn test_bad_request_mapping() {
        let err = ApiError::from(response_error(400, "mapper_parsing_exception"));
        assert!(matches!(err, ApiError::Validation(_)));

        let err = ApiError::from(response_error(400, "search_phase_execution_exception"));
        assert!(matches!(err, ApiError::Elasticsearch(_)));
    }

    #[test]
    fn test_transport_mapping() {
        let err = ApiError::from(ElasticsearchError::Timeout("20s".to_string()));
        assert!(matches!(err, ApiError::Elasticsearch(ref m) if m.contains("timed out")));

        let err = ApiError::from(ElasticsearchError::Transport("refused".to_string()));
        assert!(matches!(err, ApiError::Elasticsearch(ref m) if m.contains("connection")));

        let err = ApiError::from(response_error(503, "unavailable_shards_exception"));
        assert!(matches!(err, ApiError::Elasticsearch(_)));
    }
}
