// User handlers
// HTTP handlers for user documents

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::{error::ApiError, models::user::CreateUserRequest, service::DocumentService};

/// Create a new user
/// POST /documents/users
pub async fn create_user(
    State(service): State<Arc<DocumentService>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Creating new user with username: {}", request.username);

    let user = service.create_user(request).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Get user by ID
/// GET /documents/users/:id
pub async fn get_user(
    State(service): State<Arc<DocumentService>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Fetching user with id: {}", user_id);

    let user = service.get_user(&user_id).await?;

    Ok((StatusCode::OK, Json(user)))
}
