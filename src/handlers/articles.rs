// Article handlers
// HTTP handlers for article documents

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::Query;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::{
    error::ApiError,
    models::article::{CreateArticleRequest, SearchArticlesQuery, UpdateArticleRequest},
    service::DocumentService,
};

/// Create a new article
/// POST /documents/articles
pub async fn create_article(
    State(service): State<Arc<DocumentService>>,
    Json(request): Json<CreateArticleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Creating new article with title: {}", request.title);

    let article = service.create_article(request).await?;

    Ok((StatusCode::CREATED, Json(article)))
}

/// Get article by ID
/// GET /documents/articles/:id
pub async fn get_article(
    State(service): State<Arc<DocumentService>>,
    Path(article_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Fetching article with id: {}", article_id);

    let article = service.get_article(&article_id).await?;

    Ok((StatusCode::OK, Json(article)))
}

/// Search articles with optional full-text query, category and tag filters
/// GET /documents/articles?query=<text>&category=<c>&tags=<t>&tags=<t>&limit=<n>&offset=<n>
pub async fn search_articles(
    State(service): State<Arc<DocumentService>>,
    Query(params): Query<SearchArticlesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    info!(
        "Searching articles (query: {:?}, category: {:?}, tags: {:?}, limit: {}, offset: {})",
        params.query, params.category, params.tags, params.limit, params.offset
    );

    let articles = service.search_articles(params).await?;

    Ok((StatusCode::OK, Json(articles)))
}

/// Update article by ID
/// PUT /documents/articles/:id
pub async fn update_article(
    State(service): State<Arc<DocumentService>>,
    Path(article_id): Path<String>,
    Json(request): Json<UpdateArticleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Updating article with id: {}", article_id);

    let article = service.update_article(&article_id, request).await?;

    Ok((StatusCode::OK, Json(article)))
}

/// Delete article by ID
/// DELETE /documents/articles/:id
pub async fn delete_article(
    State(service): State<Arc<DocumentService>>,
    Path(article_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Deleting article with id: {}", article_id);

    service.delete_article(&article_id).await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Article deleted successfully" })),
    ))
}
