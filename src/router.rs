use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{
    handlers::{
        articles::{create_article, delete_article, get_article, search_articles, update_article},
        health::{elasticsearch_health, health_check},
        root,
        users::{create_user, get_user},
    },
    middleware::apply_middleware,
    service::DocumentService,
};

/// Create the Axum router with all endpoints and middleware
pub fn create_router(service: Arc<DocumentService>) -> Router {
    let router = Router::new()
        .route("/", get(root))
        // Health endpoints
        .route("/health", get(health_check))
        .route("/health/", get(health_check))
        .route("/health/elasticsearch", get(elasticsearch_health))
        // Article endpoints
        .route("/documents/articles", post(create_article).get(search_articles))
        .route(
            "/documents/articles/:id",
            get(get_article).put(update_article).delete(delete_article),
        )
        // User endpoints
        .route("/documents/users", post(create_user))
        .route("/documents/users/:id", get(get_user))
        .with_state(service);

    apply_middleware(router)
}
