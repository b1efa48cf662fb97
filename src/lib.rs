// Library root for the Elasticsearch document API

pub mod config;
pub mod elasticsearch;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod router;
pub mod service;

// Re-export commonly used types
pub use error::{ApiError, ApiResult};
pub use models::{Article, CreateArticleRequest, CreateUserRequest, UpdateArticleRequest, User};
pub use repository::{DocumentRepository, ElasticsearchRepository};
pub use service::DocumentService;
