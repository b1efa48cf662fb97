// Models module

pub mod article;
pub mod timestamp;
pub mod user;

// Re-export commonly used types
pub use article::{Article, ArticleSearch, CreateArticleRequest, SearchArticlesQuery, UpdateArticleRequest};
pub use user::{CreateUserRequest, User};

/// Elasticsearch rejects `_id` values longer than 512 bytes.
pub const MAX_DOCUMENT_ID_BYTES: usize = 512;

/// パスから受け取ったドキュメント ID を検証する。
pub fn validate_document_id(id: &str) -> Result<(), String> {
    if id.trim().is_empty() {
        return Err("Document ID cannot be empty".to_string());
    }

    if id.len() > MAX_DOCUMENT_ID_BYTES {
        return Err(format!("Document ID cannot exceed {} bytes", MAX_DOCUMENT_ID_BYTES));
    }

    Ok(())
}
