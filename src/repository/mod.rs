//! Persistence seam for article and user documents.
//!
//! `DocumentService` only talks to [`DocumentRepository`], so the HTTP layer
//! can be exercised against [`memory::InMemoryRepository`] without a cluster.

pub mod elasticsearch;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::elasticsearch::DocumentVersion;
use crate::error::{ApiError, ApiResult};
use crate::models::{Article, ArticleSearch, User};

pub use self::elasticsearch::ElasticsearchRepository;

/// A document together with the version it was read at.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub document: T,
    pub version: DocumentVersion,
}

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Creates missing indices with their mappings. Safe to call repeatedly;
    /// implementations also run it before their first write until it succeeds.
    async fn ensure_indices(&self) -> ApiResult<()>;

    async fn is_healthy(&self) -> ApiResult<bool>;

    /// Fails with `Conflict` if the id is already taken.
    async fn insert_article(&self, article: &Article) -> ApiResult<()>;

    async fn find_article(&self, id: &str) -> ApiResult<Option<Versioned<Article>>>;

    async fn search_articles(&self, search: &ArticleSearch) -> ApiResult<Vec<Article>>;

    /// Fails with `Conflict` if the stored document no longer matches `version`.
    async fn replace_article(&self, article: &Article, version: DocumentVersion) -> ApiResult<()>;

    /// Returns `false` when nothing was deleted.
    async fn delete_article(&self, id: &str) -> ApiResult<bool>;

    async fn insert_user(&self, user: &User) -> ApiResult<()>;

    async fn find_user(&self, id: &str) -> ApiResult<Option<User>>;
}

/// ドキュメントを `_source` 用の JSON に変換する。`id` は `_id` として別に送るので取り除く。
pub fn to_source<T: Serialize>(document: &T) -> ApiResult<Value> {
    let mut value = serde_json::to_value(document)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Failed to serialize document: {}", e)))?;

    if let Value::Object(ref mut map) = value {
        map.remove("id");
    }

    Ok(value)
}

/// `_source` と `_id` からドキュメントを復元する。
pub fn from_source<T: DeserializeOwned>(id: &str, source: Value) -> ApiResult<T> {
    let mut value = source;

    match value {
        Value::Object(ref mut map) => {
            map.insert("id".to_string(), Value::String(id.to_string()));
        }
        _ => {
            return Err(ApiError::Internal(anyhow::anyhow!(
                "Document {} has a non-object _source",
                id
            )))
        }
    }

    serde_json::from_value(value)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Failed to decode document {}: {}", id, e)))
}
