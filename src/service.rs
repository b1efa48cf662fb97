use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::models::{
    validate_document_id, Article, CreateArticleRequest, CreateUserRequest, SearchArticlesQuery,
    UpdateArticleRequest, User,
};
use crate::repository::DocumentRepository;

/// Article and user operations on top of a [`DocumentRepository`].
/// Validation, normalisation and timestamps live here; the repository only stores.
#[derive(Clone)]
pub struct DocumentService {
    repository: Arc<dyn DocumentRepository>,
}

impl DocumentService {
    pub fn new(repository: Arc<dyn DocumentRepository>) -> Self {
        DocumentService { repository }
    }

    /// 起動時にインデックスとマッピングを用意する。
    pub async fn prepare(&self) -> ApiResult<()> {
        self.repository.ensure_indices().await
    }

    /// クラスタが green / yellow なら `true`。接続失敗も unhealthy として扱う。
    pub async fn elasticsearch_healthy(&self) -> bool {
        match self.repository.is_healthy().await {
            Ok(healthy) => {
                if !healthy {
                    warn!("Elasticsearch cluster reported red status");
                }
                healthy
            }
            Err(e) => {
                error!("Elasticsearch health check failed: {}", e);
                false
            }
        }
    }

    pub async fn create_article(&self, request: CreateArticleRequest) -> ApiResult<Article> {
        request.validate().map_err(ApiError::Validation)?;

        let article = request.into_article();
        self.repository.insert_article(&article).await.map_err(|e| {
            error!("Failed to create article: {}", e);
            e
        })?;

        info!("Created article with ID: {}", article.id);
        Ok(article)
    }

    pub async fn get_article(&self, article_id: &str) -> ApiResult<Article> {
        validate_document_id(article_id).map_err(ApiError::Validation)?;

        match self.repository.find_article(article_id).await? {
            Some(found) => Ok(found.document),
            None => {
                warn!("Article not found: {}", article_id);
                Err(ApiError::not_found("Article"))
            }
        }
    }

    pub async fn search_articles(&self, query: SearchArticlesQuery) -> ApiResult<Vec<Article>> {
        let search = query.into_search().map_err(ApiError::Validation)?;

        let articles = self.repository.search_articles(&search).await.map_err(|e| {
            error!("Failed to search articles: {}", e);
            e
        })?;

        info!("Search returned {} articles", articles.len());
        Ok(articles)
    }

    /// 読み込んだ時点の `_seq_no` / `_primary_term` を条件に書き戻すので、
    /// 間に別の更新が入った場合は `Conflict` になる。
    pub async fn update_article(
        &self,
        article_id: &str,
        request: UpdateArticleRequest,
    ) -> ApiResult<Article> {
        validate_document_id(article_id).map_err(ApiError::Validation)?;
        request.validate().map_err(ApiError::Validation)?;

        let Some(found) = self.repository.find_article(article_id).await? else {
            warn!("Article not found for update: {}", article_id);
            return Err(ApiError::not_found("Article"));
        };

        let mut article = found.document;
        article.apply(request);

        self.repository
            .replace_article(&article, found.version)
            .await
            .map_err(|e| {
                error!("Failed to update article {}: {}", article_id, e);
                e
            })?;

        info!("Updated article with ID: {}", article_id);
        Ok(article)
    }

    pub async fn delete_article(&self, article_id: &str) -> ApiResult<()> {
        validate_document_id(article_id).map_err(ApiError::Validation)?;

        if self.repository.delete_article(article_id).await? {
            info!("Deleted article with ID: {}", article_id);
            Ok(())
        } else {
            warn!("Article not found for deletion: {}", article_id);
            Err(ApiError::not_found("Article"))
        }
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> ApiResult<User> {
        request.validate().map_err(ApiError::Validation)?;

        let user = request.into_user();
        self.repository.insert_user(&user).await.map_err(|e| {
            error!("Failed to create user: {}", e);
            e
        })?;

        info!("Created user with ID: {}", user.id);
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> ApiResult<User> {
        validate_document_id(user_id).map_err(ApiError::Validation)?;

        match self.repository.find_user(user_id).await? {
            Some(user) => Ok(user),
            None => {
                warn!("User not found: {}", user_id);
                Err(ApiError::not_found("User"))
            }
        }
    }
}
