use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use super::{from_source, to_source, DocumentRepository, Versioned};
use crate::config::ElasticsearchConfig;
use crate::elasticsearch::{DocumentVersion, ElasticsearchClient};
use crate::error::{ApiError, ApiResult};
use crate::models::{Article, ArticleSearch, User};

/// Elasticsearch をバックエンドに持つリポジトリ層。
/// 記事とユーザーはそれぞれ `<prefix>_articles` / `<prefix>_users` インデックスに保存する。
/// 書き込みと検索の前に必ずインデックスの準備を済ませ、失敗した場合は次の呼び出しで再試行する。
#[derive(Clone)]
pub struct ElasticsearchRepository {
    client: ElasticsearchClient,
    articles_index: String,
    users_index: String,
    indices_ready: Arc<OnceCell<()>>,
}

impl ElasticsearchRepository {
    pub fn new(config: &ElasticsearchConfig) -> ApiResult<Self> {
        let client = ElasticsearchClient::new(config)?;

        Ok(ElasticsearchRepository {
            client,
            articles_index: config.articles_index(),
            users_index: config.users_index(),
            indices_ready: Arc::new(OnceCell::new()),
        })
    }

    /// Without this a write to a missing index would auto-create it with dynamic mappings.
    async fn ready(&self) -> ApiResult<()> {
        self.indices_ready
            .get_or_try_init(|| async move {
                info!("Ensuring Elasticsearch indices exist");
                self.ensure_index(&self.articles_index, articles_index_body()).await?;
                self.ensure_index(&self.users_index, users_index_body()).await?;
                info!("Elasticsearch indices ready");
                Ok::<(), ApiError>(())
            })
            .await?;
        Ok(())
    }

    async fn ensure_index(&self, index: &str, body: Value) -> ApiResult<()> {
        if self.client.index_exists(index).await? {
            info!("Elasticsearch index {} already present", index);
            return Ok(());
        }

        self.client.create_index(index, &body).await.map_err(|e| {
            error!("Failed to create index {}: {}", index, e);
            ApiError::from(e)
        })?;

        Ok(())
    }
}

fn index_settings() -> Value {
    json!({
        "number_of_shards": 1,
        "number_of_replicas": 0
    })
}

/// 記事インデックスのマッピング。タイトルと本文は全文検索用に `text`、絞り込みに使う項目は `keyword`。
pub fn articles_index_body() -> Value {
    json!({
        "settings": index_settings(),
        "mappings": {
            "properties": {
                "title": { "type": "text", "analyzer": "standard" },
                "content": { "type": "text", "analyzer": "standard" },
                "author": { "type": "keyword" },
                "category": { "type": "keyword" },
                "tags": { "type": "keyword" },
                "views": { "type": "integer" },
                "rating": { "type": "float" },
                "created_at": { "type": "date" },
                "updated_at": { "type": "date" }
            }
        }
    })
}

pub fn users_index_body() -> Value {
    json!({
        "settings": index_settings(),
        "mappings": {
            "properties": {
                "username": { "type": "keyword" },
                "email": { "type": "keyword" },
                "full_name": { "type": "text" },
                "bio": { "type": "text" },
                "is_active": { "type": "keyword" },
                "created_at": { "type": "date" },
                "updated_at": { "type": "date" }
            }
        }
    })
}

/// 検索条件から `_search` のリクエストボディを組み立てる。
/// 検索語があれば `multi_match` (タイトルを 2 倍に重み付け)、なければ `match_all` で新しい順に並べる。
pub fn build_search_body(search: &ArticleSearch) -> Value {
    let must = match search.query {
        Some(ref query) => json!({
            "multi_match": {
                "query": query,
                "fields": ["title^2", "content"]
            }
        }),
        None => json!({ "match_all": {} }),
    };

    let mut filter = Vec::new();
    if let Some(ref category) = search.category {
        filter.push(json!({ "term": { "category": category } }));
    }
    if !search.tags.is_empty() {
        filter.push(json!({ "terms": { "tags": search.tags } }));
    }

    let mut body = json!({
        "from": search.offset,
        "size": search.limit,
        "query": {
            "bool": {
                "must": [must],
                "filter": filter
            }
        }
    });

    if search.query.is_none() {
        body["sort"] = json!([{ "created_at": { "order": "desc" } }]);
    }

    body
}

#[async_trait]
impl DocumentRepository for ElasticsearchRepository {
    async fn ensure_indices(&self) -> ApiResult<()> {
        self.ready().await
    }

    async fn is_healthy(&self) -> ApiResult<bool> {
        let health = self.client.cluster_health().await?;
        Ok(health.is_healthy())
    }

    async fn insert_article(&self, article: &Article) -> ApiResult<()> {
        self.ready().await?;

        let source = to_source(article)?;
        self.client
            .create_document(&self.articles_index, &article.id, &source)
            .await?;
        Ok(())
    }

    async fn find_article(&self, id: &str) -> ApiResult<Option<Versioned<Article>>> {
        let Some(doc) = self.client.get_document(&self.articles_index, id).await? else {
            return Ok(None);
        };

        let (Some(source), Some(seq_no), Some(primary_term)) = (doc.source, doc.seq_no, doc.primary_term) else {
            return Err(ApiError::Internal(anyhow::anyhow!(
                "Article {} returned without source or version",
                id
            )));
        };

        Ok(Some(Versioned {
            document: from_source(&doc.id, source)?,
            version: DocumentVersion { seq_no, primary_term },
        }))
    }

    async fn search_articles(&self, search: &ArticleSearch) -> ApiResult<Vec<Article>> {
        self.ready().await?;

        let body = build_search_body(search);
        let response = self.client.search(&self.articles_index, &body).await?;

        // One malformed document should not hide the rest of the page
        let articles = response
            .hits
            .hits
            .into_iter()
            .filter_map(|hit| match from_source(&hit.id, hit.source) {
                Ok(article) => Some(article),
                Err(e) => {
                    warn!("Skipping undecodable article {}: {}", hit.id, e);
                    None
                }
            })
            .collect();

        Ok(articles)
    }

    async fn replace_article(&self, article: &Article, version: DocumentVersion) -> ApiResult<()> {
        self.ready().await?;

        let source = to_source(article)?;
        self.client
            .index_document(&self.articles_index, &article.id, &source, Some(version))
            .await?;
        Ok(())
    }

    async fn delete_article(&self, id: &str) -> ApiResult<bool> {
        Ok(self.client.delete_document(&self.articles_index, id).await?)
    }

    async fn insert_user(&self, user: &User) -> ApiResult<()> {
        self.ready().await?;

        let source = to_source(user)?;
        self.client
            .create_document(&self.users_index, &user.id, &source)
            .await?;
        Ok(())
    }

    async fn find_user(&self, id: &str) -> ApiResult<Option<User>> {
        let Some(doc) = self.client.get_document(&self.users_index, id).await? else {
            return Ok(None);
        };

        let source = doc.source.ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!("User {} returned without source", id))
        })?;

        Ok(Some(from_source(&doc.id, source)?))
    }
}
