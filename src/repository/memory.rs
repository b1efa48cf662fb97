//! In-memory repository used by the service and router tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use super::{DocumentRepository, Versioned};
use crate::elasticsearch::DocumentVersion;
use crate::error::{ApiError, ApiResult};
use crate::models::{Article, ArticleSearch, User};

const PRIMARY_TERM: i64 = 1;

#[derive(Default)]
struct State {
    articles: HashMap<String, (Article, i64)>,
    users: HashMap<String, User>,
    next_seq_no: i64,
}

/// Mimics the Elasticsearch contract: create-only inserts, sequence numbers
/// for optimistic concurrency, and a switch for cluster health.
#[derive(Clone)]
pub struct InMemoryRepository {
    state: Arc<RwLock<State>>,
    healthy: Arc<AtomicBool>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        InMemoryRepository {
            state: Arc::new(RwLock::new(State::default())),
            healthy: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn article_count(&self) -> usize {
        self.state.read().unwrap().articles.len()
    }

    /// Bumps the stored sequence number, as a concurrent writer would.
    pub fn touch_article(&self, id: &str) {
        let mut state = self.state.write().unwrap();
        let seq_no = state.next_seq_no;
        if let Some(entry) = state.articles.get_mut(id) {
            entry.1 = seq_no;
            state.next_seq_no += 1;
        }
    }
}

fn matches(article: &Article, search: &ArticleSearch) -> bool {
    if let Some(ref query) = search.query {
        let title = article.title.to_lowercase();
        let content = article.content.to_lowercase();
        let any_term = query
            .to_lowercase()
            .split_whitespace()
            .any(|term| title.contains(term) || content.contains(term));
        if !any_term {
            return false;
        }
    }

    if let Some(ref category) = search.category {
        if &article.category != category {
            return false;
        }
    }

    if !search.tags.is_empty() && !article.tags.iter().any(|t| search.tags.contains(t)) {
        return false;
    }

    true
}

#[async_trait]
impl DocumentRepository for InMemoryRepository {
    async fn ensure_indices(&self) -> ApiResult<()> {
        Ok(())
    }

    async fn is_healthy(&self) -> ApiResult<bool> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(true)
        } else {
            Err(ApiError::Elasticsearch("connection refused".to_string()))
        }
    }

    async fn insert_article(&self, article: &Article) -> ApiResult<()> {
        let mut state = self.state.write().unwrap();
        if state.articles.contains_key(&article.id) {
            return Err(ApiError::conflict("Document already exists"));
        }
        let seq_no = state.next_seq_no;
        state.next_seq_no += 1;
        state.articles.insert(article.id.clone(), (article.clone(), seq_no));
        Ok(())
    }

    async fn find_article(&self, id: &str) -> ApiResult<Option<Versioned<Article>>> {
        let state = self.state.read().unwrap();
        Ok(state.articles.get(id).map(|(article, seq_no)| Versioned {
            document: article.clone(),
            version: DocumentVersion {
                seq_no: *seq_no,
                primary_term: PRIMARY_TERM,
            },
        }))
    }

    async fn search_articles(&self, search: &ArticleSearch) -> ApiResult<Vec<Article>> {
        let state = self.state.read().unwrap();
        let mut hits: Vec<Article> = state
            .articles
            .values()
            .filter(|(article, _)| matches(article, search))
            .map(|(article, _)| article.clone())
            .collect();

        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        Ok(hits.into_iter().skip(search.offset).take(search.limit).collect())
    }

    async fn replace_article(&self, article: &Article, version: DocumentVersion) -> ApiResult<()> {
        let mut state = self.state.write().unwrap();
        let seq_no = state.next_seq_no;

        let Some(entry) = state.articles.get_mut(&article.id) else {
            return Err(ApiError::conflict("Document was modified concurrently, please retry"));
        };

        if entry.1 != version.seq_no || version.primary_term != PRIMARY_TERM {
            return Err(ApiError::conflict("Document was modified concurrently, please retry"));
        }

        *entry = (article.clone(), seq_no);
        state.next_seq_no += 1;
        Ok(())
    }

    async fn delete_article(&self, id: &str) -> ApiResult<bool> {
        Ok(self.state.write().unwrap().articles.remove(id).is_some())
    }

    async fn insert_user(&self, user: &User) -> ApiResult<()> {
        let mut state = self.state.write().unwrap();
        if state.users.contains_key(&user.id) {
            return Err(ApiError::conflict("Document already exists"));
        }
        state.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user(&self, id: &str) -> ApiResult<Option<User>> {
        Ok(self.state.read().unwrap().users.get(id).cloned())
    }
}
