use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timestamp;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_CONTENT_LEN: usize = 100_000;
pub const MAX_KEYWORD_LEN: usize = 100;
pub const MAX_TAGS: usize = 50;
pub const MAX_TAG_LEN: usize = 50;

pub const DEFAULT_SEARCH_LIMIT: i64 = 10;
pub const MAX_SEARCH_LIMIT: i64 = 100;
/// Elasticsearch の `index.max_result_window` の既定値。`from + size` はこれを超えられない。
pub const MAX_RESULT_WINDOW: i64 = 10_000;

/// 記事ドキュメント。`id` は Elasticsearch の `_id` で、`_source` には含めない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub views: i32,
    pub rating: f64,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
}

/// 記事作成 API のペイロード。`tags` / `views` / `rating` は省略可能。
#[derive(Debug, Deserialize)]
pub struct CreateArticleRequest {
    pub title: String,
    pub content: String,
    pub author: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub views: i32,
    #[serde(default)]
    pub rating: f64,
}

/// 記事更新 API の入力。`None` のフィールドは変更しない。
#[derive(Debug, Default, Deserialize)]
pub struct UpdateArticleRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub views: Option<i32>,
    pub rating: Option<f64>,
}

/// Query string of `GET /documents/articles`. `tags` may be repeated.
#[derive(Debug, Deserialize)]
pub struct SearchArticlesQuery {
    pub query: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// Validated search criteria handed to the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleSearch {
    pub query: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub limit: usize,
    pub offset: usize,
}

fn default_limit() -> i64 {
    DEFAULT_SEARCH_LIMIT
}

impl Article {
    pub fn new(
        title: String,
        content: String,
        author: String,
        category: String,
        tags: Vec<String>,
        views: i32,
        rating: f64,
    ) -> Self {
        let now = Utc::now();

        Article {
            id: Uuid::new_v4().to_string(),
            title,
            content,
            author,
            category,
            tags,
            views,
            rating,
            created_at: now,
            updated_at: now,
        }
    }

    /// 指定されたフィールドだけを書き換え、`created_at` は保持して `updated_at` を更新する。
    pub fn apply(&mut self, update: UpdateArticleRequest) {
        if let Some(title) = update.title {
            self.title = title.trim().to_string();
        }

        if let Some(content) = update.content {
            self.content = content;
        }

        if let Some(author) = update.author {
            self.author = author.trim().to_string();
        }

        if let Some(category) = update.category {
            self.category = category.trim().to_string();
        }

        if let Some(tags) = update.tags {
            self.tags = normalize_tags(tags);
        }

        if let Some(views) = update.views {
            self.views = views;
        }

        if let Some(rating) = update.rating {
            self.rating = rating;
        }

        self.updated_at = Utc::now();
    }
}

impl CreateArticleRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_title(&self.title)?;
        validate_content(&self.content)?;
        validate_keyword("Author", &self.author)?;
        validate_keyword("Category", &self.category)?;
        validate_tags(&self.tags)?;
        validate_views(self.views)?;
        validate_rating(self.rating)?;

        Ok(())
    }

    pub fn into_article(self) -> Article {
        Article::new(
            self.title.trim().to_string(),
            self.content,
            self.author.trim().to_string(),
            self.category.trim().to_string(),
            normalize_tags(self.tags),
            self.views,
            self.rating,
        )
    }
}

impl UpdateArticleRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.author.is_none()
            && self.category.is_none()
            && self.tags.is_none()
            && self.views.is_none()
            && self.rating.is_none()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.is_empty() {
            return Err("At least one field must be provided for update".to_string());
        }

        if let Some(ref title) = self.title {
            validate_title(title)?;
        }

        if let Some(ref content) = self.content {
            validate_content(content)?;
        }

        if let Some(ref author) = self.author {
            validate_keyword("Author", author)?;
        }

        if let Some(ref category) = self.category {
            validate_keyword("Category", category)?;
        }

        if let Some(ref tags) = self.tags {
            validate_tags(tags)?;
        }

        if let Some(views) = self.views {
            validate_views(views)?;
        }

        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }

        Ok(())
    }
}

impl SearchArticlesQuery {
    /// limit / offset の範囲をチェックし、空白だけの検索語やカテゴリは「指定なし」に落とす。
    pub fn into_search(self) -> Result<ArticleSearch, String> {
        if !(1..=MAX_SEARCH_LIMIT).contains(&self.limit) {
            return Err(format!("Limit must be between 1 and {}", MAX_SEARCH_LIMIT));
        }

        if self.offset < 0 {
            return Err("Offset cannot be negative".to_string());
        }

        if self.offset.saturating_add(self.limit) > MAX_RESULT_WINDOW {
            return Err(format!(
                "Offset plus limit cannot exceed {}",
                MAX_RESULT_WINDOW
            ));
        }

        let query = self
            .query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());
        let category = self
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        let tags = normalize_tags(self.tags);

        Ok(ArticleSearch {
            query,
            category,
            tags,
            limit: self.limit as usize,
            offset: self.offset as usize,
        })
    }
}

impl Default for SearchArticlesQuery {
    fn default() -> Self {
        SearchArticlesQuery {
            query: None,
            category: None,
            tags: Vec::new(),
            limit: DEFAULT_SEARCH_LIMIT,
            offset: 0,
        }
    }
}

/// Trims tags, drops blanks and repeats, keeps first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !normalized.iter().any(|t| t == tag) {
            normalized.push(tag.to_string());
        }
    }
    normalized
}

fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("Title cannot be empty".to_string());
    }

    if title.chars().count() > MAX_TITLE_LEN {
        return Err(format!("Title cannot exceed {} characters", MAX_TITLE_LEN));
    }

    Ok(())
}

fn validate_content(content: &str) -> Result<(), String> {
    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(format!("Content cannot exceed {} characters", MAX_CONTENT_LEN));
    }

    Ok(())
}

fn validate_keyword(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} cannot be empty", field));
    }

    if value.chars().count() > MAX_KEYWORD_LEN {
        return Err(format!("{} cannot exceed {} characters", field, MAX_KEYWORD_LEN));
    }

    Ok(())
}

fn validate_tags(tags: &[String]) -> Result<(), String> {
    if tags.len() > MAX_TAGS {
        return Err(format!("An article cannot have more than {} tags", MAX_TAGS));
    }

    for tag in tags {
        if tag.trim().is_empty() {
            return Err("Tags cannot be empty".to_string());
        }

        if tag.chars().count() > MAX_TAG_LEN {
            return Err(format!("Tags cannot exceed {} characters", MAX_TAG_LEN));
        }
    }

    Ok(())
}

fn validate_views(views: i32) -> Result<(), String> {
    if views < 0 {
        return Err("Views cannot be negative".to_string());
    }

    Ok(())
}

fn validate_rating(rating: f64) -> Result<(), String> {
    if !rating.is_finite() || rating < 0.0 {
        return Err("Rating must be a non-negative number".to_string());
    }

    Ok(())
}
