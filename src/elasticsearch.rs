use std::time::Duration;

use reqwest::{Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ElasticsearchConfig, RefreshPolicy};

#[cfg(test)]
pub(crate) mod mock;

const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);
const BASE_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum ElasticsearchError {
    #[error("Invalid Elasticsearch URL: {0}")]
    InvalidUrl(String),

    #[error("Elasticsearch connection unavailable: {0}")]
    Transport(String),

    #[error("Elasticsearch request timed out: {0}")]
    Timeout(String),

    #[error("Document {0} already exists")]
    AlreadyExists(String),

    #[error("Elasticsearch responded with {status}: {reason}")]
    Response {
        status: u16,
        error_type: Option<String>,
        reason: String,
    },

    #[error("Failed to parse Elasticsearch response: {0}")]
    Parse(String),
}

impl ElasticsearchError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ElasticsearchError::Timeout(err.to_string())
        } else {
            ElasticsearchError::Transport(err.to_string())
        }
    }

    /// `error.type` 付きのレスポンスエラーかどうかを判定する。
    pub fn is_type(&self, expected: &str) -> bool {
        matches!(self, ElasticsearchError::Response { error_type: Some(t), .. } if t == expected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Green,
    Yellow,
    Red,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterHealth {
    pub cluster_name: Option<String>,
    pub status: HealthStatus,
}

impl ClusterHealth {
    /// green と yellow はどちらも読み書き可能なので healthy とみなす。
    pub fn is_healthy(&self) -> bool {
        matches!(self.status, HealthStatus::Green | HealthStatus::Yellow)
    }
}

/// `GET /{index}/_doc/{id}` のレスポンス。
#[derive(Debug, Clone, Deserialize)]
pub struct GetResponse {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_seq_no")]
    pub seq_no: Option<i64>,
    #[serde(rename = "_primary_term")]
    pub primary_term: Option<i64>,
    pub found: bool,
    #[serde(rename = "_source")]
    pub source: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub hits: SearchHits,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchHits {
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source")]
    pub source: Value,
}

/// Optimistic concurrency guard for index writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentVersion {
    pub seq_no: i64,
    pub primary_term: i64,
}

/// Whether a request may be sent again after its outcome is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Replay {
    Safe,
    /// Only resent when it provably never reached the cluster.
    Unsafe,
}

/// Thin REST client for the handful of Elasticsearch endpoints the service needs.
/// Holds a pooled `reqwest::Client`, so cloning is cheap.
#[derive(Clone)]
pub struct ElasticsearchClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Option<(String, String)>,
    max_retries: u32,
    retry_on_timeout: bool,
    refresh: RefreshPolicy,
}

impl ElasticsearchClient {
    /// reqwest クライアントを組み立てるだけで、クラスタへの接続はまだ行わない。
    pub fn new(config: &ElasticsearchConfig) -> Result<Self, ElasticsearchError> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| ElasticsearchError::InvalidUrl(format!("{}: {}", config.url, e)))?;

        if base_url.cannot_be_a_base() {
            return Err(ElasticsearchError::InvalidUrl(config.url.clone()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ElasticsearchError::Transport(format!("HTTP client creation failed: {}", e)))?;

        let credentials = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ => None,
        };

        info!("Elasticsearch client configured for {}", base_url);

        Ok(ElasticsearchClient {
            http,
            base_url,
            credentials,
            max_retries: config.max_retries,
            retry_on_timeout: config.retry_on_timeout,
            refresh: config.refresh,
        })
    }

    /// Appends each segment percent-encoded, so ids containing `/` or `?` stay one segment.
    pub fn url_for(&self, segments: &[&str]) -> Result<Url, ElasticsearchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ElasticsearchError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        replay: Replay,
    ) -> Result<reqwest::Response, ElasticsearchError> {
        let mut attempt: u32 = 0;

        loop {
            let mut request = self.http.request(method.clone(), url.clone());
            if let Some((user, pass)) = &self.credentials {
                request = request.basic_auth(user, Some(pass));
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let outcome = request.send().await;

            let retryable = match &outcome {
                // A gateway error on a write may hide an applied change
                Ok(resp) => replay == Replay::Safe && is_retryable_status(resp.status()),
                Err(e) if e.is_timeout() => replay == Replay::Safe && self.retry_on_timeout,
                Err(e) => e.is_connect(),
            };

            if !retryable || attempt >= self.max_retries {
                return outcome.map_err(ElasticsearchError::from_reqwest);
            }

            attempt += 1;
            let delay = retry_delay(attempt);
            match &outcome {
                Ok(resp) => warn!(
                    "Elasticsearch {} {} returned {}, retry {}/{} in {:?}",
                    method, url, resp.status(), attempt, self.max_retries, delay
                ),
                Err(e) => warn!(
                    "Elasticsearch {} {} failed: {}, retry {}/{} in {:?}",
                    method, url, e, attempt, self.max_retries, delay
                ),
            }
            tokio::time::sleep(delay).await;
        }
    }

    async fn expect_success(resp: reqwest::Response) -> Result<reqwest::Response, ElasticsearchError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let text = resp.text().await.unwrap_or_default();
        Err(decode_error(status.as_u16(), &text))
    }

    async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ElasticsearchError> {
        resp.json::<T>()
            .await
            .map_err(|e| ElasticsearchError::Parse(e.to_string()))
    }

    fn with_refresh(&self, mut url: Url) -> Url {
        url.query_pairs_mut().append_pair("refresh", self.refresh.as_str());
        url
    }

    pub async fn cluster_health(&self) -> Result<ClusterHealth, ElasticsearchError> {
        let url = self.url_for(&["_cluster", "health"])?;
        let resp = self.send(Method::GET, url, None, Replay::Safe).await?;
        let resp = Self::expect_success(resp).await?;
        let health: ClusterHealth = Self::parse_json(resp).await?;

        debug!(
            "Elasticsearch cluster {} is {:?}",
            health.cluster_name.as_deref().unwrap_or("<unnamed>"),
            health.status
        );
        Ok(health)
    }

    pub async fn index_exists(&self, index: &str) -> Result<bool, ElasticsearchError> {
        let url = self.url_for(&[index])?;
        let resp = self.send(Method::HEAD, url, None, Replay::Safe).await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            s => Err(decode_error(s.as_u16(), "")),
        }
    }

    /// 既に存在するインデックスはエラー扱いにせず `false` を返す。
    pub async fn create_index(&self, index: &str, body: &Value) -> Result<bool, ElasticsearchError> {
        let url = self.url_for(&[index])?;
        let resp = self.send(Method::PUT, url, Some(body), Replay::Safe).await?;

        match Self::expect_success(resp).await {
            Ok(_) => {
                info!("Created Elasticsearch index {}", index);
                Ok(true)
            }
            Err(e) if e.is_type("resource_already_exists_exception") => {
                debug!("Elasticsearch index {} already exists", index);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// `op_type=create`: a taken id comes back as [`ElasticsearchError::AlreadyExists`].
    pub async fn create_document(
        &self,
        index: &str,
        id: &str,
        source: &Value,
    ) -> Result<(), ElasticsearchError> {
        let url = self.with_refresh(self.url_for(&[index, "_create", id])?);
        let resp = self.send(Method::PUT, url, Some(source), Replay::Unsafe).await?;

        // Elasticsearch reports a taken id as version_conflict_engine_exception
        if resp.status() == StatusCode::CONFLICT {
            return Err(ElasticsearchError::AlreadyExists(id.to_string()));
        }

        Self::expect_success(resp).await?;
        Ok(())
    }

    pub async fn get_document(
        &self,
        index: &str,
        id: &str,
    ) -> Result<Option<GetResponse>, ElasticsearchError> {
        let url = self.url_for(&[index, "_doc", id])?;
        let resp = self.send(Method::GET, url, None, Replay::Safe).await?;

        // 404 covers both a missing document and a missing index
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let resp = Self::expect_success(resp).await?;
        let doc: GetResponse = Self::parse_json(resp).await?;
        Ok(doc.found.then_some(doc))
    }

    pub async fn index_document(
        &self,
        index: &str,
        id: &str,
        source: &Value,
        version: Option<DocumentVersion>,
    ) -> Result<(), ElasticsearchError> {
        let replay = if version.is_some() { Replay::Unsafe } else { Replay::Safe };

        let mut url = self.with_refresh(self.url_for(&[index, "_doc", id])?);
        if let Some(version) = version {
            url.query_pairs_mut()
                .append_pair("if_seq_no", &version.seq_no.to_string())
                .append_pair("if_primary_term", &version.primary_term.to_string());
        }

        let resp = self.send(Method::PUT, url, Some(source), replay).await?;
        Self::expect_success(resp).await?;
        Ok(())
    }

    pub async fn delete_document(&self, index: &str, id: &str) -> Result<bool, ElasticsearchError> {
        let url = self.with_refresh(self.url_for(&[index, "_doc", id])?);
        let resp = self.send(Method::DELETE, url, None, Replay::Unsafe).await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }

        Self::expect_success(resp).await?;
        Ok(true)
    }

    pub async fn search(&self, index: &str, body: &Value) -> Result<SearchResponse, ElasticsearchError> {
        let url = self.url_for(&[index, "_search"])?;
        let resp = self.send(Method::POST, url, Some(body), Replay::Safe).await?;

        match Self::expect_success(resp).await {
            Ok(resp) => Self::parse_json(resp).await,
            Err(e) if e.is_type("index_not_found_exception") => {
                warn!("Search against missing index {}, returning no hits", index);
                Ok(SearchResponse { hits: SearchHits::default() })
            }
            Err(e) => Err(e),
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Exponential backoff, `attempt` is 1-based.
pub fn retry_delay(attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    BASE_RETRY_DELAY
        .checked_mul(factor)
        .map_or(MAX_RETRY_DELAY, |d| d.min(MAX_RETRY_DELAY))
}

/// Elasticsearch のエラーボディ (`{"error":{"type","reason"},"status"}` または `{"error":"..."}`) を解釈する。
pub fn decode_error(status: u16, body: &str) -> ElasticsearchError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    let (error_type, reason) = match parsed.as_ref().and_then(|v| v.get("error")) {
        Some(Value::Object(obj)) => (
            obj.get("type").and_then(Value::as_str).map(str::to_string),
            obj.get("reason")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        ),
        Some(Value::String(s)) => (None, s.clone()),
        _ if body.trim().is_empty() => (None, format!("HTTP {}", status)),
        _ => (None, body.trim().to_string()),
    };

    ElasticsearchError::Response {
        status,
        error_type,
        reason,
    }
}
