use std::env;
use std::time::Duration;
use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub elasticsearch: ElasticsearchConfig,
    pub environment: Environment,
}

#[derive(Debug, Clone)]
pub struct ElasticsearchConfig {
    pub url: String,
    pub index_prefix: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_on_timeout: bool,
    pub refresh: RefreshPolicy,
}

/// Value passed as `?refresh=` on every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    False,
    True,
    WaitFor,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Local,
    Production,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    /// `from_env` passes the process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        let elasticsearch = ElasticsearchConfig::from_lookup(&lookup)?;

        let environment = match lookup("ENV").unwrap_or_else(|| "local".to_string()).as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Local,
        };

        // Validate configuration values
        Self::validate_config(&elasticsearch, port)?;

        Ok(Config {
            port,
            elasticsearch,
            environment,
        })
    }

    fn validate_config(elasticsearch: &ElasticsearchConfig, port: u16) -> Result<()> {
        // Validate port range
        if port == 0 {
            anyhow::bail!("PORT must be greater than 0");
        }

        elasticsearch.validate()?;

        Ok(())
    }
}

impl ElasticsearchConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("ELASTICSEARCH_URL")
            .unwrap_or_else(|| "http://localhost:9200".to_string());

        let index_prefix = lookup("ELASTICSEARCH_INDEX_PREFIX")
            .unwrap_or_else(|| "app".to_string());

        let username = lookup("ELASTICSEARCH_USERNAME").filter(|u| !u.is_empty());
        let password = lookup("ELASTICSEARCH_PASSWORD").filter(|p| !p.is_empty());

        let timeout_secs = lookup("ELASTICSEARCH_TIMEOUT")
            .unwrap_or_else(|| "20".to_string())
            .parse::<u64>()
            .context("ELASTICSEARCH_TIMEOUT must be a valid number of seconds")?;

        let max_retries = lookup("ELASTICSEARCH_MAX_RETRIES")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()
            .context("ELASTICSEARCH_MAX_RETRIES must be a valid number")?;

        let retry_on_timeout = parse_bool(
            &lookup("ELASTICSEARCH_RETRY_ON_TIMEOUT").unwrap_or_else(|| "true".to_string()),
        )
        .context("ELASTICSEARCH_RETRY_ON_TIMEOUT must be true or false")?;

        let refresh = RefreshPolicy::parse(
            &lookup("ELASTICSEARCH_REFRESH").unwrap_or_else(|| "false".to_string()),
        )?;

        Ok(ElasticsearchConfig {
            url: url.trim_end_matches('/').to_string(),
            index_prefix,
            username,
            password,
            timeout: Duration::from_secs(timeout_secs),
            max_retries,
            retry_on_timeout,
            refresh,
        })
    }

    pub fn validate(&self) -> Result<()> {
        let parsed = reqwest::Url::parse(&self.url)
            .with_context(|| format!("ELASTICSEARCH_URL is not a valid URL: {}", self.url))?;

        match parsed.scheme() {
            "http" | "https" => {}
            other => anyhow::bail!("ELASTICSEARCH_URL must use http or https, got '{}'", other),
        }

        if parsed.host_str().map_or(true, str::is_empty) {
            anyhow::bail!("ELASTICSEARCH_URL must include a host");
        }

        validate_index_prefix(&self.index_prefix)?;

        if self.username.is_some() != self.password.is_some() {
            anyhow::bail!("ELASTICSEARCH_USERNAME and ELASTICSEARCH_PASSWORD must be set together");
        }

        if self.timeout.as_secs() == 0 {
            anyhow::bail!("Elasticsearch timeout must be greater than 0");
        }

        Ok(())
    }

    pub fn articles_index(&self) -> String {
        format!("{}_articles", self.index_prefix)
    }

    pub fn users_index(&self) -> String {
        format!("{}_users", self.index_prefix)
    }
}

impl RefreshPolicy {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "false" | "" => Ok(RefreshPolicy::False),
            "true" => Ok(RefreshPolicy::True),
            "wait_for" => Ok(RefreshPolicy::WaitFor),
            other => anyhow::bail!(
                "ELASTICSEARCH_REFRESH must be one of: false, true, wait_for (got '{}')",
                other
            ),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshPolicy::False => "false",
            RefreshPolicy::True => "true",
            RefreshPolicy::WaitFor => "wait_for",
        }
    }
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Environment::Local)
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => anyhow::bail!("invalid boolean '{}'", other),
    }
}

// Index names must be lowercase and avoid the characters Elasticsearch rejects.
fn validate_index_prefix(prefix: &str) -> Result<()> {
    if prefix.trim().is_empty() {
        anyhow::bail!("ELASTICSEARCH_INDEX_PREFIX cannot be empty");
    }

    if prefix.starts_with(['-', '_', '+']) {
        anyhow::bail!("ELASTICSEARCH_INDEX_PREFIX cannot start with '-', '_' or '+'");
    }

    if prefix.chars().any(|c| c.is_uppercase()) {
        anyhow::bail!("ELASTICSEARCH_INDEX_PREFIX must be lowercase");
    }

    if let Some(bad) = prefix.chars().find(|c| "\\/*?\"<>|,#: ".contains(*c)) {
        anyhow::bail!("ELASTICSEARCH_INDEX_PREFIX contains invalid character '{}'", bad);
    }

    Ok(())
}
