use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::sync::RwLock;
use url::Url;

use crate::config::IdentityConfig;
use crate::metrics::{record_cache_hit, record_cache_miss, IDENTITY_LOOKUPS_TOTAL};
use crate::models::user::UserRecord;

const PRIVATE_TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// Failed identity lookups. Always returned as values so the caller can show
/// the next step; none of them is fatal to the rest of the service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("GitLab access token is not configured. Set GITLAB_PAT (or APP__IDENTITY__TOKEN).")]
    MissingToken,
    #[error("invalid GitLab configuration: {0}")]
    Configuration(String),
    #[error("Username cannot be empty.")]
    EmptyUsername,
    #[error("GitLab user '{0}' not found. Please check the username and try again.")]
    NotFound(String),
    #[error("Unauthorized: check the GitLab token and its 'read_user' scope.")]
    Unauthorized,
    #[error("GitLab API request failed: {status} - {body}")]
    Upstream { status: u16, body: String },
    #[error("Error connecting to GitLab ({base_url}): {message}")]
    Transport { base_url: String, message: String },
    #[error("unexpected response from GitLab: {0}")]
    InvalidResponse(String),
}

impl IdentityError {
    pub fn kind(&self) -> &'static str {
        match self {
            IdentityError::MissingToken | IdentityError::Configuration(_) => "configuration_error",
            IdentityError::EmptyUsername => "invalid_username",
            IdentityError::NotFound(_) => "not_found",
            IdentityError::Unauthorized => "authorization_error",
            IdentityError::Upstream { .. } | IdentityError::InvalidResponse(_) => "upstream_error",
            IdentityError::Transport { .. } => "transport_error",
        }
    }
}

/// Resolves a username to a user record.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn lookup(&self, username: &str) -> Result<UserRecord, IdentityError>;

    /// False when lookups cannot succeed because of missing configuration.
    fn is_configured(&self) -> bool {
        true
    }
}

struct CachedLookup {
    user: Option<UserRecord>,
    fetched_at: Instant,
}

/// GitLab `users` API client with a per-username TTL cache. Only found and
/// not-found answers are cached; failures are retried on the next call.
pub struct GitLabIdentityProvider {
    http_client: Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
    cache_ttl: Duration,
    cache: RwLock<HashMap<String, CachedLookup>>,
}

impl GitLabIdentityProvider {
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            http_client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Overrides the request timeout. Mostly useful in tests.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn users_endpoint(&self) -> Result<Url, IdentityError> {
        Url::parse(&format!("{}/", self.base_url))
            .and_then(|base| base.join("api/v4/users"))
            .map_err(|e| IdentityError::Configuration(format!("{}: {}", self.base_url, e)))
    }

    async fn cached(&self, username: &str) -> Option<Option<UserRecord>> {
        if self.cache_ttl.is_zero() {
            return None;
        }
        let cache = self.cache.read().await;
        cache
            .get(username)
            .filter(|entry| entry.fetched_at.elapsed() < self.cache_ttl)
            .map(|entry| entry.user.clone())
    }

    async fn remember(&self, username: &str, user: Option<UserRecord>) {
        if self.cache_ttl.is_zero() {
            return;
        }
        let mut cache = self.cache.write().await;
        let ttl = self.cache_ttl;
        cache.retain(|_, entry| entry.fetched_at.elapsed() < ttl);
        cache.insert(
            username.to_string(),
            CachedLookup {
                user,
                fetched_at: Instant::now(),
            },
        );
    }

    async fn fetch(&self, username: &str, token: &str) -> Result<UserRecord, IdentityError> {
        let endpoint = self.users_endpoint()?;

        tracing::debug!("Looking up GitLab user '{}' at {}", username, endpoint);

        let response = self
            .http_client
            .get(endpoint)
            .query(&[("username", username)])
            .header(PRIVATE_TOKEN_HEADER, token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(IdentityError::Unauthorized);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(IdentityError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        // GitLab answers with a list even for an exact username match
        let users: Option<Vec<UserRecord>> = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.transport_error(e)
            } else {
                IdentityError::InvalidResponse(e.to_string())
            }
        })?;

        users
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| IdentityError::NotFound(username.to_string()))
    }

    fn transport_error(&self, err: reqwest::Error) -> IdentityError {
        let message = if err.is_timeout() {
            format!("request timed out after {}s", self.timeout.as_secs_f64())
        } else {
            err.to_string()
        };
        IdentityError::Transport {
            base_url: self.base_url.clone(),
            message,
        }
    }
}

#[async_trait]
impl IdentityProvider for GitLabIdentityProvider {
    async fn lookup(&self, username: &str) -> Result<UserRecord, IdentityError> {
        let token = self.token.as_deref().ok_or(IdentityError::MissingToken)?;
        let username = username.trim();
        if username.is_empty() {
            return Err(IdentityError::EmptyUsername);
        }

        if let Some(cached) = self.cached(username).await {
            record_cache_hit();
            IDENTITY_LOOKUPS_TOTAL.with_label_values(&["cached"]).inc();
            return cached.ok_or_else(|| IdentityError::NotFound(username.to_string()));
        }
        record_cache_miss();

        let result = self.fetch(username, token).await;
        match &result {
            Ok(user) => {
                tracing::info!("Resolved GitLab user '{}' (id={})", username, user.id);
                self.remember(username, Some(user.clone())).await;
            }
            Err(IdentityError::NotFound(_)) => {
                tracing::info!("GitLab user '{}' not found", username);
                self.remember(username, None).await;
            }
            Err(e) => tracing::warn!("GitLab lookup for '{}' failed: {}", username, e),
        }

        let outcome = match &result {
            Ok(_) => "found",
            Err(e) => e.kind(),
        };
        IDENTITY_LOOKUPS_TOTAL.with_label_values(&[outcome]).inc();

        result
    }

    fn is_configured(&self) -> bool {
        self.token.is_some()
    }
}
