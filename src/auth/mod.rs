use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::config::DirectoryConfig;
use crate::error::{Result, SignalError};
use crate::registry::Identity;

/// The external account directory: resolves a session token to an identity,
/// or rejects it.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// `Ok(None)` means the directory rejected the token. Transport failures
    /// are errors in their own right.
    async fn verify(&self, token: &str) -> Result<Option<Identity>>;
}

/// HTTP client for the account directory service.
pub struct HttpAccountDirectory {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAccountDirectory {
    pub fn new(config: &DirectoryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SignalError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl AccountDirectory for HttpAccountDirectory {
    async fn verify(&self, token: &str) -> Result<Option<Identity>> {
        let url = format!("{}/api/auth/verify", self.base_url);
        let response = self.client.get(&url).bearer_auth(token).send().await?;

        match response.status() {
            StatusCode::OK => {
                let identity: Identity = response.json().await?;
                Ok(Some(identity))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status => Err(SignalError::Directory(format!(
                "unexpected status {} from account directory",
                status
            ))),
        }
    }
}

/// Fixed token-to-identity table. Used in tests and as a local development
/// directory when no account service is running.
#[derive(Default)]
pub struct StaticDirectory {
    identities: HashMap<String, Identity>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, identity: Identity) -> Self {
        self.identities.insert(token.to_string(), identity);
        self
    }
}

#[async_trait]
impl AccountDirectory for StaticDirectory {
    async fn verify(&self, token: &str) -> Result<Option<Identity>> {
        Ok(self.identities.get(token).cloned())
    }
}

/// Gate in front of every registry entry point. Fails closed: a missing,
/// malformed, or directory-rejected token aborts the operation before the
/// registry is touched.
pub struct SessionAuthGate {
    directory: Arc<dyn AccountDirectory>,
}

impl SessionAuthGate {
    pub fn new(directory: Arc<dyn AccountDirectory>) -> Arc<Self> {
        Arc::new(Self { directory })
    }

    /// Authorize a raw `Authorization` header value.
    pub async fn authorize(&self, auth_header: Option<&str>) -> Result<Identity> {
        let header = auth_header
            .ok_or_else(|| SignalError::Unauthenticated("missing authorization header".into()))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                SignalError::Unauthenticated("malformed authorization header".into())
            })?;

        match self.directory.verify(token).await? {
            Some(identity) => {
                tracing::debug!(identity = %identity.id, "Token authorized");
                Ok(identity)
            }
            None => {
                tracing::warn!("Token rejected by account directory");
                Err(SignalError::Unauthenticated("token rejected".into()))
            }
        }
    }
}
