use crate::adapters::sharepoint::ODATA_VERBOSE;
use crate::domain::ports::TokenProvider;
use crate::utils::error::{LedgerError, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Digest lifetime assumed when the context endpoint does not report one.
const DEFAULT_DIGEST_TTL: Duration = Duration::from_secs(1800);
/// Digests are refreshed this long before the server expires them.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// A digest handed over by the hosting page or the environment.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    digest: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(digest: Option<String>) -> Self {
        Self {
            digest: digest.filter(|d| !d.trim().is_empty()),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn request_digest(&self) -> Result<String> {
        self.digest
            .clone()
            .ok_or_else(|| LedgerError::TokenMissing {
                reason: "no request digest was provided by the hosting context".to_string(),
            })
    }
}

#[derive(Debug, Clone)]
struct CachedDigest {
    value: String,
    refresh_at: Instant,
}

/// Fetches digests from `{site}/_api/contextinfo` and reuses them until
/// shortly before they expire.
pub struct ContextInfoTokenProvider {
    endpoint: String,
    client: Client,
    cache: Mutex<Option<CachedDigest>>,
}

impl ContextInfoTokenProvider {
    pub fn new(site_url: &str, client: Client) -> Self {
        Self {
            endpoint: format!("{}/_api/contextinfo", site_url.trim_end_matches('/')),
            client,
            cache: Mutex::new(None),
        }
    }

    fn cached(&self) -> Option<String> {
        let cache = self.cache.lock().ok()?;
        cache
            .as_ref()
            .filter(|c| Instant::now() < c.refresh_at)
            .map(|c| c.value.clone())
    }

    fn store(&self, value: &str, ttl: Duration) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some(CachedDigest {
                value: value.to_string(),
                refresh_at: Instant::now() + ttl.saturating_sub(EXPIRY_MARGIN),
            });
        }
    }

    async fn fetch(&self) -> Result<(String, Duration)> {
        tracing::debug!(endpoint = %self.endpoint, "Requesting form digest");
        let response = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, ODATA_VERBOSE)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LedgerError::TokenMissing {
                reason: format!("context endpoint returned HTTP {}", response.status()),
            });
        }

        parse_context_info(&response.json::<Value>().await?)
    }
}

/// Reads `FormDigestValue` and `FormDigestTimeoutSeconds` from either the
/// verbose or the minimal metadata shape.
pub fn parse_context_info(body: &Value) -> Result<(String, Duration)> {
    let info = body
        .pointer("/d/GetContextWebInformation")
        .unwrap_or(body);

    let digest = info
        .get("FormDigestValue")
        .and_then(Value::as_str)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| LedgerError::TokenMissing {
            reason: "context response carries no FormDigestValue".to_string(),
        })?;

    let ttl = info
        .get("FormDigestTimeoutSeconds")
        .and_then(Value::as_u64)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_DIGEST_TTL);

    Ok((digest.to_string(), ttl))
}

#[async_trait]
impl TokenProvider for ContextInfoTokenProvider {
    async fn request_digest(&self) -> Result<String> {
        if let Some(digest) = self.cached() {
            return Ok(digest);
        }

        let (digest, ttl) = self.fetch().await?;
        self.store(&digest, ttl);
        Ok(digest)
    }

    fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = None;
        }
    }
}
