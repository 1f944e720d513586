use crate::config::GeocodingConfig;
use crate::errors::ServiceError;
use crate::models::GeoPoint;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// Tokens are refreshed this long before the provider says they expire
const EXPIRY_SKEW: Duration = Duration::from_secs(30);

/// Resolves a free-form address to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when the provider has no match.
    async fn geocode(&self, address: &str) -> Result<Option<GeoPoint>, ServiceError>;
}

/// Used when no provider is configured.
#[derive(Debug, Default, Clone)]
pub struct NoopGeocoder;

#[async_trait]
impl Geocoder for NoopGeocoder {
    async fn geocode(&self, _address: &str) -> Result<Option<GeoPoint>, ServiceError> {
        Ok(None)
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Access-token cache shared by the geocoding client; injectable so tests
/// and multiple clients can share or isolate it.
#[derive(Debug, Default)]
pub struct TokenCache {
    inner: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token if still valid.
    pub async fn current(&self) -> Option<String> {
        let guard = self.inner.read().await;
        guard
            .as_ref()
            .filter(|t| Instant::now() + EXPIRY_SKEW < t.expires_at)
            .map(|t| t.value.clone())
    }

    pub async fn store(&self, value: String, ttl: Duration) {
        *self.inner.write().await = Some(CachedToken {
            value,
            expires_at: Instant::now() + ttl,
        });
    }

    pub async fn invalidate(&self) {
        *self.inner.write().await = None;
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    latitude: f64,
    longitude: f64,
}

/// Client for an OAuth-protected geocoding HTTP API.
pub struct HttpGeocoder {
    client: reqwest::Client,
    base_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    tokens: Arc<TokenCache>,
}

impl HttpGeocoder {
    pub fn new(base_url: impl Into<String>, tokens: Arc<TokenCache>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: None,
            client_secret: None,
            tokens,
        }
    }

    pub fn with_credentials(mut self, client_id: String, client_secret: String) -> Self {
        self.client_id = Some(client_id);
        self.client_secret = Some(client_secret);
        self
    }

    pub fn from_config(cfg: &GeocodingConfig) -> Option<Self> {
        let base_url = cfg.base_url.as_deref().filter(|_| cfg.is_enabled())?;
        let geocoder = Self::new(base_url, Arc::new(TokenCache::new()));
        Some(match (&cfg.client_id, &cfg.client_secret) {
            (Some(id), Some(secret)) => geocoder.with_credentials(id.clone(), secret.clone()),
            _ => geocoder,
        })
    }

    async fn access_token(&self) -> Result<Option<String>, ServiceError> {
        let (Some(client_id), Some(client_secret)) = (&self.client_id, &self.client_secret) else {
            return Ok(None);
        };
        if let Some(token) = self.tokens.current().await {
            return Ok(Some(token));
        }

        debug!("fetching geocoding access token");
        let response = self
            .client
            .post(format!("{}/oauth/token", self.base_url))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("token request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("bad token response: {}", e)))?;

        self.tokens
            .store(token.access_token.clone(), Duration::from_secs(token.expires_in))
            .await;
        Ok(Some(token.access_token))
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    #[instrument(skip(self))]
    async fn geocode(&self, address: &str) -> Result<Option<GeoPoint>, ServiceError> {
        let mut request = self
            .client
            .get(format!("{}/geocode", self.base_url))
            .query(&[("address", address)]);
        if let Some(token) = self.access_token().await? {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("geocode request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
            warn!("geocoding token rejected; cache cleared");
            return Err(ServiceError::ExternalServiceError(
                "geocoding provider rejected credentials".to_string(),
            ));
        }
        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "geocoding provider returned {}",
                response.status()
            )));
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("bad geocode response: {}", e)))?;

        Ok(body
            .results
            .into_iter()
            .find_map(|r| GeoPoint::from_parts(Some(r.latitude), Some(r.longitude))))
    }
}
