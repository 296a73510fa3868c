//! Catalog API bearer token cache

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use reqwest::Url;

use crate::{error::ResolveError, http::CatalogHttpClient};

/// Token lifetime assumed when the auth endpoint does not report one
const DEFAULT_TTL: Duration = Duration::from_hours(1);

/// Source of current time
pub(crate) trait Clock: Send + Sync {
    /// Current monotonic time
    fn now(&self) -> Instant;
}

/// Real monotonic clock
pub(crate) struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Freshly exchanged credential
#[derive(Debug)]
pub(crate) struct Grant {
    /// Bearer token
    pub access_token: String,
    /// Validity duration from exchange time
    pub ttl: Duration,
}

/// Way to obtain a new bearer token
#[async_trait::async_trait]
pub(crate) trait TokenExchange: Send + Sync {
    /// Exchange credentials for a new token
    async fn exchange(&self) -> Result<Grant, ResolveError>;
}

/// Application credentials
#[derive(Clone)]
pub(crate) struct Credentials {
    /// Client id
    pub client_id: String,
    /// Client secret
    pub client_secret: String,
}

/// OAuth2 client credentials flow
pub(crate) struct ClientCredentials {
    /// HTTP client
    http: Arc<CatalogHttpClient>,
    /// Token endpoint
    auth_url: Url,
    /// Credentials, if configured
    credentials: Option<Credentials>,
}

#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

impl ClientCredentials {
    pub(crate) fn new(
        http: Arc<CatalogHttpClient>,
        auth_url: Url,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            http,
            auth_url,
            credentials,
        }
    }
}

#[async_trait::async_trait]
impl TokenExchange for ClientCredentials {
    async fn exchange(&self) -> Result<Grant, ResolveError> {
        let Some(credentials) = self.credentials.as_ref() else {
            return Err(ResolveError::Auth(
                "Missing catalog API credentials (CLIENT_ID/CLIENT_SECRET)".to_owned(),
            ));
        };

        log::debug!("Requesting new token from {}", self.auth_url);
        let resp: TokenResponse = self
            .http
            .post_form_json(
                self.auth_url.clone(),
                (&credentials.client_id, &credentials.client_secret),
                "grant_type=client_credentials",
            )
            .await
            .map_err(|err| {
                log::warn!("Token exchange failed: {err}");
                ResolveError::Auth("Failed to authenticate with catalog API".to_owned())
            })?;

        Ok(Grant {
            access_token: resp.access_token,
            ttl: resp.expires_in.map_or(DEFAULT_TTL, Duration::from_secs),
        })
    }
}

/// Cached bearer token
#[derive(Clone, Debug)]
struct Token {
    /// Bearer token
    value: String,
    /// Instant after which the token must not be used anymore
    expires_at: Instant,
}

/// Single slot token cache, refreshed on demand
pub(crate) struct TokenCache<E, C> {
    /// Token source
    exchange: E,
    /// Time source
    clock: C,
    /// Duration before actual expiry at which we stop using the token
    safety_margin: Duration,
    /// Current token
    slot: Mutex<Option<Token>>,
}

impl<E, C> TokenCache<E, C>
where
    E: TokenExchange,
    C: Clock,
{
    pub(crate) fn new(exchange: E, clock: C, safety_margin: Duration) -> Self {
        Self {
            exchange,
            clock,
            safety_margin,
            slot: Mutex::new(None),
        }
    }

    /// Get a valid token, exchanging a new one if needed
    pub(crate) async fn get_token(&self) -> Result<String, ResolveError> {
        let issued_at = self.clock.now();
        if let Some(token) = self
            .slot
            .lock()
            .as_ref()
            .filter(|t| issued_at < t.expires_at)
        {
            log::trace!("Reusing cached token");
            return Ok(token.value.clone());
        }

        // Concurrent refreshes can race here, last one wins
        let grant = self.exchange.exchange().await?;
        let expires_at = issued_at + grant.ttl.saturating_sub(self.safety_margin);
        log::debug!(
            "Got new token, valid for {}s",
            expires_at.saturating_duration_since(issued_at).as_secs()
        );
        *self.slot.lock() = Some(Token {
            value: grant.access_token.clone(),
            expires_at,
        });
        Ok(grant.access_token)
    }
}
