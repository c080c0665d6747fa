//! Platform client with builder pattern.
//!
//! One [`AtriumClient`] is built at startup and passed to whatever needs the
//! platform. Clones are cheap and share the HTTP pool, the user session and
//! the health cache.

use crate::{
    auth::AuthApi,
    config::PlatformConfig,
    error::{AtriumLinkError, Result},
    event_handlers::EventHandlers,
    models::{ChangeFilter, HealthCheckResponse},
    query::TableQuery,
    realtime::RealtimeChannel,
    storage::{StorageAdmin, StorageBucket},
    timeouts::LinkTimeouts,
    transport::Transport,
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

/// Client for the hosted platform.
///
/// # Examples
///
/// ```rust,no_run
/// use atrium_link::{AtriumClient, PlatformConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = AtriumClient::from_config(&PlatformConfig::from_env()?)?;
///
/// client.auth().sign_in("ada@example.com", "correct horse").await?;
/// let posts = client
///     .from("posts")
///     .eq("published", true)
///     .order("created_at", false)
///     .limit(10)
///     .execute()
///     .await?;
/// println!("{} posts", posts.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AtriumClient {
    transport: Transport,
    timeouts: LinkTimeouts,
    event_handlers: EventHandlers,
    health_cache: Arc<Mutex<HealthCheckCache>>,
}

impl AtriumClient {
    pub fn builder() -> AtriumClientBuilder {
        AtriumClientBuilder::new()
    }

    /// Client with default timeouts for `config`.
    pub fn from_config(config: &PlatformConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Client configured from `ATRIUM_URL` / `ATRIUM_ANON_KEY` / `ATRIUM_SERVICE_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::from_config(&PlatformConfig::from_env()?)
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.transport.clone())
    }

    /// Start a query on `table`.
    pub fn from(&self, table: &str) -> TableQuery {
        TableQuery::new(self.transport.clone(), table)
    }

    pub fn bucket(&self, name: &str) -> StorageBucket {
        StorageBucket::new(self.transport.clone(), name)
    }

    /// Bucket administration; calls fail with `ConfigurationError` when no
    /// service key was configured.
    pub fn storage_admin(&self) -> StorageAdmin {
        StorageAdmin::new(self.transport.clone())
    }

    /// Open and join a realtime channel. The current session's token (if
    /// any) is sent with the join so row-level security applies.
    pub async fn channel(&self, name: &str, filter: ChangeFilter) -> Result<RealtimeChannel> {
        let auth = self.transport.auth()?;
        RealtimeChannel::open(
            self.transport.base_url(),
            name,
            filter,
            &auth,
            &self.timeouts,
            &self.event_handlers,
        )
        .await
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    pub fn timeouts(&self) -> &LinkTimeouts {
        &self.timeouts
    }

    pub fn has_service_key(&self) -> bool {
        self.transport.service_auth().is_ok()
    }

    /// Auth service health, cached for a few seconds.
    pub async fn health_check(&self) -> Result<HealthCheckResponse> {
        {
            let cache = self.health_cache.lock().await;
            if let Some(response) = cache.fresh() {
                log::debug!("[HEALTH_CHECK] Returning cached response");
                return Ok(response);
            }
        }

        let start = Instant::now();
        let response = self.auth().health().await?;
        log::debug!("[HEALTH_CHECK] Fetched in {:?}", start.elapsed());

        let mut cache = self.health_cache.lock().await;
        cache.store(response.clone());
        Ok(response)
    }
}

impl std::fmt::Debug for AtriumClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtriumClient")
            .field("base_url", &self.transport.base_url())
            .field("timeouts", &self.timeouts)
            .field("event_handlers", &self.event_handlers)
            .finish()
    }
}

/// Builder for [`AtriumClient`].
pub struct AtriumClientBuilder {
    base_url: Option<String>,
    anon_key: Option<String>,
    service_key: Option<String>,
    timeout: Duration,
    max_retries: u32,
    timeouts: LinkTimeouts,
    event_handlers: EventHandlers,
}

impl AtriumClientBuilder {
    fn new() -> Self {
        let timeouts = LinkTimeouts::default();
        Self {
            base_url: None,
            anon_key: None,
            service_key: None,
            timeout: timeouts.receive_timeout,
            max_retries: 3,
            timeouts,
            event_handlers: EventHandlers::default(),
        }
    }

    /// Take URL and keys from a validated config.
    pub fn config(mut self, config: &PlatformConfig) -> Self {
        self.base_url = Some(config.url().to_string());
        self.anon_key = Some(config.anon_key().to_string());
        self.service_key = config.service_key().map(str::to_string);
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn anon_key(mut self, key: impl Into<String>) -> Self {
        self.anon_key = Some(key.into());
        self
    }

    pub fn service_key(mut self, key: impl Into<String>) -> Self {
        self.service_key = Some(key.into());
        self
    }

    /// HTTP request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retries for idempotent reads on connect/timeout failures
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Timeouts for HTTP and realtime. Also sets the HTTP request timeout
    /// to the receive timeout.
    pub fn timeouts(mut self, timeouts: LinkTimeouts) -> Self {
        self.timeout = timeouts.receive_timeout;
        self.timeouts = timeouts;
        self
    }

    pub fn event_handlers(mut self, handlers: EventHandlers) -> Self {
        self.event_handlers = handlers;
        self
    }

    pub fn build(self) -> Result<AtriumClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| AtriumLinkError::ConfigurationError("base_url is required".into()))?;
        let anon_key = self
            .anon_key
            .ok_or_else(|| AtriumLinkError::ConfigurationError("anon_key is required".into()))?;

        let mut config = PlatformConfig::new(base_url, anon_key)?;
        if let Some(service_key) = self.service_key {
            config = config.with_service_key(service_key);
        }

        let mut http_builder = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90));
        if !LinkTimeouts::is_no_timeout(self.timeout) {
            http_builder = http_builder.timeout(self.timeout);
        }
        if !LinkTimeouts::is_no_timeout(self.timeouts.connection_timeout) {
            http_builder = http_builder.connect_timeout(self.timeouts.connection_timeout);
        }
        let http_client = http_builder
            .build()
            .map_err(|e| AtriumLinkError::ConfigurationError(e.to_string()))?;

        log::debug!("[CLIENT] Built client for {}", config.url());

        let transport = Transport::new(
            config.url().to_string(),
            http_client,
            config.anon_key().to_string(),
            config.service_key().map(str::to_string),
            self.max_retries,
        );

        Ok(AtriumClient {
            transport,
            timeouts: self.timeouts,
            event_handlers: self.event_handlers,
            health_cache: Arc::new(Mutex::new(HealthCheckCache::default())),
        })
    }
}

const HEALTH_CHECK_TTL: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
struct HealthCheckCache {
    last_check: Option<Instant>,
    last_response: Option<HealthCheckResponse>,
}

impl HealthCheckCache {
    fn fresh(&self) -> Option<HealthCheckResponse> {
        match (self.last_check, &self.last_response) {
            (Some(at), Some(response)) if at.elapsed() < HEALTH_CHECK_TTL => Some(response.clone()),
            _ => None,
        }
    }

    fn store(&mut self, response: HealthCheckResponse) {
        self.last_check = Some(Instant::now());
        self.last_response = Some(response);
    }
}
