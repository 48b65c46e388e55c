use std::{fmt, sync::Arc, time::Duration};

use crate::{
    cache::default_cache_key,
    logger::{Logger, NoopLogger},
    transport::Transport,
    Client, EvaluationContext, Result,
};

/// Function deriving a cache key from an evaluation context.
pub type CacheKeyFn = Arc<dyn Fn(&EvaluationContext) -> String + Send + Sync>;

/// Configuration for the response cache.
///
/// # Examples
/// ```
/// # use std::time::Duration;
/// # use hyphen_toggle::CacheConfig;
/// // Cache per targeting key only, for five minutes.
/// let cache = CacheConfig::default()
///     .ttl(Duration::from_secs(300))
///     .cache_key_fn(|context| context.targeting_key.clone());
/// ```
#[derive(Clone)]
pub struct CacheConfig {
    pub(crate) ttl: Duration,
    pub(crate) cache_key_fn: CacheKeyFn,
}

impl CacheConfig {
    /// Default time-to-live of a cached evaluation response.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

    /// Environment variable read by [`CacheConfig::from_env`].
    pub const TTL_ENV_VAR: &'static str = "HYPHEN_CACHE_TTL_SECONDS";

    /// Default cache configuration, with the TTL taken from `HYPHEN_CACHE_TTL_SECONDS` if it is
    /// set to a valid number of seconds.
    pub fn from_env() -> Self {
        let ttl = ttl_from_env_value(std::env::var(Self::TTL_ENV_VAR).ok().as_deref());
        CacheConfig::default().ttl(ttl)
    }

    /// Set how long a response stays cached, measured from when it was stored.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set TTL in whole seconds.
    pub fn ttl_seconds(self, seconds: u64) -> Self {
        self.ttl(Duration::from_secs(seconds))
    }

    /// Override how cache keys are derived from a context. Contexts mapping to the same key
    /// share a cached response.
    pub fn cache_key_fn(
        mut self,
        cache_key_fn: impl Fn(&EvaluationContext) -> String + Send + Sync + 'static,
    ) -> Self {
        self.cache_key_fn = Arc::new(cache_key_fn);
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            ttl: CacheConfig::DEFAULT_TTL,
            cache_key_fn: Arc::new(default_cache_key),
        }
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

fn ttl_from_env_value(value: Option<&str>) -> Duration {
    match value.map(|v| v.trim().parse::<u64>()) {
        Some(Ok(seconds)) => Duration::from_secs(seconds),
        Some(Err(err)) => {
            log::warn!(target: "hyphen", "ignoring invalid {}: {:?}", CacheConfig::TTL_ENV_VAR, err);
            CacheConfig::DEFAULT_TTL
        }
        None => CacheConfig::DEFAULT_TTL,
    }
}

/// Configuration for [`Client`].
///
/// # Examples
/// ```
/// # use hyphen_toggle::ClientConfig;
/// let client = ClientConfig::from_public_key("public-key")
///     .application("my-app")
///     .environment("production")
///     .horizon_urls(["https://horizon.internal.example"])
///     .to_client()
///     .unwrap();
/// ```
pub struct ClientConfig<'a> {
    pub(crate) public_key: String,
    pub(crate) application: Option<String>,
    pub(crate) environment: Option<String>,
    pub(crate) horizon_urls: Vec<String>,
    pub(crate) cache: CacheConfig,
    pub(crate) request_timeout: Option<Duration>,
    pub(crate) logger: Box<dyn Logger + Send + Sync + 'a>,
    pub(crate) transport: Option<Box<dyn Transport + Send + Sync + 'a>>,
}

impl<'a> ClientConfig<'a> {
    /// Default per-request timeout.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a default configuration using the specified public key.
    ///
    /// ```
    /// # use hyphen_toggle::ClientConfig;
    /// ClientConfig::from_public_key("public-key");
    /// ```
    pub fn from_public_key(public_key: impl Into<String>) -> Self {
        ClientConfig {
            public_key: public_key.into(),
            application: None,
            environment: None,
            horizon_urls: Vec::new(),
            cache: CacheConfig::default(),
            request_timeout: Some(Self::DEFAULT_REQUEST_TIMEOUT),
            logger: Box::new(NoopLogger),
            transport: None,
        }
    }

    /// Application name or id. Not sent by the client itself; see [`ClientConfig::context`].
    pub fn application(mut self, application: impl Into<String>) -> Self {
        self.application = Some(application.into());
        self
    }

    /// Project environment. Not sent by the client itself; see [`ClientConfig::context`].
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Horizon URLs to try, in order, before the default URL derived from the public key.
    pub fn horizon_urls<I>(mut self, urls: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.horizon_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    /// Response cache settings.
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Deadline for each individual request attempt, so that a stalled Horizon URL does not
    /// block failover. `None` disables the timeout.
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Logger receiving per-attempt diagnostics.
    ///
    /// ```
    /// # use hyphen_toggle::ClientConfig;
    /// let config = ClientConfig::from_public_key("public-key").logger(|level: log::Level, message: &str| {
    ///     eprintln!("[{level}] {message}");
    /// });
    /// ```
    pub fn logger(mut self, logger: impl Logger + Send + Sync + 'a) -> Self {
        self.logger = Box::new(logger);
        self
    }

    /// Use a custom HTTP transport instead of the default `reqwest` one. `request_timeout` is
    /// not applied to custom transports.
    pub fn transport(mut self, transport: impl Transport + Send + Sync + 'a) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Build an evaluation context for `targeting_key`, pre-filled with the configured
    /// application and environment.
    pub fn context(&self, targeting_key: impl Into<String>) -> EvaluationContext {
        EvaluationContext {
            application: self.application.clone(),
            environment: self.environment.clone(),
            ..EvaluationContext::new(targeting_key)
        }
    }

    /// Create a new [`Client`] using the specified configuration.
    ///
    /// ```
    /// # use hyphen_toggle::{ClientConfig, Client};
    /// let client: Client = ClientConfig::from_public_key("public-key").to_client().unwrap();
    /// ```
    pub fn to_client(self) -> Result<Client<'a>> {
        Client::new(self)
    }
}
