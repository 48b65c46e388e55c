use std::sync::Arc;

use url::Url;

use crate::{
    cache::ResponseCache,
    endpoints::{Endpoints, EVALUATE_PATH, TELEMETRY_PATH},
    error::AttemptError,
    logger::Logger,
    transport::{ReqwestTransport, Transport, TransportResponse},
    ClientConfig, Error, EvaluationContext, EvaluationResponse, Result, TelemetryPayload,
};

/// A client for the Hyphen Toggle evaluation service (Horizon).
///
/// In order to create a client instance, first create [`ClientConfig`].
///
/// # Failover
///
/// Requests go to the configured Horizon URLs in order, followed by the default URL derived
/// from the public key. The first 2xx response wins. Non-2xx responses and network errors move
/// on to the next URL; if every URL fails, [`Error::EndpointsExhausted`] is returned carrying the
/// last error. Attempts are sequential, there are no retries and no delay between attempts.
///
/// # Caching
///
/// Successful evaluations are cached per context for the configured TTL (see
/// [`CacheConfig`](crate::CacheConfig)). Concurrent calls that miss the cache for the same
/// context are not de-duplicated, each of them performs the full request sequence.
///
/// # Examples
/// ```no_run
/// # use hyphen_toggle::{ClientConfig, EvaluationContext};
/// let client = ClientConfig::from_public_key("public-key").to_client().unwrap();
/// let response = client.evaluate(&EvaluationContext::new("user-123")).unwrap();
/// let enabled = response
///     .get("new-checkout")
///     .and_then(|toggle| toggle.as_boolean())
///     // default value
///     .unwrap_or(false);
/// ```
pub struct Client<'a> {
    public_key: String,
    application: Option<String>,
    environment: Option<String>,
    endpoints: Endpoints,
    cache: ResponseCache,
    logger: Box<dyn Logger + Send + Sync + 'a>,
    transport: Box<dyn Transport + Send + Sync + 'a>,
}

impl<'a> Client<'a> {
    /// Create a new `Client` using the specified configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidBaseUrl`] if one of the configured Horizon URLs is invalid.
    /// - [`Error::Transport`] if the HTTP client cannot be initialized.
    pub fn new(config: ClientConfig<'a>) -> Result<Self> {
        let endpoints = Endpoints::resolve(&config.horizon_urls, &config.public_key)?;

        let transport: Box<dyn Transport + Send + Sync + 'a> = match config.transport {
            Some(transport) => transport,
            None => Box::new(ReqwestTransport::new(config.request_timeout)?),
        };

        Ok(Client {
            public_key: config.public_key,
            application: config.application,
            environment: config.environment,
            endpoints,
            cache: ResponseCache::new(config.cache),
            logger: config.logger,
            transport,
        })
    }

    /// Evaluate all toggles for `context`, using the configured logger.
    ///
    /// See [`Client::evaluate_with_logger`].
    pub fn evaluate(&self, context: &EvaluationContext) -> Result<Arc<EvaluationResponse>> {
        self.evaluate_with_logger(context, &*self.logger)
    }

    /// Evaluate all toggles for `context`.
    ///
    /// Returns the cached response if there is a fresh one. Otherwise, POSTs the context to
    /// `/toggle/evaluate` on each Horizon URL in turn and caches the first successful response.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidContext`] if the targeting key is empty.
    /// - [`Error::EndpointsExhausted`] if every Horizon URL failed.
    /// - [`Error::MalformedResponse`] if a Horizon URL answered 2xx with an unexpected body.
    ///   Remaining URLs are not tried in that case.
    pub fn evaluate_with_logger(
        &self,
        context: &EvaluationContext,
        logger: &dyn Logger,
    ) -> Result<Arc<EvaluationResponse>> {
        if context.targeting_key.is_empty() {
            return Err(Error::InvalidContext("targeting key is required"));
        }

        if let Some(response) = self.cache.get(context) {
            log::trace!(target: "hyphen",
                        targeting_key:display = context.targeting_key;
                        "using cached evaluation response");
            return Ok(response);
        }

        let body = serde_json::to_vec(context).map_err(|err| Error::Serialization(Arc::new(err)))?;
        let response = self.post_with_failover(EVALUATE_PATH, body, logger)?;

        let evaluation: EvaluationResponse = serde_json::from_str(&response.body).map_err(|err| {
            log::warn!(target: "hyphen",
                       targeting_key:display = context.targeting_key;
                       "failed to parse evaluation response body: {:?}", err);
            logger.error(&format!("failed to parse evaluation response: {err}"));
            Error::MalformedResponse(Arc::new(err))
        })?;

        log::debug!(target: "hyphen",
                    targeting_key:display = context.targeting_key,
                    toggles = evaluation.toggles.len();
                    "successfully evaluated toggles");

        Ok(self.cache.set(context, evaluation))
    }

    /// Send a telemetry event, using the configured logger.
    ///
    /// See [`Client::post_telemetry_with_logger`].
    pub fn post_telemetry(&self, payload: &TelemetryPayload) -> Result<()> {
        self.post_telemetry_with_logger(payload, &*self.logger)
    }

    /// POST `payload` to `/toggle/telemetry`, with the same failover as evaluation. The response
    /// cache is neither read nor written.
    ///
    /// # Errors
    ///
    /// - [`Error::EndpointsExhausted`] if every Horizon URL failed.
    pub fn post_telemetry_with_logger(
        &self,
        payload: &TelemetryPayload,
        logger: &dyn Logger,
    ) -> Result<()> {
        let body = serde_json::to_vec(payload).map_err(|err| Error::Serialization(Arc::new(err)))?;
        self.post_with_failover(TELEMETRY_PATH, body, logger)?;

        log::debug!(target: "hyphen",
                    toggle_key:display = payload.data.toggle.key;
                    "successfully posted telemetry");
        Ok(())
    }

    /// Horizon base URLs in the order they are tried.
    pub fn horizon_urls(&self) -> &[Url] {
        self.endpoints.base_urls()
    }

    /// Configured application, if any.
    pub fn application(&self) -> Option<&str> {
        self.application.as_deref()
    }

    /// Configured environment, if any.
    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    fn post_with_failover(
        &self,
        path: &str,
        body: Vec<u8>,
        logger: &dyn Logger,
    ) -> Result<TransportResponse> {
        let mut attempts = Vec::new();

        for url in self.endpoints.urls_for(path)? {
            log::debug!(target: "hyphen", url:display = url; "sending request");
            logger.debug(&format!("POST {url}"));

            let error = match self.transport.post(&url, &self.public_key, body.clone()) {
                Ok(response) if response.status.is_success() => {
                    logger.info(&format!("POST {url} succeeded with {}", response.status));
                    return Ok(response);
                }
                Ok(response) => Error::Http {
                    status: response.status,
                    message: response.body,
                },
                Err(err) => err,
            };

            log::warn!(target: "hyphen", url:display = url; "request failed: {}", error);
            logger.error(&format!("POST {url} failed: {error}"));
            attempts.push(AttemptError { url, error });
        }

        let Some(last) = attempts.last().map(|attempt| attempt.error.clone()) else {
            return Err(Error::NoEndpoints);
        };
        Err(Error::EndpointsExhausted {
            last: Box::new(last),
            attempts,
        })
    }
}
