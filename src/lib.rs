//! The Rust client for Hyphen Toggle, a feature flag service.
//!
//! # Overview
//!
//! The crate revolves around a [`Client`] that asks the Hyphen Toggle evaluation service
//! ("Horizon") to evaluate all toggles for an [`EvaluationContext`]: the subject's targeting key
//! plus application, environment, user, and custom attributes. Evaluation results in an
//! [`EvaluationResponse`] mapping each toggle key to an [`Evaluation`].
//!
//! Toggle rules are evaluated by the server; the client only handles transport, failover
//! between several Horizon URLs, and caching.
//!
//! ```no_run
//! # use hyphen_toggle::ClientConfig;
//! let config = ClientConfig::from_public_key("public-key")
//!     .application("my-app")
//!     .environment("production");
//! let context = config.context("user-123");
//! let client = config.to_client().unwrap();
//!
//! let dark_mode = client
//!     .evaluate(&context)
//!     .ok()
//!     .and_then(|response| response.get("dark-mode").and_then(|t| t.as_boolean()))
//!     // default value
//!     .unwrap_or(false);
//! ```
//!
//! # Horizon URLs
//!
//! Requests go to the URLs set with [`ClientConfig::horizon_urls`], in order, and finally to a
//! default URL derived from the public key (see [`default_horizon_url`]). The first successful
//! response wins.
//!
//! # Caching
//!
//! Successful evaluation responses are cached for 30 seconds by default, keyed by a hash of the
//! whole context. Both can be changed with [`CacheConfig`].
//!
//! # Telemetry
//!
//! [`Client::post_telemetry`] reports a single toggle usage to the server using the same
//! failover as evaluation. Telemetry never touches the cache.
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum. The client never substitutes default values;
//! that decision is left to the caller.
//!
//! In production, it is recommended to fall back to a default value on any error, as feature
//! flag evaluation should not be critical enough to cause system crashes. However, the returned
//! errors are valuable for debugging and usually indicate that developer's attention is needed.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging
//! messages under the `hyphen` target. Consider integrating a `log`-compatible logger
//! implementation for better visibility into client operations. Per-attempt diagnostics can
//! additionally be routed to a [`Logger`].
//!
//! # Examples
//!
//! Examples can be found in the `demos` directory of the `hyphen-toggle` crate repository.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod cache;
mod client;
mod config;
mod context;
mod endpoints;
mod error;
mod evaluation;
mod logger;
mod transport;

pub use cache::{default_cache_key, ResponseCache};
pub use client::Client;
pub use config::{CacheConfig, CacheKeyFn, ClientConfig};
pub use context::{CustomAttributes, EvaluationContext, User};
pub use endpoints::{default_horizon_url, join_path, org_id_from_public_key, DEFAULT_HORIZON_URL};
pub use error::{AttemptError, Error, Result, TransportError};
pub use evaluation::{
    Evaluation, EvaluationResponse, EvaluationType, EvaluationValue, TelemetryData,
    TelemetryPayload,
};
pub use logger::{Logger, NoopLogger};
pub use transport::{ReqwestTransport, Transport, TransportResponse, API_KEY_HEADER};
