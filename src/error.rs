use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the Hyphen Toggle client.
///
/// A cache miss is not an error; it only shows up as a network round trip.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// One of the configured Horizon URLs could not be parsed or cannot carry a path.
    #[error("invalid horizon url `{url}`")]
    InvalidBaseUrl {
        /// The offending URL as configured.
        url: String,
        /// Parse error, if the URL failed to parse at all.
        #[source]
        source: Option<url::ParseError>,
    },

    /// The evaluation context cannot be sent to the server.
    #[error("invalid evaluation context: {0}")]
    InvalidContext(&'static str),

    /// The request could not complete (DNS, connection, timeout, ...).
    #[error("transport error: {0}")]
    Transport(TransportError),

    /// The server answered with a non-2xx status. `message` holds the response body text.
    #[error("server responded with {status}: {message}")]
    Http {
        /// Response status.
        status: StatusCode,
        /// Response body text.
        message: String,
    },

    /// A 2xx response whose body is not a valid evaluation response.
    #[error("malformed evaluation response")]
    MalformedResponse(#[source] Arc<serde_json::Error>),

    /// The request body could not be serialized.
    #[error("failed to serialize request body")]
    Serialization(#[source] Arc<serde_json::Error>),

    /// Every Horizon URL failed. `last` is the error of the final attempt and is also the
    /// [`source`](std::error::Error::source) of this error; `attempts` holds every attempt in
    /// endpoint order (including the last one).
    #[error("all horizon urls failed")]
    EndpointsExhausted {
        /// Error of the last attempt.
        #[source]
        last: Box<Error>,
        /// All attempts in the order they were made.
        attempts: Vec<AttemptError>,
    },

    /// No Horizon URL to try. Never happens for clients built from [`ClientConfig`](crate::ClientConfig).
    #[error("no horizon urls configured")]
    NoEndpoints,
}

/// A single failed attempt against one Horizon URL.
#[derive(Debug, Clone)]
pub struct AttemptError {
    /// Full request URL of the attempt.
    pub url: Url,
    /// Why the attempt failed.
    pub error: Error,
}

/// Underlying network failure.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// Error reported by `reqwest`.
    // reqwest::Error is not clonable, so we're wrapping it in an Arc.
    #[error(transparent)]
    Reqwest(Arc<reqwest::Error>),
    /// Error reported by a custom [`Transport`](crate::Transport) implementation.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a transport error from a plain message. Useful for custom transports.
    pub fn transport(message: impl Into<String>) -> Self {
        Error::Transport(TransportError::Other(message.into()))
    }

    /// For [`Error::EndpointsExhausted`], the error of the last attempt. Otherwise, `self`.
    pub fn last_error(&self) -> &Error {
        match self {
            Error::EndpointsExhausted { last, .. } => last,
            other => other,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Transport(TransportError::Reqwest(Arc::new(value)))
    }
}
