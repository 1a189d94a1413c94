//! Error types for the scene API client
//!
//! A request can fail in three places:
//! - Before it is sent (client setup, bad base URL or credential)
//! - On the wire (connection refused, timeout)
//! - In the response (non-success status, body of the wrong shape)

use reqwest::{Method, StatusCode};

/// Longest response body kept in [`RequestError::Status`]
pub const MAX_ERROR_BODY: usize = 512;

/// Errors raised by [`SceneApi`](crate::SceneApi) implementations
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Server answered with a non-success status
    #[error("{method} {url} failed with status {status}")]
    Status {
        /// Request method
        method: Method,
        /// Full request URL
        url: String,
        /// Status the server answered with
        status: StatusCode,
        /// Response body, truncated to [`MAX_ERROR_BODY`] bytes
        body: String,
    },

    /// Request could not be sent or the response could not be read
    #[error("{method} {url} could not be completed: {source}")]
    Transport {
        /// Request method
        method: Method,
        /// Full request URL
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// Response body did not match the expected record
    #[error("response from {url} has an unexpected shape: {source}")]
    Decode {
        /// Full request URL
        url: String,
        /// Where decoding stopped
        #[source]
        source: serde_json::Error,
    },

    /// Base URL cannot be used to build request paths
    #[error("invalid base url '{url}': {reason}")]
    InvalidBaseUrl {
        /// URL as configured
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// Credential contains characters not allowed in a header
    #[error("credential cannot be sent as an Authorization header")]
    InvalidCredential,

    /// HTTP client construction failed
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}

impl RequestError {
    /// HTTP status of the failed response, if the server answered
    #[inline]
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if the server answered with `status`
    #[inline]
    #[must_use]
    pub fn is_status(&self, status: StatusCode) -> bool {
        self.status() == Some(status)
    }

    pub(crate) fn status_error(
        method: Method,
        url: impl Into<String>,
        status: StatusCode,
        body: &str,
    ) -> Self {
        Self::Status {
            method,
            url: url.into(),
            status,
            body: truncate(body, MAX_ERROR_BODY).to_string(),
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
