//! Authority API client error types.

/// Errors from authority API calls.
#[derive(Debug, thiserror::Error)]
pub enum ItsError {
    /// HTTP transport error (connection failure, TLS, etc.).
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        /// The endpoint being called.
        endpoint: String,
        /// The underlying transport error.
        source: reqwest::Error,
    },

    /// The bounded request timeout elapsed. The affected records remain in
    /// their last durable state.
    #[error("request to {endpoint} timed out after {timeout_secs}s")]
    Timeout {
        /// The endpoint being called.
        endpoint: String,
        /// The configured timeout.
        timeout_secs: u64,
    },

    /// The authority returned a non-2xx status.
    #[error("authority {endpoint} returned {status}: {body}")]
    Api {
        /// The endpoint being called.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body excerpt for diagnostics.
        body: String,
    },

    /// Response deserialization failed — the authority spoke, but not the
    /// protocol we expected.
    #[error("failed to deserialize response from {endpoint}: {reason}")]
    Protocol {
        /// The endpoint being called.
        endpoint: String,
        /// What failed to parse.
        reason: String,
    },

    /// Token acquisition failed or credentials were rejected.
    #[error("authentication failed: {reason}")]
    Auth {
        /// Why authentication failed.
        reason: String,
    },

    /// The client is missing configuration required to operate.
    #[error("client not configured: {reason}")]
    NotConfigured {
        /// What is missing.
        reason: String,
    },
}

impl ItsError {
    /// Whether retrying the same call can reasonably succeed. Transport
    /// failures, timeouts, and 5xx responses are retryable; protocol and
    /// authentication errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { .. } | Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Protocol { .. } | Self::Auth { .. } | Self::NotConfigured { .. } => false,
        }
    }
}
