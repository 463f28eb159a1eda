//! EMT client error types

use thiserror::Error;

/// Errors that can occur while talking to the MobilityLabs API
///
/// Raw response codes never escape the client; every code that is not
/// accepted ends up as one of these variants.
#[derive(Debug, Error)]
pub enum EmtError {
    /// Login failed (bad credentials, unexpected code or transport failure)
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Transport failure on an authenticated call
    #[error("Network error: {0}")]
    Network(String),

    /// Request timeout
    #[error("Request timed out after {timeout_secs} seconds")]
    Timeout {
        /// The timeout duration in seconds
        timeout_secs: u64,
    },

    /// Still rate limited after every backoff retry
    #[error("Rate limit still exceeded after {attempts} retries")]
    RateLimitExhausted {
        /// Number of retries performed
        attempts: u32,
    },

    /// Primary endpoint (and its fallback, if any) reported unavailable
    #[error("Endpoint unavailable: {operation}")]
    EndpointUnavailable {
        /// Operation whose endpoints are down
        operation: String,
    },

    /// Token was rejected again right after reauthenticating
    #[error("Token rejected again after reauthentication")]
    ReauthExhausted,

    /// Response code outside the documented set
    #[error("Unexpected response code {code:?}: {description}")]
    Protocol {
        /// Raw code as received
        code: String,
        /// Description sent along with the code
        description: String,
    },

    /// Failed to parse a response body
    #[error("Parse error: {0}")]
    Parse(String),

    /// Search radius outside the accepted range
    #[error("Radius {radius}m outside accepted range {min}..={max}m")]
    InvalidRadius {
        /// Requested radius in meters
        radius: u32,
        /// Smallest accepted radius
        min: u32,
        /// Largest accepted radius
        max: u32,
    },

    /// Invalid coordinates or stop id
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl EmtError {
    /// Returns true if the failure may clear up on a later polling cycle
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::Timeout { .. }
                | Self::RateLimitExhausted { .. }
                | Self::EndpointUnavailable { .. }
        )
    }

    /// Returns true for transport-level failures (including timeouts)
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout { .. })
    }
}
