//! MobilityLabs response codes and the retry decision table
//!
//! Every response body carries a short string `code`. It is parsed into
//! [`ResponseCode`] during deserialization, and [`interpret`] turns it into the
//! next step for the request loop. The table is pure so stop lookup and
//! arrivals share identical retry semantics.

use std::fmt;

use serde::Deserialize;

use crate::config::BackoffConfig;

/// Classified response code
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ResponseCode {
    /// `00` or `01`
    Success,
    /// `80`: token rejected
    InvalidToken,
    /// `81`: endpoint temporarily disabled
    EndpointUnavailable,
    /// `90`: stop not in service
    StopDisabled,
    /// `98`: request quota exceeded
    RateLimited,
    /// Anything else, kept verbatim for error reporting
    Unknown(String),
}

impl ResponseCode {
    /// Parse a raw wire code
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "00" | "01" => Self::Success,
            "80" => Self::InvalidToken,
            "81" => Self::EndpointUnavailable,
            "90" => Self::StopDisabled,
            "98" => Self::RateLimited,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Wire representation
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "00",
            Self::InvalidToken => "80",
            Self::EndpointUnavailable => "81",
            Self::StopDisabled => "90",
            Self::RateLimited => "98",
            Self::Unknown(raw) => raw,
        }
    }

    /// Returns true for `00`/`01`
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<String> for ResponseCode {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the request loop does next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Use the response data
    Accept,
    /// Invalidate the token, log in again and repeat the call
    ReauthRetry,
    /// Repeat the call against the secondary endpoint
    Fallback,
    /// Treat the target stop as having no arrivals
    SkipDisabled,
    /// Wait, then repeat the call
    BackoffRetry,
    /// Give up
    Fail(Failure),
}

/// Why a call gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Token rejected after the one allowed reauthentication
    ReauthExhausted,
    /// No (further) fallback for an unavailable endpoint
    EndpointUnavailable,
    /// Backoff budget spent
    RateLimitExhausted,
    /// Unrecognized code
    Protocol,
}

/// Retry bookkeeping for one client call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Attempts {
    /// Whether the operation has a secondary endpoint at all
    pub fallback_available: bool,
    /// A reauthentication already happened
    pub reauthenticated: bool,
    /// The fallback endpoint is already in use
    pub fell_back: bool,
    /// Backoff retries performed so far
    pub backoffs: u32,
}

impl Attempts {
    /// Fresh bookkeeping for an operation
    #[must_use]
    pub const fn new(fallback_available: bool) -> Self {
        Self {
            fallback_available,
            reauthenticated: false,
            fell_back: false,
            backoffs: 0,
        }
    }
}

/// Decide the next step for a response code
#[must_use]
pub fn interpret(code: &ResponseCode, attempts: &Attempts, backoff: &BackoffConfig) -> Action {
    match code {
        ResponseCode::Success => Action::Accept,
        ResponseCode::InvalidToken if attempts.reauthenticated => {
            Action::Fail(Failure::ReauthExhausted)
        },
        ResponseCode::InvalidToken => Action::ReauthRetry,
        ResponseCode::EndpointUnavailable
            if attempts.fallback_available && !attempts.fell_back =>
        {
            Action::Fallback
        },
        ResponseCode::EndpointUnavailable => Action::Fail(Failure::EndpointUnavailable),
        ResponseCode::StopDisabled => Action::SkipDisabled,
        ResponseCode::RateLimited if backoff.should_retry(attempts.backoffs) => {
            Action::BackoffRetry
        },
        ResponseCode::RateLimited => Action::Fail(Failure::RateLimitExhausted),
        ResponseCode::Unknown(_) => Action::Fail(Failure::Protocol),
    }
}
