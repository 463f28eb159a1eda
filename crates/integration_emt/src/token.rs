//! Access token lifecycle
//!
//! MobilityLabs tokens are opaque and carry no usable expiry, so a token is
//! only ever invalidated reactively: when a request using it comes back with
//! the invalid-token code. The single token slot sits behind an async mutex
//! that is held across the login exchange, which means at most one login is
//! in flight and concurrent callers reuse its result.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::api::MobilityApi;
use crate::credentials::Credentials;
use crate::error::EmtError;

/// An access token and what we currently believe about it
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    obtained_at: DateTime<Utc>,
    believed_valid: bool,
}

impl Token {
    /// Wrap a freshly issued token value
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            obtained_at: Utc::now(),
            believed_valid: true,
        }
    }

    /// Raw token value for the `accessToken` header
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// When the login that produced this token completed
    #[must_use]
    pub const fn obtained_at(&self) -> DateTime<Utc> {
        self.obtained_at
    }

    /// False once the server has rejected the token
    #[must_use]
    pub const fn is_believed_valid(&self) -> bool {
        self.believed_valid
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"[REDACTED]")
            .field("obtained_at", &self.obtained_at)
            .field("believed_valid", &self.believed_valid)
            .finish()
    }
}

/// Sole owner of the client's token
pub struct TokenManager {
    api: Arc<dyn MobilityApi>,
    credentials: Credentials,
    slot: Mutex<Option<Token>>,
    logins: AtomicU32,
}

impl TokenManager {
    /// Create a manager with no token; the first request logs in
    pub fn new(api: Arc<dyn MobilityApi>, credentials: Credentials) -> Self {
        Self {
            api,
            credentials,
            slot: Mutex::new(None),
            logins: AtomicU32::new(0),
        }
    }

    /// Return the current token, logging in first if there is no valid one
    ///
    /// # Errors
    ///
    /// Returns `Auth` if a login was needed and failed.
    pub async fn ensure_token(&self) -> Result<Token, EmtError> {
        let mut slot = self.slot.lock().await;
        if let Some(token) = slot.as_ref().filter(|t| t.believed_valid) {
            return Ok(token.clone());
        }
        self.login_into(&mut slot).await
    }

    /// Log in unconditionally and replace the current token
    ///
    /// # Errors
    ///
    /// Returns `Auth` on transport failure, on a non-success login code, or
    /// when the response carries no token. The previous token is left
    /// invalidated in that case.
    pub async fn authenticate(&self) -> Result<Token, EmtError> {
        let mut slot = self.slot.lock().await;
        self.login_into(&mut slot).await
    }

    /// Mark the current token as rejected
    pub async fn invalidate(&self) {
        if let Some(token) = self.slot.lock().await.as_mut() {
            token.believed_valid = false;
        }
    }

    /// Mark `rejected` as invalid unless it has already been replaced
    ///
    /// A request that was sent with an older token must not throw away a
    /// token another caller obtained in the meantime.
    pub async fn invalidate_if_current(&self, rejected: &Token) {
        if let Some(token) = self.slot.lock().await.as_mut() {
            if token.value == rejected.value {
                token.believed_valid = false;
            }
        }
    }

    /// Current token, valid or not, without logging in
    pub async fn current(&self) -> Option<Token> {
        self.slot.lock().await.clone()
    }

    /// Number of login exchanges performed so far
    pub fn login_count(&self) -> u32 {
        self.logins.load(Ordering::Relaxed)
    }

    #[instrument(skip_all)]
    async fn login_into(&self, slot: &mut Option<Token>) -> Result<Token, EmtError> {
        if let Some(token) = slot.as_mut() {
            token.believed_valid = false;
        }

        let attempt = self.logins.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(attempt, "Authenticating with MobilityLabs");

        let response = self.api.login(&self.credentials).await.map_err(|e| match e {
            EmtError::Auth(msg) => EmtError::Auth(msg),
            other => EmtError::Auth(other.to_string()),
        });

        let token = match response {
            Ok(response) if response.code.is_success() => match response.data {
                Some(value) if !value.is_empty() => Token::new(value),
                _ => {
                    warn!("Login succeeded without an access token");
                    return Err(EmtError::Auth("login response carried no token".to_string()));
                },
            },
            Ok(response) => {
                warn!(code = %response.code, "Login rejected");
                return Err(EmtError::Auth(format!(
                    "login rejected with code {}: {}",
                    response.code, response.description
                )));
            },
            Err(e) => {
                warn!(error = %e, "Login failed");
                return Err(e);
            },
        };

        info!(attempt, "Authenticated with MobilityLabs");
        *slot = Some(token.clone());
        Ok(token)
    }
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("credentials", &self.credentials)
            .field("logins", &self.login_count())
            .finish_non_exhaustive()
    }
}
