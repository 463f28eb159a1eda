//! Login credentials for MobilityLabs

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

/// Email/password pair used for the login exchange
///
/// Supplied once when the client is built and never changed afterwards.
#[derive(Clone)]
pub struct Credentials {
    email: String,
    password: SecretString,
}

impl Credentials {
    /// Create a credential pair
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Account email
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Account password in plain text, for the login header only
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Whether both fields are filled in
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.expose_secret().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
