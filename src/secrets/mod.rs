//! Secret store port and the webhook secret value.
//!
//! The dispatcher fetches the reference webhook secret on every invocation
//! through [`SecretStore::get_parameter`]. The value is wrapped in
//! [`SecretToken`] so it cannot leak through `Debug`, `Display` or tracing
//! fields, and is zeroized when dropped.

pub mod memory;
#[cfg(feature = "aws")]
pub mod ssm;

use std::fmt;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

pub use memory::StaticSecretStore;
#[cfg(feature = "aws")]
pub use ssm::SsmSecretStore;

/// The reference webhook secret.
///
/// # Examples
///
/// ```
/// use ci_task_dispatcher::secrets::SecretToken;
///
/// let token = SecretToken::new("s3cr3t");
/// assert_eq!(format!("{token:?}"), "[REDACTED]");
/// assert_eq!(token.expose(), "s3cr3t");
/// ```
#[derive(Clone)]
pub struct SecretToken {
    inner: SecretString,
}

impl SecretToken {
    /// Wraps a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: SecretString::from(value.into()),
        }
    }

    /// Exposes the value for comparison. Never log the result.
    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }

    /// Returns `true` if the secret is the empty string.
    pub fn is_empty(&self) -> bool {
        self.inner.expose_secret().is_empty()
    }
}

impl fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Display for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// Errors returned by a [`SecretStore`].
#[derive(Debug, Error)]
pub enum SecretError {
    /// No parameter exists under the name.
    #[error("secret parameter '{name}' not found")]
    NotFound {
        /// The parameter name.
        name: String,
    },

    /// The parameter exists but holds no value.
    #[error("secret parameter '{name}' is empty")]
    Empty {
        /// The parameter name.
        name: String,
    },

    /// The store could not be reached or refused the request.
    #[error("secret store error for '{name}': {message}")]
    Backend {
        /// The parameter name.
        name: String,
        /// Human-readable description.
        message: String,
        /// The underlying SDK error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type for secret operations.
pub type SecretResult<T> = Result<T, SecretError>;

/// Read access to a parameter store holding encrypted secrets.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetches and decrypts the parameter `name`.
    ///
    /// # Errors
    ///
    /// - [`SecretError::NotFound`] if the parameter does not exist.
    /// - [`SecretError::Empty`] if it exists without a value.
    /// - [`SecretError::Backend`] on transport or permission failures.
    async fn get_parameter(&self, name: &str) -> SecretResult<SecretToken>;
}
