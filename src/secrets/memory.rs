//! In-memory secret store.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use super::{SecretError, SecretResult, SecretStore, SecretToken};

/// Secret store backed by a map, for tests and local runs.
///
/// Can be switched into an unavailable mode in which every lookup fails with
/// [`SecretError::Backend`], and counts lookups so tests can assert that a
/// secret was (or was not) fetched.
///
/// # Examples
///
/// ```
/// use ci_task_dispatcher::secrets::StaticSecretStore;
///
/// let store = StaticSecretStore::new().with_parameter("/ci/token", "abc");
/// assert_eq!(store.lookups(), 0);
/// ```
#[derive(Debug, Default)]
pub struct StaticSecretStore {
    parameters: DashMap<String, String>,
    unavailable: Mutex<Option<String>>,
    lookups: Mutex<usize>,
}

impl StaticSecretStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter.
    pub fn with_parameter(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Makes every lookup fail with the given message.
    pub fn unavailable(self, message: impl Into<String>) -> Self {
        *self.unavailable.lock() = Some(message.into());
        self
    }

    /// Number of `get_parameter` calls made so far.
    pub fn lookups(&self) -> usize {
        *self.lookups.lock()
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn get_parameter(&self, name: &str) -> SecretResult<SecretToken> {
        *self.lookups.lock() += 1;

        if let Some(message) = self.unavailable.lock().clone() {
            return Err(SecretError::Backend {
                name: name.to_string(),
                message,
                source: None,
            });
        }

        let value = self
            .parameters
            .get(name)
            .ok_or_else(|| SecretError::NotFound {
                name: name.to_string(),
            })?;
        if value.is_empty() {
            return Err(SecretError::Empty {
                name: name.to_string(),
            });
        }
        Ok(SecretToken::new(value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_configured_value() {
        let store = StaticSecretStore::new().with_parameter("/ci/token", "abc");
        let token = store.get_parameter("/ci/token").await.unwrap();
        assert_eq!(token.expose(), "abc");
        assert_eq!(store.lookups(), 1);
    }

    #[tokio::test]
    async fn missing_parameter_is_not_found() {
        let store = StaticSecretStore::new();
        let err = store.get_parameter("/ci/token").await.unwrap_err();
        assert!(matches!(err, SecretError::NotFound { .. }));
    }

    #[tokio::test]
    async fn empty_parameter_is_rejected() {
        let store = StaticSecretStore::new().with_parameter("/ci/token", "");
        let err = store.get_parameter("/ci/token").await.unwrap_err();
        assert!(matches!(err, SecretError::Empty { .. }));
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_lookup() {
        let store = StaticSecretStore::new()
            .with_parameter("/ci/token", "abc")
            .unavailable("connection reset");
        let err = store.get_parameter("/ci/token").await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(store.lookups(), 1);
    }
}
