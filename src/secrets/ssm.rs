//! AWS Systems Manager Parameter Store secret backend.
//!
//! This module is only compiled when the `aws` feature is enabled.

use async_trait::async_trait;
use aws_sdk_ssm::error::DisplayErrorContext;
use aws_sdk_ssm::Client;

use super::{SecretError, SecretResult, SecretStore, SecretToken};

/// Reads `SecureString` parameters from SSM with decryption enabled.
///
/// # Examples
///
/// ```rust,no_run
/// use ci_task_dispatcher::secrets::SsmSecretStore;
///
/// # async fn example() {
/// let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
/// let store = SsmSecretStore::from_conf(&config);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SsmSecretStore {
    client: Client,
}

impl SsmSecretStore {
    /// Creates a store with a pre-built SSM client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a store from a loaded AWS SDK configuration.
    pub fn from_conf(config: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(config))
    }
}

#[async_trait]
impl SecretStore for SsmSecretStore {
    async fn get_parameter(&self, name: &str) -> SecretResult<SecretToken> {
        let output = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_parameter_not_found())
                {
                    return SecretError::NotFound {
                        name: name.to_string(),
                    };
                }
                SecretError::Backend {
                    name: name.to_string(),
                    message: DisplayErrorContext(&err).to_string(),
                    source: Some(Box::new(err)),
                }
            })?;

        match output.parameter().and_then(|p| p.value()) {
            Some(value) if !value.is_empty() => Ok(SecretToken::new(value)),
            _ => Err(SecretError::Empty {
                name: name.to_string(),
            }),
        }
    }
}
