//! The per-request webhook handler.
//!
//! [`Dispatcher`] owns the configuration and the three collaborator ports.
//! Each call to [`Dispatcher::handle`] is independent:
//!
//! 1. fetch the reference secret (failure: 500, nothing else attempted)
//! 2. authenticate the token header (failure: 401, no side effects)
//! 3. decode the body and route on `X-Gitlab-Event`
//! 4. run the matched action, if any
//!
//! The dispatcher holds no mutable state, so one instance can serve
//! concurrent invocations.

use std::sync::Arc;

use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::actions::{start_task, stop_all_tasks};
use crate::auth::authenticate;
use crate::config::DispatcherConfig;
use crate::constants::{EVENT_HEADER, MSG_PROCESSED};
use crate::error::DispatchError;
use crate::event::{decode_payload, PipelineId};
use crate::platform::ComputePlatform;
use crate::router::{route, Action};
use crate::secrets::SecretStore;
use crate::store::PipelineTaskStore;

/// Successful outcome of one webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No rule matched; nothing was done.
    Ignored,
    /// A task was launched and recorded.
    Started {
        /// Pipeline the task runs for.
        pipeline_id: PipelineId,
        /// ARN of the launched task.
        task_id: String,
    },
    /// Every recorded task of the pipeline was stopped and forgotten.
    Stopped {
        /// Pipeline that finished.
        pipeline_id: PipelineId,
        /// Number of tasks stopped.
        count: usize,
    },
}

/// JSON body of every response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseBody {
    /// Human-readable outcome.
    pub message: String,
}

/// Status and message returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Message placed in the JSON body.
    pub message: String,
}

impl DispatchResponse {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Serializes the `{"message": ...}` body.
    pub fn body_json(&self) -> String {
        serde_json::json!({ "message": self.message }).to_string()
    }
}

impl From<&DispatchError> for DispatchResponse {
    fn from(err: &DispatchError) -> Self {
        Self::new(err.status_code(), err.public_message())
    }
}

/// Webhook dispatcher with injected collaborators.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use ci_task_dispatcher::config::DispatcherConfig;
/// use ci_task_dispatcher::dispatcher::Dispatcher;
/// use ci_task_dispatcher::platform::InMemoryPlatform;
/// use ci_task_dispatcher::secrets::StaticSecretStore;
/// use ci_task_dispatcher::store::InMemoryPipelineTaskStore;
/// use http::{HeaderMap, StatusCode};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let config = DispatcherConfig::from_lookup(|key| Some(format!("{key}-value"))).unwrap();
/// let secrets = StaticSecretStore::new()
///     .with_parameter(config.secret_parameter_name.clone(), "s3cr3t");
/// let dispatcher = Dispatcher::new(
///     config,
///     Arc::new(secrets),
///     Arc::new(InMemoryPlatform::new()),
///     Arc::new(InMemoryPipelineTaskStore::new()),
/// );
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-gitlab-token", "s3cr3t".parse().unwrap());
/// headers.insert("x-gitlab-event", "Push Hook".parse().unwrap());
///
/// let response = dispatcher.handle(&headers, b"{}").await;
/// assert_eq!(response.status, StatusCode::OK);
/// # }
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    config: DispatcherConfig,
    secrets: Arc<dyn SecretStore>,
    platform: Arc<dyn ComputePlatform>,
    store: Arc<dyn PipelineTaskStore>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher.
    pub fn new(
        config: DispatcherConfig,
        secrets: Arc<dyn SecretStore>,
        platform: Arc<dyn ComputePlatform>,
        store: Arc<dyn PipelineTaskStore>,
    ) -> Self {
        Self {
            config,
            secrets,
            platform,
            store,
        }
    }

    /// The configuration this dispatcher was built with.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Handles one webhook and always produces a response.
    ///
    /// Failures are logged with their full error chain here; the response
    /// only carries the public message.
    pub async fn handle(&self, headers: &HeaderMap, body: &[u8]) -> DispatchResponse {
        match self.dispatch(headers, body).await {
            Ok(outcome) => {
                info!(?outcome, "event processed");
                DispatchResponse::new(StatusCode::OK, MSG_PROCESSED)
            },
            Err(err) => {
                if err.status_code().is_server_error() {
                    error!(error = %err, source = ?std::error::Error::source(&err), "event processing failed");
                } else {
                    warn!(error = %err, "event rejected");
                }
                DispatchResponse::from(&err)
            },
        }
    }

    /// Authenticates, routes and executes one webhook.
    ///
    /// # Errors
    ///
    /// See [`DispatchError`] for the taxonomy and HTTP mapping.
    pub async fn dispatch(&self, headers: &HeaderMap, body: &[u8]) -> Result<Outcome, DispatchError> {
        let secret = self
            .secrets
            .get_parameter(&self.config.secret_parameter_name)
            .await
            .map_err(DispatchError::SecretUnavailable)?;

        if !authenticate(headers, &secret) {
            return Err(DispatchError::Unauthorized);
        }
        drop(secret);

        let event_type = headers
            .get(EVENT_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");
        let payload = decode_payload(body).map_err(DispatchError::InvalidPayload)?;

        let Some(action) = route(event_type, &payload)? else {
            info!(event_type, "no rule matched");
            return Ok(Outcome::Ignored);
        };

        self.execute(action).await
    }

    async fn execute(&self, action: Action) -> Result<Outcome, DispatchError> {
        let kind = action.kind();
        let platform = self.platform.as_ref();
        let store = self.store.as_ref();

        let result = match action {
            Action::StartTask(pipeline_id) => {
                let started = start_task(&self.config, platform, store, &pipeline_id).await;
                started.map(|task_id| Outcome::Started {
                    pipeline_id,
                    task_id,
                })
            },
            Action::StopAllTasks(pipeline_id) => {
                let stopped = stop_all_tasks(&self.config, platform, store, &pipeline_id).await;
                stopped.map(|count| Outcome::Stopped { pipeline_id, count })
            },
        };

        result.map_err(|source| DispatchError::Action { kind, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_body_is_a_message_object() {
        let response = DispatchResponse::new(StatusCode::OK, MSG_PROCESSED);
        let body: ResponseBody = serde_json::from_str(&response.body_json()).unwrap();
        assert_eq!(body.message, "Event processed successfully");
    }

    #[test]
    fn error_responses_use_public_messages() {
        let response = DispatchResponse::from(&DispatchError::Unauthorized);
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.body_json(), r#"{"message":"Unauthorized"}"#);
    }
}
