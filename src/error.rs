//! Error types for webhook dispatch.
//!
//! Errors are grouped by the boundary that produces them so that callers can
//! tell a client error from a configuration error from an execution error
//! without looking at message text:
//!
//! - [`RouteError`] - a matched rule could not read the fields it needs
//! - [`ActionError`] - a start/stop action failed against a collaborator
//! - [`DispatchError`] - the per-request outcome, mapped to an HTTP status
//!
//! Port-level errors ([`SecretError`], [`PlatformError`], [`StorageError`])
//! live next to their traits.

use http::StatusCode;
use thiserror::Error;

use crate::constants::{
    MSG_INVALID_PAYLOAD, MSG_SECRET_UNAVAILABLE, MSG_UNAUTHORIZED,
};
use crate::event::EventKind;
use crate::platform::PlatformError;
use crate::secrets::SecretError;
use crate::store::StorageError;

/// A matched routing rule found the payload missing a field it needs.
///
/// # Examples
///
/// ```
/// use ci_task_dispatcher::error::RouteError;
/// use ci_task_dispatcher::event::EventKind;
///
/// let err = RouteError::MissingField {
///     kind: EventKind::PipelineHook,
///     field: "object_attributes.status",
/// };
/// assert!(err.to_string().contains("object_attributes.status"));
/// assert_eq!(err.kind(), EventKind::PipelineHook);
/// ```
#[derive(Debug, Error)]
pub enum RouteError {
    /// The field is absent.
    #[error("{kind} payload is missing `{field}`")]
    MissingField {
        /// Event category being routed.
        kind: EventKind,
        /// Dotted path of the missing field.
        field: &'static str,
    },

    /// The field is present but is not a JSON scalar usable as an id.
    #[error("{kind} payload has a non-scalar `{field}`")]
    InvalidField {
        /// Event category being routed.
        kind: EventKind,
        /// Dotted path of the offending field.
        field: &'static str,
    },
}

impl RouteError {
    /// Returns the event category whose payload was malformed.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::MissingField { kind, .. } | Self::InvalidField { kind, .. } => *kind,
        }
    }
}

/// Failure while executing a start or stop action.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The configured family has no ACTIVE task definition revision.
    #[error("no active task definitions found for family {family}")]
    NoActiveTaskDefinition {
        /// The task definition family that was searched.
        family: String,
    },

    /// The compute platform rejected a call.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// The persistence store rejected a call.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for actions.
pub type ActionResult<T> = Result<T, ActionError>;

/// Outcome of a rejected or failed webhook invocation.
///
/// Every variant maps to an HTTP status with
/// [`status_code`](DispatchError::status_code) and to a caller-facing message
/// with [`public_message`](DispatchError::public_message). The public message
/// never carries internal error text; use `Display` (or the `source` chain)
/// for logs.
///
/// # Examples
///
/// ```
/// use ci_task_dispatcher::error::DispatchError;
/// use http::StatusCode;
///
/// assert_eq!(DispatchError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
/// assert_eq!(DispatchError::Unauthorized.public_message(), "Unauthorized");
/// ```
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The token header is absent or does not match the reference secret.
    #[error("webhook token rejected")]
    Unauthorized,

    /// The reference secret could not be fetched.
    #[error("reference secret unavailable: {0}")]
    SecretUnavailable(#[source] SecretError),

    /// The request body is not JSON.
    #[error("request body is not valid JSON: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    /// A matched rule could not read its fields.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// A matched action failed.
    #[error("{kind} action failed: {source}")]
    Action {
        /// Event category whose action failed.
        kind: EventKind,
        /// What went wrong.
        #[source]
        source: ActionError,
    },
}

impl DispatchError {
    /// HTTP status for this outcome.
    ///
    /// Only a rejected token is a client error; everything else points at
    /// configuration or infrastructure and is a 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::SecretUnavailable(_)
            | Self::InvalidPayload(_)
            | Self::Route(_)
            | Self::Action { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Caller-facing message for this outcome.
    pub fn public_message(&self) -> String {
        match self {
            Self::Unauthorized => MSG_UNAUTHORIZED.to_string(),
            Self::SecretUnavailable(_) => MSG_SECRET_UNAVAILABLE.to_string(),
            Self::InvalidPayload(_) => MSG_INVALID_PAYLOAD.to_string(),
            Self::Route(err) => processing_failed(err.kind()),
            Self::Action { kind, .. } => processing_failed(*kind),
        }
    }
}

fn processing_failed(kind: EventKind) -> String {
    format!("Error processing {kind} event")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_failures_name_the_category_only() {
        let err = DispatchError::Action {
            kind: EventKind::JobHook,
            source: ActionError::NoActiveTaskDefinition {
                family: "runner".to_string(),
            },
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Error processing Job Hook event");
        assert!(!err.public_message().contains("runner"));
        assert!(err.to_string().contains("runner"));
    }

    #[test]
    fn route_failures_name_the_category() {
        let err = DispatchError::from(RouteError::MissingField {
            kind: EventKind::PipelineHook,
            field: "object_attributes.id",
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Error processing Pipeline Hook event");
    }

    #[test]
    fn secret_failure_is_a_server_error() {
        let err = DispatchError::SecretUnavailable(SecretError::Empty {
            name: "/ci/token".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), MSG_SECRET_UNAVAILABLE);
    }

    #[test]
    fn storage_errors_convert_into_action_errors() {
        let err: ActionError = StorageError::backend("throttled", None).into();
        assert!(matches!(err, ActionError::Storage(_)));
        assert!(err.to_string().contains("throttled"));
    }
}
