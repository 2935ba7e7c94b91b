//! Dispatch table from (event category, status) to an action.
//!
//! | event              | condition                                               | action                      |
//! |--------------------|---------------------------------------------------------|-----------------------------|
//! | `Job Hook`         | `build_status == "pending"`                             | [`Action::StartTask`]       |
//! | `Pipeline Hook`    | `object_attributes.status` in success/failed/canceled   | [`Action::StopAllTasks`]    |
//! | anything else      |                                                         | none                        |
//!
//! Routing has no side effects. An unknown category or a status outside the
//! table yields `Ok(None)`; only a matched rule that cannot read its
//! identifier is an error.

use serde_json::Value;

use crate::constants::{JOB_STATUS_PENDING, TERMINAL_PIPELINE_STATUSES};
use crate::error::RouteError;
use crate::event::{EventKind, PipelineId};

/// Side effect selected for an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Launch one task for the pipeline and record it.
    StartTask(PipelineId),
    /// Stop every recorded task of the pipeline and forget it.
    StopAllTasks(PipelineId),
}

impl Action {
    /// The event category this action answers.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::StartTask(_) => EventKind::JobHook,
            Self::StopAllTasks(_) => EventKind::PipelineHook,
        }
    }

    /// The pipeline the action applies to.
    pub fn pipeline_id(&self) -> &PipelineId {
        match self {
            Self::StartTask(id) | Self::StopAllTasks(id) => id,
        }
    }
}

/// Selects the action for an event.
///
/// # Examples
///
/// ```
/// use ci_task_dispatcher::router::{route, Action};
/// use serde_json::json;
///
/// let action = route("Job Hook", &json!({"build_status": "pending", "pipeline_id": 42}))
///     .unwrap();
/// assert_eq!(action, Some(Action::StartTask("42".into())));
///
/// let action = route("Push Hook", &json!({})).unwrap();
/// assert_eq!(action, None);
/// ```
pub fn route(event_type: &str, payload: &Value) -> Result<Option<Action>, RouteError> {
    match EventKind::from_label(event_type) {
        Some(EventKind::JobHook) => route_job(payload),
        Some(EventKind::PipelineHook) => route_pipeline(payload),
        None => Ok(None),
    }
}

fn route_job(payload: &Value) -> Result<Option<Action>, RouteError> {
    // A job without a status is just another non-matching status.
    let status = payload.get("build_status").and_then(Value::as_str);
    if status != Some(JOB_STATUS_PENDING) {
        return Ok(None);
    }

    let id = pipeline_id(payload.get("pipeline_id"), EventKind::JobHook, "pipeline_id")?;
    Ok(Some(Action::StartTask(id)))
}

fn route_pipeline(payload: &Value) -> Result<Option<Action>, RouteError> {
    let attributes = payload.get("object_attributes");
    let status = attributes
        .and_then(|attrs| attrs.get("status"))
        .ok_or(RouteError::MissingField {
            kind: EventKind::PipelineHook,
            field: "object_attributes.status",
        })?;

    let terminal = status
        .as_str()
        .is_some_and(|s| TERMINAL_PIPELINE_STATUSES.contains(&s));
    if !terminal {
        return Ok(None);
    }

    let id = pipeline_id(
        attributes.and_then(|attrs| attrs.get("id")),
        EventKind::PipelineHook,
        "object_attributes.id",
    )?;
    Ok(Some(Action::StopAllTasks(id)))
}

fn pipeline_id(
    value: Option<&Value>,
    kind: EventKind,
    field: &'static str,
) -> Result<PipelineId, RouteError> {
    let value = value.ok_or(RouteError::MissingField { kind, field })?;
    PipelineId::from_json(value).ok_or(RouteError::InvalidField { kind, field })
}
