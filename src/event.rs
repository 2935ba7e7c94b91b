//! Webhook event envelope types.
//!
//! GitLab identifies the event category through the `X-Gitlab-Event` header
//! and sends a JSON body whose shape depends on that category. Only the
//! fields the router needs are modelled here; the body is otherwise kept as
//! a [`serde_json::Value`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{JOB_HOOK, PIPELINE_HOOK};

/// Webhook event category the dispatcher acts on.
///
/// # Examples
///
/// ```
/// use ci_task_dispatcher::event::EventKind;
///
/// assert_eq!(EventKind::from_label("Job Hook"), Some(EventKind::JobHook));
/// assert_eq!(EventKind::from_label("Push Hook"), None);
/// assert_eq!(EventKind::PipelineHook.to_string(), "Pipeline Hook");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A single job changed state.
    JobHook,
    /// A whole pipeline changed state.
    PipelineHook,
}

impl EventKind {
    /// Parses the `X-Gitlab-Event` header value. Matching is exact.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            JOB_HOOK => Some(Self::JobHook),
            PIPELINE_HOOK => Some(Self::PipelineHook),
            _ => None,
        }
    }

    /// The header label for this category.
    pub fn label(self) -> &'static str {
        match self {
            Self::JobHook => JOB_HOOK,
            Self::PipelineHook => PIPELINE_HOOK,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pipeline identifier in its normalized string form.
///
/// GitLab sends numeric ids, but the payload field may hold any JSON scalar.
/// The normalized form is what the persistence store is keyed on, so the
/// same pipeline always maps to the same partition.
///
/// # Examples
///
/// ```
/// use ci_task_dispatcher::event::PipelineId;
/// use serde_json::json;
///
/// assert_eq!(PipelineId::from_json(&json!(42)).unwrap().as_str(), "42");
/// assert_eq!(PipelineId::from_json(&json!("42")).unwrap().as_str(), "42");
/// assert!(PipelineId::from_json(&json!(null)).is_none());
/// assert!(PipelineId::from_json(&json!({"id": 1})).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineId(String);

impl PipelineId {
    /// Wraps an already-normalized identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Normalizes a JSON scalar. Returns `None` for `null`, arrays and
    /// objects.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            Value::Bool(b) => Some(Self(b.to_string())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PipelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PipelineId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Decodes a webhook body.
///
/// The body is parsed before routing, whatever the event category, so an
/// undecodable body is always reported.
pub fn decode_payload(body: &[u8]) -> Result<Value, serde_json::Error> {
    serde_json::from_slice(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_normalize_to_their_text_form() {
        let cases = [
            (json!(42), "42"),
            (json!(-7), "-7"),
            (json!(1.5), "1.5"),
            (json!("abc"), "abc"),
            (json!(""), ""),
            (json!(true), "true"),
        ];
        for (value, expected) in cases {
            let id = PipelineId::from_json(&value).unwrap();
            assert_eq!(id.as_str(), expected, "value: {value}");
        }
    }

    #[test]
    fn numeric_and_string_forms_share_a_key() {
        assert_eq!(
            PipelineId::from_json(&json!(1234)),
            PipelineId::from_json(&json!("1234"))
        );
    }

    #[test]
    fn composites_are_rejected() {
        assert!(PipelineId::from_json(&json!([1])).is_none());
        assert!(PipelineId::from_json(&json!({})).is_none());
        assert!(PipelineId::from_json(&Value::Null).is_none());
    }

    #[test]
    fn labels_round_trip() {
        for kind in [EventKind::JobHook, EventKind::PipelineHook] {
            assert_eq!(EventKind::from_label(kind.label()), Some(kind));
        }
        assert_eq!(EventKind::from_label("job hook"), None);
        assert_eq!(EventKind::from_label(""), None);
    }

    #[test]
    fn decode_rejects_non_json() {
        assert!(decode_payload(b"not json").is_err());
        assert!(decode_payload(b"").is_err());
        assert_eq!(decode_payload(b"{}").unwrap(), json!({}));
    }
}
