//! Header names, event labels, statuses and response messages.
//!
//! These values are part of the wire contract with GitLab and with whatever
//! sits in front of the Lambda, so they live in one place.

/// Header carrying the shared webhook secret.
pub const TOKEN_HEADER: &str = "x-gitlab-token";

/// Header carrying the webhook event category.
pub const EVENT_HEADER: &str = "x-gitlab-event";

/// Event label for individual job lifecycle transitions.
pub const JOB_HOOK: &str = "Job Hook";

/// Event label for whole-pipeline lifecycle transitions.
pub const PIPELINE_HOOK: &str = "Pipeline Hook";

/// Job status that triggers a task launch.
pub const JOB_STATUS_PENDING: &str = "pending";

/// Pipeline statuses after which no job of the pipeline will run again.
pub const TERMINAL_PIPELINE_STATUSES: &[&str] = &["success", "failed", "canceled"];

/// Response message for a processed (or ignored) event.
pub const MSG_PROCESSED: &str = "Event processed successfully";

/// Response message for a rejected token.
pub const MSG_UNAUTHORIZED: &str = "Unauthorized";

/// Response message when the reference secret cannot be fetched.
pub const MSG_SECRET_UNAVAILABLE: &str = "Error retrieving secret token from SSM";

/// Response message when the request body is not JSON.
pub const MSG_INVALID_PAYLOAD: &str = "Error parsing event payload";
