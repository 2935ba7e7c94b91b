//! GitLab webhook dispatcher for ephemeral ECS Fargate tasks.
//!
//! This crate turns GitLab job and pipeline webhooks into container task
//! lifecycle actions: a job entering `pending` launches one task from the
//! newest active task definition, and a pipeline reaching `success`,
//! `failed` or `canceled` stops every task launched for it. A small table of
//! (pipeline id, task id) records makes the second step possible.
//!
//! # Overview
//!
//! Each invocation is handled by [`Dispatcher`](dispatcher::Dispatcher):
//!
//! 1. Fetch the reference secret and authenticate `X-Gitlab-Token`
//! 2. Decode the body and route on `X-Gitlab-Event` and status
//! 3. Run the matched action against the platform and the store
//!
//! Unknown events and non-matching statuses are acknowledged with a 200 and
//! have no side effects.
//!
//! # Module Organization
//!
//! - [`config`] - Environment configuration, validated once at startup
//! - [`auth`] - Constant-time webhook token check
//! - [`event`] - Event categories and pipeline id normalization
//! - [`router`] - The (event, status) to action table
//! - [`actions`] - StartTask and StopAllTasks
//! - [`dispatcher`] - Per-request handler and HTTP mapping
//! - [`error`] - Error taxonomy
//! - [`secrets`], [`platform`], [`store`] - Collaborator ports with
//!   in-memory adapters and, behind the `aws` feature, SSM, ECS and DynamoDB
//!   adapters

pub mod actions;
pub mod auth;
pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod platform;
pub mod router;
pub mod secrets;
pub mod store;

// Re-exports for ergonomic access
pub use config::{ConfigError, DispatcherConfig};
pub use dispatcher::{DispatchResponse, Dispatcher, Outcome};
pub use error::{ActionError, DispatchError, RouteError};
pub use event::{EventKind, PipelineId};
pub use router::Action;
