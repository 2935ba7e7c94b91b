//! Compute platform port.
//!
//! [`ComputePlatform`] is the narrow slice of the container orchestrator the
//! dispatcher needs: look up the newest active task definition of a family,
//! launch a task, and stop a task.

pub mod memory;
#[cfg(feature = "aws")]
pub mod ecs;

use async_trait::async_trait;
use thiserror::Error;

#[cfg(feature = "aws")]
pub use ecs::EcsPlatform;
pub use memory::InMemoryPlatform;

/// Network placement for a launched task.
///
/// Tasks always run in private subnets: the public IP flag defaults to off
/// and the dispatcher never turns it on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPlacement {
    /// Subnets the task ENI may be placed in.
    pub subnets: Vec<String>,
    /// The single security group attached to the task ENI.
    pub security_group: String,
    /// Whether a public IP is assigned.
    pub assign_public_ip: bool,
}

impl NetworkPlacement {
    /// Private placement in the given subnets and security group.
    pub fn private(subnets: Vec<String>, security_group: impl Into<String>) -> Self {
        Self {
            subnets,
            security_group: security_group.into(),
            assign_public_ip: false,
        }
    }
}

/// Parameters for launching one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTaskRequest {
    /// Cluster to launch in.
    pub cluster: String,
    /// Full task definition ARN (family and revision).
    pub task_definition: String,
    /// Network placement.
    pub network: NetworkPlacement,
}

/// Errors returned by a [`ComputePlatform`].
#[derive(Debug, Error)]
pub enum PlatformError {
    /// RunTask succeeded at the API level but launched nothing.
    #[error("no task launched from {task_definition}: {reason}")]
    NoTaskLaunched {
        /// The task definition that was requested.
        task_definition: String,
        /// Failure reasons reported by the platform, if any.
        reason: String,
    },

    /// The platform call failed.
    #[error("{operation} failed: {message}")]
    Backend {
        /// API operation name, e.g. `RunTask`.
        operation: &'static str,
        /// Human-readable description.
        message: String,
        /// The underlying SDK error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PlatformError {
    /// Builds a [`PlatformError::Backend`] without an underlying source.
    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            message: message.into(),
            source: None,
        }
    }
}

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Task lifecycle operations on the container platform.
#[async_trait]
pub trait ComputePlatform: Send + Sync {
    /// Lists ACTIVE task definition ARNs of `family`, newest revision first.
    ///
    /// Adapters may truncate the list, but never reorder it: the first
    /// element, if any, is the newest active revision.
    async fn list_active_task_definitions(&self, family: &str) -> PlatformResult<Vec<String>>;

    /// Launches one task and returns its ARN.
    async fn run_task(&self, request: &RunTaskRequest) -> PlatformResult<String>;

    /// Stops a running task.
    async fn stop_task(&self, cluster: &str, task_id: &str) -> PlatformResult<()>;
}
