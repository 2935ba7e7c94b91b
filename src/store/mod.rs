//! Pipeline-to-task bookkeeping.
//!
//! A [`PipelineTaskRecord`] says "task `task_id` is running on behalf of
//! pipeline `pipeline_id`". Records are only ever inserted or deleted, never
//! updated. A pipeline may own several records, one per launched job task.
//!
//! # Invariant
//!
//! Every record present corresponds to a task believed to still be running.
//! A task without a record has either never been started by the dispatcher
//! or has already been sent a stop request.
//!
//! # Backends
//!
//! - [`InMemoryPipelineTaskStore`] - `DashMap` keyed by pipeline
//! - `DynamoDbPipelineTaskStore` - DynamoDB table (feature `aws`)

pub mod memory;
#[cfg(feature = "aws")]
pub mod dynamodb;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::PipelineId;

#[cfg(feature = "aws")]
pub use dynamodb::DynamoDbPipelineTaskStore;
pub use memory::InMemoryPipelineTaskStore;

/// One running task owned by one pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTaskRecord {
    /// Partition key.
    pub pipeline_id: PipelineId,
    /// Sort key: the task ARN returned by the platform.
    pub task_id: String,
}

impl PipelineTaskRecord {
    /// Creates a record.
    pub fn new(pipeline_id: PipelineId, task_id: impl Into<String>) -> Self {
        Self {
            pipeline_id,
            task_id: task_id.into(),
        }
    }
}

/// Errors that can occur during storage operations.
///
/// # Examples
///
/// ```
/// use ci_task_dispatcher::store::StorageError;
///
/// let err = StorageError::backend("ProvisionedThroughputExceeded", None);
/// assert!(err.to_string().contains("ProvisionedThroughputExceeded"));
/// ```
#[derive(Debug, Error)]
pub enum StorageError {
    /// A stored item lacks an attribute or has the wrong type.
    #[error("malformed item in pipeline {pipeline_id}: {message}")]
    MalformedItem {
        /// Partition the item was read from.
        pipeline_id: String,
        /// What was wrong with it.
        message: String,
    },

    /// An I/O or backend-specific error occurred.
    #[error("backend error: {message}")]
    Backend {
        /// Human-readable description of the error.
        message: String,
        /// The underlying error, if available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StorageError {
    /// Builds a [`StorageError::Backend`].
    pub fn backend(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Backend {
            message: message.into(),
            source,
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence for [`PipelineTaskRecord`]s.
///
/// Implementations rely only on the backend's own atomic put, delete and
/// query. They do not lock, retry or batch.
#[async_trait]
pub trait PipelineTaskStore: Send + Sync {
    /// Inserts a record. Writing an existing record again is a no-op.
    async fn put(&self, record: &PipelineTaskRecord) -> StorageResult<()>;

    /// Returns every record of `pipeline_id`. Order is stable for a given
    /// store content but otherwise unspecified.
    async fn query(&self, pipeline_id: &PipelineId) -> StorageResult<Vec<PipelineTaskRecord>>;

    /// Deletes a record. Deleting a missing record succeeds.
    async fn delete(&self, record: &PipelineTaskRecord) -> StorageResult<()>;
}
