//! DynamoDB pipeline task store.
//!
//! [`DynamoDbPipelineTaskStore`] maps the three [`PipelineTaskStore`]
//! operations to `PutItem`, `Query` and `DeleteItem` on a single table.
//!
//! # Table Layout
//!
//! | Attribute    | Type   | Key                       |
//! |--------------|--------|---------------------------|
//! | `pipelineId` | String | Partition key             |
//! | `taskId`     | String | Sort key (task ARN)       |
//!
//! No other attributes are written. Because both attributes form the
//! primary key, a repeated `PutItem` for the same pair overwrites an
//! identical item, which makes `put` idempotent.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;

use super::{PipelineTaskRecord, PipelineTaskStore, StorageError, StorageResult};
use crate::event::PipelineId;

/// Partition key attribute name.
const PIPELINE_ID_ATTR: &str = "pipelineId";

/// Sort key attribute name.
const TASK_ID_ATTR: &str = "taskId";

/// DynamoDB-backed store.
///
/// # Examples
///
/// ```rust,no_run
/// use ci_task_dispatcher::store::DynamoDbPipelineTaskStore;
///
/// # async fn example() {
/// let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
/// let store = DynamoDbPipelineTaskStore::from_conf(&config, "ci-pipeline-tasks");
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DynamoDbPipelineTaskStore {
    client: Client,
    table_name: String,
}

impl DynamoDbPipelineTaskStore {
    /// Creates a store with a pre-built DynamoDB client.
    ///
    /// The table must already exist with `pipelineId` (S) as partition key
    /// and `taskId` (S) as sort key.
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Creates a store from a loaded AWS SDK configuration.
    pub fn from_conf(config: &aws_config::SdkConfig, table_name: impl Into<String>) -> Self {
        Self::new(Client::new(config), table_name)
    }

    /// The table this store writes to.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn key(record: &PipelineTaskRecord) -> HashMap<String, AttributeValue> {
    HashMap::from([
        (
            PIPELINE_ID_ATTR.to_string(),
            AttributeValue::S(record.pipeline_id.as_str().to_string()),
        ),
        (
            TASK_ID_ATTR.to_string(),
            AttributeValue::S(record.task_id.clone()),
        ),
    ])
}

/// Maps an AWS SDK error to a [`StorageError::Backend`].
fn map_sdk_error(
    operation: &str,
    err: impl std::error::Error + Send + Sync + 'static,
    pipeline_id: &PipelineId,
) -> StorageError {
    StorageError::backend(
        format!(
            "DynamoDB {operation} failed for pipeline {pipeline_id}: {}",
            DisplayErrorContext(&err)
        ),
        Some(Box::new(err)),
    )
}

fn parse_item(
    item: &HashMap<String, AttributeValue>,
    pipeline_id: &PipelineId,
) -> StorageResult<PipelineTaskRecord> {
    let task_id = item
        .get(TASK_ID_ATTR)
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| StorageError::MalformedItem {
            pipeline_id: pipeline_id.to_string(),
            message: format!("missing or non-string `{TASK_ID_ATTR}`"),
        })?;
    Ok(PipelineTaskRecord::new(pipeline_id.clone(), task_id.clone()))
}

// ---------------------------------------------------------------------------
// PipelineTaskStore implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl PipelineTaskStore for DynamoDbPipelineTaskStore {
    async fn put(&self, record: &PipelineTaskRecord) -> StorageResult<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(key(record)))
            .send()
            .await
            .map_err(|e| map_sdk_error("PutItem", e, &record.pipeline_id))?;
        Ok(())
    }

    async fn query(&self, pipeline_id: &PipelineId) -> StorageResult<Vec<PipelineTaskRecord>> {
        let mut records = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let mut query = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("#pid = :pid")
                .expression_attribute_names("#pid", PIPELINE_ID_ATTR)
                .expression_attribute_values(
                    ":pid",
                    AttributeValue::S(pipeline_id.as_str().to_string()),
                );

            if let Some(start_key) = exclusive_start_key.take() {
                query = query.set_exclusive_start_key(Some(start_key));
            }

            let output = query
                .send()
                .await
                .map_err(|e| map_sdk_error("Query", e, pipeline_id))?;

            for item in output.items() {
                records.push(parse_item(item, pipeline_id)?);
            }

            match output.last_evaluated_key() {
                Some(last_key) if !last_key.is_empty() => {
                    exclusive_start_key = Some(last_key.clone());
                },
                _ => break,
            }
        }

        Ok(records)
    }

    async fn delete(&self, record: &PipelineTaskRecord) -> StorageResult<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(key(record)))
            .send()
            .await
            .map_err(|e| map_sdk_error("DeleteItem", e, &record.pipeline_id))?;
        Ok(())
    }
}
