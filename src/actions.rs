//! Task lifecycle actions.
//!
//! Both actions issue their external calls strictly one after another and
//! never roll back. A failure part-way leaves whatever was already applied
//! in place:
//!
//! - [`start_task`]: a launched task whose record write fails is orphaned;
//!   the stop path cannot find it.
//! - [`stop_all_tasks`]: records before the failing one are stopped and
//!   deleted, the failing one may be stopped but not deleted, later ones
//!   are untouched.
//!
//! Recovery is left to GitLab redelivering the webhook.

use tracing::{debug, info, warn};

use crate::config::DispatcherConfig;
use crate::error::{ActionError, ActionResult};
use crate::event::PipelineId;
use crate::platform::{ComputePlatform, RunTaskRequest};
use crate::store::{PipelineTaskRecord, PipelineTaskStore};

/// Resolves the newest ACTIVE task definition of the configured family.
///
/// # Errors
///
/// [`ActionError::NoActiveTaskDefinition`] if the family has none, or the
/// platform error if the lookup fails.
pub async fn latest_task_definition(
    platform: &dyn ComputePlatform,
    family: &str,
) -> ActionResult<String> {
    let arns = platform.list_active_task_definitions(family).await?;
    arns.into_iter()
        .next()
        .ok_or_else(|| ActionError::NoActiveTaskDefinition {
            family: family.to_string(),
        })
}

/// Launches one task for `pipeline_id` and records it.
///
/// Returns the launched task's ARN.
///
/// # Errors
///
/// Fails without writing a record if the definition lookup or the launch
/// fails; fails after launching if the record write fails.
pub async fn start_task(
    config: &DispatcherConfig,
    platform: &dyn ComputePlatform,
    store: &dyn PipelineTaskStore,
    pipeline_id: &PipelineId,
) -> ActionResult<String> {
    let task_definition = latest_task_definition(platform, &config.task_family).await?;
    debug!(%pipeline_id, %task_definition, "resolved task definition");

    let request = RunTaskRequest {
        cluster: config.cluster_name.clone(),
        task_definition,
        network: config.network_placement(),
    };
    let task_id = platform.run_task(&request).await?;
    info!(%pipeline_id, %task_id, cluster = %config.cluster_name, "started task");

    let record = PipelineTaskRecord::new(pipeline_id.clone(), task_id.clone());
    if let Err(err) = store.put(&record).await {
        warn!(%pipeline_id, %task_id, "task launched but not recorded; it will not be stopped automatically");
        return Err(err.into());
    }
    info!(%pipeline_id, %task_id, "recorded job start");

    Ok(task_id)
}

/// Stops and forgets every recorded task of `pipeline_id`.
///
/// Returns the number of tasks stopped.
///
/// # Errors
///
/// The first failing query, stop or delete aborts the loop and is returned.
pub async fn stop_all_tasks(
    config: &DispatcherConfig,
    platform: &dyn ComputePlatform,
    store: &dyn PipelineTaskStore,
    pipeline_id: &PipelineId,
) -> ActionResult<usize> {
    let records = store.query(pipeline_id).await?;
    debug!(%pipeline_id, count = records.len(), "found recorded tasks");

    for record in &records {
        platform
            .stop_task(&config.cluster_name, &record.task_id)
            .await?;
        store.delete(record).await?;
        info!(%pipeline_id, task_id = %record.task_id, "stopped task");
    }

    Ok(records.len())
}
