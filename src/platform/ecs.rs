//! Amazon ECS (Fargate) compute platform.
//!
//! This module is only compiled when the `aws` feature is enabled. It maps
//! the three [`ComputePlatform`] operations to `ListTaskDefinitions`,
//! `RunTask` and `StopTask`.

use async_trait::async_trait;
use aws_sdk_ecs::error::DisplayErrorContext;
use aws_sdk_ecs::types::{
    AssignPublicIp, AwsVpcConfiguration, LaunchType, NetworkConfiguration, SortOrder,
    TaskDefinitionStatus,
};
use aws_sdk_ecs::Client;

use super::{ComputePlatform, NetworkPlacement, PlatformError, PlatformResult, RunTaskRequest};

/// ECS platform launching tasks on Fargate.
///
/// # Examples
///
/// ```rust,no_run
/// use ci_task_dispatcher::platform::EcsPlatform;
///
/// # async fn example() {
/// let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
/// let platform = EcsPlatform::from_conf(&config);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EcsPlatform {
    client: Client,
}

impl EcsPlatform {
    /// Creates a platform with a pre-built ECS client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a platform from a loaded AWS SDK configuration.
    pub fn from_conf(config: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(config))
    }
}

/// Maps an AWS SDK error to a [`PlatformError::Backend`].
fn map_sdk_error(
    operation: &'static str,
    err: impl std::error::Error + Send + Sync + 'static,
) -> PlatformError {
    PlatformError::Backend {
        operation,
        message: DisplayErrorContext(&err).to_string(),
        source: Some(Box::new(err)),
    }
}

fn awsvpc(network: &NetworkPlacement) -> PlatformResult<NetworkConfiguration> {
    let assign_public_ip = if network.assign_public_ip {
        AssignPublicIp::Enabled
    } else {
        AssignPublicIp::Disabled
    };
    let vpc = AwsVpcConfiguration::builder()
        .set_subnets(Some(network.subnets.clone()))
        .security_groups(network.security_group.clone())
        .assign_public_ip(assign_public_ip)
        .build()
        .map_err(|e| map_sdk_error("RunTask", e))?;

    Ok(NetworkConfiguration::builder()
        .awsvpc_configuration(vpc)
        .build())
}

#[async_trait]
impl ComputePlatform for EcsPlatform {
    /// Only the newest revision is fetched; the returned list holds at most
    /// one ARN.
    async fn list_active_task_definitions(&self, family: &str) -> PlatformResult<Vec<String>> {
        let output = self
            .client
            .list_task_definitions()
            .family_prefix(family)
            .status(TaskDefinitionStatus::Active)
            .sort(SortOrder::Desc)
            .max_results(1)
            .send()
            .await
            .map_err(|e| map_sdk_error("ListTaskDefinitions", e))?;

        Ok(output.task_definition_arns().to_vec())
    }

    async fn run_task(&self, request: &RunTaskRequest) -> PlatformResult<String> {
        let output = self
            .client
            .run_task()
            .cluster(&request.cluster)
            .task_definition(&request.task_definition)
            .launch_type(LaunchType::Fargate)
            .count(1)
            .network_configuration(awsvpc(&request.network)?)
            .send()
            .await
            .map_err(|e| map_sdk_error("RunTask", e))?;

        if let Some(arn) = output.tasks().first().and_then(|t| t.task_arn()) {
            return Ok(arn.to_string());
        }

        let reason = output
            .failures()
            .iter()
            .map(|f| {
                format!(
                    "{}: {}",
                    f.arn().unwrap_or("-"),
                    f.reason().unwrap_or("unknown")
                )
            })
            .collect::<Vec<_>>()
            .join("; ");
        Err(PlatformError::NoTaskLaunched {
            task_definition: request.task_definition.clone(),
            reason,
        })
    }

    async fn stop_task(&self, cluster: &str, task_id: &str) -> PlatformResult<()> {
        self.client
            .stop_task()
            .cluster(cluster)
            .task(task_id)
            .send()
            .await
            .map_err(|e| map_sdk_error("StopTask", e))?;
        Ok(())
    }
}
