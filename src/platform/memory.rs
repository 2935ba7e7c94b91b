//! In-memory compute platform.
//!
//! [`InMemoryPlatform`] keeps task definitions per family and a set of
//! running tasks, records every call it receives, and can be told to fail
//! specific operations. It stands in for the real orchestrator in tests and
//! local runs.

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{ComputePlatform, PlatformError, PlatformResult, RunTaskRequest};

/// A recorded `StopTask` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopCall {
    /// Cluster passed to the call.
    pub cluster: String,
    /// Task passed to the call.
    pub task_id: String,
}

/// Recording, failure-injectable compute platform.
///
/// # Examples
///
/// ```
/// use ci_task_dispatcher::platform::InMemoryPlatform;
///
/// let platform = InMemoryPlatform::new()
///     .with_task_definition("runner", "arn:aws:ecs:eu-west-1:1:task-definition/runner:1")
///     .with_task_definition("runner", "arn:aws:ecs:eu-west-1:1:task-definition/runner:2");
/// assert!(platform.run_calls().is_empty());
/// assert!(platform.running_tasks().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryPlatform {
    /// Definitions per family, oldest revision first.
    definitions: DashMap<String, Vec<String>>,
    running: Mutex<Vec<String>>,
    run_calls: Mutex<Vec<RunTaskRequest>>,
    stop_calls: Mutex<Vec<StopCall>>,
    list_calls: Mutex<usize>,
    fail_list: Mutex<Option<String>>,
    fail_run: Mutex<Option<String>>,
    fail_stop: Mutex<HashSet<String>>,
}

impl InMemoryPlatform {
    /// Creates a platform with no definitions and no tasks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the next (higher) revision of `family`.
    pub fn with_task_definition(self, family: impl Into<String>, arn: impl Into<String>) -> Self {
        self.definitions
            .entry(family.into())
            .or_default()
            .push(arn.into());
        self
    }

    /// Marks a task as already running, e.g. one launched by an earlier
    /// invocation.
    pub fn with_running_task(self, task_id: impl Into<String>) -> Self {
        self.running.lock().push(task_id.into());
        self
    }

    /// Makes `ListTaskDefinitions` fail.
    pub fn fail_list_with(self, message: impl Into<String>) -> Self {
        *self.fail_list.lock() = Some(message.into());
        self
    }

    /// Makes `RunTask` fail.
    pub fn fail_run_with(self, message: impl Into<String>) -> Self {
        *self.fail_run.lock() = Some(message.into());
        self
    }

    /// Makes `StopTask` fail for one task.
    pub fn fail_stop_for(self, task_id: impl Into<String>) -> Self {
        self.fail_stop.lock().insert(task_id.into());
        self
    }

    /// Every `RunTask` request received, in order.
    pub fn run_calls(&self) -> Vec<RunTaskRequest> {
        self.run_calls.lock().clone()
    }

    /// Every `StopTask` call received, in order.
    pub fn stop_calls(&self) -> Vec<StopCall> {
        self.stop_calls.lock().clone()
    }

    /// Number of `ListTaskDefinitions` calls received.
    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock()
    }

    /// Tasks currently running.
    pub fn running_tasks(&self) -> Vec<String> {
        self.running.lock().clone()
    }

    /// Total calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.list_calls() + self.run_calls.lock().len() + self.stop_calls.lock().len()
    }
}

#[async_trait]
impl ComputePlatform for InMemoryPlatform {
    async fn list_active_task_definitions(&self, family: &str) -> PlatformResult<Vec<String>> {
        *self.list_calls.lock() += 1;
        if let Some(message) = self.fail_list.lock().clone() {
            return Err(PlatformError::backend("ListTaskDefinitions", message));
        }

        Ok(self
            .definitions
            .get(family)
            .map(|revisions| revisions.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn run_task(&self, request: &RunTaskRequest) -> PlatformResult<String> {
        self.run_calls.lock().push(request.clone());
        if let Some(message) = self.fail_run.lock().clone() {
            return Err(PlatformError::backend("RunTask", message));
        }

        let task_arn = format!(
            "arn:aws:ecs:local:000000000000:task/{}/{}",
            request.cluster,
            Uuid::new_v4().simple()
        );
        self.running.lock().push(task_arn.clone());
        Ok(task_arn)
    }

    async fn stop_task(&self, cluster: &str, task_id: &str) -> PlatformResult<()> {
        self.stop_calls.lock().push(StopCall {
            cluster: cluster.to_string(),
            task_id: task_id.to_string(),
        });
        if self.fail_stop.lock().contains(task_id) {
            return Err(PlatformError::backend(
                "StopTask",
                format!("cannot stop {task_id}"),
            ));
        }

        // Stopping an unknown or already stopped task succeeds, as it does on ECS.
        self.running.lock().retain(|t| t != task_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::NetworkPlacement;

    fn request() -> RunTaskRequest {
        RunTaskRequest {
            cluster: "ci".to_string(),
            task_definition: "runner:2".to_string(),
            network: NetworkPlacement::private(vec!["subnet-a".to_string()], "sg-1"),
        }
    }

    #[tokio::test]
    async fn lists_newest_revision_first() {
        let platform = InMemoryPlatform::new()
            .with_task_definition("runner", "runner:1")
            .with_task_definition("runner", "runner:2")
            .with_task_definition("other", "other:9");
        let arns = platform.list_active_task_definitions("runner").await.unwrap();
        assert_eq!(arns, vec!["runner:2".to_string(), "runner:1".to_string()]);
        assert!(platform
            .list_active_task_definitions("missing")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn run_then_stop_tracks_running_tasks() {
        let platform = InMemoryPlatform::new();
        let arn = platform.run_task(&request()).await.unwrap();
        assert!(arn.contains("task/ci/"));
        assert_eq!(platform.running_tasks(), vec![arn.clone()]);

        platform.stop_task("ci", &arn).await.unwrap();
        assert!(platform.running_tasks().is_empty());
        assert_eq!(platform.stop_calls().len(), 1);
        assert_eq!(platform.total_calls(), 2);
    }

    #[tokio::test]
    async fn injected_failures_are_reported() {
        let platform = InMemoryPlatform::new()
            .fail_run_with("capacity")
            .fail_stop_for("t-1")
            .with_running_task("t-1");
        let err = platform.run_task(&request()).await.unwrap_err();
        assert!(err.to_string().contains("RunTask"));
        assert!(platform.stop_task("ci", "t-1").await.is_err());
        assert_eq!(platform.running_tasks(), vec!["t-1".to_string()]);
    }
}
