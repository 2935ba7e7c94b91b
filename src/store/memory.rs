//! In-memory pipeline task store.
//!
//! [`InMemoryPipelineTaskStore`] keeps records in a
//! `DashMap<PipelineId, Vec<String>>`, one entry per pipeline holding its
//! task ids in insertion order. It also counts calls per operation and can
//! be told to fail, so tests can assert on what the dispatcher did to the
//! store.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use super::{PipelineTaskRecord, PipelineTaskStore, StorageError, StorageResult};
use crate::event::PipelineId;

/// Call counters for an [`InMemoryPipelineTaskStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    /// `put` calls.
    pub puts: usize,
    /// `query` calls.
    pub queries: usize,
    /// `delete` calls.
    pub deletes: usize,
}

impl StoreCalls {
    /// Sum of all calls.
    pub fn total(&self) -> usize {
        self.puts + self.queries + self.deletes
    }
}

/// Thread-safe in-memory store.
///
/// # Examples
///
/// ```
/// use ci_task_dispatcher::store::InMemoryPipelineTaskStore;
///
/// let store = InMemoryPipelineTaskStore::new();
/// assert!(store.is_empty());
/// assert_eq!(store.calls().total(), 0);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryPipelineTaskStore {
    data: DashMap<PipelineId, Vec<String>>,
    calls: Mutex<StoreCalls>,
    fail_puts: Mutex<Option<String>>,
    fail_deletes: Mutex<Option<String>>,
}

impl InMemoryPipelineTaskStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record without counting it as a call.
    pub fn with_record(self, record: PipelineTaskRecord) -> Self {
        insert(&self.data, record);
        self
    }

    /// Makes every `put` fail.
    pub fn fail_puts_with(self, message: impl Into<String>) -> Self {
        *self.fail_puts.lock() = Some(message.into());
        self
    }

    /// Makes every `delete` fail.
    pub fn fail_deletes_with(self, message: impl Into<String>) -> Self {
        *self.fail_deletes.lock() = Some(message.into());
        self
    }

    /// Calls received so far.
    pub fn calls(&self) -> StoreCalls {
        *self.calls.lock()
    }

    /// Number of records across all pipelines.
    pub fn len(&self) -> usize {
        self.data.iter().map(|entry| entry.value().len()).sum()
    }

    /// Returns `true` if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Task ids recorded for `pipeline_id`, in insertion order.
    pub fn task_ids(&self, pipeline_id: &PipelineId) -> Vec<String> {
        self.data
            .get(pipeline_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}

fn insert(data: &DashMap<PipelineId, Vec<String>>, record: PipelineTaskRecord) {
    let mut tasks = data.entry(record.pipeline_id).or_default();
    if !tasks.contains(&record.task_id) {
        tasks.push(record.task_id);
    }
}

#[async_trait]
impl PipelineTaskStore for InMemoryPipelineTaskStore {
    async fn put(&self, record: &PipelineTaskRecord) -> StorageResult<()> {
        self.calls.lock().puts += 1;
        if let Some(message) = self.fail_puts.lock().clone() {
            return Err(StorageError::backend(message, None));
        }
        insert(&self.data, record.clone());
        Ok(())
    }

    async fn query(&self, pipeline_id: &PipelineId) -> StorageResult<Vec<PipelineTaskRecord>> {
        self.calls.lock().queries += 1;
        Ok(self
            .task_ids(pipeline_id)
            .into_iter()
            .map(|task_id| PipelineTaskRecord::new(pipeline_id.clone(), task_id))
            .collect())
    }

    async fn delete(&self, record: &PipelineTaskRecord) -> StorageResult<()> {
        self.calls.lock().deletes += 1;
        if let Some(message) = self.fail_deletes.lock().clone() {
            return Err(StorageError::backend(message, None));
        }
        // The shard guard must be released before `remove_if`.
        if let Some(mut tasks) = self.data.get_mut(&record.pipeline_id) {
            tasks.retain(|t| t != &record.task_id);
        }
        self.data
            .remove_if(&record.pipeline_id, |_, tasks| tasks.is_empty());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(pipeline: &str, task: &str) -> PipelineTaskRecord {
        PipelineTaskRecord::new(PipelineId::new(pipeline), task)
    }

    #[tokio::test]
    async fn query_is_scoped_to_one_pipeline() {
        let store = InMemoryPipelineTaskStore::new();
        store.put(&record("1", "a")).await.unwrap();
        store.put(&record("1", "b")).await.unwrap();
        store.put(&record("2", "c")).await.unwrap();

        let records = store.query(&PipelineId::new("1")).await.unwrap();
        assert_eq!(records, vec![record("1", "a"), record("1", "b")]);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn put_is_idempotent() {
        let store = InMemoryPipelineTaskStore::new();
        store.put(&record("1", "a")).await.unwrap();
        store.put(&record("1", "a")).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.calls().puts, 2);
    }

    #[tokio::test]
    async fn delete_removes_only_the_record() {
        let store = InMemoryPipelineTaskStore::new()
            .with_record(record("1", "a"))
            .with_record(record("1", "b"));
        store.delete(&record("1", "a")).await.unwrap();
        assert_eq!(store.task_ids(&PipelineId::new("1")), vec!["b".to_string()]);

        store.delete(&record("1", "b")).await.unwrap();
        store.delete(&record("1", "missing")).await.unwrap();
        assert!(store.is_empty());
        assert_eq!(store.calls().deletes, 3);
    }

    #[tokio::test]
    async fn injected_failures_leave_data_untouched() {
        let store = InMemoryPipelineTaskStore::new()
            .with_record(record("1", "a"))
            .fail_puts_with("throttled")
            .fail_deletes_with("throttled");
        assert!(store.put(&record("1", "b")).await.is_err());
        assert!(store.delete(&record("1", "a")).await.is_err());
        assert_eq!(store.task_ids(&PipelineId::new("1")), vec!["a".to_string()]);
    }
}
