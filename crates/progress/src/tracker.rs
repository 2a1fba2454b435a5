//! Task tracking service.
//!
//! [`TaskTracker`] owns the in-memory [`Store`] and its [`Storage`] backend.
//! Every mutating call applies the change, recomputes velocity and writes the
//! snapshot before returning:
//!
//! ```text
//! mutate store → recompute velocity → save snapshot
//! ```
//!
//! Mutations take `&mut self`, so one tracker serves one session at a time.
//! Share it between clients behind a single mutex.

use chrono::Utc;
use ebs_core::{Store, Task, TaskUpdate, TimeSegment};
use ebs_storage::Storage;
use tracing::{debug, info, warn};

use crate::analyzer::{Analyzer, Report};
use crate::error::Result;
use crate::estimator::VelocityEstimator;
use crate::predictor::Predictor;

/// The estimation engine bound to a storage backend.
pub struct TaskTracker<S: Storage> {
    storage: S,
    store: Store,
    estimator: VelocityEstimator,
    analyzer: Analyzer,
    dirty: bool,
}

impl<S: Storage> TaskTracker<S> {
    /// Load the snapshot from `storage` and start tracking.
    pub async fn load(storage: S) -> Result<Self> {
        let store = storage.load_store().await?;
        info!(tasks = store.tasks().len(), velocity = store.velocity(), "Loaded task store");
        Ok(Self {
            storage,
            store,
            estimator: VelocityEstimator::new(),
            analyzer: Analyzer::new(),
            dirty: false,
        })
    }

    /// Current in-memory store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// All tasks in display order.
    pub fn tasks(&self) -> &[Task] {
        self.store.tasks()
    }

    /// Look up a task by name.
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.store.task(name)
    }

    /// Current velocity.
    pub fn velocity(&self) -> f64 {
        self.store.velocity()
    }

    /// Whether the in-memory store holds changes the last save did not persist.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the current store. Use this to retry after a failed save.
    pub async fn save(&mut self) -> Result<()> {
        self.storage.save_store(&self.store).await?;
        self.dirty = false;
        Ok(())
    }

    /// Throw away in-memory changes and re-read the snapshot.
    pub async fn reload(&mut self) -> Result<()> {
        self.store = self.storage.load_store().await?;
        self.dirty = false;
        debug!("Reloaded task store");
        Ok(())
    }

    /// Add a new task.
    pub async fn add_task(&mut self, name: &str, estimated_hours: f64) -> Result<Task> {
        let task = self.store.add_task(name, estimated_hours, Utc::now())?.clone();
        info!(task = %task.name(), estimated_hours, "Added task");
        self.commit().await?;
        Ok(task)
    }

    /// Rename a task. Renaming to the current name is a no-op.
    pub async fn rename_task(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if self.store.rename_task(old_name, new_name)? {
            info!(from = %old_name.trim(), to = %new_name.trim(), "Renamed task");
            self.commit().await?;
        }
        Ok(())
    }

    /// Change a task's estimate.
    pub async fn set_estimate(&mut self, name: &str, estimated_hours: f64) -> Result<()> {
        self.store.set_estimate(name, estimated_hours)?;
        info!(task = %name.trim(), estimated_hours, "Changed estimate");
        self.commit().await
    }

    /// Rename and/or re-estimate a task in one step.
    pub async fn modify_task(&mut self, name: &str, update: &TaskUpdate) -> Result<()> {
        if self.store.modify_task(name, update)? {
            info!(task = %name.trim(), ?update, "Modified task");
            self.commit().await?;
        }
        Ok(())
    }

    /// Delete a task with all of its recorded time.
    pub async fn delete_task(&mut self, name: &str) -> Result<Task> {
        let task = self.store.delete_task(name)?;
        info!(task = %task.name(), segments = task.segments().len(), "Deleted task");
        self.commit().await?;
        Ok(task)
    }

    /// Record hours worked on a task.
    pub async fn add_segment(&mut self, name: &str, hours: f64) -> Result<TimeSegment> {
        let segment = self.store.add_segment(name, hours, Utc::now())?;
        info!(task = %name.trim(), hours, "Recorded time");
        self.commit().await?;
        Ok(segment)
    }

    /// Remove one recorded segment (0-based index).
    pub async fn delete_segment(&mut self, name: &str, index: usize) -> Result<TimeSegment> {
        let segment = self.store.delete_segment(name, index, Utc::now())?;
        info!(task = %name.trim(), index, hours = segment.hours, "Deleted time segment");
        self.commit().await?;
        Ok(segment)
    }

    /// Mark a task finished.
    pub async fn finish_task(&mut self, name: &str) -> Result<Task> {
        let task = self.store.finish_task(name, Utc::now())?.clone();
        if task.segments().is_empty() {
            warn!(task = %task.name(), "Finished task has no recorded time; it will not affect velocity");
        }
        info!(task = %task.name(), "Finished task");
        self.commit().await?;
        Ok(task)
    }

    /// Predicted actual hours for `requested_hours` of estimated work.
    pub fn predict(&self, requested_hours: f64) -> Result<f64> {
        Ok(Predictor::from_store(&self.store).predict(requested_hours)?)
    }

    /// Report over the current store.
    pub fn analyze(&self) -> Report<'_> {
        self.analyzer.analyze(&self.store)
    }

    /// Recompute velocity and persist. A failed write keeps the mutation in
    /// memory and leaves the tracker dirty. Recomputing cannot fail, so the
    /// only error after a mutation is the write itself.
    async fn commit(&mut self) -> Result<()> {
        self.dirty = true;
        self.estimator.recompute(&mut self.store);
        self.save().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use async_trait::async_trait;
    use ebs_storage::{JsonStorage, MemoryStorage, StorageError};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Memory storage whose writes can be switched off.
    #[derive(Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        fail: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Storage for FlakyStorage {
        async fn load_store(&self) -> ebs_storage::Result<Store> {
            self.inner.load_store().await
        }

        async fn save_store(&mut self, store: &Store) -> ebs_storage::Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only medium",
                )));
            }
            self.inner.save_store(store).await
        }
    }

    async fn tracker() -> TaskTracker<MemoryStorage> {
        TaskTracker::load(MemoryStorage::new()).await.unwrap()
    }

    #[tokio::test]
    async fn test_velocity_from_two_finished_tasks() {
        let mut tracker = tracker().await;
        tracker.add_task("A", 10.0).await.unwrap();
        tracker.add_task("B", 20.0).await.unwrap();
        tracker.add_segment("A", 5.0).await.unwrap();
        tracker.add_segment("B", 30.0).await.unwrap();
        tracker.add_segment("B", 10.0).await.unwrap();

        // Nothing finished yet.
        assert_eq!(tracker.velocity(), 1.0);

        tracker.finish_task("A").await.unwrap();
        assert_eq!(tracker.velocity(), 2.0);

        tracker.finish_task("B").await.unwrap();
        assert_eq!(tracker.velocity(), 1.25);
        assert_eq!(tracker.predict(10.0).unwrap(), 8.0);

        let saved = tracker.storage().snapshot().unwrap();
        assert_eq!(saved.velocity(), 1.25);
        assert!(!tracker.is_dirty());
    }

    #[tokio::test]
    async fn test_every_mutation_is_saved() {
        let mut tracker = tracker().await;
        tracker.add_task("A", 2.0).await.unwrap();
        tracker.add_segment("A", 1.0).await.unwrap();
        tracker.delete_segment("A", 0).await.unwrap();
        tracker.rename_task("A", "A2").await.unwrap();
        tracker.set_estimate("A2", 3.0).await.unwrap();
        tracker.finish_task("A2").await.unwrap();
        tracker.delete_task("A2").await.unwrap();
        assert_eq!(tracker.storage().saves(), 7);
        assert!(tracker.storage().snapshot().unwrap().tasks().is_empty());
    }

    #[tokio::test]
    async fn test_noop_rename_does_not_save() {
        let mut tracker = tracker().await;
        tracker.add_task("A", 2.0).await.unwrap();
        tracker.rename_task("A", "A").await.unwrap();
        tracker.modify_task("A", &TaskUpdate::default()).await.unwrap();
        assert_eq!(tracker.storage().saves(), 1);
    }

    #[tokio::test]
    async fn test_add_then_delete_leaves_velocity() {
        let mut tracker = tracker().await;
        tracker.add_task("A", 4.0).await.unwrap();
        tracker.add_segment("A", 2.0).await.unwrap();
        tracker.finish_task("A").await.unwrap();
        let before = tracker.store().clone();

        tracker.add_task("tmp", 1.0).await.unwrap();
        tracker.delete_task("tmp").await.unwrap();
        assert_eq!(tracker.store(), &before);
        assert_eq!(tracker.velocity(), 2.0);
    }

    #[tokio::test]
    async fn test_estimate_change_recomputes_velocity() {
        let mut tracker = tracker().await;
        tracker.add_task("A", 4.0).await.unwrap();
        tracker.add_segment("A", 2.0).await.unwrap();
        tracker.finish_task("A").await.unwrap();
        assert_eq!(tracker.velocity(), 2.0);

        tracker
            .modify_task(
                "A",
                &TaskUpdate {
                    new_name: Some("Alpha".to_string()),
                    estimated_hours: Some(1.0),
                },
            )
            .await
            .unwrap();
        assert_eq!(tracker.velocity(), 0.5);
        assert!(tracker.task("Alpha").is_some());
    }

    #[tokio::test]
    async fn test_clearing_completed_ledger() {
        let mut tracker = tracker().await;
        tracker.add_task("A", 10.0).await.unwrap();
        tracker.add_task("B", 20.0).await.unwrap();
        tracker.add_segment("A", 5.0).await.unwrap();
        tracker.add_segment("B", 40.0).await.unwrap();
        tracker.finish_task("A").await.unwrap();
        tracker.finish_task("B").await.unwrap();

        tracker.delete_segment("A", 0).await.unwrap();
        let a = tracker.task("A").unwrap();
        assert!(a.actual_hours().is_none());
        assert!(a.is_completed());
        assert_eq!(tracker.velocity(), 0.5);

        // Removing the last piece of evidence keeps the previous velocity.
        tracker.delete_segment("B", 0).await.unwrap();
        assert_eq!(tracker.velocity(), 0.5);
        assert_eq!(tracker.analyze().avg_velocity, 1.0);
    }

    #[tokio::test]
    async fn test_errors_are_classified() {
        let mut tracker = tracker().await;
        tracker.add_task("A", 1.0).await.unwrap();
        tracker.add_task("B", 1.0).await.unwrap();

        let err = tracker.add_task("A", 2.0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = tracker.add_segment("A", 0.0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = tracker.rename_task("A", "B").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(tracker.task("A").is_some());

        let err = tracker.delete_task("C").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = tracker.delete_segment("A", 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = tracker.predict(-1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        // Rejected operations write nothing.
        assert_eq!(tracker.storage().saves(), 2);
    }

    #[tokio::test]
    async fn test_extreme_hours_rejected_before_mutation() {
        let mut tracker = tracker().await;
        tracker.add_task("A", 1e300).await.unwrap();
        let err = tracker.add_segment("A", 1e-10).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(tracker.task("A").unwrap().segments().is_empty());
        assert_eq!(tracker.storage().saves(), 1);
        assert!(!tracker.is_dirty());

        tracker.add_task("B", 1.0).await.unwrap();
        tracker.add_segment("B", 1e308).await.unwrap();
        let err = tracker.add_segment("B", 1e308).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(tracker.task("B").unwrap().segments().len(), 1);

        // Later mutations still commit normally.
        tracker.finish_task("B").await.unwrap();
        tracker.add_task("C", 2.0).await.unwrap();
        assert_eq!(tracker.storage().saves(), 5);
        assert!(!tracker.is_dirty());
        assert!(tracker.velocity() > 0.0 && tracker.velocity() < 1e-300);
        assert!(tracker.storage().snapshot().unwrap().contains("C"));
    }

    #[tokio::test]
    async fn test_finish_twice_rejected() {
        let mut tracker = tracker().await;
        tracker.add_task("A", 1.0).await.unwrap();
        tracker.finish_task("A").await.unwrap();
        let err = tracker.finish_task("A").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_mutation() {
        let fail = Arc::new(AtomicBool::new(false));
        let storage = FlakyStorage {
            inner: MemoryStorage::new(),
            fail: fail.clone(),
        };
        let mut tracker = TaskTracker::load(storage).await.unwrap();
        tracker.add_task("kept", 2.0).await.unwrap();

        fail.store(true, Ordering::SeqCst);
        let err = tracker.add_task("pending", 3.0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(tracker.task("pending").is_some());
        assert!(tracker.is_dirty());

        fail.store(false, Ordering::SeqCst);
        tracker.save().await.unwrap();
        assert!(!tracker.is_dirty());
        assert!(tracker.storage().inner.snapshot().unwrap().contains("pending"));
    }

    #[tokio::test]
    async fn test_reload_discards_unsaved_change() {
        let fail = Arc::new(AtomicBool::new(false));
        let storage = FlakyStorage {
            inner: MemoryStorage::new(),
            fail: fail.clone(),
        };
        let mut tracker = TaskTracker::load(storage).await.unwrap();
        tracker.add_task("kept", 2.0).await.unwrap();

        fail.store(true, Ordering::SeqCst);
        assert!(tracker.add_segment("kept", 1.0).await.is_err());
        assert_eq!(tracker.task("kept").unwrap().total_hours(), 1.0);

        tracker.reload().await.unwrap();
        assert!(!tracker.is_dirty());
        assert!(tracker.task("kept").unwrap().segments().is_empty());
    }

    #[tokio::test]
    async fn test_json_round_trip_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ebs_data.json");

        {
            let mut tracker = TaskTracker::load(JsonStorage::new(&path)).await.unwrap();
            tracker.add_task("Port CLI", 6.0).await.unwrap();
            tracker.add_segment("Port CLI", 2.0).await.unwrap();
            tracker.add_segment("Port CLI", 2.0).await.unwrap();
            tracker.finish_task("Port CLI").await.unwrap();
            tracker.add_task("Docs", 1.0).await.unwrap();
        }

        let tracker = TaskTracker::load(JsonStorage::new(&path)).await.unwrap();
        assert_eq!(tracker.tasks().len(), 2);
        assert_eq!(tracker.velocity(), 1.5);
        let task = tracker.task("Port CLI").unwrap();
        assert_eq!(task.actual_hours(), Some(4.0));
        assert!(task.is_completed());

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["tasks"][0]["actual_hours"], serde_json::json!(4.0));
        assert!(raw["tasks"][1]["actual_hours"].is_null());
        assert_eq!(raw["velocity"], serde_json::json!(1.5));
    }
}
