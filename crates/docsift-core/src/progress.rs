// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job progress tracking.
//
// The pipeline reports completion percentages through the `JobStore` trait.
// Stores must accept concurrent updates for different jobs; for any single job
// the recorded percentage never decreases and only reaches 100 on success.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, instrument};

use crate::error::{DocsiftError, Result};
use crate::types::{JobId, JobRecord, JobStatus};

/// Highest percentage a running job may report.
pub const MAX_RUNNING_PROGRESS: u8 = 99;

/// Compute the value to store when a stage proposes `proposed` while the job
/// sits at `current`: rounded, capped at 99, and never below `current`.
pub fn next_progress(current: u8, proposed: f32) -> u8 {
    let rounded = if proposed.is_finite() {
        proposed.round().clamp(0.0, MAX_RUNNING_PROGRESS as f32) as u8
    } else {
        0
    };
    current.max(rounded)
}

/// Keyed job records with monotonic progress updates.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Register a new job in the `Queued` state. An id that is already known
    /// keeps its record, which is returned unchanged.
    async fn create(&self, id: JobId) -> Result<JobRecord>;

    /// Mark a job `Running`, registering it first if it is unknown.
    async fn start(&self, id: JobId) -> Result<()>;

    async fn get(&self, id: JobId) -> Result<Option<JobRecord>>;

    /// Apply [`next_progress`] and return the stored value. Writes only when
    /// the value changes.
    async fn advance_progress(&self, id: JobId, proposed: f32) -> Result<u8>;

    /// Record success: status `Succeeded`, progress 100.
    async fn complete(&self, id: JobId) -> Result<()>;

    /// Record a fatal error. Progress is left where it was.
    async fn fail(&self, id: JobId, message: &str) -> Result<()>;
}

/// Receiver of completion percentages from a single stage.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, percent: f32);
}

/// Sink that drops every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

#[async_trait]
impl ProgressSink for NoProgress {
    async fn report(&self, _percent: f32) {}
}

/// Maps a child stage's own 0–100 scale onto `start..=start + span` of its
/// parent.
pub struct ScaledProgress<'a> {
    parent: &'a dyn ProgressSink,
    start: f32,
    span: f32,
}

impl<'a> ScaledProgress<'a> {
    pub fn new(parent: &'a dyn ProgressSink, start: f32, span: f32) -> Self {
        Self {
            parent,
            start,
            span,
        }
    }
}

#[async_trait]
impl ProgressSink for ScaledProgress<'_> {
    async fn report(&self, percent: f32) {
        let fraction = percent.clamp(0.0, 100.0) / 100.0;
        self.parent.report(self.start + self.span * fraction).await;
    }
}

/// Process-local [`JobStore`] backed by a mutex-guarded map.
///
/// Cloning is cheap and every clone shares the same records. Records stay
/// until [`InMemoryJobStore::remove`] drops them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobStore {
    jobs: Arc<Mutex<HashMap<JobId, JobRecord>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked jobs.
    pub fn len(&self) -> usize {
        self.lock().map(|jobs| jobs.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget a finished job, returning its last record.
    pub fn remove(&self, id: JobId) -> Result<Option<JobRecord>> {
        Ok(self.lock()?.remove(&id))
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<JobId, JobRecord>>> {
        self.jobs
            .lock()
            .map_err(|_| DocsiftError::Task("job store lock poisoned".into()))
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    #[instrument(skip(self), fields(job_id = %id))]
    async fn create(&self, id: JobId) -> Result<JobRecord> {
        let mut jobs = self.lock()?;
        if let Some(existing) = jobs.get(&id) {
            debug!("job already registered");
            return Ok(existing.clone());
        }
        let record = JobRecord::new(id);
        jobs.insert(id, record.clone());
        debug!("job registered");
        Ok(record)
    }

    async fn start(&self, id: JobId) -> Result<()> {
        let mut jobs = self.lock()?;
        let record = jobs.entry(id).or_insert_with(|| JobRecord::new(id));
        record.status = JobStatus::Running;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<JobRecord>> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn advance_progress(&self, id: JobId, proposed: f32) -> Result<u8> {
        let mut jobs = self.lock()?;
        let record = jobs
            .get_mut(&id)
            .ok_or_else(|| DocsiftError::JobNotFound(id.to_string()))?;

        let next = next_progress(record.progress, proposed);
        if next != record.progress {
            record.progress = next;
            record.updated_at = Utc::now();
            debug!(job_id = %id, progress = next, "job progress advanced");
        }
        Ok(record.progress)
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn complete(&self, id: JobId) -> Result<()> {
        let mut jobs = self.lock()?;
        let record = jobs
            .get_mut(&id)
            .ok_or_else(|| DocsiftError::JobNotFound(id.to_string()))?;
        record.status = JobStatus::Succeeded;
        record.progress = 100;
        record.updated_at = Utc::now();
        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn fail(&self, id: JobId, message: &str) -> Result<()> {
        let mut jobs = self.lock()?;
        let record = jobs
            .get_mut(&id)
            .ok_or_else(|| DocsiftError::JobNotFound(id.to_string()))?;
        record.status = JobStatus::Failed;
        record.error_message = Some(message.to_owned());
        record.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_progress_never_regresses() {
        assert_eq!(next_progress(40, 10.0), 40);
        assert_eq!(next_progress(40, 40.4), 40);
        assert_eq!(next_progress(40, 40.6), 41);
    }

    #[test]
    fn next_progress_caps_below_completion() {
        assert_eq!(next_progress(0, 150.0), 99);
        assert_eq!(next_progress(0, -5.0), 0);
        assert_eq!(next_progress(12, f32::NAN), 12);
    }

    #[tokio::test]
    async fn progress_is_monotonic_and_completes_at_100() {
        let store = InMemoryJobStore::new();
        let id = JobId::new();
        store.create(id).await.unwrap();
        store.start(id).await.unwrap();

        let mut seen = Vec::new();
        for proposed in [5.0, 30.0, 12.0, 64.5, 64.0, 120.0, 98.0] {
            seen.push(store.advance_progress(id, proposed).await.unwrap());
        }
        assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]), "{seen:?}");
        assert_eq!(seen.last(), Some(&99));

        store.complete(id).await.unwrap();
        let record = store.get(id).await.unwrap().unwrap();
        assert_eq!(record.progress, 100);
        assert_eq!(record.status, JobStatus::Succeeded);
    }

    #[tokio::test]
    async fn recreating_a_job_keeps_its_progress() {
        let store = InMemoryJobStore::new();
        let id = JobId::new();
        store.create(id).await.unwrap();
        store.start(id).await.unwrap();
        store.advance_progress(id, 60.0).await.unwrap();

        let again = store.create(id).await.unwrap();
        assert_eq!(again.progress, 60);
        assert_eq!(again.status, JobStatus::Running);
        assert_eq!(store.get(id).await.unwrap().unwrap().progress, 60);
    }

    #[tokio::test]
    async fn removed_jobs_are_forgotten() {
        let store = InMemoryJobStore::new();
        let id = JobId::new();
        store.start(id).await.unwrap();
        store.complete(id).await.unwrap();

        let removed = store.remove(id).unwrap().unwrap();
        assert_eq!(removed.progress, 100);
        assert!(store.is_empty());
        assert!(store.remove(id).unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_job_is_reported() {
        let store = InMemoryJobStore::new();
        let err = store.advance_progress(JobId::new(), 10.0).await.unwrap_err();
        assert!(matches!(err, DocsiftError::JobNotFound(_)));
    }

    #[tokio::test]
    async fn fail_keeps_progress_and_records_message() {
        let store = InMemoryJobStore::new();
        let id = JobId::new();
        store.start(id).await.unwrap();
        store.advance_progress(id, 42.0).await.unwrap();
        store.fail(id, "unreadable document bytes").await.unwrap();

        let record = store.get(id).await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.progress, 42);
        assert_eq!(record.error_message.as_deref(), Some("unreadable document bytes"));
    }

    #[derive(Default)]
    struct Recorded(Mutex<Vec<f32>>);

    #[async_trait]
    impl ProgressSink for Recorded {
        async fn report(&self, percent: f32) {
            self.0.lock().unwrap().push(percent);
        }
    }

    #[tokio::test]
    async fn scaled_progress_maps_into_parent_span() {
        let parent = Recorded::default();
        let child = ScaledProgress::new(&parent, 70.0, 10.0);
        child.report(0.0).await;
        child.report(50.0).await;
        child.report(250.0).await;
        assert_eq!(*parent.0.lock().unwrap(), vec![70.0, 75.0, 80.0]);
    }

    #[tokio::test]
    async fn concurrent_jobs_do_not_interfere() {
        let store = InMemoryJobStore::new();
        let (a, b) = (JobId::new(), JobId::new());
        store.start(a).await.unwrap();
        store.start(b).await.unwrap();

        let (left, right) = tokio::join!(
            store.advance_progress(a, 70.0),
            store.advance_progress(b, 20.0)
        );
        assert_eq!(left.unwrap(), 70);
        assert_eq!(right.unwrap(), 20);
        assert_eq!(store.len(), 2);
    }
}
