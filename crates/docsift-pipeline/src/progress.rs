// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge from stage-level progress reports to a job store.

use async_trait::async_trait;
use docsift_core::progress::{JobStore, ProgressSink};
use docsift_core::types::JobId;
use tracing::warn;

/// Writes every report for one job into the store.
///
/// Store failures are logged and dropped; progress is advisory and never
/// aborts extraction.
pub struct JobProgress<'a> {
    store: &'a dyn JobStore,
    job_id: JobId,
}

impl<'a> JobProgress<'a> {
    pub fn new(store: &'a dyn JobStore, job_id: JobId) -> Self {
        Self { store, job_id }
    }
}

#[async_trait]
impl ProgressSink for JobProgress<'_> {
    async fn report(&self, percent: f32) {
        if let Err(err) = self.store.advance_progress(self.job_id, percent).await {
            warn!(job_id = %self.job_id, %err, "progress update dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsift_core::progress::InMemoryJobStore;

    #[tokio::test]
    async fn reports_reach_the_store_monotonically() {
        let store = InMemoryJobStore::new();
        let id = JobId::new();
        store.start(id).await.unwrap();

        let progress = JobProgress::new(&store, id);
        progress.report(30.0).await;
        progress.report(10.0).await;
        assert_eq!(store.get(id).await.unwrap().unwrap().progress, 30);
    }

    #[tokio::test]
    async fn unknown_job_is_not_an_error() {
        let store = InMemoryJobStore::new();
        JobProgress::new(&store, JobId::new()).report(50.0).await;
        assert!(store.is_empty());
    }
}
