// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blocking-pool offload for CPU-bound raster and PDF work.

use docsift_core::error::{DocsiftError, Result};

/// Run `work` on tokio's blocking pool and flatten the join error into
/// [`DocsiftError::Task`].
pub(crate) async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| DocsiftError::Task(format!("blocking task did not finish: {err}")))?
}
