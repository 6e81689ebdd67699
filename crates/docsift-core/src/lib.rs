// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docsift-core: types, configuration, errors, and job progress shared by
// every crate in the workspace.

pub mod config;
pub mod error;
pub mod logging;
pub mod progress;
pub mod types;

pub use config::PipelineConfig;
pub use error::{DocsiftError, Result};
pub use progress::{
    InMemoryJobStore, JobStore, NoProgress, ProgressSink, ScaledProgress, next_progress,
};
pub use types::*;
