//! Error types for the record pipeline.

use std::path::PathBuf;

use thiserror::Error;

use super::MIN_WORKERS;
use crate::download::DownloadError;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A transfer failed in a way that is not safe to skip.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// A book directory, metadata file or marker could not be written.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The metadata of a book could not be encoded.
    #[error("cannot encode metadata of book {book_id}: {source}")]
    Metadata {
        book_id: u64,
        #[source]
        source: serde_json::Error,
    },

    /// The run was stopped before every record was processed.
    #[error("run cancelled")]
    Cancelled,

    /// Invalid worker count provided.
    #[error("invalid worker count {value}: must be at least {min}", min = MIN_WORKERS)]
    InvalidWorkers { value: usize },

    /// A worker or group task panicked or was aborted.
    #[error("task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl PipelineError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error only reports a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Keeps the most informative of several task errors.
///
/// A real failure wins over `Cancelled`, which sibling tasks report once the
/// failure has cancelled them.
pub(crate) fn keep_first_failure(slot: &mut Option<PipelineError>, error: PipelineError) {
    match slot {
        None => *slot = Some(error),
        Some(existing) if existing.is_cancelled() && !error.is_cancelled() => *slot = Some(error),
        Some(_) => {}
    }
}
