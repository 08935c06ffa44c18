//! Classification of failed transport calls.
//!
//! When a fetch or size probe fails, the error is mapped to a [`Disposition`]:
//! - [`Disposition::Skip`] - a known, permanent and harmless remote condition;
//!   the target is logged and left out, the book continues
//! - [`Disposition::Fatal`] - anything that could be transient or indicate a
//!   data-integrity problem; the book (and the run) is aborted
//! - [`Disposition::Refetch`] - probe only: the size check could not be made,
//!   fall back to a full fetch
//!
//! # Example
//!
//! ```
//! use miflib_core::download::{Disposition, DownloadError, Phase, SkipReason, classify_error};
//!
//! let error = DownloadError::http_status("https://example.com/a.mp3", 404, "");
//! assert_eq!(
//!     classify_error(&error, Phase::Fetch),
//!     Disposition::Skip(SkipReason::NotFound)
//! );
//! ```

use std::fmt;

use tracing::instrument;

use super::DownloadError;

/// Which transport call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Metadata-only size probe made by the idempotency gate.
    Probe,
    /// Full body download.
    Fetch,
}

/// Why a target was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The redirect chain was cut off at the hop limit.
    RedirectLoop,
    /// The server answered 404.
    NotFound,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RedirectLoop => f.write_str("redirect loop"),
            Self::NotFound => f.write_str("not found"),
        }
    }
}

/// What to do with a failed transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Abort the book and the run.
    Fatal,
    /// Log a warning and continue without this target.
    Skip(SkipReason),
    /// Ignore the failed probe and download the body.
    Refetch,
}

/// Classifies a transport error into a disposition.
///
/// Rules, first match wins:
///
/// | Error | Fetch | Probe |
/// |-------|-------|-------|
/// | TooManyRedirects | Skip | Skip |
/// | HttpStatus 404 | Skip | Skip |
/// | NotAuthenticated | Fatal | Fatal |
/// | anything else | Fatal | Refetch |
#[instrument(level = "trace")]
pub fn classify_error(error: &DownloadError, phase: Phase) -> Disposition {
    match error {
        DownloadError::TooManyRedirects { .. } => Disposition::Skip(SkipReason::RedirectLoop),
        DownloadError::HttpStatus { status: 404, .. } => Disposition::Skip(SkipReason::NotFound),
        DownloadError::NotAuthenticated => Disposition::Fatal,
        _ => match phase {
            Phase::Fetch => Disposition::Fatal,
            Phase::Probe => Disposition::Refetch,
        },
    }
}
