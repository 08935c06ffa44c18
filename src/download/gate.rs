//! Decides whether a file already on disk can be kept.

use tracing::{debug, instrument};

use super::classify::{Disposition, Phase, SkipReason, classify_error};
use super::error::DownloadError;
use super::target::DownloadTarget;
use super::transport::Transport;

/// Outcome of the presence check for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The local file matches the remote size; nothing to transfer.
    Satisfied,
    /// Download the body, overwriting any local file.
    Fetch,
    /// The probe hit a skippable remote condition.
    Skip(SkipReason),
}

/// Checks whether `target` is already fully present.
///
/// Only a target with a declared size is probed, and only when a file exists
/// at its path. The file is kept when the server reports the same length as
/// the local file; any other answer leads to a full fetch. Sizes are the only
/// evidence, contents are not compared.
///
/// # Errors
///
/// Returns the probe error when it is fatal, and an I/O error when the local
/// file cannot be inspected.
#[instrument(skip(transport, target), fields(path = %target.path.display()))]
pub async fn check(
    transport: &dyn Transport,
    target: &DownloadTarget,
) -> Result<GateDecision, DownloadError> {
    let local_size = match tokio::fs::metadata(&target.path).await {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => return Ok(GateDecision::Fetch),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(GateDecision::Fetch),
        Err(e) => return Err(DownloadError::io(target.path.clone(), e)),
    };

    if target.expected_size.is_none() {
        debug!("no declared size, refetching");
        return Ok(GateDecision::Fetch);
    }

    match transport.content_length(&target.url).await {
        Ok(Some(remote_size)) if remote_size == local_size => Ok(GateDecision::Satisfied),
        Ok(remote_size) => {
            debug!(local_size, ?remote_size, "size mismatch, refetching");
            Ok(GateDecision::Fetch)
        }
        Err(error) => match classify_error(&error, Phase::Probe) {
            Disposition::Skip(reason) => Ok(GateDecision::Skip(reason)),
            Disposition::Refetch => {
                debug!(error = %error, "size probe failed, refetching");
                Ok(GateDecision::Fetch)
            }
            Disposition::Fatal => Err(error),
        },
    }
}
