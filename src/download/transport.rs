//! Seams between the download pipeline and the network.
//!
//! The pipeline only talks to the library service through these traits, so
//! tests can drive it with an in-memory implementation.

use std::path::Path;

use async_trait::async_trait;

use super::error::DownloadError;
use crate::book::Book;

/// Byte transfer from a URL to a local file.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Downloads `url` into `destination`, returning the number of bytes written.
    ///
    /// Missing parent directories are created and an existing file is
    /// overwritten. A partially written file is removed when the transfer
    /// fails mid-stream.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] describing the transport or local failure.
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, DownloadError>;

    /// Asks the server for the size of `url` without transferring the body.
    ///
    /// `Ok(None)` means the server answered but did not report a length.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] when the probe itself fails.
    async fn content_length(&self, url: &str) -> Result<Option<u64>, DownloadError>;
}

/// Source of catalog records.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Lists every book available to the signed-in account.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] when the listing cannot be retrieved or decoded.
    async fn list_books(&self) -> Result<Vec<Book>, DownloadError>;
}
