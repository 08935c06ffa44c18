//! Counters for one pipeline run.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Live counters, updated concurrently by workers and group tasks.
#[derive(Debug, Default)]
pub struct PipelineStats {
    books_completed: AtomicUsize,
    books_already_complete: AtomicUsize,
    files_downloaded: AtomicUsize,
    files_up_to_date: AtomicUsize,
    files_skipped: AtomicUsize,
    bytes_downloaded: AtomicU64,
    records_discarded: AtomicUsize,
}

impl PipelineStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Books whose marker was written during this run.
    #[must_use]
    pub fn books_completed(&self) -> usize {
        self.books_completed.load(Ordering::SeqCst)
    }

    /// Books that already had a marker.
    #[must_use]
    pub fn books_already_complete(&self) -> usize {
        self.books_already_complete.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn files_downloaded(&self) -> usize {
        self.files_downloaded.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn files_up_to_date(&self) -> usize {
        self.files_up_to_date.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn files_skipped(&self) -> usize {
        self.files_skipped.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn bytes_downloaded(&self) -> u64 {
        self.bytes_downloaded.load(Ordering::SeqCst)
    }

    /// Records still queued when the run stopped.
    #[must_use]
    pub fn records_discarded(&self) -> usize {
        self.records_discarded.load(Ordering::SeqCst)
    }

    pub(crate) fn increment_books_completed(&self) {
        self.books_completed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_books_already_complete(&self) {
        self.books_already_complete.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_download(&self, bytes: u64) {
        self.files_downloaded.fetch_add(1, Ordering::SeqCst);
        self.bytes_downloaded.fetch_add(bytes, Ordering::SeqCst);
    }

    pub(crate) fn increment_files_up_to_date(&self) {
        self.files_up_to_date.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_files_skipped(&self) {
        self.files_skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn add_records_discarded(&self, count: usize) {
        self.records_discarded.fetch_add(count, Ordering::SeqCst);
    }

    /// A point-in-time copy of all counters.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            books_completed: self.books_completed(),
            books_already_complete: self.books_already_complete(),
            files_downloaded: self.files_downloaded(),
            files_up_to_date: self.files_up_to_date(),
            files_skipped: self.files_skipped(),
            bytes_downloaded: self.bytes_downloaded(),
            records_discarded: self.records_discarded(),
        }
    }
}

/// What a finished run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub books_completed: usize,
    pub books_already_complete: usize,
    pub files_downloaded: usize,
    pub files_up_to_date: usize,
    pub files_skipped: usize,
    pub bytes_downloaded: u64,
    pub records_discarded: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} books downloaded, {} already complete; {} files ({} bytes) downloaded, {} up to date, {} skipped",
            self.books_completed,
            self.books_already_complete,
            self.files_downloaded,
            self.bytes_downloaded,
            self.files_up_to_date,
            self.files_skipped,
        )
    }
}
