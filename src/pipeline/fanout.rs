//! Concurrent download of one book's resource groups.
//!
//! Each enabled [`ResourceGroup`] runs as its own task and walks its targets
//! one at a time. A classified skip (404, redirect cycle) only drops the one
//! file. Any other failure cancels the sibling groups before their next
//! transfer and is returned once every group has stopped; files that other
//! groups already wrote stay on disk.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::error::{PipelineError, keep_first_failure};
use super::stats::PipelineStats;
use crate::book::Book;
use crate::download::{
    Disposition, DownloadError, DownloadTarget, GateDecision, Phase, Transport,
    audiobook_targets, classify_error, cover_targets, demo_targets, ebook_targets, gate,
    photo_targets,
};

/// A category of downloadable resources of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceGroup {
    Audiobook,
    Ebook,
    Cover,
    Demo,
    Photos,
}

impl ResourceGroup {
    /// Every group, in the order they are started.
    pub const ALL: [Self; 5] = [
        Self::Audiobook,
        Self::Ebook,
        Self::Cover,
        Self::Demo,
        Self::Photos,
    ];

    /// Returns the string representation of the group.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audiobook => "audiobook",
            Self::Ebook => "ebook",
            Self::Cover => "cover",
            Self::Demo => "demo",
            Self::Photos => "photos",
        }
    }

    /// The files of this group for `book`, stored under `book_dir`.
    #[must_use]
    pub fn targets(self, book: &Book, book_dir: &Path) -> Vec<DownloadTarget> {
        match self {
            Self::Audiobook => audiobook_targets(book, book_dir),
            Self::Ebook => ebook_targets(book, book_dir),
            Self::Cover => cover_targets(book, book_dir),
            Self::Demo => demo_targets(book, book_dir),
            Self::Photos => photo_targets(book, book_dir),
        }
    }
}

impl fmt::Display for ResourceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ResourceGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audiobook" | "audio" => Ok(Self::Audiobook),
            "ebook" | "e-book" => Ok(Self::Ebook),
            "cover" | "covers" => Ok(Self::Cover),
            "demo" => Ok(Self::Demo),
            "photos" | "photo" => Ok(Self::Photos),
            _ => Err(format!(
                "invalid resource group: {s} (expected one of audiobook, ebook, cover, demo, photos)"
            )),
        }
    }
}

/// Downloads every enabled group of `book` into `book_dir`.
///
/// # Errors
///
/// Returns the first fatal error of any group, or
/// [`PipelineError::Cancelled`] when `cancel` fired before all groups
/// finished.
#[instrument(skip_all, fields(book_id = book.id))]
pub async fn download_book(
    transport: &Arc<dyn Transport>,
    book: Arc<Book>,
    book_dir: &Path,
    groups: &[ResourceGroup],
    cancel: &CancellationToken,
    stats: &Arc<PipelineStats>,
) -> Result<(), PipelineError> {
    let group_cancel = cancel.child_token();
    let mut tasks = JoinSet::new();
    for &group in groups {
        tasks.spawn(run_group(
            group,
            Arc::clone(transport),
            Arc::clone(&book),
            book_dir.to_path_buf(),
            group_cancel.clone(),
            Arc::clone(stats),
        ));
    }

    let mut failure = None;
    while let Some(joined) = tasks.join_next().await {
        if let Err(error) = joined.map_err(PipelineError::from).and_then(|result| result) {
            group_cancel.cancel();
            keep_first_failure(&mut failure, error);
        }
    }
    failure.map_or(Ok(()), Err)
}

async fn run_group(
    group: ResourceGroup,
    transport: Arc<dyn Transport>,
    book: Arc<Book>,
    book_dir: PathBuf,
    cancel: CancellationToken,
    stats: Arc<PipelineStats>,
) -> Result<(), PipelineError> {
    let targets = group.targets(&book, &book_dir);
    debug!(book_id = book.id, %group, targets = targets.len(), "group started");
    for target in targets {
        if cancel.is_cancelled() {
            debug!(book_id = book.id, %group, "group cancelled");
            return Err(PipelineError::Cancelled);
        }
        download_target(transport.as_ref(), &target, &stats)
            .await
            .inspect_err(|error| warn!(book_id = book.id, %group, url = %target.url, %error, "group failed"))?;
    }
    Ok(())
}

/// Brings one target up to date, absorbing classified skips.
async fn download_target(
    transport: &dyn Transport,
    target: &DownloadTarget,
    stats: &PipelineStats,
) -> Result<(), DownloadError> {
    match gate::check(transport, target).await? {
        GateDecision::Satisfied => {
            debug!(path = %target.path.display(), "already up to date");
            stats.increment_files_up_to_date();
            return Ok(());
        }
        GateDecision::Skip(reason) => {
            warn!(url = %target.url, %reason, "skipping file");
            stats.increment_files_skipped();
            return Ok(());
        }
        GateDecision::Fetch => {}
    }

    match transport.fetch(&target.url, &target.path).await {
        Ok(bytes) => {
            stats.record_download(bytes);
            Ok(())
        }
        Err(error) => match classify_error(&error, Phase::Fetch) {
            Disposition::Skip(reason) => {
                warn!(url = %target.url, %reason, %error, "skipping file");
                stats.increment_files_skipped();
                Ok(())
            }
            Disposition::Fatal | Disposition::Refetch => Err(error),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::book::Address;

    /// Writes the URL as the body, or fails with the mapped status.
    #[derive(Default)]
    struct StatusStub {
        statuses: HashMap<String, u16>,
        fetched: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for StatusStub {
        async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, DownloadError> {
            self.fetched.lock().unwrap().push(url.to_string());
            if let Some(&status) = self.statuses.get(url) {
                return Err(DownloadError::http_status(url, status, ""));
            }
            std::fs::create_dir_all(destination.parent().unwrap()).unwrap();
            std::fs::write(destination, url).unwrap();
            Ok(url.len() as u64)
        }

        async fn content_length(&self, _url: &str) -> Result<Option<u64>, DownloadError> {
            Ok(None)
        }
    }

    fn book() -> Book {
        let mut book = Book {
            id: 3,
            title: "Title".into(),
            ..Book::default()
        };
        book.files
            .ebook
            .insert("pdf".into(), vec![Address::new("https://h/3.pdf")].into());
        book.files
            .demo
            .insert("pdf".into(), vec![Address::new("https://h/3-demo.pdf")].into());
        book.cover.large = "https://h/large.jpg".into();
        book
    }

    #[test]
    fn test_resource_group_as_str() {
        assert_eq!(ResourceGroup::Audiobook.as_str(), "audiobook");
        assert_eq!(ResourceGroup::Ebook.as_str(), "ebook");
        assert_eq!(ResourceGroup::Photos.to_string(), "photos");
    }

    #[test]
    fn test_resource_group_from_str_valid() {
        assert_eq!("ebook".parse::<ResourceGroup>(), Ok(ResourceGroup::Ebook));
        assert_eq!("E-Book".parse::<ResourceGroup>(), Ok(ResourceGroup::Ebook));
        assert_eq!(" demo ".parse::<ResourceGroup>(), Ok(ResourceGroup::Demo));
        for group in ResourceGroup::ALL {
            assert_eq!(group.as_str().parse::<ResourceGroup>(), Ok(group));
        }
    }

    #[test]
    fn test_resource_group_from_str_invalid() {
        let err = "videos".parse::<ResourceGroup>().unwrap_err();
        assert!(err.contains("invalid resource group: videos"));
    }

    #[tokio::test]
    async fn test_download_book_fetches_enabled_groups_only() {
        let dir = TempDir::new().unwrap();
        let stub = Arc::new(StatusStub::default());
        let transport: Arc<dyn Transport> = stub.clone();
        let stats = Arc::new(PipelineStats::new());

        download_book(
            &transport,
            Arc::new(book()),
            dir.path(),
            &[ResourceGroup::Ebook, ResourceGroup::Cover],
            &CancellationToken::new(),
            &stats,
        )
        .await
        .unwrap();

        let mut fetched = stub.fetched.lock().unwrap().clone();
        fetched.sort();
        assert_eq!(fetched, ["https://h/3.pdf", "https://h/large.jpg"]);
        assert!(dir.path().join("e-book/pdf/Title.pdf").exists());
        assert!(dir.path().join("large.jpg").exists());
        assert_eq!(stats.files_downloaded(), 2);
    }

    #[tokio::test]
    async fn test_download_book_skips_not_found() {
        let dir = TempDir::new().unwrap();
        let stub = Arc::new(StatusStub {
            statuses: HashMap::from([("https://h/3.pdf".to_string(), 404)]),
            ..StatusStub::default()
        });
        let transport: Arc<dyn Transport> = stub;
        let stats = Arc::new(PipelineStats::new());

        download_book(
            &transport,
            Arc::new(book()),
            dir.path(),
            &ResourceGroup::ALL,
            &CancellationToken::new(),
            &stats,
        )
        .await
        .unwrap();

        assert_eq!(stats.files_skipped(), 1);
        assert_eq!(stats.files_downloaded(), 2);
    }

    #[tokio::test]
    async fn test_download_book_surfaces_fatal_error() {
        let dir = TempDir::new().unwrap();
        let stub = Arc::new(StatusStub {
            statuses: HashMap::from([("https://h/3-demo.pdf".to_string(), 500)]),
            ..StatusStub::default()
        });
        let transport: Arc<dyn Transport> = stub;

        let result = download_book(
            &transport,
            Arc::new(book()),
            dir.path(),
            &ResourceGroup::ALL,
            &CancellationToken::new(),
            &Arc::new(PipelineStats::new()),
        )
        .await;

        match result {
            Err(PipelineError::Download(error)) => assert_eq!(error.status(), Some(500)),
            other => panic!("Expected download error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_download_book_cancelled_before_start() {
        let dir = TempDir::new().unwrap();
        let stub = Arc::new(StatusStub::default());
        let transport: Arc<dyn Transport> = stub.clone();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = download_book(
            &transport,
            Arc::new(book()),
            dir.path(),
            &ResourceGroup::ALL,
            &cancel,
            &Arc::new(PipelineStats::new()),
        )
        .await;

        assert!(matches!(result, Err(PipelineError::Cancelled)));
        assert!(stub.fetched.lock().unwrap().is_empty());
    }
}
