//! Worker pool that turns catalog records into book directories.
//!
//! Records arrive on a bounded channel shared by a fixed number of workers.
//! For every record a worker:
//!
//! 1. derives the book directory from the padded id and sanitized title
//! 2. leaves the book alone when its `.downloaded` marker exists
//! 3. downloads the enabled resource groups concurrently
//! 4. writes `book.json`, then the marker
//!
//! The marker is only written after everything else, so an interrupted run
//! is simply repeated: finished books are skipped and files whose size still
//! matches are not transferred again.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use miflib_core::download::{HttpClient, TransportConfig};
//! use miflib_core::pipeline::{Pipeline, PipelineConfig, run_catalog};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(HttpClient::new(TransportConfig::for_host("example.com")?)?);
//! client.login("reader@example.com", "secret").await?;
//!
//! let pipeline = Pipeline::new(client.clone(), PipelineConfig::new("./library"))?;
//! let summary = run_catalog(client, &pipeline, CancellationToken::new()).await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

mod error;
pub mod fanout;
pub mod producer;
mod stats;

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub use error::PipelineError;
use error::keep_first_failure;
pub use fanout::ResourceGroup;
pub use stats::{PipelineStats, RunSummary};

use crate::book::{Book, to_pretty_json};
use crate::download::constants::{COMPLETION_MARKER, METADATA_FILE};
use crate::download::{Catalog, Transport, book_dir_name};

/// Minimum allowed worker count.
pub const MIN_WORKERS: usize = 1;

/// Records buffered between the producer and the workers.
const STREAM_CAPACITY: usize = 1;

/// Worker count matching the host's available parallelism.
#[must_use]
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(MIN_WORKERS, NonZeroUsize::get)
}

/// Settings of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Directory that receives one sub-directory per book.
    pub root: PathBuf,
    /// Number of books processed at the same time.
    pub workers: usize,
    /// Resource groups downloaded for every book.
    pub groups: Vec<ResourceGroup>,
}

impl PipelineConfig {
    /// All groups, one worker per available CPU.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            workers: default_workers(),
            groups: ResourceGroup::ALL.to_vec(),
        }
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn with_groups(mut self, groups: impl Into<Vec<ResourceGroup>>) -> Self {
        self.groups = groups.into();
        self
    }
}

/// State shared by the workers of one run.
struct WorkerContext {
    transport: Arc<dyn Transport>,
    config: PipelineConfig,
    stats: Arc<PipelineStats>,
    cancel: CancellationToken,
}

/// Bounded pool of workers over a stream of records.
pub struct Pipeline {
    transport: Arc<dyn Transport>,
    config: PipelineConfig,
}

impl Pipeline {
    /// Creates a pipeline that downloads through `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidWorkers`] if `config.workers` is zero.
    pub fn new(transport: Arc<dyn Transport>, config: PipelineConfig) -> Result<Self, PipelineError> {
        if config.workers < MIN_WORKERS {
            return Err(PipelineError::InvalidWorkers {
                value: config.workers,
            });
        }
        Ok(Self { transport, config })
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Processes every record of `records`.
    ///
    /// Returns when the stream ends, on the first fatal error, or when
    /// `cancel` fires. A fatal error cancels `cancel` so the other workers and
    /// the producer stop too. Records still queued at that point are
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error, or [`PipelineError::Cancelled`] when the
    /// run was stopped from outside.
    #[instrument(skip_all, fields(root = %self.config.root.display(), workers = self.config.workers))]
    pub async fn run(
        &self,
        records: mpsc::Receiver<Book>,
        cancel: CancellationToken,
    ) -> Result<RunSummary, PipelineError> {
        let stats = Arc::new(PipelineStats::new());
        let context = Arc::new(WorkerContext {
            transport: Arc::clone(&self.transport),
            config: self.config.clone(),
            stats: Arc::clone(&stats),
            cancel: cancel.clone(),
        });
        let records = Arc::new(Mutex::new(records));

        let mut workers = JoinSet::new();
        for worker_id in 0..self.config.workers {
            workers.spawn(worker_loop(
                worker_id,
                Arc::clone(&records),
                Arc::clone(&context),
            ));
        }

        let mut failure = None;
        while let Some(joined) = workers.join_next().await {
            if let Err(error) = joined.map_err(PipelineError::from).and_then(|result| result) {
                if !error.is_cancelled() {
                    warn!(%error, "stopping run");
                }
                cancel.cancel();
                keep_first_failure(&mut failure, error);
            }
        }

        let discarded = drain(&records).await;
        stats.add_records_discarded(discarded);
        if discarded > 0 {
            info!(discarded, "discarded queued records");
        }

        let summary = stats.summary();
        match failure {
            Some(error) => Err(error),
            None if cancel.is_cancelled() => Err(PipelineError::Cancelled),
            None => {
                info!(%summary, "run finished");
                Ok(summary)
            }
        }
    }
}

/// Closes the stream and throws away what is still queued.
async fn drain(records: &Mutex<mpsc::Receiver<Book>>) -> usize {
    let mut records = records.lock().await;
    records.close();
    let mut discarded = 0;
    while records.try_recv().is_ok() {
        discarded += 1;
    }
    discarded
}

async fn worker_loop(
    worker_id: usize,
    records: Arc<Mutex<mpsc::Receiver<Book>>>,
    context: Arc<WorkerContext>,
) -> Result<(), PipelineError> {
    loop {
        let next = {
            let mut records = records.lock().await;
            tokio::select! {
                biased;
                () = context.cancel.cancelled() => None,
                book = records.recv() => book,
            }
        };
        let Some(book) = next else {
            debug!(worker_id, "worker finished");
            return Ok(());
        };
        process_book(book, &context).await?;
    }
}

#[instrument(skip_all, fields(book_id = book.id))]
async fn process_book(book: Book, context: &WorkerContext) -> Result<(), PipelineError> {
    let book_dir = context.config.root.join(book_dir_name(&book));
    tokio::fs::create_dir_all(&book_dir)
        .await
        .map_err(|e| PipelineError::io(&book_dir, e))?;

    let marker = book_dir.join(COMPLETION_MARKER);
    if tokio::fs::try_exists(&marker)
        .await
        .map_err(|e| PipelineError::io(&marker, e))?
    {
        info!(dir = %book_dir.display(), "book already downloaded");
        context.stats.increment_books_already_complete();
        return Ok(());
    }

    info!(title = %book.title, dir = %book_dir.display(), "downloading book");
    let book = Arc::new(book);
    fanout::download_book(
        &context.transport,
        Arc::clone(&book),
        &book_dir,
        &context.config.groups,
        &context.cancel,
        &context.stats,
    )
    .await?;

    write_metadata(&book, &book_dir).await?;
    tokio::fs::write(&marker, b"")
        .await
        .map_err(|e| PipelineError::io(&marker, e))?;

    context.stats.increment_books_completed();
    info!(dir = %book_dir.display(), "book complete");
    Ok(())
}

async fn write_metadata(book: &Book, book_dir: &Path) -> Result<(), PipelineError> {
    let path = book_dir.join(METADATA_FILE);
    let encoded = to_pretty_json(book).map_err(|source| PipelineError::Metadata {
        book_id: book.id,
        source,
    })?;
    tokio::fs::write(&path, encoded)
        .await
        .map_err(|e| PipelineError::io(&path, e))
}

/// Lists `catalog` and runs `pipeline` over it.
///
/// The producer and the workers share `cancel`; whichever side fails first
/// determines the returned error.
///
/// # Errors
///
/// Returns the listing error, the first fatal pipeline error, or
/// [`PipelineError::Cancelled`].
pub async fn run_catalog(
    catalog: Arc<dyn Catalog>,
    pipeline: &Pipeline,
    cancel: CancellationToken,
) -> Result<RunSummary, PipelineError> {
    let (sender, receiver) = mpsc::channel(STREAM_CAPACITY);
    let producer = tokio::spawn(producer::produce(catalog, sender, cancel.clone()));

    let run_result = pipeline.run(receiver, cancel.clone()).await;
    let produce_result = producer.await?;

    match produce_result {
        Err(error) if !error.is_cancelled() => {
            cancel.cancel();
            Err(error)
        }
        _ => run_result,
    }
}
