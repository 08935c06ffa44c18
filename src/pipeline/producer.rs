//! Feeds catalog records into the pipeline.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::error::PipelineError;
use crate::book::Book;
use crate::download::Catalog;

/// Lists the catalog and sends its books in order.
///
/// The sender is dropped on return, which ends the stream for the workers.
/// Returns the number of books sent; a closed receiver ends the loop early.
///
/// # Errors
///
/// Returns the listing error, or [`PipelineError::Cancelled`] when `cancel`
/// fires first.
#[instrument(skip_all)]
pub async fn produce(
    catalog: Arc<dyn Catalog>,
    sender: mpsc::Sender<Book>,
    cancel: CancellationToken,
) -> Result<usize, PipelineError> {
    let books = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(PipelineError::Cancelled),
        listed = catalog.list_books() => listed?,
    };
    info!(books = books.len(), "catalog received");

    let mut sent = 0;
    for book in books {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(sent, "producer cancelled");
                return Err(PipelineError::Cancelled);
            }
            result = sender.send(book) => {
                if result.is_err() {
                    debug!(sent, "stream closed by pipeline");
                    break;
                }
            }
        }
        sent += 1;
    }
    Ok(sent)
}
