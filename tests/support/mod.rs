//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use miflib_core::book::{Address, Book};
use miflib_core::download::{Catalog, DownloadError, Transport};
use tokio_util::sync::CancellationToken;

/// What the mock answers for a URL.
#[derive(Debug, Clone)]
pub enum Reply {
    Body(Vec<u8>),
    Status(u16),
    /// Answers with the body after a delay, keeping the transfer in flight.
    SlowBody(Vec<u8>, Duration),
    /// Fails with the status after a delay, letting other groups finish first.
    SlowStatus(u16, Duration),
    RedirectLoop,
}

/// In-memory transport that records every call.
#[derive(Default)]
pub struct MockTransport {
    replies: HashMap<String, Reply>,
    cancel_on_fetch: Option<(String, CancellationToken)>,
    fetches: Mutex<Vec<String>>,
    probes: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, body: &[u8]) -> Self {
        self.replies.insert(url.to_string(), Reply::Body(body.to_vec()));
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.replies.insert(url.to_string(), Reply::Status(status));
        self
    }

    pub fn with_slow_body(mut self, url: &str, body: &[u8], delay: Duration) -> Self {
        self.replies
            .insert(url.to_string(), Reply::SlowBody(body.to_vec(), delay));
        self
    }

    pub fn with_slow_status(mut self, url: &str, status: u16, delay: Duration) -> Self {
        self.replies
            .insert(url.to_string(), Reply::SlowStatus(status, delay));
        self
    }

    pub fn with_redirect_loop(mut self, url: &str) -> Self {
        self.replies.insert(url.to_string(), Reply::RedirectLoop);
        self
    }

    /// Cancels `token` while `url` is being fetched.
    pub fn cancel_during(mut self, url: &str, token: CancellationToken) -> Self {
        self.cancel_on_fetch = Some((url.to_string(), token));
        self
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.fetches().len() + self.probes().len()
    }

    fn reply(&self, url: &str) -> Reply {
        self.replies
            .get(url)
            .cloned()
            .unwrap_or_else(|| Reply::Body(url.as_bytes().to_vec()))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, DownloadError> {
        self.fetches.lock().unwrap().push(url.to_string());
        if let Some((cancel_url, token)) = &self.cancel_on_fetch {
            if cancel_url == url {
                token.cancel();
            }
        }
        match self.reply(url) {
            Reply::Body(body) => write_body(destination, &body),
            Reply::SlowBody(body, delay) => {
                tokio::time::sleep(delay).await;
                write_body(destination, &body)
            }
            Reply::Status(status) => Err(DownloadError::http_status(url, status, "")),
            Reply::SlowStatus(status, delay) => {
                tokio::time::sleep(delay).await;
                Err(DownloadError::http_status(url, status, ""))
            }
            Reply::RedirectLoop => Err(DownloadError::too_many_redirects(url, 10)),
        }
    }

    async fn content_length(&self, url: &str) -> Result<Option<u64>, DownloadError> {
        self.probes.lock().unwrap().push(url.to_string());
        match self.reply(url) {
            Reply::Body(body) | Reply::SlowBody(body, _) => Ok(Some(body.len() as u64)),
            Reply::Status(status) | Reply::SlowStatus(status, _) => {
                Err(DownloadError::http_status(url, status, ""))
            }
            Reply::RedirectLoop => Err(DownloadError::too_many_redirects(url, 10)),
        }
    }
}

fn write_body(destination: &Path, body: &[u8]) -> Result<u64, DownloadError> {
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DownloadError::io(parent, e))?;
    }
    std::fs::write(destination, body).map_err(|e| DownloadError::io(destination, e))?;
    Ok(body.len() as u64)
}

/// Catalog returning a fixed list of books.
pub struct MockCatalog(pub Vec<Book>);

#[async_trait]
impl Catalog for MockCatalog {
    async fn list_books(&self) -> Result<Vec<Book>, DownloadError> {
        Ok(self.0.clone())
    }
}

/// A book with one pdf, one mp3 chapter and a large cover, each served as
/// `https://lib.test/<id>/<name>`.
pub fn sample_book(id: u64, title: &str) -> Book {
    let mut book = Book {
        id,
        title: title.into(),
        ..Book::default()
    };
    let url = |name: &str| format!("https://lib.test/{id}/{name}");
    let size = |name: &str| url(name).len() as u64;
    book.files.ebook.insert(
        "pdf".into(),
        vec![Address::new(url("book.pdf")).with_size(size("book.pdf"))].into(),
    );
    book.files.audiobook.insert(
        "mp3".into(),
        vec![Address::new(url("01.mp3"))
            .with_size(size("01.mp3"))
            .with_title("01 Start")]
        .into(),
    );
    book.cover.large = url("cover.jpg");
    book
}
