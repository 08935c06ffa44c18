//! HTTP client for the library service.
//!
//! This module provides the `HttpClient` struct: it signs in, lists the
//! catalog, probes sizes and streams files to disk. All settings come from an
//! explicit [`TransportConfig`]; each client owns its own cookie jar.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::cookie::Jar;
use reqwest::header::CONTENT_LENGTH;
use reqwest::redirect::Policy;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{
    CONNECT_TIMEOUT_SECS, LIST_PATH, LOGIN_PATH, MAX_ERROR_BODY_BYTES, MAX_REDIRECTS,
    READ_TIMEOUT_SECS,
};
use super::error::DownloadError;
use super::transport::{Catalog, Transport};
use crate::book::{Book, BookList};
use crate::text::normalize_bytes;

/// User-Agent sent with every request.
#[must_use]
pub fn default_user_agent() -> String {
    format!("miflib/{}", env!("CARGO_PKG_VERSION"))
}

/// Connection settings for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Service root; endpoint paths are joined onto it.
    pub base_url: Url,
    /// Longest wait for a TCP/TLS connection.
    pub connect_timeout: Duration,
    /// Longest wait for the next piece of a response.
    pub read_timeout: Duration,
    /// Redirect hops followed before a request is abandoned.
    pub max_redirects: usize,
    pub user_agent: String,
}

impl TransportConfig {
    /// Default settings for the service at `base_url`.
    #[must_use]
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            max_redirects: MAX_REDIRECTS,
            user_agent: default_user_agent(),
        }
    }

    /// Default settings for `https://<hostname>/`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidUrl`] if `hostname` does not form a valid URL.
    pub fn for_host(hostname: &str) -> Result<Self, DownloadError> {
        let raw = format!("https://{hostname}/");
        let base_url = Url::parse(&raw).map_err(|_| DownloadError::invalid_url(raw))?;
        Ok(Self::new(base_url))
    }

    fn endpoint(&self, path: &str) -> Result<Url, DownloadError> {
        self.base_url
            .join(path)
            .map_err(|_| DownloadError::invalid_url(format!("{}{path}", redact(self.base_url.as_str()))))
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Authenticated client for the library service.
///
/// Create it once and share it: connections are pooled and the session
/// cookie set by [`login`](Self::login) is reused by every later request.
///
/// # Example
///
/// ```no_run
/// use miflib_core::download::{Catalog, HttpClient, TransportConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new(TransportConfig::for_host("www.mann-ivanov-ferber.ru")?)?;
/// client.login("reader@example.com", "secret").await?;
/// let books = client.list_books().await?;
/// println!("{} books", books.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    config: TransportConfig,
    authenticated: AtomicBool,
}

impl HttpClient {
    /// Builds a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Network`] if the underlying client cannot be built.
    pub fn new(config: TransportConfig) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .redirect(Policy::limited(config.max_redirects))
            .gzip(true)
            .user_agent(config.user_agent.clone())
            .cookie_provider(Arc::new(Jar::default()))
            .build()
            .map_err(|e| DownloadError::network(redact(config.base_url.as_str()), e))?;
        Ok(Self {
            client,
            config,
            authenticated: AtomicBool::new(false),
        })
    }

    /// The settings this client was built with.
    #[must_use]
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    /// Signs in; the session cookie is kept for later requests.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::HttpStatus`] when the service rejects the
    /// credentials, or a transport error when it cannot be reached.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<(), DownloadError> {
        let url = self.config.endpoint(LOGIN_PATH)?;
        let request = self.client.post(url.clone()).json(&LoginRequest {
            email: username,
            password,
        });
        self.send(request, url.as_str()).await?;
        self.authenticated.store(true, Ordering::Release);
        info!("signed in");
        Ok(())
    }

    fn ensure_authenticated(&self) -> Result<(), DownloadError> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(DownloadError::NotAuthenticated)
        }
    }

    /// Sends a request and turns transport failures and non-2xx answers into errors.
    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response, DownloadError> {
        let response = request
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        // Error bodies end up in logs; keep a bounded, printable prefix.
        let body = response
            .bytes()
            .await
            .map(|bytes| normalize_bytes(&bytes[..bytes.len().min(MAX_ERROR_BODY_BYTES)]))
            .unwrap_or_default();
        Err(DownloadError::http_status(
            redact(url),
            status.as_u16(),
            truncate_body(body),
        ))
    }

    fn request_error(&self, url: &str, error: reqwest::Error) -> DownloadError {
        let url = redact(url);
        if error.is_redirect() {
            DownloadError::too_many_redirects(url, self.config.max_redirects)
        } else if error.is_timeout() {
            DownloadError::timeout(url)
        } else {
            DownloadError::network(url, error.without_url())
        }
    }
}

#[async_trait]
impl Catalog for HttpClient {
    #[instrument(skip(self))]
    async fn list_books(&self) -> Result<Vec<Book>, DownloadError> {
        self.ensure_authenticated()?;
        let url = self.config.endpoint(LIST_PATH)?;
        let response = self.send(self.client.get(url.clone()), url.as_str()).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| self.request_error(url.as_str(), e))?;
        let list: BookList = serde_json::from_slice(&body)
            .map_err(|e| DownloadError::decode(redact(url.as_str()), e))?;
        info!(books = list.books.len(), total = list.total, "catalog listed");
        Ok(list.books)
    }
}

#[async_trait]
impl Transport for HttpClient {
    #[instrument(skip(self, url, destination), fields(url = %redact(url)))]
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, DownloadError> {
        self.ensure_authenticated()?;
        let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(redact(url)))?;
        let response = self.send(self.client.get(parsed), url).await?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent, e))?;
        }
        let mut file = File::create(destination)
            .await
            .map_err(|e| DownloadError::io(destination, e))?;

        // Stream response body to file, with cleanup on error
        let stream_result = self.stream_to_file(&mut file, response, url, destination).await;
        if stream_result.is_err() {
            drop(file);
            debug!(path = %destination.display(), "cleaning up partial file after error");
            let _ = tokio::fs::remove_file(destination).await;
        }
        let bytes = stream_result?;

        info!(path = %destination.display(), bytes, "download complete");
        Ok(bytes)
    }

    #[instrument(skip(self, url), fields(url = %redact(url)))]
    async fn content_length(&self, url: &str) -> Result<Option<u64>, DownloadError> {
        self.ensure_authenticated()?;
        let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(redact(url)))?;
        let response = self.send(self.client.head(parsed), url).await?;
        // The header itself, not the body size hint, which is zero for HEAD.
        let length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        debug!(?length, "probed size");
        Ok(length)
    }
}

impl HttpClient {
    /// Streams response body to file, returning bytes written.
    async fn stream_to_file(
        &self,
        file: &mut File,
        response: Response,
        url: &str,
        file_path: &Path,
    ) -> Result<u64, DownloadError> {
        let mut writer = BufWriter::new(file);
        let mut stream = response.bytes_stream();
        let mut bytes_written: u64 = 0;

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| self.request_error(url, e))?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| DownloadError::io(file_path, e))?;
            bytes_written += chunk.len() as u64;
        }

        writer
            .flush()
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        Ok(bytes_written)
    }
}

/// Removes user-info credentials from a URL string.
fn redact(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) if !parsed.username().is_empty() || parsed.password().is_some() => {
            let _ = parsed.set_username("");
            let _ = parsed.set_password(None);
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY_BYTES {
        let mut end = MAX_ERROR_BODY_BYTES;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}
