//! miflib core library
//!
//! This library mirrors the book library of a publisher's online service to
//! local storage: every book gets its own directory with all downloadable
//! formats, covers, photos and the full catalog record. Runs are resumable;
//! completed books are marked and never downloaded twice.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`text`] - Canonical form of remote text
//! - [`book`] - Catalog records and their JSON form
//! - [`download`] - File names, per-file policy and the HTTP transport
//! - [`pipeline`] - Worker pool and per-book concurrent download
//! - [`config`] - Validated run settings

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod book;
pub mod config;
pub mod download;
pub mod pipeline;
pub mod text;

// Re-export commonly used types
pub use book::{Book, to_pretty_json};
pub use config::{ConfigError, Credentials, RunConfig};
pub use download::{
    Catalog, Disposition, DownloadError, HttpClient, Transport, TransportConfig, classify_error,
    safe_segment, sanitize_name,
};
pub use pipeline::{
    Pipeline, PipelineConfig, PipelineError, ResourceGroup, RunSummary, run_catalog,
};
