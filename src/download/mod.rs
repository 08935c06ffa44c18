//! Per-file download policy and the HTTP transport.
//!
//! This module decides where each file of a book goes, whether a file already
//! on disk can be kept, and what a failed transfer means for the run. The
//! network itself sits behind the [`Transport`] and [`Catalog`] traits;
//! [`HttpClient`] implements both for the real service.
//!
//! # Features
//!
//! - Filesystem-safe, length-bounded names from arbitrary titles
//! - Deterministic paths, so repeated runs land on the same files
//! - Size probe before re-downloading a file that already exists
//! - 404 and redirect cycles skip one file instead of failing the book
//! - Streaming downloads with partial-file cleanup
//!
//! # Example
//!
//! ```
//! use miflib_core::download::{safe_segment, sanitize_name};
//!
//! assert_eq!(sanitize_name("№ 1: Rules?"), "No 1 Rules");
//! assert_eq!(sanitize_name("To be continued..."), "To be continued");
//! assert!(safe_segment(&"x".repeat(400)).len() <= 255);
//! ```

mod classify;
mod client;
pub mod constants;
mod error;
mod filename;
pub mod gate;
mod target;
mod transport;

pub use classify::{Disposition, Phase, SkipReason, classify_error};
pub use client::{HttpClient, TransportConfig, default_user_agent};
pub use error::DownloadError;
pub use filename::{cut_segment, safe_segment, sanitize_name, url_base_name, with_ordinal};
pub use gate::GateDecision;
pub use target::{
    AUDIOBOOK_DIR, DEMO_DIR, DownloadTarget, EBOOK_DIR, PHOTOS_DIR, audiobook_targets,
    book_dir_name, cover_targets, demo_targets, ebook_targets, photo_targets,
};
pub use transport::{Catalog, Transport};
