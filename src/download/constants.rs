//! Constants for the download module (timeouts, redirects, file layout).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout: the longest wait for the next chunk of a response.
pub const READ_TIMEOUT_SECS: u64 = 10;

/// Redirect hops followed before a fetch is abandoned as a redirect cycle.
pub const MAX_REDIRECTS: usize = 10;

/// Longest path segment, in bytes, accepted by the target filesystems.
pub const MAX_SEGMENT_BYTES: usize = 255;

/// Metadata file written into each book directory.
pub const METADATA_FILE: &str = "book.json";

/// Completion marker written into each book directory once it is complete.
pub const COMPLETION_MARKER: &str = ".downloaded";

/// Path of the login endpoint relative to the service base URL.
pub const LOGIN_PATH: &str = "auth/login.ajax";

/// Path of the catalog listing endpoint relative to the service base URL.
pub const LIST_PATH: &str = "books/list.ajax";

/// Longest response body kept on an HTTP status error.
pub const MAX_ERROR_BODY_BYTES: usize = 2048;
