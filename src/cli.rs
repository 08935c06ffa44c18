//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use clap::builder::TypedValueParser;

use miflib_core::config::{ConfigError, Credentials, RunConfig, dedup_groups, resolve_base_url};
use miflib_core::download::TransportConfig;
use miflib_core::download::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use miflib_core::pipeline::{PipelineConfig, ResourceGroup, default_workers};

/// Download your books from the MIF library.
///
/// Every book lands in its own directory with its e-book formats, audiobook,
/// demo excerpts, photos, covers and a `book.json`. Finished books are marked
/// and skipped on the next run, so an interrupted run can simply be repeated.
#[derive(Parser, Debug)]
#[command(name = "miflib")]
#[command(author, version, about)]
pub struct Args {
    /// Username (e-mail) for the library
    #[arg(short, long, env = "MIFLIB_USERNAME")]
    pub username: String,

    /// Password for the library
    #[arg(short, long, env = "MIFLIB_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Hostname of the library
    #[arg(short = 'H', long, env = "MIFLIB_HOSTNAME", required_unless_present = "base_url")]
    pub hostname: Option<String>,

    /// Full service address, overrides --hostname (e.g. http://127.0.0.1:8080/)
    #[arg(long, env = "MIFLIB_BASE_URL")]
    pub base_url: Option<String>,

    /// Directory where books will be placed
    #[arg(short, long, env = "MIFLIB_DIRECTORY", default_value = ".")]
    pub directory: PathBuf,

    /// Number of books processed in parallel
    #[arg(
        short = 'n',
        long = "num-threads",
        env = "MIFLIB_NUM_THREADS",
        default_value_t = default_workers(),
        value_parser = clap::value_parser!(u16).range(1..).map(usize::from)
    )]
    pub threads: usize,

    /// Seconds to wait for a connection
    #[arg(long, env = "MIFLIB_CONNECT_TIMEOUT", default_value_t = CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub connect_timeout: u64,

    /// Seconds to wait for the next piece of a response
    #[arg(long, env = "MIFLIB_READ_TIMEOUT", default_value_t = READ_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub read_timeout: u64,

    /// Resource groups to download (comma-separated)
    #[arg(
        short,
        long,
        env = "MIFLIB_GROUPS",
        value_delimiter = ',',
        default_value = "audiobook,ebook,cover,demo,photos"
    )]
    pub groups: Vec<ResourceGroup>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Resolves the parsed arguments into a validated run configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for unusable values.
    pub fn into_config(self) -> Result<RunConfig, ConfigError> {
        let base_url = resolve_base_url(self.hostname.as_deref(), self.base_url.as_deref())?;
        let mut transport = TransportConfig::new(base_url);
        transport.connect_timeout = Duration::from_secs(self.connect_timeout);
        transport.read_timeout = Duration::from_secs(self.read_timeout);

        let pipeline = PipelineConfig::new(self.directory)
            .with_workers(self.threads)
            .with_groups(dedup_groups(&self.groups));

        RunConfig::new(
            Credentials::new(self.username, self.password),
            transport,
            pipeline,
        )
    }
}
