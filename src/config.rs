//! Validated settings of one download run.
//!
//! The command line collects raw values; [`RunConfig::new`] checks them once
//! so the rest of the crate can rely on them.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::download::TransportConfig;
use crate::pipeline::{MIN_WORKERS, PipelineConfig, ResourceGroup};

/// Errors in user-supplied settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required value is empty.
    #[error("{name} must not be empty")]
    Missing { name: &'static str },

    /// Neither a hostname nor a base URL was given.
    #[error("either a hostname or a base URL is required")]
    MissingHost,

    /// The service address is not a usable http(s) URL.
    #[error("invalid service address {value}")]
    InvalidBaseUrl { value: String },

    /// A timeout of zero.
    #[error("{name} must be greater than zero")]
    ZeroTimeout { name: &'static str },

    /// Invalid worker count provided.
    #[error("invalid thread count {value}: must be at least {min}", min = MIN_WORKERS)]
    InvalidWorkers { value: usize },

    /// Every resource group was disabled.
    #[error("at least one resource group must be enabled")]
    NoGroups,
}

/// Account used to sign in.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Resolves the service root from a hostname or an explicit base URL.
///
/// The base URL wins when both are given.
///
/// # Errors
///
/// Returns [`ConfigError::MissingHost`] when neither is set, and
/// [`ConfigError::InvalidBaseUrl`] when the result is not an http(s) URL.
pub fn resolve_base_url(hostname: Option<&str>, base_url: Option<&str>) -> Result<Url, ConfigError> {
    let raw = match (base_url, hostname) {
        (Some(base), _) if !base.trim().is_empty() => base.trim().to_string(),
        (_, Some(host)) if !host.trim().is_empty() => format!("https://{}/", host.trim()),
        _ => return Err(ConfigError::MissingHost),
    };
    let url = Url::parse(&raw).map_err(|_| ConfigError::InvalidBaseUrl { value: raw.clone() })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::InvalidBaseUrl { value: raw });
    }
    Ok(url)
}

/// Everything a run needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub credentials: Credentials,
    pub transport: TransportConfig,
    pub pipeline: PipelineConfig,
}

impl RunConfig {
    /// Combines and validates the parts of a run configuration.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn new(
        credentials: Credentials,
        transport: TransportConfig,
        pipeline: PipelineConfig,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            credentials,
            transport,
            pipeline,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks every value.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.credentials.username.trim().is_empty() {
            return Err(ConfigError::Missing { name: "username" });
        }
        if self.credentials.password.is_empty() {
            return Err(ConfigError::Missing { name: "password" });
        }
        if self.transport.connect_timeout == Duration::ZERO {
            return Err(ConfigError::ZeroTimeout {
                name: "connect timeout",
            });
        }
        if self.transport.read_timeout == Duration::ZERO {
            return Err(ConfigError::ZeroTimeout {
                name: "read timeout",
            });
        }
        if self.pipeline.workers < MIN_WORKERS {
            return Err(ConfigError::InvalidWorkers {
                value: self.pipeline.workers,
            });
        }
        if self.pipeline.groups.is_empty() {
            return Err(ConfigError::NoGroups);
        }
        Ok(())
    }

    /// Directory that receives the library.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.pipeline.root
    }
}

/// Removes repeated groups, keeping the first occurrence.
#[must_use]
pub fn dedup_groups(groups: &[ResourceGroup]) -> Vec<ResourceGroup> {
    let mut unique = Vec::with_capacity(groups.len());
    for &group in groups {
        if !unique.contains(&group) {
            unique.push(group);
        }
    }
    unique
}
