//! Configuration types for archive-bundler

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Where scratch spaces are created and how they are named
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ScratchConfig {
    /// Parent directory for scratch spaces (default: the system temp directory)
    #[serde(default = "default_scratch_root")]
    pub root_dir: PathBuf,

    /// Prefix of every scratch directory name (default: "tmp")
    #[serde(default = "default_scratch_prefix")]
    pub prefix: String,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            root_dir: default_scratch_root(),
            prefix: default_scratch_prefix(),
        }
    }
}

/// Source retrieval settings for URL bundles
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FetchConfig {
    /// Maximum number of sources fetched at the same time (None = one worker per source)
    ///
    /// With `None` every location gets its own worker, which is fine for small
    /// batches. Set a cap when bundles may contain hundreds of sources.
    #[serde(default)]
    pub max_concurrent_fetches: Option<usize>,

    /// Per-request timeout in seconds (None = the HTTP client's own default)
    #[serde(default, with = "optional_duration_serde")]
    pub request_timeout: Option<Duration>,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: None,
            request_timeout: None,
            user_agent: default_user_agent(),
        }
    }
}

/// Compression applied to every entry of the container
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    /// No compression
    Stored,
    /// DEFLATE
    #[default]
    Deflated,
}

/// Container packaging settings
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct PackagingConfig {
    /// Compression method for container entries (default: deflated)
    #[serde(default)]
    pub compression: Compression,
}

/// Main configuration for [`Archiver`](crate::Archiver)
///
/// Every section has defaults, so `Config::default()` works out of the box:
/// scratch spaces under the system temp directory, unbounded fetch fan-out,
/// and deflate-compressed containers.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Scratch space location and naming
    #[serde(default)]
    pub scratch: ScratchConfig,

    /// Source retrieval
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Container packaging
    #[serde(default)]
    pub packaging: PackagingConfig,
}

impl Config {
    /// Check settings that would otherwise fail deep inside a build
    pub fn validate(&self) -> Result<()> {
        if self.fetch.max_concurrent_fetches == Some(0) {
            return Err(Error::Config {
                message: "max_concurrent_fetches must be at least 1".to_string(),
                key: Some("max_concurrent_fetches".to_string()),
            });
        }

        if self.scratch.prefix.is_empty() {
            return Err(Error::Config {
                message: "scratch prefix must not be empty".to_string(),
                key: Some("prefix".to_string()),
            });
        }

        if self.scratch.prefix.contains(['/', '\\', '\0']) {
            return Err(Error::Config {
                message: format!(
                    "scratch prefix {:?} must be a plain file name",
                    self.scratch.prefix
                ),
                key: Some("prefix".to_string()),
            });
        }

        Ok(())
    }
}

fn default_scratch_root() -> PathBuf {
    std::env::temp_dir()
}

fn default_scratch_prefix() -> String {
    "tmp".to_string()
}

fn default_user_agent() -> String {
    concat!("archive-bundler/", env!("CARGO_PKG_VERSION")).to_string()
}

// Optional Duration serialization helper (whole seconds)
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
