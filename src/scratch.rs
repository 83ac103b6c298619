//! Scratch spaces: uniquely named, self-removing staging directories
//!
//! A [`ScratchSpace`] is owned by exactly one build. It is removed either by an
//! explicit [`ScratchSpace::release`] or, on every other exit path (early `?`
//! return, panic unwinding, a dropped future), by its `Drop` impl.

use crate::config::ScratchConfig;
use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Subdirectory that receives the sources of a build
const STAGING_DIR: &str = "staging";

/// Disambiguates scratch spaces created within the same clock tick
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// An ephemeral staging directory, removed when released or dropped
///
/// Layout:
/// - `<root>/staging/` holds one file per source
/// - `<root>/<output>.zip` is the container written by the packager
#[derive(Debug)]
pub struct ScratchSpace {
    root: PathBuf,
    staging: PathBuf,
    released: bool,
}

impl ScratchSpace {
    /// Create a new scratch space under `config.root_dir`
    ///
    /// The directory name is `<prefix><sha256>` where the digest covers the
    /// nanosecond creation timestamp, the process id and a process-wide sequence
    /// number, so concurrent builds never share a path.
    pub async fn acquire(config: &ScratchConfig) -> Result<Self> {
        let root = config.root_dir.join(unique_dir_name(&config.prefix));
        let staging = root.join(STAGING_DIR);

        // create_dir (not _all) for the leaf so an existing directory is an error
        tokio::fs::create_dir_all(&config.root_dir)
            .await
            .map_err(|e| scratch_io_error("create scratch parent", &config.root_dir, e))?;
        tokio::fs::create_dir(&root)
            .await
            .map_err(|e| scratch_io_error("create scratch space", &root, e))?;

        // From here on the guard owns the directory and removes it on failure too
        let space = Self {
            root,
            staging,
            released: false,
        };
        tokio::fs::create_dir(&space.staging)
            .await
            .map_err(|e| scratch_io_error("create staging directory", &space.staging, e))?;

        debug!(path = %space.root.display(), "acquired scratch space");
        Ok(space)
    }

    /// Root of the scratch space
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Directory holding the staged sources
    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    /// Path of a staged source
    pub fn entry_path(&self, name: &str) -> PathBuf {
        self.staging.join(name)
    }

    /// Path of the container file for a bundle
    pub fn container_path(&self, output_name: &str) -> PathBuf {
        self.root.join(format!("{}.zip", output_name))
    }

    /// Recursively delete the scratch space
    ///
    /// A directory that is already gone counts as released.
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => {
                debug!(path = %self.root.display(), "released scratch space");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(scratch_io_error("remove scratch space", &self.root, e)),
        }
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => debug!(path = %self.root.display(), "removed scratch space on drop"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.root.display(),
                error = %e,
                "failed to remove scratch space"
            ),
        }
    }
}

fn unique_dir_name(prefix: &str) -> String {
    let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true);
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);

    let mut hasher = Sha256::new();
    hasher.update(now.as_bytes());
    hasher.update(std::process::id().to_le_bytes());
    hasher.update(sequence.to_le_bytes());

    format!("{}{:x}", prefix, hasher.finalize())
}

fn scratch_io_error(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::Io(std::io::Error::new(
        e.kind(),
        format!("failed to {} '{}': {}", action, path.display(), e),
    ))
}
