//! Archive packager: folds a populated scratch space into one container.
//!
//! The staging directory is enumerated as a single tree rooted at the bundle name,
//! streamed through a [`ContainerEncoder`] into `<scratch>/<name>.zip`, and the
//! finished file is read back into memory.

use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::spawn_blocking;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::Compression;
use crate::error::{ArchiveError, Result};
use crate::scratch::ScratchSpace;
use crate::utils::validate_entry_name;

/// Output target of a [`ContainerEncoder`]
pub trait Sink: Write + Seek + Send {}

impl<T: Write + Seek + Send> Sink for T {}

/// One node of the tree handed to an encoder
///
/// Paths are relative to the root label and use `/` separators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeEntry {
    /// A directory; `archive_path` ends with `/`
    Directory {
        /// Path below the root label
        archive_path: String,
    },
    /// A regular file whose content is read from `source`
    File {
        /// Path below the root label
        archive_path: String,
        /// File on disk holding the content
        source: PathBuf,
    },
}

impl TreeEntry {
    /// Path below the root label
    pub fn archive_path(&self) -> &str {
        match self {
            TreeEntry::Directory { archive_path } | TreeEntry::File { archive_path, .. } => {
                archive_path
            }
        }
    }
}

/// Serializes a labeled file tree into one compressed container
pub trait ContainerEncoder: Send + Sync {
    /// Encode `entries` into `sink`, each nested under a `root_label/` directory
    fn encode(
        &self,
        root_label: &str,
        entries: &[TreeEntry],
        sink: &mut dyn Sink,
    ) -> std::io::Result<()>;
}

/// [`ContainerEncoder`] producing ZIP archives
#[derive(Clone, Copy, Debug, Default)]
pub struct ZipEncoder {
    compression: Compression,
}

impl ZipEncoder {
    /// Create an encoder using `compression` for every file entry
    pub fn new(compression: Compression) -> Self {
        Self { compression }
    }
}

impl ContainerEncoder for ZipEncoder {
    fn encode(
        &self,
        root_label: &str,
        entries: &[TreeEntry],
        sink: &mut dyn Sink,
    ) -> std::io::Result<()> {
        let method = match self.compression {
            Compression::Stored => zip::CompressionMethod::Stored,
            Compression::Deflated => zip::CompressionMethod::Deflated,
        };
        let file_options = zip::write::FileOptions::default()
            .compression_method(method)
            .unix_permissions(0o644);
        let dir_options = zip::write::FileOptions::default().unix_permissions(0o755);

        let mut writer = zip::ZipWriter::new(sink);
        writer.add_directory(format!("{}/", root_label), dir_options)?;
        for entry in entries {
            match entry {
                TreeEntry::Directory { archive_path } => {
                    writer
                        .add_directory(format!("{}/{}", root_label, archive_path), dir_options)?;
                }
                TreeEntry::File {
                    archive_path,
                    source,
                } => {
                    let mut input = std::fs::File::open(source)?;
                    let large = needs_zip64(input.metadata()?.len());
                    writer.start_file(
                        format!("{}/{}", root_label, archive_path),
                        file_options.large_file(large),
                    )?;
                    std::io::copy(&mut input, &mut writer)?;
                }
            }
        }
        writer.finish()?;
        Ok(())
    }
}

/// Whether an entry of `len` bytes needs ZIP64 size fields
fn needs_zip64(len: u64) -> bool {
    len >= u64::from(u32::MAX)
}

/// Packages scratch spaces with a pluggable encoder
#[derive(Clone)]
pub struct Packager {
    encoder: Arc<dyn ContainerEncoder>,
}

impl Packager {
    /// Create a packager around `encoder`
    pub fn new(encoder: Arc<dyn ContainerEncoder>) -> Self {
        Self { encoder }
    }

    /// Build the container for `scratch` and return its bytes
    ///
    /// Enumeration, encoding and creating the container file all fail as
    /// [`ArchiveError::PackagingFailed`]; reading the finished file back fails as
    /// [`ArchiveError::ReadBackFailed`].
    pub async fn pack(&self, scratch: &ScratchSpace, output_name: &str) -> Result<Vec<u8>> {
        validate_entry_name(output_name)?;

        let staging = scratch.staging_dir().to_path_buf();
        let container = scratch.container_path(output_name);
        let label = output_name.to_string();
        let encoder = Arc::clone(&self.encoder);

        let container_for_encode = container.clone();
        let entries = spawn_blocking(move || {
            write_container(encoder.as_ref(), &label, &staging, &container_for_encode)
        })
        .await
        .map_err(|e| ArchiveError::packaging(output_name, format!("encoder task failed: {}", e)))??;

        let bytes = tokio::fs::read(&container)
            .await
            .map_err(|source| ArchiveError::ReadBackFailed {
                path: container.clone(),
                source,
            })?;

        debug!(
            output = output_name,
            entries,
            size_bytes = bytes.len(),
            "packaged container"
        );
        Ok(bytes)
    }
}

/// Enumerate, create the container file and encode; returns the number of container entries
fn write_container(
    encoder: &dyn ContainerEncoder,
    root_label: &str,
    staging: &Path,
    container: &Path,
) -> Result<usize> {
    let entries = enumerate_tree(staging).map_err(|e| {
        ArchiveError::packaging(root_label, format!("failed to enumerate: {}", e))
    })?;

    let mut out = std::fs::File::create(container).map_err(|e| {
        ArchiveError::packaging(
            root_label,
            format!("failed to create {}: {}", container.display(), e),
        )
    })?;

    encoder
        .encode(root_label, &entries, &mut out)
        .map_err(|e| ArchiveError::packaging(root_label, e))?;
    out.flush()
        .map_err(|e| ArchiveError::packaging(root_label, e))?;

    Ok(entries.len() + 1)
}

/// List `dir` relative to itself, sorted by name at every level
pub fn enumerate_tree(dir: &Path) -> std::io::Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let relative = entry.path().strip_prefix(dir).map_err(|_| {
            std::io::Error::other(format!(
                "{} is outside {}",
                entry.path().display(),
                dir.display()
            ))
        })?;

        let mut archive_path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let file_type = entry.file_type();
        if file_type.is_dir() {
            archive_path.push('/');
            entries.push(TreeEntry::Directory { archive_path });
        } else if file_type.is_file() {
            entries.push(TreeEntry::File {
                archive_path,
                source: entry.path().to_path_buf(),
            });
        } else {
            warn!(path = %entry.path().display(), "skipping non-regular file");
        }
    }

    Ok(entries)
}
