//! Byte materializer: writes in-memory blobs into a scratch space, one at a time.

use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{ArchiveError, Result};
use crate::fetcher::StagedEntry;
use crate::scratch::ScratchSpace;
use crate::types::ArchiveBlob;
use crate::utils::validate_entry_name;

/// Writes blobs sequentially; the first failure stops the batch
#[derive(Clone, Copy, Debug, Default)]
pub struct ByteMaterializer;

impl ByteMaterializer {
    /// Write every blob into `scratch`'s staging directory under its declared name
    ///
    /// Blobs are processed in order. A blob whose name is invalid, whose file cannot
    /// be created, or whose content cannot be written aborts the batch; the blobs
    /// after it are never touched. A later blob with the same name as an earlier
    /// one replaces its content.
    pub async fn materialize_all(
        &self,
        blobs: &[ArchiveBlob],
        scratch: &ScratchSpace,
    ) -> Result<Vec<StagedEntry>> {
        let mut staged = Vec::with_capacity(blobs.len());

        for (index, blob) in blobs.iter().enumerate() {
            validate_entry_name(&blob.name)?;
            let path = scratch.entry_path(&blob.name);

            let mut file = tokio::fs::File::create(&path).await.map_err(|source| {
                ArchiveError::DestinationCreateFailed {
                    path: path.clone(),
                    source,
                }
            })?;

            let write_failed = |source: std::io::Error| ArchiveError::DestinationWriteFailed {
                path: path.clone(),
                source,
            };
            file.write_all(&blob.content).await.map_err(write_failed)?;
            file.flush().await.map_err(write_failed)?;

            debug!(index, name = %blob.name, size_bytes = blob.content.len(), "materialized blob");
            staged.push(StagedEntry {
                name: blob.name.clone(),
                size_bytes: blob.content.len() as u64,
            });
        }

        Ok(staged)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScratchConfig;
    use crate::error::FailureKind;
    use crate::test_helpers::dir_len;

    async fn scratch_in(dir: &std::path::Path) -> ScratchSpace {
        ScratchSpace::acquire(&ScratchConfig {
            root_dir: dir.to_path_buf(),
            prefix: "tmp".to_string(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn writes_each_blob_under_its_name() {
        let parent = tempfile::tempdir().unwrap();
        let scratch = scratch_in(parent.path()).await;

        let blobs = vec![
            ArchiveBlob::new("a.txt", "hi"),
            ArchiveBlob::new("empty.bin", Vec::new()),
        ];
        let staged = ByteMaterializer
            .materialize_all(&blobs, &scratch)
            .await
            .unwrap();

        assert_eq!(
            staged,
            vec![
                StagedEntry {
                    name: "a.txt".to_string(),
                    size_bytes: 2
                },
                StagedEntry {
                    name: "empty.bin".to_string(),
                    size_bytes: 0
                },
            ]
        );
        assert_eq!(std::fs::read(scratch.entry_path("a.txt")).unwrap(), b"hi");
        assert!(std::fs::read(scratch.entry_path("empty.bin")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_failure_stops_before_later_blobs() {
        let parent = tempfile::tempdir().unwrap();
        let scratch = scratch_in(parent.path()).await;
        // Occupy the second blob's name with a directory
        std::fs::create_dir(scratch.entry_path("b.txt")).unwrap();

        let blobs = vec![
            ArchiveBlob::new("a.txt", "first"),
            ArchiveBlob::new("b.txt", "second"),
            ArchiveBlob::new("c.txt", "third"),
        ];
        let err = ByteMaterializer
            .materialize_all(&blobs, &scratch)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::DestinationCreateFailed);
        assert!(scratch.entry_path("a.txt").is_file());
        assert!(!scratch.entry_path("c.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn write_failure_stops_before_later_blobs() {
        let parent = tempfile::tempdir().unwrap();
        let scratch = scratch_in(parent.path()).await;
        // Every write to /dev/full fails with ENOSPC
        std::os::unix::fs::symlink("/dev/full", scratch.entry_path("b.txt")).unwrap();

        let blobs = vec![
            ArchiveBlob::new("a.txt", "first"),
            ArchiveBlob::new("b.txt", "second"),
            ArchiveBlob::new("c.txt", "third"),
        ];
        let err = ByteMaterializer
            .materialize_all(&blobs, &scratch)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::DestinationWriteFailed);
        assert!(scratch.entry_path("a.txt").is_file());
        assert!(!scratch.entry_path("c.txt").exists());
    }

    #[tokio::test]
    async fn invalid_name_stops_before_later_blobs() {
        let parent = tempfile::tempdir().unwrap();
        let scratch = scratch_in(parent.path()).await;

        let blobs = vec![
            ArchiveBlob::new("../../etc/passwd", "root"),
            ArchiveBlob::new("ok.txt", "never"),
        ];
        let err = ByteMaterializer
            .materialize_all(&blobs, &scratch)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::InvalidName);
        assert_eq!(dir_len(scratch.staging_dir()), 0);
    }

    #[tokio::test]
    async fn repeated_name_keeps_last_content() {
        let parent = tempfile::tempdir().unwrap();
        let scratch = scratch_in(parent.path()).await;

        let blobs = vec![
            ArchiveBlob::new("a.txt", "old"),
            ArchiveBlob::new("a.txt", "new"),
        ];
        ByteMaterializer
            .materialize_all(&blobs, &scratch)
            .await
            .unwrap();

        assert_eq!(std::fs::read(scratch.entry_path("a.txt")).unwrap(), b"new");
        assert_eq!(dir_len(scratch.staging_dir()), 1);
    }
}
