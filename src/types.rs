//! Core types for archive-bundler

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

/// An in-memory source: a file name and its content
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveBlob {
    /// File name of the entry inside the bundle
    pub name: String,
    /// Raw file content
    pub content: Vec<u8>,
}

impl ArchiveBlob {
    /// Create a new blob
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Per-build options
///
/// Reserved extension point; a build currently has nothing to tune beyond [`Config`](crate::Config).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ArchiveOptions {}

/// The sources of one bundle; exactly one variant per request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "items", rename_all = "snake_case")]
pub enum Sources {
    /// Remote locations, fetched concurrently
    Locations(Vec<String>),
    /// In-memory blobs, written sequentially
    Blobs(Vec<ArchiveBlob>),
}

impl Sources {
    /// Number of sources
    pub fn len(&self) -> usize {
        match self {
            Sources::Locations(locations) => locations.len(),
            Sources::Blobs(blobs) => blobs.len(),
        }
    }

    /// Whether there are no sources at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Input to one build operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRequest {
    /// Base name of the container and name of its single root folder
    pub output_name: String,
    /// What goes into the bundle
    pub sources: Sources,
    /// Per-build options
    #[serde(default)]
    pub options: ArchiveOptions,
}

/// One unit of concurrent retrieval work
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTask {
    /// Remote location to retrieve
    pub location: String,
    /// Destination file inside the scratch space
    pub destination: PathBuf,
}

/// Result of one [`FetchTask`]
#[derive(Debug)]
pub struct FetchOutcome {
    /// The task this outcome belongs to
    pub task: FetchTask,
    /// Bytes written on success, or the failure
    pub result: crate::Result<u64>,
}

/// Event emitted during a bundle build
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A build started
    BuildStarted {
        /// Bundle name
        output: String,
        /// Number of sources in the request
        sources: usize,
    },

    /// One source was written into the scratch space
    SourceMaterialized {
        /// Bundle name
        output: String,
        /// Entry name inside the bundle
        name: String,
        /// Bytes written
        size_bytes: u64,
    },

    /// The container was produced
    BuildCompleted {
        /// Bundle name
        output: String,
        /// Size of the container in bytes
        size_bytes: u64,
    },

    /// The build failed
    BuildFailed {
        /// Bundle name
        output: String,
        /// Machine-readable error code
        code: String,
    },
}
