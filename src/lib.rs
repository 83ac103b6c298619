//! # archive-bundler
//!
//! Builds a single ZIP bundle from many sources and returns it as bytes.
//!
//! ## How a build works
//!
//! - A uniquely named **scratch space** is created for the build
//! - Sources are staged into it: remote locations are fetched **concurrently**,
//!   in-memory blobs are written **sequentially**
//! - The staged files are packaged under one root folder named after the bundle
//! - The container is read back into memory and the scratch space is removed,
//!   whether the build succeeded or not
//!
//! Any failure is terminal: the caller gets exactly one structured error and never
//! a partial bundle.
//!
//! ## Quick Start
//!
//! ```no_run
//! use archive_bundler::{ArchiveBlob, ArchiveOptions, Archiver, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let archiver = Archiver::new(Config::default())?;
//!
//!     let zip = archiver
//!         .build_from_blobs(
//!             "bundle",
//!             &[ArchiveBlob::new("hello.txt", "hi")],
//!             &ArchiveOptions::default(),
//!         )
//!         .await?;
//!
//!     std::fs::write("bundle.zip", zip)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Bundle orchestration
pub mod archiver;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Concurrent retrieval of remote sources
pub mod fetcher;
/// Sequential staging of in-memory blobs
pub mod materializer;
/// Container encoding
pub mod packager;
/// Self-removing staging directories
pub mod scratch;
/// Network transport abstraction
pub mod transport;
/// Core types and events
pub mod types;
/// Entry-name helpers
pub mod utils;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use archiver::Archiver;
pub use config::{Compression, Config, FetchConfig, PackagingConfig, ScratchConfig};
pub use error::{ApiError, ArchiveError, Error, ErrorDetail, FailureKind, Result, ToHttpStatus};
pub use fetcher::{ParallelFetcher, StagedEntry};
pub use materializer::ByteMaterializer;
pub use packager::{ContainerEncoder, Packager, TreeEntry, ZipEncoder};
pub use scratch::ScratchSpace;
pub use transport::{BodyStream, HttpTransport, Transport};
pub use types::{ArchiveBlob, ArchiveOptions, ArchiveRequest, Event, FetchOutcome, FetchTask, Sources};
