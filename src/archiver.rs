//! Archiver: builds one bundle per call from URLs or in-memory blobs.
//!
//! Every build follows the same pipeline: acquire a scratch space, populate it
//! (fetcher or materializer), package it, and release the scratch space on every
//! exit path. Populating failures skip packaging; nothing is retried.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Result, ToHttpStatus};
use crate::fetcher::ParallelFetcher;
use crate::materializer::ByteMaterializer;
use crate::packager::{ContainerEncoder, Packager, ZipEncoder};
use crate::scratch::ScratchSpace;
use crate::transport::{HttpTransport, Transport};
use crate::types::{ArchiveBlob, ArchiveOptions, ArchiveRequest, Event, Sources};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Which populator fills the scratch space
enum Populate<'r> {
    Locations(&'r [String]),
    Blobs(&'r [ArchiveBlob]),
}

/// Bundle builder (cloneable - all fields are Arc-wrapped or cheap)
#[derive(Clone)]
pub struct Archiver {
    config: Arc<Config>,
    fetcher: ParallelFetcher,
    materializer: ByteMaterializer,
    packager: Packager,
    event_tx: broadcast::Sender<Event>,
}

impl Archiver {
    /// Create an archiver that fetches over HTTP and writes ZIP containers
    pub fn new(config: Config) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config.fetch)?);
        let encoder = Arc::new(ZipEncoder::new(config.packaging.compression));
        Self::with_parts(config, transport, encoder)
    }

    /// Create an archiver with a custom transport and container encoder
    pub fn with_parts(
        config: Config,
        transport: Arc<dyn Transport>,
        encoder: Arc<dyn ContainerEncoder>,
    ) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            fetcher: ParallelFetcher::new(transport, config.fetch.max_concurrent_fetches),
            materializer: ByteMaterializer,
            packager: Packager::new(encoder),
            config: Arc::new(config),
            event_tx,
        })
    }

    /// Subscribe to build events
    ///
    /// Events are dropped when nobody listens; a slow subscriber lags rather than
    /// slowing builds down.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The configuration this archiver was built with
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Fetch every location concurrently and bundle the results as `<output_name>/...`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use archive_bundler::{Archiver, ArchiveOptions, Config};
    ///
    /// # async fn example() -> archive_bundler::Result<()> {
    /// let archiver = Archiver::new(Config::default())?;
    /// let zip = archiver
    ///     .build_from_locations(
    ///         "bundle",
    ///         &["https://example.com/a.txt".to_string(), "https://example.com/b.txt".to_string()],
    ///         &ArchiveOptions::default(),
    ///     )
    ///     .await?;
    /// std::fs::write("bundle.zip", zip)?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn build_from_locations(
        &self,
        output_name: &str,
        locations: &[String],
        _options: &ArchiveOptions,
    ) -> Result<Vec<u8>> {
        self.emit_event(Event::BuildStarted {
            output: output_name.to_string(),
            sources: locations.len(),
        });

        let result = self.run(output_name, Populate::Locations(locations)).await;
        self.finish(output_name, result)
    }

    /// Write every blob and bundle them as `<output_name>/...`
    ///
    /// Blobs are written in order and the first failure stops the batch.
    pub async fn build_from_blobs(
        &self,
        output_name: &str,
        blobs: &[ArchiveBlob],
        _options: &ArchiveOptions,
    ) -> Result<Vec<u8>> {
        self.emit_event(Event::BuildStarted {
            output: output_name.to_string(),
            sources: blobs.len(),
        });

        let result = self.run(output_name, Populate::Blobs(blobs)).await;
        self.finish(output_name, result)
    }

    /// Build from a request, dispatching on its source variant
    pub async fn build(&self, request: &ArchiveRequest) -> Result<Vec<u8>> {
        match &request.sources {
            Sources::Locations(locations) => {
                self.build_from_locations(&request.output_name, locations, &request.options)
                    .await
            }
            Sources::Blobs(blobs) => {
                self.build_from_blobs(&request.output_name, blobs, &request.options)
                    .await
            }
        }
    }

    /// Scratch space lifecycle around populate + pack
    async fn run(&self, output_name: &str, populate: Populate<'_>) -> Result<Vec<u8>> {
        crate::utils::validate_entry_name(output_name)?;

        let scratch = ScratchSpace::acquire(&self.config.scratch).await?;
        let outcome = self.populate_and_pack(&scratch, output_name, populate).await;

        // Explicit release on the normal path; `Drop` covers cancellation and panics
        if let Err(e) = scratch.release().await {
            warn!(output = output_name, error = %e, "failed to release scratch space");
        }
        outcome
    }

    async fn populate_and_pack(
        &self,
        scratch: &ScratchSpace,
        output_name: &str,
        populate: Populate<'_>,
    ) -> Result<Vec<u8>> {
        let staged = match populate {
            Populate::Locations(locations) => self.fetcher.fetch_all(locations, scratch).await?,
            Populate::Blobs(blobs) => self.materializer.materialize_all(blobs, scratch).await?,
        };
        for entry in &staged {
            self.emit_event(Event::SourceMaterialized {
                output: output_name.to_string(),
                name: entry.name.clone(),
                size_bytes: entry.size_bytes,
            });
        }

        self.packager.pack(scratch, output_name).await
    }

    fn finish(&self, output_name: &str, result: Result<Vec<u8>>) -> Result<Vec<u8>> {
        match &result {
            Ok(bytes) => {
                info!(output = output_name, size_bytes = bytes.len(), "bundle built");
                self.emit_event(Event::BuildCompleted {
                    output: output_name.to_string(),
                    size_bytes: bytes.len() as u64,
                });
            }
            Err(e) => {
                warn!(
                    output = output_name,
                    error_code = e.error_code(),
                    error = %e,
                    "bundle build failed"
                );
                self.emit_event(Event::BuildFailed {
                    output: output_name.to_string(),
                    code: e.error_code().to_string(),
                });
            }
        }
        result
    }

    pub(crate) fn emit_event(&self, event: Event) {
        // send() only fails when there are no receivers
        self.event_tx.send(event).ok();
    }
}
