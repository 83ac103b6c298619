//! Shared test helpers: an in-memory transport with scripted responses.

use crate::error::{ArchiveError, Result};
use crate::transport::{BodyStream, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// How the fake answers one location
#[derive(Clone, Debug)]
pub(crate) enum Scripted {
    /// Body delivered after `delay`
    Body { content: Vec<u8>, delay: Duration },
    /// Retrieval itself fails
    Unreachable,
    /// First chunk arrives, then the connection drops
    BrokenBody { first_chunk: Vec<u8> },
}

/// Transport answering from a fixed script, counting calls and peak concurrency
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: HashMap<String, Scripted>,
    pub(crate) calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub(crate) peak_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn body(mut self, location: &str, content: &[u8], delay_ms: u64) -> Self {
        self.responses.insert(
            location.to_string(),
            Scripted::Body {
                content: content.to_vec(),
                delay: Duration::from_millis(delay_ms),
            },
        );
        self
    }

    pub(crate) fn unreachable(mut self, location: &str) -> Self {
        self.responses
            .insert(location.to_string(), Scripted::Unreachable);
        self
    }

    pub(crate) fn broken_body(mut self, location: &str, first_chunk: &[u8]) -> Self {
        self.responses.insert(
            location.to_string(),
            Scripted::BrokenBody {
                first_chunk: first_chunk.to_vec(),
            },
        );
        self
    }

    pub(crate) fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn retrieve(&self, location: &str) -> Result<BodyStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let scripted = self.responses.get(location).cloned();
        let result = match scripted {
            Some(Scripted::Body { content, delay }) => {
                tokio::time::sleep(delay).await;
                Ok(futures::stream::iter(vec![Ok(Bytes::from(content))]).boxed())
            }
            Some(Scripted::BrokenBody { first_chunk }) => Ok(futures::stream::iter(vec![
                Ok(Bytes::from(first_chunk)),
                Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                )),
            ])
            .boxed()),
            Some(Scripted::Unreachable) | None => Err(ArchiveError::RetrievalFailed {
                location: location.to_string(),
                reason: "host unreachable".to_string(),
            }
            .into()),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Decode a ZIP buffer into sorted (entry name, content) pairs, skipping directories
pub(crate) fn zip_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        if file.is_dir() {
            continue;
        }
        let mut content = Vec::new();
        file.read_to_end(&mut content).unwrap();
        entries.push((file.name().to_string(), content));
    }
    entries.sort();
    entries
}

/// Number of entries (files and directories) directly below `dir`
pub(crate) fn dir_len(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
