//! Parallel fetcher: retrieves remote sources into a scratch space.
//!
//! Each location becomes a [`FetchTask`] with its own destination file and its
//! own spawned task. A semaphore bounds how many retrieve at once. Every outcome
//! goes onto a completion queue sized to the task count, so reporting never waits
//! on the reader. The caller awaits every task before looking at any outcome, then
//! drains the queue in arrival order and returns the first failure it sees.

use std::sync::Arc;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{ArchiveError, Error, Result};
use crate::scratch::ScratchSpace;
use crate::transport::Transport;
use crate::types::{FetchOutcome, FetchTask};
use crate::utils::{dedupe_names, file_name_from_location, validate_entry_name};

/// A source that has been written into the scratch space
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedEntry {
    /// File name inside the staging directory (and the bundle)
    pub name: String,
    /// Bytes written
    pub size_bytes: u64,
}

/// Retrieves many locations at once through a [`Transport`]
#[derive(Clone)]
pub struct ParallelFetcher {
    transport: Arc<dyn Transport>,
    max_concurrent: Option<usize>,
}

impl ParallelFetcher {
    /// Create a fetcher; `max_concurrent = None` lets every location retrieve at once
    pub fn new(transport: Arc<dyn Transport>, max_concurrent: Option<usize>) -> Self {
        Self {
            transport,
            max_concurrent,
        }
    }

    /// Fetch every location into `scratch`'s staging directory
    ///
    /// Names are derived and validated before anything is retrieved. Once tasks
    /// are running there is no cancellation: every task finishes, and only then
    /// is the first failure (in completion order) returned. Files written by tasks
    /// that succeeded stay in the scratch space for its owner to discard.
    pub async fn fetch_all(
        &self,
        locations: &[String],
        scratch: &ScratchSpace,
    ) -> Result<Vec<StagedEntry>> {
        let tasks = plan_tasks(locations, scratch)?;
        let total = tasks.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let permits = self
            .max_concurrent
            .unwrap_or(tokio::sync::Semaphore::MAX_PERMITS)
            .max(1);
        debug!(tasks = total, permits = permits.min(total), "spawning fetch tasks");

        let limit = Arc::new(tokio::sync::Semaphore::new(permits));
        // One slot per task: a task can always report without waiting
        let (done_tx, mut done_rx) = mpsc::channel::<FetchOutcome>(total);

        let mut handles = Vec::with_capacity(total);
        for task in tasks {
            let limit = Arc::clone(&limit);
            let done_tx = done_tx.clone();
            let transport = Arc::clone(&self.transport);

            handles.push(tokio::spawn(async move {
                // Held until the outcome is reported
                let Ok(_permit) = limit.acquire_owned().await else {
                    return;
                };

                let result = fetch_one(transport.as_ref(), &task).await;
                debug!(
                    location = %task.location,
                    ok = result.is_ok(),
                    "fetch task finished"
                );
                let _ = done_tx.send(FetchOutcome { task, result }).await;
            }));
        }
        drop(done_tx);

        // Completion barrier: nothing is inspected until every task has stopped
        let joined = futures::future::join_all(handles).await;
        let panicked = joined.iter().filter(|j| j.is_err()).count();

        let mut staged = Vec::with_capacity(total);
        let mut first_failure: Option<Error> = None;
        while let Ok(outcome) = done_rx.try_recv() {
            match outcome.result {
                Ok(size_bytes) => staged.push(StagedEntry {
                    name: entry_name(&outcome.task),
                    size_bytes,
                }),
                Err(e) if first_failure.is_none() => first_failure = Some(e),
                Err(e) => debug!(
                    location = %outcome.task.location,
                    error = %e,
                    "discarding additional fetch failure"
                ),
            }
        }

        if let Some(e) = first_failure {
            return Err(e);
        }

        if panicked > 0 || staged.len() != total {
            warn!(
                panicked,
                reported = staged.len(),
                expected = total,
                "fetch tasks stopped before reporting an outcome"
            );
            return Err(Error::Other(format!(
                "{} of {} fetch tasks did not report an outcome",
                total - staged.len(),
                total
            )));
        }

        Ok(staged)
    }
}

/// Turn locations into tasks with distinct, validated destination files
pub(crate) fn plan_tasks(locations: &[String], scratch: &ScratchSpace) -> Result<Vec<FetchTask>> {
    let mut names = Vec::with_capacity(locations.len());
    for location in locations {
        let name = file_name_from_location(location);
        validate_entry_name(&name)?;
        names.push(name);
    }

    Ok(locations
        .iter()
        .zip(dedupe_names(names))
        .map(|(location, name)| FetchTask {
            location: location.clone(),
            destination: scratch.entry_path(&name),
        })
        .collect())
}

fn entry_name(task: &FetchTask) -> String {
    task.destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Retrieve one location and stream its body into the task's destination
async fn fetch_one(transport: &dyn Transport, task: &FetchTask) -> Result<u64> {
    let mut body = transport.retrieve(&task.location).await?;

    let mut file = tokio::fs::File::create(&task.destination)
        .await
        .map_err(|source| ArchiveError::DestinationCreateFailed {
            path: task.destination.clone(),
            source,
        })?;

    let write_failed = |source: std::io::Error| ArchiveError::DestinationWriteFailed {
        path: task.destination.clone(),
        source,
    };

    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(write_failed)?;
        file.write_all(&chunk).await.map_err(write_failed)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(write_failed)?;

    Ok(written)
}
