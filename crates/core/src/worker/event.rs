//! Lifecycle events and the deferral mechanism handlers use to extend them.

use std::future::Future;

use tokio::task::JoinSet;

use super::proxy::{ActivateReport, FetchOutcome, InstallReport};
use crate::Error;
use crate::http::ProxyRequest;

/// Signals the host delivers to the worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(ProxyRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Install,
    Activate,
    Fetch,
}

impl WorkerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            WorkerEvent::Install => EventKind::Install,
            WorkerEvent::Activate => EventKind::Activate,
            WorkerEvent::Fetch(_) => EventKind::Fetch,
        }
    }
}

/// What a handled event produced.
#[derive(Debug)]
pub enum EventOutcome {
    Installed(InstallReport),
    Activated(ActivateReport),
    Responded(FetchOutcome),
}

/// Event lifetime that handlers can extend with background work.
///
/// The host awaits [`ExtendableEvent::settled`] before it considers the
/// event finished. Dropping the event aborts whatever is still pending,
/// the same as the host terminating the worker between events.
#[derive(Debug)]
pub struct ExtendableEvent {
    kind: EventKind,
    pending: JoinSet<Result<(), Error>>,
}

impl ExtendableEvent {
    pub fn new(kind: EventKind) -> Self {
        Self { kind, pending: JoinSet::new() }
    }

    /// Keep the event alive until `task` completes.
    pub fn wait_until<F>(&mut self, task: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        self.pending.spawn(task);
    }

    /// Number of tasks not yet collected.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Wait for every extension and return the ones that failed.
    pub async fn settled(mut self) -> Vec<Error> {
        let mut failures = Vec::new();
        while let Some(joined) = self.pending.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => failures.push(e),
                Err(e) => tracing::warn!(kind = ?self.kind, "event extension did not complete: {e}"),
            }
        }
        failures
    }
}
