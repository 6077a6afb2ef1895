//! Host-side lifecycle: the worker state machine and event dispatch.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::clients::Clients;
use super::event::{EventOutcome, ExtendableEvent, WorkerEvent};
use super::proxy::{ActivateReport, CacheProxy, FetchOutcome, InstallReport, ResponseSource};
use crate::Error;
use crate::http::ProxyRequest;
use crate::network::Network;

/// Lifecycle of one worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    /// Installed and waiting to activate.
    Installed,
    Activating,
    Activated,
    /// Failed to install, or superseded.
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// Result of [`Registration::update`].
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct UpdateReport {
    pub install: InstallReport,
    /// None while the new version waits for older clients to go away.
    pub activation: Option<ActivateReport>,
}

/// A registered worker version and the clients it may control.
pub struct Registration<N> {
    proxy: CacheProxy<N>,
    state: RwLock<WorkerState>,
    clients: Clients,
}

impl<N: Network> Registration<N> {
    pub fn new(proxy: CacheProxy<N>) -> Self {
        Self { proxy, state: RwLock::new(WorkerState::Parsed), clients: Clients::new() }
    }

    pub fn proxy(&self) -> &CacheProxy<N> {
        &self.proxy
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    async fn transition(&self, from: &[WorkerState], to: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        let current = *state;
        if !from.contains(&current) {
            return Err(Error::InvalidState(format!("cannot move to {to} while {current}")));
        }
        tracing::debug!(from = %current, %to, "worker state change");
        *state = to;
        Ok(())
    }

    async fn set_state(&self, to: WorkerState) {
        *self.state.write().await = to;
    }

    /// Run the install handler. A failed install leaves the worker redundant.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(&[WorkerState::Parsed, WorkerState::Redundant], WorkerState::Installing)
            .await?;

        match self.proxy.install().await {
            Ok(report) => {
                self.set_state(WorkerState::Installed).await;
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(cache = %self.proxy.config().cache_name, "install failed: {e}");
                self.set_state(WorkerState::Redundant).await;
                Err(e)
            }
        }
    }

    /// Run the activate handler. Only an installed worker can activate;
    /// on failure it stays installed so activation can be retried.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.transition(&[WorkerState::Installed], WorkerState::Activating)
            .await?;

        match self.proxy.activate(&self.clients).await {
            Ok(report) => {
                self.set_state(WorkerState::Activated).await;
                tracing::info!(cache = %report.kept, deleted = report.deleted.len(), claimed = report.claimed, "worker activated");
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(cache = %self.proxy.config().cache_name, "activate failed: {e}");
                self.set_state(WorkerState::Installed).await;
                Err(e)
            }
        }
    }

    /// Install, then activate unless the worker must wait for clients
    /// still controlled by an older generation.
    pub async fn update(&self) -> Result<UpdateReport, Error> {
        let install = self.install().await?;

        let generation = &self.proxy.config().cache_name;
        let must_wait = !install.skip_waiting && self.clients.controlled_by_other(generation).await;
        if must_wait {
            tracing::info!(cache = %generation, "installed worker is waiting");
            return Ok(UpdateReport { install, activation: None });
        }

        let activation = self.activate().await?;
        Ok(UpdateReport { install, activation: Some(activation) })
    }

    /// Route a request through the worker, or straight to the network when
    /// the worker is not active or the requesting page is not controlled.
    ///
    /// A navigation brings its client under this worker's control.
    pub async fn fetch(&self, request: &ProxyRequest, event: &mut ExtendableEvent) -> Result<FetchOutcome, Error> {
        if self.state().await != WorkerState::Activated {
            return self.passthrough(request).await;
        }

        let generation = &self.proxy.config().cache_name;
        if let Some(id) = &request.client_id {
            if request.is_navigation() {
                self.clients.control(id, generation).await;
            } else {
                self.clients.connect(id).await;
                if self.clients.controller(id).await.as_deref() != Some(generation.as_str()) {
                    return self.passthrough(request).await;
                }
            }
        }

        self.proxy.fetch(request, event).await
    }

    async fn passthrough(&self, request: &ProxyRequest) -> Result<FetchOutcome, Error> {
        tracing::debug!(url = %request.url, "bypassing worker");
        let response = self.proxy.network().fetch(request).await?;
        Ok(FetchOutcome { response, source: ResponseSource::Passthrough })
    }

    /// Deliver one event to its handler.
    pub async fn dispatch(&self, event: WorkerEvent, lifetime: &mut ExtendableEvent) -> Result<EventOutcome, Error> {
        tracing::debug!(kind = ?event.kind(), "dispatching worker event");
        match event {
            WorkerEvent::Install => self.install().await.map(EventOutcome::Installed),
            WorkerEvent::Activate => self.activate().await.map(EventOutcome::Activated),
            WorkerEvent::Fetch(request) => self.fetch(&request, lifetime).await.map(EventOutcome::Responded),
        }
    }
}
