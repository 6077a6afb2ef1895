//! The caching proxy worker and the host pieces around it.
//!
//! - [`CacheProxy`] owns the caching policy: install-time precaching,
//!   activation-time eviction of stale generations, and request routing
//!   (network-first for navigations, cache-first for everything else).
//! - [`Registration`] is the host side: it drives the lifecycle state
//!   machine and dispatches [`WorkerEvent`]s to the proxy.
//! - [`Clients`] tracks which open pages the worker controls.
//! - [`ExtendableEvent`] lets a handler hand background work back to the
//!   host, which keeps the event alive until that work settles.

pub mod clients;
pub mod event;
pub mod proxy;
pub mod registration;

#[cfg(test)]
pub(crate) mod testing;

pub use clients::Clients;
pub use event::{EventKind, EventOutcome, ExtendableEvent, WorkerEvent};
pub use proxy::{ActivateReport, CacheProxy, FetchOutcome, InstallReport, ProxyConfig, ResponseSource};
pub use registration::{Registration, UpdateReport, WorkerState};
