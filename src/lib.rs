//! regcache - client-side service registry cache
//!
//! Keeps an eventually consistent local copy of a remote service registry.
//! A full snapshot is fetched at startup; a periodic task merges recent
//! change events and reconciles the instance count against the server,
//! refetching in full when the two disagree. Reads never block.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod registry;
pub mod transport;

pub use cache::{CacheSettings, CachedServiceRegistry, CycleOutcome};
pub use error::{RegCacheError, RegCacheResult};
pub use registry::{ChangeEvent, ChangeOperation, DeltaRegistry, ServiceInstance, Snapshot};
pub use transport::{FileTransport, RegistryTransport};
