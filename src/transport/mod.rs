//! Registry transport abstraction
//!
//! The cache never talks to the network itself. Anything that can hand
//! back a full [`Snapshot`] or a [`DeltaRegistry`] implements
//! [`RegistryTransport`]; HTTP or gRPC clients live outside this crate.

mod file;

pub use file::FileTransport;

use crate::error::RegCacheResult;
use crate::registry::{DeltaRegistry, Snapshot};
use async_trait::async_trait;
use std::time::Duration;

/// Source of registry state
///
/// Implementations own their timeouts: a call that never returns stalls
/// the task that made it.
#[async_trait]
pub trait RegistryTransport: Send + Sync {
    /// Fetch the complete, internally consistent registry
    async fn fetch_full_registry(&self) -> RegCacheResult<Snapshot>;

    /// Fetch changes recorded within `window`, oldest first, plus the
    /// server's current total instance count
    async fn fetch_delta_registry(&self, window: Duration) -> RegCacheResult<DeltaRegistry>;

    /// Human-readable transport name for logs
    fn transport_name(&self) -> &'static str;
}
