//! Registry data model
//!
//! A [`Snapshot`] maps service name to instance id to [`ServiceInstance`].
//! Snapshots are published behind an `Arc` and never change once shared;
//! updates always build a new one. [`DeltaRegistry`] carries a batch of
//! [`ChangeEvent`]s plus the server's authoritative instance count.

pub mod delta;
pub mod instance;
pub mod snapshot;

pub use delta::{ChangeEvent, ChangeOperation, DeltaRegistry};
pub use instance::ServiceInstance;
pub use snapshot::{MergeStats, Snapshot};
