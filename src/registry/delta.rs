//! Incremental change batches

use crate::registry::instance::ServiceInstance;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operation recorded for a changed instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOperation {
    Register,
    Remove,
}

/// One state transition the server wants replayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// The instance that changed
    pub instance: ServiceInstance,

    /// When the server recorded the change
    pub changed_at: DateTime<Utc>,

    /// Register or remove
    pub operation: ChangeOperation,
}

impl ChangeEvent {
    pub fn register(instance: ServiceInstance, changed_at: DateTime<Utc>) -> Self {
        Self {
            instance,
            changed_at,
            operation: ChangeOperation::Register,
        }
    }

    pub fn remove(instance: ServiceInstance, changed_at: DateTime<Utc>) -> Self {
        Self {
            instance,
            changed_at,
            operation: ChangeOperation::Remove,
        }
    }
}

/// Recent changes plus the server's total instance count at generation time
///
/// `changes` is ordered oldest first and must be replayed in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaRegistry {
    #[serde(default)]
    pub changes: Vec<ChangeEvent>,

    /// Authoritative number of live instances across all services
    pub total_count: u64,
}

impl DeltaRegistry {
    pub fn new(changes: Vec<ChangeEvent>, total_count: u64) -> Self {
        Self {
            changes,
            total_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
