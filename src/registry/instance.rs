//! Registered service instance

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One registered endpoint, identified by `(service_name, instance_id)`
///
/// Fields are private: an instance is replaced as a whole, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    service_name: String,
    instance_id: String,
    host: String,
    port: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, String>,
}

impl ServiceInstance {
    /// Create a new instance without metadata
    pub fn new(
        service_name: impl Into<String>,
        instance_id: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            instance_id: instance_id.into(),
            host: host.into(),
            port,
            metadata: BTreeMap::new(),
        }
    }

    /// Return a copy of this instance carrying `metadata`
    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// `host:port` form for dialing
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
