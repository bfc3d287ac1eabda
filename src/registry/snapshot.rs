//! Point-in-time registry snapshot and delta merge

use crate::error::{RegCacheError, RegCacheResult};
use crate::registry::delta::{ChangeEvent, ChangeOperation};
use crate::registry::instance::ServiceInstance;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Instances of one service, keyed by instance id
pub type InstanceMap = HashMap<String, ServiceInstance>;

/// Full cached view: service name -> instance id -> instance
///
/// Serialized as the bare two-level map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    services: HashMap<String, InstanceMap>,
}

/// Outcome counters for one merge pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// REGISTER events that added a new instance
    pub inserted: usize,
    /// REGISTER events for an id already present (first-seen wins)
    pub ignored: usize,
    /// REMOVE events that deleted an instance
    pub removed: usize,
    /// REMOVE events for an absent service or id
    pub missing: usize,
}

impl MergeStats {
    pub fn applied(&self) -> usize {
        self.inserted + self.removed
    }
}

impl Snapshot {
    /// Empty snapshot, as seen before the first fetch lands
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from instances, filing each under its own identity
    ///
    /// Duplicate identities keep the last instance given.
    pub fn from_instances(instances: impl IntoIterator<Item = ServiceInstance>) -> Self {
        let mut services: HashMap<String, InstanceMap> = HashMap::new();
        for inst in instances {
            services
                .entry(inst.service_name().to_string())
                .or_default()
                .insert(inst.instance_id().to_string(), inst);
        }
        Self { services }
    }

    /// Build a snapshot from a raw map, rejecting entries filed under the wrong key
    pub fn try_from_map(services: HashMap<String, InstanceMap>) -> RegCacheResult<Self> {
        let snapshot = Self { services };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Check that every instance is filed under its declared `(service, id)`
    pub fn validate(&self) -> RegCacheResult<()> {
        for (service, instances) in &self.services {
            for (id, inst) in instances {
                if inst.service_name() != service || inst.instance_id() != id {
                    return Err(RegCacheError::IdentityMismatch {
                        filed_service: service.clone(),
                        filed_id: id.clone(),
                        declared_service: inst.service_name().to_string(),
                        declared_id: inst.instance_id().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// All services with their instance maps
    pub fn services(&self) -> &HashMap<String, InstanceMap> {
        &self.services
    }

    /// Instances registered under `service`, if the service is known
    pub fn instances(&self, service: &str) -> Option<&InstanceMap> {
        self.services.get(service)
    }

    pub fn get(&self, service: &str, instance_id: &str) -> Option<&ServiceInstance> {
        self.services.get(service)?.get(instance_id)
    }

    /// Number of service entries, including services left with no instances
    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    /// Instances summed across all services
    pub fn total_count(&self) -> u64 {
        self.services.values().map(|m| m.len() as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }

    /// Replay `changes` in order
    ///
    /// REGISTER inserts only when the id is absent: an instance already
    /// present is kept and the incoming one dropped. REMOVE of an unknown
    /// service or id is a no-op. Service maps emptied by REMOVE are kept.
    pub fn apply_changes(&mut self, changes: &[ChangeEvent]) -> MergeStats {
        let mut stats = MergeStats::default();

        for change in changes {
            let service = change.instance.service_name();
            let id = change.instance.instance_id();

            match change.operation {
                ChangeOperation::Register => {
                    let instances = self.services.entry(service.to_string()).or_default();
                    if instances.contains_key(id) {
                        debug!(service, instance_id = id, "Ignoring register for known instance");
                        stats.ignored += 1;
                    } else {
                        instances.insert(id.to_string(), change.instance.clone());
                        stats.inserted += 1;
                    }
                }
                ChangeOperation::Remove => {
                    let removed = self
                        .services
                        .get_mut(service)
                        .and_then(|instances| instances.remove(id));
                    if removed.is_some() {
                        stats.removed += 1;
                    } else {
                        stats.missing += 1;
                    }
                }
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn inst(service: &str, id: &str, port: u16) -> ServiceInstance {
        ServiceInstance::new(service, id, "10.0.0.1", port)
    }

    fn register(i: ServiceInstance) -> ChangeEvent {
        ChangeEvent::register(i, Utc::now())
    }

    fn remove(i: ServiceInstance) -> ChangeEvent {
        ChangeEvent::remove(i, Utc::now())
    }

    #[test]
    fn empty_snapshot_has_no_instances() {
        let snap = Snapshot::empty();
        assert!(snap.is_empty());
        assert_eq!(snap.total_count(), 0);
        assert!(snap.instances("orders").is_none());
    }

    #[test]
    fn register_inserts_into_new_service() {
        let mut snap = Snapshot::from_instances([inst("svcA", "i1", 1)]);
        let stats = snap.apply_changes(&[register(inst("svcA", "i2", 2))]);

        assert_eq!(stats.inserted, 1);
        assert_eq!(snap.total_count(), 2);
        assert_eq!(snap.get("svcA", "i2").unwrap().port(), 2);
    }

    #[test]
    fn register_on_existing_id_keeps_first_seen() {
        let original = inst("svcA", "i1", 1);
        let mut snap = Snapshot::from_instances([original.clone()]);

        let stats = snap.apply_changes(&[register(inst("svcA", "i1", 9999))]);

        assert_eq!(stats.ignored, 1);
        assert_eq!(stats.inserted, 0);
        assert_eq!(snap.get("svcA", "i1"), Some(&original));
    }

    #[test]
    fn duplicate_registers_in_one_batch_keep_the_first() {
        let mut snap = Snapshot::empty();
        snap.apply_changes(&[register(inst("svcA", "i1", 1)), register(inst("svcA", "i1", 2))]);
        assert_eq!(snap.get("svcA", "i1").unwrap().port(), 1);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut snap = Snapshot::from_instances([inst("svcA", "i1", 1)]);
        let before = snap.clone();

        let stats = snap.apply_changes(&[
            remove(inst("svcA", "missing", 1)),
            remove(inst("nosuch", "i1", 1)),
        ]);

        assert_eq!(stats.missing, 2);
        assert_eq!(snap, before);
    }

    #[test]
    fn register_then_remove_leaves_no_entry() {
        let mut snap = Snapshot::empty();
        let a = inst("svcA", "A", 1);
        snap.apply_changes(&[register(a.clone()), remove(a)]);
        assert!(snap.get("svcA", "A").is_none());
        assert_eq!(snap.total_count(), 0);
    }

    #[test]
    fn remove_then_register_leaves_entry() {
        let mut snap = Snapshot::empty();
        let a = inst("svcA", "A", 1);
        let stats = snap.apply_changes(&[remove(a.clone()), register(a.clone())]);
        assert_eq!(snap.get("svcA", "A"), Some(&a));
        assert_eq!(stats.missing, 1);
        assert_eq!(stats.applied(), 1);
    }

    #[test]
    fn emptied_service_is_kept_but_not_counted() {
        let a = inst("svcA", "A", 1);
        let mut snap = Snapshot::from_instances([a.clone()]);
        snap.apply_changes(&[remove(a)]);

        assert_eq!(snap.service_count(), 1);
        assert!(snap.instances("svcA").unwrap().is_empty());
        assert_eq!(snap.total_count(), 0);
    }

    #[test]
    fn try_from_map_rejects_misfiled_instance() {
        let mut inner = InstanceMap::new();
        inner.insert("i1".to_string(), inst("svcB", "i1", 1));
        let mut map = HashMap::new();
        map.insert("svcA".to_string(), inner);

        let err = Snapshot::try_from_map(map).unwrap_err();
        assert!(matches!(err, RegCacheError::IdentityMismatch { .. }));
    }

    #[test]
    fn snapshot_json_is_bare_map() {
        let snap = Snapshot::from_instances([inst("svcA", "i1", 1)]);
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["svcA"]["i1"]["port"], 1);

        let parsed: Snapshot = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, snap);
    }
}
