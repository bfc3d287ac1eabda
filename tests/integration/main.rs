//! Integration tests for regcache

use chrono::Utc;
use regcache::{ChangeEvent, DeltaRegistry, ServiceInstance, Snapshot};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn inst(service: &str, id: &str, port: u16) -> ServiceInstance {
    ServiceInstance::new(service, id, "127.0.0.1", port)
}

fn write_json(path: &Path, value: &impl serde::Serialize) {
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

/// Temp dir holding `full.json` and `delta.json`
struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new(full: &Snapshot, delta: &DeltaRegistry) -> Self {
        let fixture = Self {
            dir: TempDir::new().unwrap(),
        };
        fixture.set_full(full);
        fixture.set_delta(delta);
        fixture
    }

    fn full_path(&self) -> PathBuf {
        self.dir.path().join("full.json")
    }

    fn delta_path(&self) -> PathBuf {
        self.dir.path().join("delta.json")
    }

    fn set_full(&self, full: &Snapshot) {
        write_json(&self.full_path(), full);
    }

    fn set_delta(&self, delta: &DeltaRegistry) {
        write_json(&self.delta_path(), delta);
    }
}

mod cache_tests {
    use super::*;
    use regcache::{CacheSettings, CachedServiceRegistry, FileTransport};
    use std::sync::Arc;
    use std::time::Duration;

    fn cache_for(fixture: &Fixture, interval: Duration) -> Arc<CachedServiceRegistry> {
        let transport = Arc::new(FileTransport::new(
            fixture.full_path(),
            fixture.delta_path(),
        ));
        let settings = CacheSettings {
            fetch_interval: interval,
            ..Default::default()
        };
        Arc::new(CachedServiceRegistry::new(transport, settings))
    }

    #[tokio::test]
    async fn delta_merge_then_drift_refetch() {
        let fixture = Fixture::new(
            &Snapshot::from_instances([inst("svcA", "i1", 1)]),
            &DeltaRegistry::new(
                vec![ChangeEvent::register(inst("svcA", "i2", 2), Utc::now())],
                2,
            ),
        );
        let cache = cache_for(&fixture, Duration::from_secs(30));

        cache.refresh_full().await.unwrap();
        let outcome = cache.sync_once().await.unwrap();
        assert!(!outcome.refetched);
        assert_eq!(cache.registry().total_count(), 2);

        // Server lost track of us: delta says 5, full registry is elsewhere
        let truth = Snapshot::from_instances([
            inst("svcB", "b1", 1),
            inst("svcB", "b2", 2),
            inst("svcB", "b3", 3),
            inst("svcC", "c1", 4),
            inst("svcC", "c2", 5),
        ]);
        fixture.set_full(&truth);
        fixture.set_delta(&DeltaRegistry::new(vec![], 5));

        let outcome = cache.sync_once().await.unwrap();
        assert!(outcome.refetched);
        assert_eq!(*cache.registry(), truth);
    }

    #[tokio::test]
    async fn reregistration_does_not_overwrite() {
        let original = inst("svcA", "i1", 1);
        let fixture = Fixture::new(
            &Snapshot::from_instances([original.clone()]),
            &DeltaRegistry::new(
                vec![ChangeEvent::register(inst("svcA", "i1", 9), Utc::now())],
                1,
            ),
        );
        let cache = cache_for(&fixture, Duration::from_secs(30));

        cache.refresh_full().await.unwrap();
        let outcome = cache.sync_once().await.unwrap();

        assert_eq!(outcome.merge.ignored, 1);
        assert_eq!(cache.registry().get("svcA", "i1"), Some(&original));
    }

    #[tokio::test]
    async fn malformed_delta_leaves_snapshot_alone() {
        let fixture = Fixture::new(
            &Snapshot::from_instances([inst("svcA", "i1", 1)]),
            &DeltaRegistry::default(),
        );
        std::fs::write(fixture.delta_path(), "[[[").unwrap();
        let cache = cache_for(&fixture, Duration::from_secs(30));

        cache.refresh_full().await.unwrap();
        assert!(cache.sync_once().await.is_err());
        assert_eq!(cache.registry().total_count(), 1);
    }

    #[tokio::test]
    async fn background_tasks_populate_and_stop() {
        let fixture = Fixture::new(
            &Snapshot::from_instances([inst("svcA", "i1", 1)]),
            &DeltaRegistry::new(
                vec![ChangeEvent::register(inst("svcA", "i2", 2), Utc::now())],
                2,
            ),
        );
        let cache = cache_for(&fixture, Duration::from_secs(1));

        cache.initialize().unwrap();
        // Readable immediately, possibly empty
        let _ = cache.registry().total_count();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while cache.registry().total_count() < 2 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(cache.registry().total_count(), 2);

        cache.destroy().await;
        let cycles = cache.metrics().cycles;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(cache.metrics().cycles, cycles);
    }
}

mod cli_tests {
    use super::*;
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn regcache(config_dir: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("regcache");
        cmd.env("REGCACHE_CONFIG", config_dir.path().join("config.toml"));
        cmd
    }

    #[test]
    fn help_displays() {
        let dir = TempDir::new().unwrap();
        regcache(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Client-side service registry cache"));
    }

    #[test]
    fn version_displays() {
        let dir = TempDir::new().unwrap();
        regcache(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("regcache"));
    }

    #[test]
    fn config_path_honours_env() {
        let dir = TempDir::new().unwrap();
        regcache(&dir)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let dir = TempDir::new().unwrap();
        regcache(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[fetch]"))
            .stdout(predicate::str::contains("interval_secs = 30"));
    }

    #[test]
    fn config_set_persists() {
        let dir = TempDir::new().unwrap();
        regcache(&dir)
            .args(["config", "set", "fetch.interval_secs", "7"])
            .assert()
            .success();

        regcache(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("interval_secs = 7"));
    }

    #[test]
    fn config_set_rejects_zero_interval() {
        let dir = TempDir::new().unwrap();
        regcache(&dir)
            .args(["config", "set", "fetch.interval_secs", "0"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("interval_secs"));
    }

    #[test]
    fn invalid_config_file_fails_with_hint() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[fetch\n").unwrap();
        regcache(&dir)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn watch_reports_bootstrap_snapshot() {
        let dir = TempDir::new().unwrap();
        let fixture = Fixture::new(
            &Snapshot::from_instances([
                inst("orders", "o1", 1),
                inst("orders", "o2", 2),
                inst("billing", "b1", 3),
            ]),
            &DeltaRegistry::new(vec![], 3),
        );

        regcache(&dir)
            .arg("watch")
            .arg("--full")
            .arg(fixture.full_path())
            .arg("--delta")
            .arg(fixture.delta_path())
            .args(["--interval-secs", "1", "--cycles", "1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("orders"))
            .stdout(predicate::str::contains("total: 3 instances"));
    }
}
