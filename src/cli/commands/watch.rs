//! Watch command - run the cache against JSON files and report its contents

use crate::cache::{delayed_ticker, CachedServiceRegistry};
use crate::cli::args::WatchArgs;
use crate::config::Config;
use crate::error::RegCacheResult;
use crate::registry::Snapshot;
use crate::transport::FileTransport;
use console::style;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Execute the watch command
pub async fn execute(args: WatchArgs, config: &Config) -> RegCacheResult<()> {
    let mut settings = config.cache_settings();
    if let Some(secs) = args.interval_secs {
        settings.fetch_interval = Duration::from_secs(secs.max(1));
    }

    let transport = Arc::new(FileTransport::new(args.full, args.delta));
    let cache = Arc::new(CachedServiceRegistry::new(transport, settings));
    cache.initialize()?;

    // Report halfway between delta cycles so each report follows a cycle
    let period = settings.effective_fetch_interval();
    let mut ticker = delayed_ticker(period / 2, period);

    let mut reports = 0u32;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                print_report(&cache.registry(), &cache);
                reports += 1;
                if args.cycles.is_some_and(|n| reports >= n) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping cache");
                break;
            }
        }
    }

    cache.destroy().await;
    Ok(())
}

fn print_report(snapshot: &Snapshot, cache: &CachedServiceRegistry) {
    let metrics = cache.metrics();

    println!("{:<32} {:>9}", style("SERVICE").bold(), style("INSTANCES").bold());
    for (service, count) in service_counts(snapshot) {
        println!("{:<32} {:>9}", service, count);
    }
    println!(
        "total: {} instances (cycles {}, failed {}, refetches {})",
        snapshot.total_count(),
        metrics.cycles,
        metrics.failed_cycles,
        metrics.refetches
    );
}

/// Per-service instance counts sorted by service name
fn service_counts(snapshot: &Snapshot) -> Vec<(&str, usize)> {
    let mut counts: Vec<(&str, usize)> = snapshot
        .services()
        .iter()
        .map(|(name, instances)| (name.as_str(), instances.len()))
        .collect();
    counts.sort_unstable_by(|a, b| a.0.cmp(b.0));
    counts
}
