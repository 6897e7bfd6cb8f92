/// tipwatch-live — Tip Sync
///
/// What it does:
///   1. Every POLL_INTERVAL_SECS loads the tips watchlist
///   2. Pulls the live fixture snapshot (API-Football)
///   3. Matches fixtures to tips, merges with the published set, writes it back
///   4. Empty watchlist → published set deleted
///
/// Run:
///   cargo run --bin tip-sync

use anyhow::Result;
use dotenv::dotenv;
use logger::EventLogger;
use fixture_feed::ApiFootballFeed;
use std::env;
use std::fs::File;
use std::sync::Arc;
use tip_engine::{source_from_location, CycleOutcome, SqlitePublishedStore, TipSync, TipSyncConfig};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let config = TipSyncConfig::from_env();

    info!("=== tipwatch-live — TIP SYNC ===");
    info!("Watchlist: {}", config.watchlist_source);
    info!("Feed: {} scope={}", config.feed.base_url, config.feed.scope);
    info!("Published set: {} [{}]", config.db_path, config.slot);
    info!(
        "Matching: mode={:?} names={} tolerance={}min naive tip times at UTC{}",
        config.match_mode, config.name_policy, config.time_tolerance_mins, config.tip_utc_offset
    );
    info!("Logs: ./{}/", config.log_dir);

    if config.feed.api_key.is_empty() && config.feed_is_default_host() {
        warn!("FEED_API_KEY is not set; the feed will most likely answer 401/403");
    }

    // Single instance lock: two writers would race on the published set
    let lock_file_path = env::temp_dir().join("tipwatch_tip_sync.lock");
    let lock_file = match File::create(&lock_file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create lock file at {:?}: {}", lock_file_path, e);
            return Ok(());
        }
    };

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another instance of tip-sync is already running! Exiting.");
            return Ok(());
        }
    };

    let store = SqlitePublishedStore::open(&config.db_path, config.slot.clone())?;
    let sync = TipSync::new(
        source_from_location(&config.watchlist_source, config.feed.timeout_secs),
        Arc::new(ApiFootballFeed::new(config.feed.clone())),
        Arc::new(store),
        config.matcher(),
    )
    .with_event_log(EventLogger::new(&config.log_dir))
    .with_tip_offset(config.tip_utc_offset);

    info!("Poll interval: {}s", config.poll_interval_secs);
    let mut ticker = interval(Duration::from_secs(config.poll_interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => {
                info!("Shutdown requested, no further cycles scheduled.");
                break;
            }
        }

        // Failures are logged inside the cycle; the next tick retries.
        match sync.run_cycle().await {
            Ok(CycleOutcome::Completed(_)) | Err(_) => {}
            Ok(CycleOutcome::Skipped) => warn!("Cycle skipped: previous one still in flight"),
        }
    }

    Ok(())
}
