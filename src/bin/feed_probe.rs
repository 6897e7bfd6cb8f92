//! Dry run: one load → fetch → match → reconcile pass, nothing written.
//! Prints every matched fixture with the tip that backs it.
//!
//! Run: cargo run --bin feed-probe

use anyhow::Result;
use dotenv::dotenv;
use fixture_feed::{ApiFootballFeed, FeedShape, FixtureFeed};
use tip_engine::{reconcile, source_from_location, watchlist, TipSyncConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        )
        .init();

    let config = TipSyncConfig::from_env();
    let matcher = config.matcher();

    info!("=== FEED PROBE (dry run, store untouched) ===");

    let source = source_from_location(&config.watchlist_source, config.feed.timeout_secs);
    let tips = watchlist::load(source.as_ref(), matcher.normalizer(), config.tip_utc_offset).await?;
    info!("Watchlist {}: {} tips ({} dropped)", source.describe(), tips.len(), tips.dropped);
    for tip in &tips.entries {
        info!("  tip: {tip}");
    }

    let feed = ApiFootballFeed::new(config.feed.clone());
    let snapshot = feed.fetch().await?;
    if let FeedShape::Malformed(reason) = &snapshot.shape {
        warn!("Feed payload malformed ({reason}); continuing with zero fixtures");
    }
    info!(
        "Feed scope={}: {} fixtures, {} skipped, {} without id",
        feed.scope(),
        snapshot.fixtures.len(),
        snapshot.skipped,
        snapshot.synthetic_ids
    );

    let mut matched = Vec::new();
    for fixture in snapshot.fixtures {
        match matcher.first_match(&fixture, &tips) {
            Some(tip) => {
                info!(
                    "MATCH [{}] {} vs {} ({}, {}) ← {tip}",
                    fixture.id, fixture.home, fixture.away, fixture.region, fixture.status
                );
                matched.push(fixture);
            }
            None => tracing::debug!("no tip for {} vs {}", fixture.home, fixture.away),
        }
    }

    let outcome = reconcile(&matcher, &tips, matched, None);
    info!(
        "Would {} {} fixtures (nothing written)",
        outcome.action.as_str(),
        outcome.published.len()
    );

    Ok(())
}
