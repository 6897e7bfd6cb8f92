use anyhow::{Context, Result};
use fixture_feed::FixtureRecord;
use tip_engine::SqlitePublishedStore;

#[tokio::main]
async fn main() -> Result<()> {
    let db_path = std::env::var("PUBLISHED_DB_PATH").unwrap_or_else(|_| "data/published.db".to_string());
    let slot = std::env::var("PUBLISHED_SLOT").unwrap_or_else(|_| "live_matches".to_string());

    let store = SqlitePublishedStore::open(&db_path, slot.clone())
        .with_context(|| format!("open db at {db_path}"))?;

    println!("db_path={db_path}");
    println!("slot={slot}");

    let Some(row) = store.read_row().await.context("read published set")? else {
        println!("published: <absent> (cleared or never written)");
        return Ok(());
    };

    println!("last_write: {}", row.ts);
    println!("published: {}", row.payloads.len());

    for payload in row.payloads {
        match FixtureRecord::from_payload(payload) {
            Some(f) => println!(
                "  [{}] {} vs {} ({}) status={} kickoff={}",
                f.id,
                f.home,
                f.away,
                if f.region.is_empty() { "?" } else { f.region.as_str() },
                f.status,
                f.scheduled_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "?".to_string()),
            ),
            None => println!("  <unreadable entry>"),
        }
    }

    Ok(())
}
