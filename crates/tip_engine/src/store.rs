//! Published-set stores.
//!
//! Whole-collection semantics only: read, overwrite, clear. `None` from `read`
//! means "nothing published / cleared", which is different from an empty list.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use fixture_feed::FixtureRecord;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;

pub const DEFAULT_SLOT: &str = "live_matches";

/// What `read` found in the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredSet {
    pub fixtures:   Vec<FixtureRecord>,
    /// Stored entries that no longer parse as fixtures. Non-zero means the
    /// stored set differs from `fixtures` and must be rewritten.
    pub unreadable: usize,
}

impl StoredSet {
    pub fn is_clean(&self) -> bool {
        self.unreadable == 0
    }
}

#[async_trait]
pub trait PublishedStore: Send + Sync {
    async fn read(&self) -> Result<Option<StoredSet>>;

    async fn overwrite(&self, fixtures: &[FixtureRecord]) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Re-parse stored payloads. Entries that no longer parse are left out and counted.
fn records_from_payloads(payloads: Vec<Value>) -> StoredSet {
    let total = payloads.len();
    let fixtures: Vec<FixtureRecord> = payloads.into_iter().filter_map(FixtureRecord::from_payload).collect();
    let unreadable = total - fixtures.len();
    if unreadable > 0 {
        warn!("published set: {unreadable} stored entries unreadable");
    }
    StoredSet { fixtures, unreadable }
}

// ── SQLite ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PublishedRow {
    pub slot:     String,
    pub ts:       String,
    pub payloads: Vec<Value>,
}

pub struct SqlitePublishedStore {
    conn: Arc<Mutex<Connection>>,
    slot: String,
}

impl SqlitePublishedStore {
    pub fn open(path: impl AsRef<Path>, slot: impl Into<String>) -> Result<Self> {
        let db_path = path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("open sqlite db at {}", db_path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        init_schema(&conn)?;

        Ok(Self { conn: Arc::new(Mutex::new(conn)), slot: slot.into() })
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Raw row as stored, for inspection tools.
    pub async fn read_row(&self) -> Result<Option<PublishedRow>> {
        let slot = self.slot.clone();
        self.with_conn(move |conn| {
            let row: Option<(String, String)> = conn
                .query_row(
                    "SELECT ts, payload_json FROM published_set WHERE slot = ?1",
                    params![slot],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )
                .optional()
                .context("read published row")?;

            row.map(|(ts, raw)| {
                let payloads: Vec<Value> = serde_json::from_str(&raw).context("published payload is not a JSON array")?;
                Ok(PublishedRow { slot, ts, payloads })
            })
            .transpose()
        })
        .await
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| anyhow!("sqlite connection mutex poisoned"))?;
            f(&mut guard)
        })
        .await
        .context("sqlite task panicked")?
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS published_set (
            slot TEXT PRIMARY KEY,
            ts TEXT NOT NULL,
            payload_json TEXT NOT NULL
        );
        "#,
    ).context("init schema")?;

    Ok(())
}

#[async_trait]
impl PublishedStore for SqlitePublishedStore {
    async fn read(&self) -> Result<Option<StoredSet>> {
        Ok(self.read_row().await?.map(|row| records_from_payloads(row.payloads)))
    }

    async fn overwrite(&self, fixtures: &[FixtureRecord]) -> Result<()> {
        let payloads: Vec<&Value> = fixtures.iter().map(|f| &f.payload).collect();
        let raw = serde_json::to_string(&payloads).context("serialize published set")?;
        let slot = self.slot.clone();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                r#"
                INSERT INTO published_set(slot, ts, payload_json)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(slot) DO UPDATE SET
                    ts=excluded.ts,
                    payload_json=excluded.payload_json
                "#,
                params![slot, Utc::now().to_rfc3339(), raw],
            )?;
            tx.commit().context("commit published set")?;
            Ok(())
        })
        .await
    }

    async fn clear(&self) -> Result<()> {
        let slot = self.slot.clone();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM published_set WHERE slot = ?1", params![slot])
                .context("delete published set")?;
            Ok(())
        })
        .await
    }
}

// ── In-memory ────────────────────────────────────────────────────────────────

/// Process-local store for tests. Failure switches simulate an unavailable backend.
#[derive(Default)]
pub struct MemoryPublishedStore {
    state:       Mutex<Option<Vec<FixtureRecord>>>,
    fail_reads:  AtomicBool,
    fail_writes: AtomicBool,
    writes:      AtomicUsize,
}

impl MemoryPublishedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_published(fixtures: Vec<FixtureRecord>) -> Self {
        let store = Self::default();
        if let Ok(mut state) = store.state.lock() {
            *state = Some(fixtures);
        }
        store
    }

    pub fn snapshot(&self) -> Option<Vec<FixtureRecord>> {
        match self.state.lock() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of overwrite/clear calls that went through.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn replace(&self, next: Option<Vec<FixtureRecord>>) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("memory store: write rejected"));
        }
        let mut state = self.state.lock().map_err(|_| anyhow!("memory store mutex poisoned"))?;
        *state = next;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl PublishedStore for MemoryPublishedStore {
    async fn read(&self) -> Result<Option<StoredSet>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(anyhow!("memory store: read rejected"));
        }
        let state = self.state.lock().map_err(|_| anyhow!("memory store mutex poisoned"))?;
        Ok(state.clone().map(|fixtures| StoredSet { fixtures, unreadable: 0 }))
    }

    async fn overwrite(&self, fixtures: &[FixtureRecord]) -> Result<()> {
        self.replace(Some(fixtures.to_vec()))
    }

    async fn clear(&self) -> Result<()> {
        self.replace(None)
    }
}
