/// tipwatch-live — Logger
/// JSONL event stream (one file per UTC day) for cycle audits

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event typy ────────────────────────────────────────────────────────────────

#[derive(Serialize, Debug, Clone)]
pub struct CycleEvent {
    pub ts:                String,
    pub event:             &'static str,   // "TIP_SYNC_CYCLE"
    pub action:            String,         // "CLEAR" | "PUBLISH" | "MERGE" | "UNCHANGED"
    pub watchlist_entries: usize,
    pub dropped_entries:   usize,
    pub fetched:           usize,
    pub feed_shape_ok:     bool,
    pub matched:           usize,
    pub retained:          usize,
    pub evicted:           usize,
    pub published:         usize,
    pub wrote:             bool,
    pub duration_ms:       u64,
}

#[derive(Serialize, Debug, Clone)]
pub struct CycleErrorEvent {
    pub ts:      String,
    pub event:   &'static str,   // "TIP_SYNC_ERROR"
    pub stage:   String,         // "watchlist" | "feed" | "store_read" | "store_write"
    pub message: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct FeedStatusEvent {
    pub ts:          String,
    pub event:       &'static str,   // "FEED_STATUS"
    pub scope:       String,
    pub ok:          bool,
    pub status_code: Option<u16>,
    pub message:     String,
    pub items:       usize,
}

#[derive(Serialize, Debug, Clone)]
pub struct DataQualityEvent {
    pub ts:     String,
    pub event:  &'static str,   // "DATA_QUALITY"
    pub kind:   String,         // "SYNTHETIC_FIXTURE_ID" | "MALFORMED_FEED" | ...
    pub detail: String,
}
