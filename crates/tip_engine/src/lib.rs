//! tipwatch-live — Tip Engine
//!
//! Reconciliation of the live fixture feed against the tips watchlist:
//!   1. load + normalize tips (malformed ones dropped)
//!   2. fetch the fixture snapshot (bad shape = zero fixtures)
//!   3. match fixtures to tips (names, optional region, optional time window)
//!   4. merge with the re-validated published set, dedup by fixture id, write or clear

pub mod config;
pub mod cycle;
pub mod error;
pub mod matcher;
pub mod normalize;
pub mod reconcile;
pub mod store;
pub mod watchlist;

pub use config::TipSyncConfig;
pub use cycle::{CycleOutcome, CycleReport, TipSync};
pub use error::CycleError;
pub use matcher::{MatchKey, MatchMode, Matcher};
pub use normalize::{NameNormalizer, NamePolicy, DEFAULT_NAME_POLICY};
pub use reconcile::{reconcile, PublishAction, Reconciliation};
pub use store::{MemoryPublishedStore, PublishedRow, PublishedStore, SqlitePublishedStore, StoredSet};
pub use watchlist::{
    source_from_location, HttpWatchlist, JsonFileWatchlist, Watchlist, WatchlistEntry, WatchlistSource,
};
