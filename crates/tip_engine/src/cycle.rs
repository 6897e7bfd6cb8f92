//! One reconciliation cycle: load → fetch → match → reconcile → write.
//!
//! The whole read-merge-write sequence runs under `cycle_guard`. A tick that
//! arrives while a cycle is still in flight is skipped, never queued behind it,
//! so an older result can never overwrite a fresher one.

use chrono::{FixedOffset, Offset, Utc};
use fixture_feed::{FeedShape, FeedSnapshot, FixtureFeed};
use logger::{now_iso, CycleErrorEvent, CycleEvent, DataQualityEvent, EventLogger, FeedStatusEvent};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::CycleError;
use crate::matcher::Matcher;
use crate::reconcile::{reconcile, PublishAction};
use crate::store::PublishedStore;
use crate::watchlist::{self, WatchlistSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub action:            PublishAction,
    pub watchlist_entries: usize,
    pub dropped_entries:   usize,
    pub fetched:           usize,
    pub feed_shape_ok:     bool,
    pub synthetic_ids:     usize,
    pub matched:           usize,
    pub retained:          usize,
    pub evicted:           usize,
    pub refreshed:         usize,
    pub added:             usize,
    /// Stored entries that could not be parsed; they are never carried over.
    pub unreadable:        usize,
    pub published:         usize,
    pub wrote:             bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Another cycle held the guard.
    Skipped,
}

pub struct TipSync {
    watchlist:   Arc<dyn WatchlistSource>,
    feed:        Arc<dyn FixtureFeed>,
    store:       Arc<dyn PublishedStore>,
    matcher:     Matcher,
    tip_offset:  FixedOffset,
    logger:      Option<EventLogger>,
    cycle_guard: Mutex<()>,
}

impl TipSync {
    pub fn new(
        watchlist: Arc<dyn WatchlistSource>,
        feed:      Arc<dyn FixtureFeed>,
        store:     Arc<dyn PublishedStore>,
        matcher:   Matcher,
    ) -> Self {
        Self {
            watchlist,
            feed,
            store,
            matcher,
            tip_offset: Utc.fix(),
            logger: None,
            cycle_guard: Mutex::new(()),
        }
    }

    /// Zone for tip times written without one. UTC unless set.
    pub fn with_tip_offset(mut self, offset: FixedOffset) -> Self {
        self.tip_offset = offset;
        self
    }

    /// Mirror cycle summaries and failures into a JSONL event log.
    pub fn with_event_log(mut self, logger: EventLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub async fn run_cycle(&self) -> Result<CycleOutcome, CycleError> {
        let Ok(_guard) = self.cycle_guard.try_lock() else {
            debug!("previous cycle still running, tick skipped");
            return Ok(CycleOutcome::Skipped);
        };

        let started = Instant::now();
        match self.cycle().await {
            Ok(report) => {
                info!(
                    action = report.action.as_str(),
                    tips = report.watchlist_entries,
                    fetched = report.fetched,
                    matched = report.matched,
                    retained = report.retained,
                    evicted = report.evicted,
                    published = report.published,
                    wrote = report.wrote,
                    "cycle completed"
                );
                self.emit(&CycleEvent {
                    ts:                now_iso(),
                    event:             "TIP_SYNC_CYCLE",
                    action:            report.action.as_str().to_string(),
                    watchlist_entries: report.watchlist_entries,
                    dropped_entries:   report.dropped_entries,
                    fetched:           report.fetched,
                    feed_shape_ok:     report.feed_shape_ok,
                    matched:           report.matched,
                    retained:          report.retained,
                    evicted:           report.evicted,
                    published:         report.published,
                    wrote:             report.wrote,
                    duration_ms:       started.elapsed().as_millis() as u64,
                });
                Ok(CycleOutcome::Completed(report))
            }
            Err(e) => {
                warn!(stage = e.stage(), "cycle aborted: {e}");
                self.emit(&CycleErrorEvent {
                    ts:      now_iso(),
                    event:   "TIP_SYNC_ERROR",
                    stage:   e.stage().to_string(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn cycle(&self) -> Result<CycleReport, CycleError> {
        let tips = watchlist::load(self.watchlist.as_ref(), self.matcher.normalizer(), self.tip_offset).await?;
        if tips.dropped > 0 {
            debug!("{} malformed tips dropped", tips.dropped);
        }

        // Nothing can match an empty watchlist; skip the feed request entirely.
        let (snapshot, stored) = if tips.is_empty() {
            (FeedSnapshot::empty(FeedShape::Ok), None)
        } else {
            let snapshot = self.fetch().await?;
            let stored = self.store.read().await.map_err(CycleError::StoreRead)?;
            (snapshot, stored)
        };
        let unreadable = stored.as_ref().map_or(0, |s| s.unreadable);
        let previous = stored.map(|s| s.fixtures);

        let fetched = snapshot.fixtures.len();
        let feed_shape_ok = snapshot.is_shape_ok();
        let synthetic_ids = snapshot.synthetic_ids;

        let matched = self.matcher.filter(snapshot.fixtures, &tips);
        let matched_count = matched.len();
        let mut rec = reconcile(&self.matcher, &tips, matched, previous);

        // Unreadable entries are still in the store; equality with the parsed part is not enough.
        if rec.action == PublishAction::Unchanged && unreadable > 0 {
            warn!("{unreadable} unreadable entries in published set, rewriting");
            rec.action = if rec.retained > 0 { PublishAction::Merge } else { PublishAction::Publish };
        }

        let wrote = match rec.action {
            PublishAction::Unchanged => false,
            PublishAction::Clear => {
                self.store.clear().await.map_err(CycleError::StoreWrite)?;
                info!("watchlist empty, published set cleared");
                true
            }
            PublishAction::Publish | PublishAction::Merge => {
                self.store.overwrite(&rec.published).await.map_err(CycleError::StoreWrite)?;
                true
            }
        };

        Ok(CycleReport {
            action:            rec.action,
            watchlist_entries: tips.len(),
            dropped_entries:   tips.dropped,
            fetched,
            feed_shape_ok,
            synthetic_ids,
            matched:           matched_count,
            retained:          rec.retained,
            evicted:           rec.evicted,
            refreshed:         rec.refreshed,
            added:             rec.added,
            unreadable,
            published:         rec.published.len(),
            wrote,
        })
    }

    async fn fetch(&self) -> Result<FeedSnapshot, CycleError> {
        let scope = self.feed.scope().to_string();
        let snapshot = match self.feed.fetch().await {
            Ok(s) => s,
            Err(e) => {
                self.emit(&FeedStatusEvent {
                    ts:          now_iso(),
                    event:       "FEED_STATUS",
                    scope,
                    ok:          false,
                    status_code: e.status_code(),
                    message:     e.to_string(),
                    items:       0,
                });
                return Err(e.into());
            }
        };

        self.emit(&FeedStatusEvent {
            ts:          now_iso(),
            event:       "FEED_STATUS",
            scope,
            ok:          true,
            status_code: Some(200),
            message:     match &snapshot.shape {
                FeedShape::Ok => "ok".to_string(),
                FeedShape::Malformed(reason) => reason.clone(),
            },
            items:       snapshot.fixtures.len(),
        });

        if let FeedShape::Malformed(reason) = &snapshot.shape {
            self.emit(&DataQualityEvent {
                ts:     now_iso(),
                event:  "DATA_QUALITY",
                kind:   "MALFORMED_FEED".to_string(),
                detail: reason.clone(),
            });
        }

        for fixture in snapshot.fixtures.iter().filter(|f| f.id.is_synthetic()) {
            warn!("fixture {} vs {} has no id, using {}", fixture.home, fixture.away, fixture.id);
            self.emit(&DataQualityEvent {
                ts:     now_iso(),
                event:  "DATA_QUALITY",
                kind:   "SYNTHETIC_FIXTURE_ID".to_string(),
                detail: fixture.id.to_string(),
            });
        }

        Ok(snapshot)
    }

    fn emit<T: serde::Serialize>(&self, event: &T) {
        if let Some(logger) = &self.logger {
            let _ = logger.log(event);
        }
    }
}
