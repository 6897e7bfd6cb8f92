//! Merge of fresh matches with the previously published set.

use fixture_feed::{FixtureId, FixtureRecord};
use std::collections::HashMap;

use crate::matcher::Matcher;
use crate::watchlist::Watchlist;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishAction {
    /// Watchlist empty: delete the published set.
    Clear,
    /// Overwrite; nothing from the previous set survived.
    Publish,
    /// Overwrite; at least one previous fixture was kept.
    Merge,
    /// Result identical to what is stored, no write.
    Unchanged,
}

impl PublishAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishAction::Clear => "CLEAR",
            PublishAction::Publish => "PUBLISH",
            PublishAction::Merge => "MERGE",
            PublishAction::Unchanged => "UNCHANGED",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub action:    PublishAction,
    pub published: Vec<FixtureRecord>,
    /// Previous fixtures still backed by a tip.
    pub retained:  usize,
    /// Previous fixtures no longer backed by any tip.
    pub evicted:   usize,
    /// Fresh fixtures that replaced a same-id entry.
    pub refreshed: usize,
    /// Fresh fixtures with a new id.
    pub added:     usize,
}

/// Previous entries are re-validated against the current watchlist, then fresh
/// matches overlay them by id. Output order is insertion order (previous first).
pub fn reconcile(
    matcher:   &Matcher,
    watchlist: &Watchlist,
    matched:   Vec<FixtureRecord>,
    previous:  Option<Vec<FixtureRecord>>,
) -> Reconciliation {
    if watchlist.is_empty() {
        return Reconciliation {
            action:    PublishAction::Clear,
            published: Vec::new(),
            retained:  0,
            evicted:   previous.as_ref().map_or(0, Vec::len),
            refreshed: 0,
            added:     0,
        };
    }

    let mut published: Vec<FixtureRecord> = Vec::new();
    let mut index: HashMap<FixtureId, usize> = HashMap::new();
    let (mut retained, mut evicted, mut refreshed, mut added) = (0, 0, 0, 0);

    for rec in previous.iter().flatten() {
        if !matcher.matches(rec, watchlist) {
            evicted += 1;
            continue;
        }
        retained += 1;
        upsert(&mut published, &mut index, rec.clone());
    }

    for rec in matched {
        if upsert(&mut published, &mut index, rec) {
            refreshed += 1;
        } else {
            added += 1;
        }
    }

    let action = if previous.as_ref() == Some(&published) {
        PublishAction::Unchanged
    } else if retained > 0 {
        PublishAction::Merge
    } else {
        PublishAction::Publish
    };

    Reconciliation { action, published, retained, evicted, refreshed, added }
}

/// Replace in place when the id is known (returns true), append otherwise.
fn upsert(published: &mut Vec<FixtureRecord>, index: &mut HashMap<FixtureId, usize>, rec: FixtureRecord) -> bool {
    match index.get(&rec.id) {
        Some(&i) => {
            published[i] = rec;
            true
        }
        None => {
            index.insert(rec.id.clone(), published.len());
            published.push(rec);
            false
        }
    }
}
