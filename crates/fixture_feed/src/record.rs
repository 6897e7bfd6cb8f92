//! Fixture records extracted from the API-Football `/fixtures` payload.
//!
//! Feed object (trimmed):
//!   { "fixture": { "id": 42, "date": "2024-05-12T19:00:00+00:00", "timestamp": 1715540400,
//!                  "status": { "short": "1H" } },
//!     "league":  { "country": "Spain", ... },
//!     "teams":   { "home": { "name": "Real Madrid CF" }, "away": { "name": "FC Barcelona" } },
//!     "goals":   { ... } }
//!
//! Only the fields below are interpreted; everything else rides along in `payload`.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;

/// Stable identity of a fixture, used as the merge/dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FixtureId {
    /// Id supplied by the feed (numbers are rendered as decimal strings).
    Feed(String),
    /// Fallback derived from the participant pair when the feed omitted the id.
    Synthetic(String),
}

impl FixtureId {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, FixtureId::Synthetic(_))
    }
}

impl fmt::Display for FixtureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixtureId::Feed(id) => write!(f, "{id}"),
            FixtureId::Synthetic(key) => write!(f, "synthetic:{key}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixtureRecord {
    pub id:           FixtureId,
    pub home:         String,
    pub away:         String,
    pub region:       String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status:       String,
    /// Original feed object, published as-is.
    pub payload:      Value,
}

impl FixtureRecord {
    /// Extract a record from one feed object. `None` when either participant name is missing.
    pub fn from_payload(payload: Value) -> Option<Self> {
        let home = str_at(&payload, "/teams/home/name")?;
        let away = str_at(&payload, "/teams/away/name")?;
        if home.trim().is_empty() || away.trim().is_empty() {
            return None;
        }

        let id = match payload.pointer("/fixture/id") {
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }
        .map(FixtureId::Feed)
        .unwrap_or_else(|| FixtureId::Synthetic(synthetic_key(&home, &away)));

        let scheduled_at = payload
            .pointer("/fixture/date")
            .and_then(|d| d.as_str())
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| {
                payload
                    .pointer("/fixture/timestamp")
                    .and_then(|t| t.as_i64())
                    .and_then(|t| DateTime::<Utc>::from_timestamp(t, 0))
            });

        Some(Self {
            id,
            home,
            away,
            region: str_at(&payload, "/league/country").unwrap_or_default(),
            scheduled_at,
            status: str_at(&payload, "/fixture/status/short").unwrap_or_default(),
            payload,
        })
    }
}

fn str_at(v: &Value, pointer: &str) -> Option<String> {
    v.pointer(pointer).and_then(|s| s.as_str()).map(|s| s.to_string())
}

/// `home_vs_away` key over alphanumeric words, stable across feed polls.
pub fn synthetic_key(home: &str, away: &str) -> String {
    format!("{}_vs_{}", key_part(home), key_part(away))
}

fn key_part(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

// ── Body parsing ─────────────────────────────────────────────────────────────

/// Whether the feed body had the expected `{ "response": [...] }` shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedShape {
    Ok,
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    pub fixtures:      Vec<FixtureRecord>,
    pub shape:         FeedShape,
    /// Array items dropped because a participant name was missing.
    pub skipped:       usize,
    pub synthetic_ids: usize,
    /// Non-empty `errors` block reported by the API next to a 200 status.
    pub api_errors:    Option<String>,
}

impl FeedSnapshot {
    pub fn empty(shape: FeedShape) -> Self {
        Self { fixtures: Vec::new(), shape, skipped: 0, synthetic_ids: 0, api_errors: None }
    }

    pub fn is_shape_ok(&self) -> bool {
        self.shape == FeedShape::Ok
    }
}

/// Parse a raw feed body. Never fails: anything that is not a `response` array is zero fixtures.
pub fn parse_feed_body(raw: &str) -> FeedSnapshot {
    let parsed: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => return FeedSnapshot::empty(FeedShape::Malformed(format!("body is not JSON: {e}"))),
    };

    let api_errors = match parsed.get("errors") {
        Some(Value::Object(m)) if !m.is_empty() => Some(Value::Object(m.clone()).to_string()),
        Some(Value::Array(a)) if !a.is_empty() => Some(Value::Array(a.clone()).to_string()),
        _ => None,
    };

    let items = match parsed.get("response") {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => {
            let mut snap = FeedSnapshot::empty(FeedShape::Malformed("missing `response` field".into()));
            snap.api_errors = api_errors;
            return snap;
        }
        Some(other) => {
            let mut snap = FeedSnapshot::empty(FeedShape::Malformed(format!(
                "`response` is {}, expected array",
                json_kind(other)
            )));
            snap.api_errors = api_errors;
            return snap;
        }
    };

    let mut snap = FeedSnapshot::empty(FeedShape::Ok);
    snap.api_errors = api_errors;
    for item in items {
        match FixtureRecord::from_payload(item.clone()) {
            Some(rec) => {
                if rec.id.is_synthetic() {
                    snap.synthetic_ids += 1;
                }
                snap.fixtures.push(rec);
            }
            None => snap.skipped += 1,
        }
    }
    snap
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
