//! Watchlist ("tips") loading.
//!
//! The source is one JSON tree: arbitrary section keys → collections of tips.
//!
//!   {
//!     "2024-05-12": { "-Nx1": { "teamA": "Real Madrid", "teamB": "Barcelona", "country": "Spain", "time": "21:00", "date": "2024-05-12" } },
//!     "acca":       [ { "home": "Arsenal", "away": "Chelsea" } ]
//!   }
//!
//! Section keys carry no meaning downstream and are thrown away.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::CycleError;
use crate::matcher::MatchKey;
use crate::normalize::NameNormalizer;

const PARTICIPANT_A_KEYS: &[&str] = &["participantA", "teamA", "team1", "home", "homeTeam"];
const PARTICIPANT_B_KEYS: &[&str] = &["participantB", "teamB", "team2", "away", "awayTeam"];
const TIME_KEYS: &[&str] = &["scheduledAt", "time", "kickoff"];
const REGION_KEYS: &[&str] = &["region", "country"];
const DATE_KEYS: &[&str] = &["matchDate", "date"];

/// One tip, names already normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchlistEntry {
    pub participant_a: String,
    pub participant_b: String,
    pub scheduled_at:  Option<DateTime<Utc>>,
    pub region:        Option<String>,
    pub match_date:    Option<NaiveDate>,
}

impl WatchlistEntry {
    pub fn key(&self) -> MatchKey {
        MatchKey::from_normalized(&self.participant_a, &self.participant_b)
    }
}

impl fmt::Display for WatchlistEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} vs {}", self.participant_a, self.participant_b)?;
        if let Some(region) = &self.region {
            write!(f, " [{region}]")?;
        }
        if let Some(at) = &self.scheduled_at {
            write!(f, " @ {}", at.format("%Y-%m-%d %H:%M"))?;
        }
        Ok(())
    }
}

/// Flattened watchlist for one cycle, in flatten order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Watchlist {
    pub entries: Vec<WatchlistEntry>,
    /// Tips dropped as malformed (not an object, or a participant name missing/blank).
    pub dropped: usize,
}

impl Watchlist {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

// ── Sources ──────────────────────────────────────────────────────────────────

#[async_trait]
pub trait WatchlistSource: Send + Sync {
    fn describe(&self) -> String;

    /// Whole-tree read. Absent data is `Value::Null`.
    async fn read_tree(&self) -> Result<Value>;
}

pub struct JsonFileWatchlist {
    path: PathBuf,
}

impl JsonFileWatchlist {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl WatchlistSource for JsonFileWatchlist {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    async fn read_tree(&self) -> Result<Value> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("read watchlist {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&raw).with_context(|| format!("parse watchlist {}", self.path.display()))
    }
}

/// JSON over HTTP, e.g. a realtime-database REST export (`https://<db>/tips.json`).
pub struct HttpWatchlist {
    client: reqwest::Client,
    url:    String,
}

impl HttpWatchlist {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            url: url.into(),
        }
    }
}

#[async_trait]
impl WatchlistSource for HttpWatchlist {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn read_tree(&self) -> Result<Value> {
        let resp = self.client.get(&self.url).send().await.context("watchlist request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("watchlist HTTP {status}: {}", body.chars().take(200).collect::<String>());
        }
        let raw = resp.text().await.context("watchlist body read failed")?;
        serde_json::from_str(&raw).context("watchlist body is not JSON")
    }
}

/// `http(s)://…` → [`HttpWatchlist`], anything else is a file path.
pub fn source_from_location(location: &str, timeout_secs: u64) -> Arc<dyn WatchlistSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Arc::new(HttpWatchlist::new(location, timeout_secs))
    } else {
        Arc::new(JsonFileWatchlist::new(location))
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

/// `naive_offset` is the zone of tip times written without one (`YYYY-MM-DD HH:MM`, bare `HH:MM`).
pub async fn load(
    source:       &dyn WatchlistSource,
    normalizer:   &NameNormalizer,
    naive_offset: FixedOffset,
) -> Result<Watchlist, CycleError> {
    let tree = source.read_tree().await.map_err(CycleError::WatchlistRead)?;
    let watchlist = flatten(&tree, normalizer, naive_offset).map_err(CycleError::WatchlistRead)?;
    debug!(
        source = %source.describe(),
        entries = watchlist.len(),
        dropped = watchlist.dropped,
        "watchlist loaded"
    );
    Ok(watchlist)
}

pub fn flatten(tree: &Value, normalizer: &NameNormalizer, naive_offset: FixedOffset) -> Result<Watchlist> {
    let sections: Vec<&Value> = match tree {
        Value::Null => return Ok(Watchlist::default()),
        Value::Object(m) => m.values().collect(),
        Value::Array(a) => a.iter().collect(),
        other => return Err(anyhow!("watchlist root must be an object or array, got {other}")),
    };

    let mut watchlist = Watchlist::default();
    for section in sections {
        let tips: Vec<&Value> = match section {
            Value::Null => continue,
            Value::Object(m) if looks_like_tip(m) => vec![section],
            Value::Object(m) => m.values().collect(),
            Value::Array(a) => a.iter().collect(),
            _ => {
                watchlist.dropped += 1;
                continue;
            }
        };

        for tip in tips {
            match tip {
                Value::Null => {}
                Value::Object(obj) => match parse_tip(obj, normalizer, naive_offset) {
                    Some(entry) => watchlist.entries.push(entry),
                    None => watchlist.dropped += 1,
                },
                _ => watchlist.dropped += 1,
            }
        }
    }
    Ok(watchlist)
}

fn looks_like_tip(obj: &Map<String, Value>) -> bool {
    PARTICIPANT_A_KEYS.iter().any(|k| obj.get(*k).map_or(false, Value::is_string))
}

fn first_str<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_str))
}

fn first_value<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
}

fn parse_tip(obj: &Map<String, Value>, normalizer: &NameNormalizer, naive_offset: FixedOffset) -> Option<WatchlistEntry> {
    let participant_a = normalizer.normalize(first_str(obj, PARTICIPANT_A_KEYS)?);
    let participant_b = normalizer.normalize(first_str(obj, PARTICIPANT_B_KEYS)?);
    if participant_a.is_empty() || participant_b.is_empty() {
        return None;
    }

    let match_date = first_str(obj, DATE_KEYS).and_then(parse_match_date);
    let scheduled_at = first_value(obj, TIME_KEYS).and_then(|v| {
        let parsed = parse_scheduled(v, match_date, naive_offset);
        if parsed.is_none() {
            debug!("tip {participant_a} vs {participant_b}: unparseable time {v}, time check skipped");
        }
        parsed
    });
    let region = first_str(obj, REGION_KEYS)
        .map(|r| normalizer.normalize(r))
        .filter(|r| !r.is_empty());

    Some(WatchlistEntry { participant_a, participant_b, scheduled_at, region, match_date })
}

pub(crate) fn parse_match_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Epoch seconds/millis, RFC 3339, naive `YYYY-MM-DD HH:MM[:SS]`, or `HH:MM` on `date`.
/// Naive forms are read in `naive_offset`.
pub(crate) fn parse_scheduled(v: &Value, date: Option<NaiveDate>, naive_offset: FixedOffset) -> Option<DateTime<Utc>> {
    if let Some(n) = v.as_i64() {
        // Browser clients store Date.now() (millis)
        return if n > 100_000_000_000 {
            DateTime::from_timestamp_millis(n)
        } else {
            DateTime::from_timestamp(n, 0)
        };
    }

    let raw = v.as_str()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let in_offset = |naive: NaiveDateTime| {
        naive.and_local_timezone(naive_offset).single().map(|dt| dt.with_timezone(&Utc))
    };
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return in_offset(naive);
        }
    }
    for fmt in ["%H:%M", "%H:%M:%S"] {
        if let Ok(time) = NaiveTime::parse_from_str(raw, fmt) {
            return date.and_then(|d| in_offset(d.and_time(time)));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::NamePolicy;
    use chrono::Offset;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn strip() -> NameNormalizer {
        NameNormalizer::new(NamePolicy::StripWhitespace)
    }

    fn utc() -> FixedOffset {
        Utc.fix()
    }

    #[test]
    fn flattens_object_and_array_sections() {
        let tree = json!({
            "2024-05-12": {
                "-Nx1": { "teamA": "Real Madrid", "teamB": "Barcelona", "country": "Spain" },
                "-Nx2": { "teamA": "Sevilla", "teamB": "Betis" }
            },
            "acca": [ { "home": "Arsenal", "away": "Chelsea" } ]
        });

        let wl = flatten(&tree, &strip(), utc()).unwrap();
        assert_eq!(wl.len(), 3);
        assert_eq!(wl.dropped, 0);
        assert_eq!(wl.entries[0].participant_a, "realmadrid");
        assert_eq!(wl.entries[0].region.as_deref(), Some("spain"));
        assert_eq!(wl.entries[2].participant_b, "chelsea");
    }

    #[test]
    fn drops_tips_with_blank_or_missing_names() {
        let tree = json!({
            "s": [
                { "teamA": "  ", "teamB": "Barcelona" },
                { "teamA": "Real Madrid" },
                "just a string",
                null,
                { "teamA": "Ajax", "teamB": "PSV", "country": "   " }
            ]
        });

        let wl = flatten(&tree, &strip(), utc()).unwrap();
        assert_eq!(wl.len(), 1);
        assert_eq!(wl.dropped, 3);
        assert_eq!(wl.entries[0].region, None);
    }

    #[test]
    fn section_that_is_itself_a_tip() {
        let tree = json!({ "-Nx9": { "participantA": "Lazio", "participantB": "Roma" } });
        let wl = flatten(&tree, &strip(), utc()).unwrap();
        assert_eq!(wl.len(), 1);
        assert_eq!(wl.entries[0].key().to_string(), "lazio_vs_roma");
    }

    #[test]
    fn null_tree_is_empty_and_scalar_tree_is_error() {
        assert!(flatten(&Value::Null, &strip(), utc()).unwrap().is_empty());
        assert!(flatten(&json!("oops"), &strip(), utc()).is_err());
    }

    #[test]
    fn time_formats() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 12);
        let expected = "2024-05-12T19:00:00+00:00";

        for v in [
            json!("2024-05-12T21:00:00+02:00"),
            json!("2024-05-12 19:00"),
            json!("2024-05-12T19:00:00"),
            json!(1715540400),
            json!(1715540400000i64),
        ] {
            assert_eq!(parse_scheduled(&v, None, utc()).unwrap().to_rfc3339(), expected, "{v}");
        }

        assert_eq!(parse_scheduled(&json!("19:00"), date, utc()).unwrap().to_rfc3339(), expected);
        assert_eq!(parse_scheduled(&json!("19:00"), None, utc()), None);
        assert_eq!(parse_scheduled(&json!("soon"), date, utc()), None);
    }

    #[test]
    fn naive_times_follow_configured_offset() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, 12);
        let expected = "2024-05-12T19:00:00+00:00";

        assert_eq!(parse_scheduled(&json!("2024-05-12 21:00"), None, plus_two).unwrap().to_rfc3339(), expected);
        assert_eq!(parse_scheduled(&json!("21:00"), date, plus_two).unwrap().to_rfc3339(), expected);
        // Explicit zones and epochs ignore it.
        assert_eq!(parse_scheduled(&json!("2024-05-12T19:00:00Z"), None, plus_two).unwrap().to_rfc3339(), expected);
        assert_eq!(parse_scheduled(&json!(1715540400), None, plus_two).unwrap().to_rfc3339(), expected);
    }

    #[test]
    fn bare_time_uses_match_date_and_bad_time_keeps_tip() {
        let tree = json!([[
            { "teamA": "A", "teamB": "B", "time": "21:30", "date": "2024-05-12" },
            { "teamA": "C", "teamB": "D", "time": "tbc" }
        ]]);

        let wl = flatten(&tree, &strip(), utc()).unwrap();
        assert_eq!(wl.len(), 2);
        assert_eq!(wl.entries[0].match_date, NaiveDate::from_ymd_opt(2024, 5, 12));
        assert_eq!(wl.entries[0].scheduled_at.unwrap().to_rfc3339(), "2024-05-12T21:30:00+00:00");
        assert_eq!(wl.entries[1].scheduled_at, None);
    }

    #[tokio::test]
    async fn file_source_reads_and_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tips.json");
        std::fs::write(&path, r#"{"s": [{"teamA": "Lazio", "teamB": "Roma"}]}"#).unwrap();

        let wl = load(&JsonFileWatchlist::new(&path), &strip(), utc()).await.unwrap();
        assert_eq!(wl.len(), 1);

        let missing = JsonFileWatchlist::new(dir.path().join("nope.json"));
        let err = load(&missing, &strip(), utc()).await.unwrap_err();
        assert!(matches!(err, CycleError::WatchlistRead(_)));
    }
}
