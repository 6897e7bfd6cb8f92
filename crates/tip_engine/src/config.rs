use chrono::{Duration, FixedOffset, Offset, Utc};
use fixture_feed::{FeedConfig, FeedScope, DEFAULT_API_HOST, DEFAULT_BASE_URL};
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

use crate::matcher::{MatchMode, Matcher, DEFAULT_TIME_TOLERANCE_MINS};
use crate::normalize::{NameNormalizer, NamePolicy, DEFAULT_NAME_POLICY};
use crate::store::DEFAULT_SLOT;

/// Upper bound for `MATCH_TIME_TOLERANCE_MINS` (one week).
pub const MAX_TIME_TOLERANCE_MINS: i64 = 7 * 24 * 60;

#[derive(Debug, Clone)]
pub struct TipSyncConfig {
    /// File path or `http(s)://` URL of the watchlist JSON.
    pub watchlist_source:    String,
    pub feed:                FeedConfig,
    pub db_path:             String,
    pub slot:                String,
    pub poll_interval_secs:  u64,
    pub name_policy:         NamePolicy,
    pub match_mode:          MatchMode,
    pub time_tolerance_mins: i64,
    /// Zone of tip times written without one.
    pub tip_utc_offset:      FixedOffset,
    pub log_dir:             String,
}

impl Default for TipSyncConfig {
    fn default() -> Self {
        Self {
            watchlist_source:    "data/tips.json".to_string(),
            feed:                FeedConfig::default(),
            db_path:             "data/published.db".to_string(),
            slot:                DEFAULT_SLOT.to_string(),
            poll_interval_secs:  60,
            name_policy:         DEFAULT_NAME_POLICY,
            match_mode:          MatchMode::Tolerant,
            time_tolerance_mins: DEFAULT_TIME_TOLERANCE_MINS,
            tip_utc_offset:      Utc.fix(),
            log_dir:             "logs".to_string(),
        }
    }
}

impl TipSyncConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or invalid values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("WATCHLIST_SOURCE") {
            config.watchlist_source = v;
        }
        if let Some(v) = lookup("FEED_BASE_URL") {
            config.feed.base_url = v;
        }
        if let Some(v) = lookup("FEED_API_KEY") {
            config.feed.api_key = v;
        }
        if let Some(v) = lookup("FEED_API_HOST") {
            config.feed.api_host = v;
        }
        if let Some(v) = lookup("PUBLISHED_DB_PATH") {
            config.db_path = v;
        }
        if let Some(v) = lookup("PUBLISHED_SLOT") {
            config.slot = v;
        }
        if let Some(v) = lookup("LOG_DIR") {
            config.log_dir = v;
        }

        config.feed.scope = parsed(&lookup, "FEED_SCOPE", FeedScope::Live);
        config.feed.timeout_secs = parsed(&lookup, "FEED_TIMEOUT_SECS", config.feed.timeout_secs);
        config.poll_interval_secs = parsed(&lookup, "POLL_INTERVAL_SECS", config.poll_interval_secs).max(1);
        config.name_policy = parsed(&lookup, "TIP_NAME_POLICY", config.name_policy);
        config.match_mode = parsed(&lookup, "TIP_MATCH_MODE", config.match_mode);
        config.time_tolerance_mins =
            parsed(&lookup, "MATCH_TIME_TOLERANCE_MINS", config.time_tolerance_mins).max(0);
        config.tip_utc_offset = parsed(&lookup, "TIP_UTC_OFFSET", config.tip_utc_offset);
        if config.time_tolerance_mins > MAX_TIME_TOLERANCE_MINS {
            warn!(
                "MATCH_TIME_TOLERANCE_MINS={} above {MAX_TIME_TOLERANCE_MINS}, clamped",
                config.time_tolerance_mins
            );
            config.time_tolerance_mins = MAX_TIME_TOLERANCE_MINS;
        }

        config
    }

    pub fn matcher(&self) -> Matcher {
        Matcher::new(
            NameNormalizer::new(self.name_policy),
            self.match_mode,
            Duration::try_minutes(self.time_tolerance_mins.clamp(0, MAX_TIME_TOLERANCE_MINS))
                .unwrap_or_else(|| Duration::minutes(DEFAULT_TIME_TOLERANCE_MINS)),
        )
    }

    pub fn feed_is_default_host(&self) -> bool {
        self.feed.base_url == DEFAULT_BASE_URL && self.feed.api_host == DEFAULT_API_HOST
    }
}

fn parsed<T, E>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr<Err = E>,
    E: Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("{key}={raw:?} invalid ({e}), using default");
            default
        }),
    }
}
