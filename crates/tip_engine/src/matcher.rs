//! Fixture ↔ tip matching.
//!
//! Predicate per (fixture, tip), short-circuit in order:
//!   1. names   — tolerant: substring either direction, per side; exact: MatchKey equality
//!   2. region  — only when the tip names one; normalized equality
//!   3. time    — only when the tip has one; |tip − fixture| ≤ tolerance
//!
//! Home/away are positional. A fixture whose roles are reversed relative to the
//! tip does not match.

use chrono::{DateTime, Duration, Utc};
use fixture_feed::FixtureRecord;
use std::fmt;
use std::str::FromStr;

use crate::normalize::NameNormalizer;
use crate::watchlist::{Watchlist, WatchlistEntry};

pub const DEFAULT_TIME_TOLERANCE_MINS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Tolerant,
    Exact,
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tolerant" => Ok(MatchMode::Tolerant),
            "exact" => Ok(MatchMode::Exact),
            other => Err(format!("unknown match mode `{other}` (expected tolerant or exact)")),
        }
    }
}

/// Normalized, ordered (home, away) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub home: String,
    pub away: String,
}

impl MatchKey {
    pub fn new(normalizer: &NameNormalizer, home: &str, away: &str) -> Self {
        Self { home: normalizer.normalize(home), away: normalizer.normalize(away) }
    }

    pub fn from_normalized(home: &str, away: &str) -> Self {
        Self { home: home.to_string(), away: away.to_string() }
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_vs_{}", self.home, self.away)
    }
}

#[derive(Debug, Clone)]
pub struct Matcher {
    normalizer:     NameNormalizer,
    mode:           MatchMode,
    time_tolerance: Duration,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(NameNormalizer::default(), MatchMode::Tolerant, Duration::minutes(DEFAULT_TIME_TOLERANCE_MINS))
    }
}

impl Matcher {
    pub fn new(normalizer: NameNormalizer, mode: MatchMode, time_tolerance: Duration) -> Self {
        Self { normalizer, mode, time_tolerance }
    }

    pub fn normalizer(&self) -> &NameNormalizer {
        &self.normalizer
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn time_tolerance(&self) -> Duration {
        self.time_tolerance
    }

    /// First tip (in flatten order) the fixture satisfies.
    pub fn first_match<'w>(&self, fixture: &FixtureRecord, watchlist: &'w Watchlist) -> Option<&'w WatchlistEntry> {
        let key = MatchKey::new(&self.normalizer, &fixture.home, &fixture.away);
        let region = self.normalizer.normalize(&fixture.region);

        watchlist
            .entries
            .iter()
            .find(|tip| self.tip_matches(tip, &key, &region, fixture.scheduled_at))
    }

    pub fn matches(&self, fixture: &FixtureRecord, watchlist: &Watchlist) -> bool {
        self.first_match(fixture, watchlist).is_some()
    }

    /// Fixtures backed by at least one tip, feed order preserved.
    pub fn filter(&self, fixtures: Vec<FixtureRecord>, watchlist: &Watchlist) -> Vec<FixtureRecord> {
        fixtures.into_iter().filter(|f| self.matches(f, watchlist)).collect()
    }

    fn tip_matches(
        &self,
        tip: &WatchlistEntry,
        fixture: &MatchKey,
        region: &str,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> bool {
        let names_ok = match self.mode {
            MatchMode::Tolerant => {
                names_overlap(&fixture.home, &tip.participant_a) && names_overlap(&fixture.away, &tip.participant_b)
            }
            MatchMode::Exact => *fixture == tip.key(),
        };
        if !names_ok {
            return false;
        }

        if let Some(tip_region) = &tip.region {
            if region != tip_region {
                return false;
            }
        }

        match (tip.scheduled_at, scheduled_at) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(tip_at), Some(fixture_at)) => (tip_at - fixture_at).abs() <= self.time_tolerance,
        }
    }
}

/// Either name contains the other. An empty feed name never matches.
fn names_overlap(feed: &str, tip: &str) -> bool {
    !feed.is_empty() && !tip.is_empty() && (feed.contains(tip) || tip.contains(feed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::NamePolicy;
    use crate::watchlist::flatten;
    use chrono::TimeZone;
    use fixture_feed::FixtureId;
    use serde_json::{json, Value};

    fn fixture(id: u64, home: &str, away: &str, region: &str, at: Option<DateTime<Utc>>) -> FixtureRecord {
        FixtureRecord {
            id: FixtureId::Feed(id.to_string()),
            home: home.to_string(),
            away: away.to_string(),
            region: region.to_string(),
            scheduled_at: at,
            status: "NS".to_string(),
            payload: Value::Null,
        }
    }

    fn kickoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 12, 19, 0, 0).unwrap()
    }

    fn watchlist(tips: Value) -> Watchlist {
        flatten(&json!({ "s": tips }), &NameNormalizer::default(), chrono::FixedOffset::east_opt(0).unwrap()).unwrap()
    }

    #[test]
    fn official_names_contain_tip_names() {
        let wl = watchlist(json!([{ "teamA": "real madrid", "teamB": "barcelona", "country": "spain" }]));
        let f = fixture(42, "Real Madrid CF", "FC Barcelona", "Spain", Some(kickoff()));
        assert!(Matcher::default().matches(&f, &wl));
    }

    #[test]
    fn tip_name_may_contain_feed_name() {
        let wl = watchlist(json!([{ "teamA": "Manchester United FC", "teamB": "Liverpool FC" }]));
        let f = fixture(1, "Manchester United", "Liverpool", "England", None);
        assert!(Matcher::default().matches(&f, &wl));
    }

    #[test]
    fn reversed_roles_do_not_match() {
        let wl = watchlist(json!([{ "teamA": "Barcelona", "teamB": "Real Madrid" }]));
        let f = fixture(42, "Real Madrid CF", "FC Barcelona", "Spain", None);
        assert!(!Matcher::default().matches(&f, &wl));
    }

    #[test]
    fn region_only_checked_when_tip_has_one() {
        let f = fixture(7, "Arsenal", "Chelsea", "England", None);
        assert!(Matcher::default().matches(&f, &watchlist(json!([{ "teamA": "Arsenal", "teamB": "Chelsea" }]))));
        assert!(!Matcher::default().matches(
            &f,
            &watchlist(json!([{ "teamA": "Arsenal", "teamB": "Chelsea", "country": "Scotland" }]))
        ));
    }

    #[test]
    fn time_window_is_inclusive() {
        let wl = watchlist(json!([{ "teamA": "A", "teamB": "B", "scheduledAt": "2024-05-12T19:00:00Z" }]));
        let m = Matcher::default();

        assert!(m.matches(&fixture(1, "A", "B", "", Some(kickoff() + Duration::minutes(90))), &wl));
        assert!(m.matches(&fixture(1, "A", "B", "", Some(kickoff() - Duration::minutes(90))), &wl));
        assert!(!m.matches(&fixture(1, "A", "B", "", Some(kickoff() + Duration::minutes(91))), &wl));
        assert!(!m.matches(&fixture(1, "A", "B", "", None), &wl));
    }

    #[test]
    fn empty_feed_name_never_matches() {
        let wl = watchlist(json!([{ "teamA": "A", "teamB": "B" }]));
        assert!(!Matcher::default().matches(&fixture(1, "  ", "B", "", None), &wl));
    }

    #[test]
    fn first_match_follows_flatten_order() {
        let wl = watchlist(json!([
            { "teamA": "Real", "teamB": "Barcelona" },
            { "teamA": "Real Madrid", "teamB": "Barcelona", "country": "Spain" }
        ]));
        let f = fixture(42, "Real Madrid CF", "FC Barcelona", "Spain", None);
        let tip = Matcher::default().first_match(&f, &wl).unwrap();
        assert_eq!(tip.participant_a, "real");
    }

    #[test]
    fn exact_mode_is_subset_of_tolerant() {
        let wl = watchlist(json!([{ "teamA": "Real Madrid", "teamB": "Barcelona" }]));
        let fixtures = vec![
            fixture(1, "Real Madrid", "Barcelona", "Spain", None),
            fixture(2, "Real Madrid CF", "FC Barcelona", "Spain", None),
            fixture(3, "Sevilla", "Betis", "Spain", None),
        ];

        let exact = Matcher::new(NameNormalizer::default(), MatchMode::Exact, Duration::minutes(90));
        let tolerant = Matcher::default();

        let exact_ids: Vec<_> = exact.filter(fixtures.clone(), &wl).into_iter().map(|f| f.id).collect();
        let tolerant_ids: Vec<_> = tolerant.filter(fixtures, &wl).into_iter().map(|f| f.id).collect();

        assert_eq!(exact_ids, vec![FixtureId::Feed("1".into())]);
        assert_eq!(tolerant_ids, vec![FixtureId::Feed("1".into()), FixtureId::Feed("2".into())]);
    }

    #[test]
    fn widening_tolerance_never_shrinks_matches() {
        let wl = watchlist(json!([{ "teamA": "A", "teamB": "B", "scheduledAt": "2024-05-12T19:00:00Z" }]));
        let fixtures: Vec<_> = [0i64, 45, 90, 120, 240]
            .iter()
            .enumerate()
            .map(|(i, m)| fixture(i as u64, "A", "B", "", Some(kickoff() + Duration::minutes(*m))))
            .collect();

        let mut previous = 0;
        for mins in [0i64, 30, 90, 180, 300] {
            let m = Matcher::new(NameNormalizer::default(), MatchMode::Tolerant, Duration::minutes(mins));
            let count = m.filter(fixtures.clone(), &wl).len();
            assert!(count >= previous, "tolerance {mins} matched {count} < {previous}");
            previous = count;
        }
        assert_eq!(previous, 5);
    }

    #[test]
    fn strip_policy_matches_at_least_what_trim_matches() {
        let tips = json!([{ "teamA": "RealMadrid", "teamB": "Barcelona" }]);
        let f = fixture(1, "Real Madrid", "Barcelona", "", None);

        let trim = NameNormalizer::new(NamePolicy::TrimOnly);
        let strip = NameNormalizer::new(NamePolicy::StripWhitespace);
        let wl_trim = flatten(&json!({ "s": tips.clone() }), &trim, chrono::FixedOffset::east_opt(0).unwrap()).unwrap();
        let wl_strip = flatten(&json!({ "s": tips }), &strip, chrono::FixedOffset::east_opt(0).unwrap()).unwrap();

        let m_trim = Matcher::new(trim, MatchMode::Tolerant, Duration::minutes(90));
        let m_strip = Matcher::new(strip, MatchMode::Tolerant, Duration::minutes(90));
        assert!(!m_trim.matches(&f, &wl_trim));
        assert!(m_strip.matches(&f, &wl_strip));
    }

    #[test]
    fn match_key_display() {
        let key = MatchKey::new(&NameNormalizer::new(NamePolicy::TrimOnly), " Real Madrid ", "Barcelona");
        assert_eq!(key.to_string(), "real madrid_vs_barcelona");
    }
}
