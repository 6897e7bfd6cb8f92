use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// Which slice of the feed a deployment polls. Fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedScope {
    /// `live=all`
    Live,
    /// `date=<current UTC date>`, resolved per request
    Today,
    /// `date=YYYY-MM-DD`
    Date(NaiveDate),
    /// `next=N&live=all`
    Upcoming(u32),
}

#[derive(Debug, thiserror::Error)]
#[error("invalid feed scope `{0}` (expected live, today, date:YYYY-MM-DD or next:N)")]
pub struct InvalidScope(pub String);

impl FeedScope {
    pub fn query(&self, today: NaiveDate) -> Vec<(&'static str, String)> {
        match self {
            FeedScope::Live => vec![("live", "all".to_string())],
            FeedScope::Today => vec![("date", today.format("%Y-%m-%d").to_string())],
            FeedScope::Date(d) => vec![("date", d.format("%Y-%m-%d").to_string())],
            FeedScope::Upcoming(n) => vec![("next", n.to_string()), ("live", "all".to_string())],
        }
    }
}

impl FromStr for FeedScope {
    type Err = InvalidScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().to_lowercase();
        let bad = || InvalidScope(s.to_string());

        match raw.as_str() {
            "live" => return Ok(FeedScope::Live),
            "today" => return Ok(FeedScope::Today),
            _ => {}
        }

        match raw.split_once(':') {
            Some(("date", d)) => NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")
                .map(FeedScope::Date)
                .map_err(|_| bad()),
            Some(("next", n)) => match n.trim().parse::<u32>() {
                Ok(n) if n > 0 => Ok(FeedScope::Upcoming(n)),
                _ => Err(bad()),
            },
            _ => Err(bad()),
        }
    }
}

impl fmt::Display for FeedScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedScope::Live => write!(f, "live"),
            FeedScope::Today => write!(f, "today"),
            FeedScope::Date(d) => write!(f, "date:{}", d.format("%Y-%m-%d")),
            FeedScope::Upcoming(n) => write!(f, "next:{n}"),
        }
    }
}
