//! tipwatch-live — Fixture Feed
//!
//! Live fixture snapshot from API-Football:
//!   - one GET per cycle, scope fixed per deployment (live / date / next+live)
//!   - transport problems and non-2xx are errors
//!   - a body without a `response` array is zero fixtures, never an error

use async_trait::async_trait;

mod client;
mod record;
mod scope;

pub use client::{ApiFootballFeed, FeedConfig, DEFAULT_API_HOST, DEFAULT_BASE_URL};
pub use record::{parse_feed_body, synthetic_key, FeedShape, FeedSnapshot, FixtureId, FixtureRecord};
pub use scope::{FeedScope, InvalidScope};

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("feed returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl FeedError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FeedError::Transport(e) => e.status().map(|s| s.as_u16()),
            FeedError::Status { status, .. } => Some(*status),
        }
    }
}

#[async_trait]
pub trait FixtureFeed: Send + Sync {
    fn scope(&self) -> &FeedScope;

    async fn fetch(&self) -> Result<FeedSnapshot, FeedError>;
}
