//! API-Football (RapidAPI) `/fixtures` client.
//!
//!   GET {base_url}/fixtures?live=all
//!   x-rapidapi-key:  <key>
//!   x-rapidapi-host: api-football-v1.p.rapidapi.com

use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{parse_feed_body, FeedError, FeedScope, FeedShape, FeedSnapshot, FixtureFeed};

pub const DEFAULT_BASE_URL: &str = "https://api-football-v1.p.rapidapi.com/v3";
pub const DEFAULT_API_HOST: &str = "api-football-v1.p.rapidapi.com";

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub base_url:     String,
    pub api_key:      String,
    pub api_host:     String,
    pub scope:        FeedScope,
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url:     DEFAULT_BASE_URL.to_string(),
            api_key:      String::new(),
            api_host:     DEFAULT_API_HOST.to_string(),
            scope:        FeedScope::Live,
            timeout_secs: 10,
        }
    }
}

pub struct ApiFootballFeed {
    client: reqwest::Client,
    config: FeedConfig,
}

impl ApiFootballFeed {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            config,
        }
    }

    fn fixtures_url(&self) -> String {
        format!("{}/fixtures", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl FixtureFeed for ApiFootballFeed {
    fn scope(&self) -> &FeedScope {
        &self.config.scope
    }

    async fn fetch(&self) -> Result<FeedSnapshot, FeedError> {
        let query = self.config.scope.query(Utc::now().date_naive());
        let resp = self.client
            .get(self.fixtures_url())
            .header("x-rapidapi-key", &self.config.api_key)
            .header("x-rapidapi-host", &self.config.api_host)
            .query(&query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FeedError::Status {
                status: status.as_u16(),
                body:   body.chars().take(200).collect(),
            });
        }

        let raw = resp.text().await?;
        debug!("feed {} raw (first 300): {}", self.config.scope, raw.chars().take(300).collect::<String>());

        let snapshot = parse_feed_body(&raw);
        if let Some(errors) = &snapshot.api_errors {
            warn!(scope = %self.config.scope, "feed reported errors: {errors}");
        }
        match &snapshot.shape {
            FeedShape::Ok => info!(
                scope = %self.config.scope,
                fixtures = snapshot.fixtures.len(),
                skipped = snapshot.skipped,
                "feed snapshot fetched"
            ),
            FeedShape::Malformed(reason) => {
                warn!(scope = %self.config.scope, "feed payload malformed, treating as zero fixtures: {reason}")
            }
        }
        Ok(snapshot)
    }
}
