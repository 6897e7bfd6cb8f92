use fixture_feed::FeedError;

/// Why a cycle stopped. None of these ever leads to a write of partial data.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("watchlist read failed: {0:#}")]
    WatchlistRead(anyhow::Error),
    #[error(transparent)]
    FeedRequest(#[from] FeedError),
    #[error("published set read failed: {0:#}")]
    StoreRead(anyhow::Error),
    #[error("published set write failed: {0:#}")]
    StoreWrite(anyhow::Error),
}

impl CycleError {
    pub fn stage(&self) -> &'static str {
        match self {
            CycleError::WatchlistRead(_) => "watchlist",
            CycleError::FeedRequest(_) => "feed",
            CycleError::StoreRead(_) => "store_read",
            CycleError::StoreWrite(_) => "store_write",
        }
    }
}
