//! Market-data retrievers for fetching upstream market state

mod gamma;

use async_trait::async_trait;

use crate::model::MarketSnapshot;

pub use gamma::GammaClient;

#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    #[error("Market not found: {0}")]
    NotFound(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

/// Trait for market-data retrievers
#[async_trait]
pub trait MarketRetriever: Send + Sync {
    /// Retrieve normalized market data for a slug
    async fn retrieve(&self, slug: &str) -> Result<MarketSnapshot, RetrieverError>;
}
