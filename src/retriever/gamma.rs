//! Polymarket Gamma API client
//!
//! Markets can live behind two shapes upstream: multi-outcome events and
//! single markets. The client tries the event endpoint first and falls back
//! to the single-market endpoint, normalizing both into `MarketSnapshot`.

use std::env;

use async_trait::async_trait;
use reqwest::Client;

use crate::model::market::{GammaEvent, GammaMarket};
use crate::model::{MarketPayload, MarketSnapshot};

use super::{MarketRetriever, RetrieverError};

const GAMMA_API_BASE_URL: &str = "https://gamma-api.polymarket.com";
const GAMMA_BASE_URL_ENV: &str = "GAMMA_BASE_URL";

/// Client for the Polymarket Gamma API
pub struct GammaClient {
    client: Client,
    base_url: String,
}

impl GammaClient {
    /// Create a new Gamma client
    ///
    /// The base URL is resolved in this order:
    /// 1. `GAMMA_BASE_URL` environment variable if set
    /// 2. Default Gamma API URL
    pub fn new() -> Self {
        let resolved_url = env::var(GAMMA_BASE_URL_ENV)
            .ok()
            .unwrap_or_else(|| GAMMA_API_BASE_URL.to_string());

        Self {
            client: Client::new(),
            base_url: resolved_url,
        }
    }

    /// Fetch the event shape for a slug; `None` when the endpoint has no match
    async fn fetch_event(&self, slug: &str) -> Result<Option<GammaEvent>, RetrieverError> {
        let url = format!("{}/events", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("slug", slug)])
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!(slug = %slug, status = %response.status(), "Event endpoint miss");
            return Ok(None);
        }

        let mut events: Vec<GammaEvent> = response
            .json()
            .await
            .map_err(|e| RetrieverError::Parse(format!("Failed to deserialize events: {}", e)))?;

        if events.is_empty() {
            return Ok(None);
        }
        Ok(Some(events.remove(0)))
    }

    /// Fetch the single-market shape for a slug
    async fn fetch_market(&self, slug: &str) -> Result<Option<GammaMarket>, RetrieverError> {
        let url = format!("{}/markets", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("slug", slug)])
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!(slug = %slug, status = %response.status(), "Market endpoint miss");
            return Ok(None);
        }

        let mut markets: Vec<GammaMarket> = response
            .json()
            .await
            .map_err(|e| RetrieverError::Parse(format!("Failed to deserialize markets: {}", e)))?;

        if markets.is_empty() {
            return Ok(None);
        }
        Ok(Some(markets.remove(0)))
    }
}

impl Default for GammaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketRetriever for GammaClient {
    async fn retrieve(&self, slug: &str) -> Result<MarketSnapshot, RetrieverError> {
        tracing::debug!(slug = %slug, "Fetching market data from Gamma");

        // Events are the more specific shape; try them first
        if let Some(event) = self.fetch_event(slug).await? {
            tracing::debug!(
                slug = %slug,
                sub_markets = event.markets.len(),
                "Resolved slug as event"
            );
            return Ok(MarketSnapshot::from(MarketPayload::Event(event)));
        }

        match self.fetch_market(slug).await? {
            Some(market) => {
                tracing::debug!(slug = %slug, "Resolved slug as single market");
                Ok(MarketSnapshot::from(MarketPayload::Single(market)))
            }
            None => Err(RetrieverError::NotFound(slug.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_retrieve_known_event() {
        let client = GammaClient::new();
        let result = client.retrieve("fed-decision-in-december").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_retrieve_nonexistent_slug() {
        let client = GammaClient::new();
        let result = client.retrieve("definitely-not-a-real-market-slug").await;
        assert!(matches!(result, Err(RetrieverError::NotFound(_))));
    }
}
