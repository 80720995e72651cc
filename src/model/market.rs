//! Upstream market-data model for the Polymarket Gamma API
//!
//! Wire shapes are decoded defensively: every field is optional with an
//! explicit default, and the `outcomes`/`outcomePrices` fields accept either
//! a native JSON list or a JSON-encoded string, falling back to an empty
//! list when the string form does not decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// One discrete outcome option inside a multi-outcome event
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubMarket {
    pub question: String,
    pub outcomes: Vec<String>,
    pub outcome_prices: Vec<String>,
}

/// Normalized market data consumed by extraction and risk scoring
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MarketSnapshot {
    pub question: String,
    pub description: String,
    pub outcomes: Vec<String>,
    pub outcome_prices: Vec<String>,
    /// End date when the upstream value parses as RFC 3339
    pub end_date: Option<DateTime<Utc>>,
    /// Resolution source; empty upstream strings normalize to `None`
    pub resolution_source: Option<String>,
    pub category: String,
    pub volume: String,
    pub liquidity: String,
    pub is_event: bool,
    /// Sub-markets of a multi-outcome event; empty for single markets
    pub markets: Vec<SubMarket>,
}

/// Event shape returned by `/events?slug=`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaEvent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub end_date_iso: Option<String>,
    #[serde(default)]
    pub resolution_source: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub volume: Option<Value>,
    #[serde(default)]
    pub liquidity: Option<Value>,
    #[serde(default)]
    pub markets: Vec<GammaSubMarket>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaSubMarket {
    #[serde(default)]
    pub question: String,
    #[serde(default, deserialize_with = "string_or_list")]
    pub outcomes: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub outcome_prices: Vec<String>,
}

/// Single-market shape returned by `/markets?slug=`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaMarket {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "string_or_list")]
    pub outcomes: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub outcome_prices: Vec<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub end_date_iso: Option<String>,
    #[serde(default)]
    pub resolution_source: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub volume: Option<Value>,
    #[serde(default)]
    pub volume_num: Option<Value>,
    #[serde(default)]
    pub liquidity: Option<Value>,
    #[serde(default)]
    pub liquidity_num: Option<Value>,
}

/// Tagged union of the two upstream response shapes
#[derive(Debug, Clone)]
pub enum MarketPayload {
    Event(GammaEvent),
    Single(GammaMarket),
}

impl From<MarketPayload> for MarketSnapshot {
    fn from(payload: MarketPayload) -> Self {
        match payload {
            MarketPayload::Event(event) => {
                let markets: Vec<SubMarket> = event
                    .markets
                    .into_iter()
                    .map(|m| SubMarket {
                        question: m.question,
                        outcomes: m.outcomes,
                        outcome_prices: m.outcome_prices,
                    })
                    .collect();

                MarketSnapshot {
                    question: event.title,
                    description: event.description,
                    outcomes: markets.iter().map(|m| m.question.clone()).collect(),
                    outcome_prices: markets
                        .iter()
                        .map(|m| m.outcome_prices.first().cloned().unwrap_or_else(|| "0".to_string()))
                        .collect(),
                    end_date: parse_end_date(event.end_date.as_deref(), event.end_date_iso.as_deref()),
                    resolution_source: normalize_source(event.resolution_source),
                    category: event.category.unwrap_or_default(),
                    volume: display_value(event.volume),
                    liquidity: display_value(event.liquidity),
                    is_event: true,
                    markets,
                }
            }
            MarketPayload::Single(market) => MarketSnapshot {
                question: market.question,
                description: market.description,
                outcomes: market.outcomes,
                outcome_prices: market.outcome_prices,
                end_date: parse_end_date(market.end_date.as_deref(), market.end_date_iso.as_deref()),
                resolution_source: normalize_source(market.resolution_source),
                category: market.category.unwrap_or_default(),
                volume: first_display_value(market.volume, market.volume_num),
                liquidity: first_display_value(market.liquidity, market.liquidity_num),
                is_event: false,
                markets: Vec::new(),
            },
        }
    }
}

/// Accept either a native list or a JSON-encoded string of a list.
/// A string that fails to decode yields an empty list, never an error.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(decode_list(value))
}

fn decode_list(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::String(encoded)) => serde_json::from_str(&encoded).unwrap_or_default(),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn normalize_source(source: Option<String>) -> Option<String> {
    source.filter(|s| !s.trim().is_empty())
}

fn parse_end_date(end_date: Option<&str>, end_date_iso: Option<&str>) -> Option<DateTime<Utc>> {
    end_date
        .into_iter()
        .chain(end_date_iso)
        .find_map(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn display_value(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn first_display_value(primary: Option<Value>, fallback: Option<Value>) -> String {
    let primary = display_value(primary);
    if primary.is_empty() {
        display_value(fallback)
    } else {
        primary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_decode_from_json_encoded_string() {
        let market: GammaMarket =
            serde_json::from_str(r#"{"question":"Q","outcomes":"[\"Yes\",\"No\"]"}"#).unwrap();
        assert_eq!(market.outcomes, vec!["Yes", "No"]);
    }

    #[test]
    fn outcomes_decode_from_native_list() {
        let market: GammaMarket =
            serde_json::from_str(r#"{"question":"Q","outcomes":["Yes","No"]}"#).unwrap();
        assert_eq!(market.outcomes, vec!["Yes", "No"]);
    }

    #[test]
    fn malformed_outcome_string_falls_back_to_empty() {
        let market: GammaMarket =
            serde_json::from_str(r#"{"question":"Q","outcomes":"not json"}"#).unwrap();
        assert!(market.outcomes.is_empty());

        let market: GammaMarket =
            serde_json::from_str(r#"{"question":"Q","outcomePrices":null}"#).unwrap();
        assert!(market.outcome_prices.is_empty());
    }

    #[test]
    fn event_normalizes_submarkets_and_prices() {
        let event: GammaEvent = serde_json::from_str(
            r#"{
                "title": "Fed decision in December?",
                "description": "Resolves based on the FOMC statement.",
                "endDate": "2025-12-31T00:00:00Z",
                "volume": 12345.5,
                "markets": [
                    {"question": "25 bps decrease?", "outcomes": "[\"Yes\",\"No\"]", "outcomePrices": "[\"0.4\",\"0.6\"]"},
                    {"question": "No change?", "outcomes": ["Yes","No"]}
                ]
            }"#,
        )
        .unwrap();

        let snapshot = MarketSnapshot::from(MarketPayload::Event(event));
        assert!(snapshot.is_event);
        assert_eq!(snapshot.markets.len(), 2);
        assert_eq!(snapshot.outcomes, vec!["25 bps decrease?", "No change?"]);
        assert_eq!(snapshot.outcome_prices, vec!["0.4", "0"]);
        assert_eq!(snapshot.volume, "12345.5");
        assert!(snapshot.end_date.is_some());
    }

    #[test]
    fn empty_resolution_source_normalizes_to_none() {
        let market: GammaMarket =
            serde_json::from_str(r#"{"question":"Q","resolutionSource":"  "}"#).unwrap();
        let snapshot = MarketSnapshot::from(MarketPayload::Single(market));
        assert!(snapshot.resolution_source.is_none());

        let market: GammaMarket =
            serde_json::from_str(r#"{"question":"Q","resolutionSource":"federalreserve.gov"}"#)
                .unwrap();
        let snapshot = MarketSnapshot::from(MarketPayload::Single(market));
        assert_eq!(snapshot.resolution_source.as_deref(), Some("federalreserve.gov"));
    }

    #[test]
    fn unparseable_end_date_is_none() {
        let market: GammaMarket =
            serde_json::from_str(r#"{"question":"Q","endDate":"soon"}"#).unwrap();
        let snapshot = MarketSnapshot::from(MarketPayload::Single(market));
        assert!(snapshot.end_date.is_none());
    }
}
