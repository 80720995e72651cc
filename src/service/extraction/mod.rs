//! Deterministic rule-extraction strategies
//!
//! Two interchangeable strategies share the `ParsedRule` contract: `basic`
//! builds a linear condition chain, `advanced` models timelines, bracketed
//! outcomes, sources and fallbacks. Both are pure and total: any string
//! input yields a valid rule, with absent matches simply producing fewer
//! nodes and lower coverage.

pub mod advanced;
pub mod basic;
pub mod patterns;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::MarketSnapshot;

/// Vocabulary that signals process-driven or bracketed resolution rules
static COMPLEXITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)basis points?|bps|meeting|statement|unless|versus|rounded").unwrap());

/// Pick the strategy for a market: advanced for long descriptions,
/// multi-outcome events, and process-heavy vocabulary
pub fn should_use_advanced(market: &MarketSnapshot) -> bool {
    market.description.chars().count() > 500
        || (market.is_event && market.markets.len() > 2)
        || COMPLEXITY.is_match(&market.description)
}
