//! Market rule-analysis orchestration
//!
//! One analysis request: retrieve the market, score its rule text, and
//! extract the resolution graph — AI first when enabled, with a synchronous
//! fallback to the deterministic strategies. Extraction and risk scoring
//! share no state beyond the raw market text.

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::{LogicNode, MarketSnapshot, ParsedRule, RiskAssessment};
use crate::retriever::{MarketRetriever, RetrieverError};
use crate::service::ai::{AiExtractionError, AiParsedRule, AiRuleParser};
use crate::service::{extraction, risk};

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Retriever(#[from] RetrieverError),
}

/// Which producer built the rule graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionEngine {
    Ai,
    Advanced,
    Basic,
}

/// Extracted rule graph plus derived artifacts
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RuleAnalysis {
    pub engine: ExtractionEngine,
    pub nodes: Vec<LogicNode>,
    pub diagram_markup: String,
    pub summary: String,
    pub coverage_rate: u8,
    pub detected_patterns: Vec<String>,
    /// Model commentary; empty for the deterministic engines
    pub insights: Vec<String>,
}

impl RuleAnalysis {
    fn from_parsed(rule: ParsedRule, engine: ExtractionEngine) -> Self {
        Self {
            engine,
            nodes: rule.nodes,
            diagram_markup: rule.diagram_markup,
            summary: rule.summary,
            coverage_rate: rule.coverage_rate,
            detected_patterns: rule.detected_patterns,
            insights: Vec::new(),
        }
    }

    fn from_ai(parsed: AiParsedRule) -> Self {
        let mut analysis = Self::from_parsed(parsed.rule, ExtractionEngine::Ai);
        analysis.insights = parsed.insights;
        analysis
    }
}

/// Full analysis report for one market
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MarketAnalysis {
    pub market: MarketSnapshot,
    pub rule: RuleAnalysis,
    pub risk: RiskAssessment,
    /// Non-fatal note when AI extraction was skipped over quota
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_advisory: Option<String>,
}

/// Service orchestrating retrieval, extraction and scoring
pub struct AnalysisService {
    retriever: Arc<dyn MarketRetriever>,
    ai: Option<AiRuleParser>,
}

impl AnalysisService {
    pub fn new(retriever: Arc<dyn MarketRetriever>, ai: Option<AiRuleParser>) -> Self {
        Self { retriever, ai }
    }

    /// Whether AI extraction is configured for this service
    pub fn ai_available(&self) -> bool {
        self.ai.is_some()
    }

    /// Analyze a market by slug
    pub async fn analyze(&self, slug: &str, use_ai: bool) -> Result<MarketAnalysis, AnalysisError> {
        let market = self.retriever.retrieve(slug).await?;

        let risk = risk::assess_market_risk(
            &market.question,
            &market.description,
            market.resolution_source.as_deref(),
            &market.markets,
        );

        let (rule, ai_advisory) = self.extract_rule(&market, use_ai).await;

        tracing::info!(
            slug = %slug,
            engine = ?rule.engine,
            coverage = rule.coverage_rate,
            risk_score = risk.score,
            "Market analysis complete"
        );

        Ok(MarketAnalysis {
            market,
            rule,
            risk,
            ai_advisory,
        })
    }

    /// Extract the rule graph: one AI attempt when enabled, deterministic
    /// fallback on any failure
    async fn extract_rule(
        &self,
        market: &MarketSnapshot,
        use_ai: bool,
    ) -> (RuleAnalysis, Option<String>) {
        let mut advisory = None;

        if use_ai {
            if let Some(ai) = &self.ai {
                match ai.parse(market).await {
                    Ok(parsed) => return (RuleAnalysis::from_ai(parsed), None),
                    Err(e @ AiExtractionError::QuotaExceeded(_)) => {
                        tracing::warn!(error = %e, "AI extraction over quota, using fallback");
                        advisory = Some(e.to_string());
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "AI extraction failed, using fallback");
                    }
                }
            }
        }

        (Self::deterministic(market), advisory)
    }

    /// Deterministic extraction, strategy chosen by text complexity
    fn deterministic(market: &MarketSnapshot) -> RuleAnalysis {
        if extraction::should_use_advanced(market) {
            RuleAnalysis::from_parsed(
                extraction::advanced::extract(
                    &market.question,
                    &market.description,
                    market.resolution_source.as_deref(),
                    &market.markets,
                ),
                ExtractionEngine::Advanced,
            )
        } else {
            RuleAnalysis::from_parsed(
                extraction::basic::extract(
                    &market.question,
                    &market.description,
                    market.resolution_source.as_deref(),
                ),
                ExtractionEngine::Basic,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SubMarket;
    use async_trait::async_trait;

    struct StubRetriever {
        snapshot: Option<MarketSnapshot>,
    }

    #[async_trait]
    impl MarketRetriever for StubRetriever {
        async fn retrieve(&self, slug: &str) -> Result<MarketSnapshot, RetrieverError> {
            self.snapshot
                .clone()
                .ok_or_else(|| RetrieverError::NotFound(slug.to_string()))
        }
    }

    fn snapshot(description: &str, sub_markets: usize) -> MarketSnapshot {
        MarketSnapshot {
            question: "Will X happen".to_string(),
            description: description.to_string(),
            outcomes: Vec::new(),
            outcome_prices: Vec::new(),
            end_date: None,
            resolution_source: None,
            category: String::new(),
            volume: String::new(),
            liquidity: String::new(),
            is_event: sub_markets > 0,
            markets: (0..sub_markets)
                .map(|i| SubMarket {
                    question: format!("Will bracket {} hit?", i),
                    outcomes: Vec::new(),
                    outcome_prices: Vec::new(),
                })
                .collect(),
        }
    }

    fn service(snapshot: Option<MarketSnapshot>) -> AnalysisService {
        AnalysisService::new(Arc::new(StubRetriever { snapshot }), None)
    }

    #[tokio::test]
    async fn simple_markets_use_the_basic_engine() {
        let analysis = service(Some(snapshot("Resolves YES if it rains.", 0)))
            .analyze("slug", true)
            .await
            .unwrap();
        assert_eq!(analysis.rule.engine, ExtractionEngine::Basic);
        assert!(analysis.ai_advisory.is_none());
        assert!(analysis.rule.insights.is_empty());
    }

    #[tokio::test]
    async fn complex_markets_use_the_advanced_engine() {
        let analysis = service(Some(snapshot(
            "Resolves based on the statement, in basis points versus the prior level.",
            4,
        )))
        .analyze("slug", true)
        .await
        .unwrap();
        assert_eq!(analysis.rule.engine, ExtractionEngine::Advanced);
    }

    #[tokio::test]
    async fn risk_and_rule_come_from_the_same_text() {
        let analysis = service(Some(snapshot("Short rule text.", 0)))
            .analyze("slug", false)
            .await
            .unwrap();
        // risk scoring ran independently of extraction
        assert_eq!(analysis.risk.score, 65);
        assert_eq!(analysis.rule.engine, ExtractionEngine::Basic);
    }

    #[tokio::test]
    async fn missing_markets_surface_not_found() {
        let result = service(None).analyze("missing-slug", true).await;
        assert!(matches!(
            result,
            Err(AnalysisError::Retriever(RetrieverError::NotFound(_)))
        ));
    }
}
