//! AI-assisted rule extraction
//!
//! Drop-in alternative producer of the `ParsedRule` contract: a single LLM
//! call per analysis, no retries. The model is asked for a JSON flowchart
//! structure; the reply may carry it raw or inside a fenced code block, so
//! recovery is a two-stage parse (fenced block first, then the first
//! brace-balanced span). Quota exhaustion is a distinguished error so the
//! caller can fall back to the deterministic strategies and still surface
//! the advisory; every other failure falls back silently.

use once_cell::sync::Lazy;
use regex::Regex;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::openai;
use serde::Deserialize;

use crate::model::{LogicNode, MarketSnapshot, NodeKind, ParsedRule, TagSet};
use crate::service::diagram::{self, Connection};

/// Environment variable for the OpenAI API key
const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Default model used for extraction
const DEFAULT_MODEL: &str = openai::GPT_4O_MINI;

/// Sub-markets listed in the prompt before truncating
const MAX_PROMPT_OPTIONS: usize = 10;

/// Coverage claimed when the model omits the field
const DEFAULT_COVERAGE: u8 = 90;

#[derive(Debug, thiserror::Error)]
pub enum AiExtractionError {
    /// Provider quota or rate limit exhausted; the message is surfaced to
    /// the caller as a non-fatal advisory
    #[error("AI extraction quota exhausted: {0}")]
    QuotaExceeded(String),

    /// No JSON object could be recovered from the model's reply
    #[error("No JSON object found in AI response")]
    Unparseable,

    #[error("AI extraction failed: {0}")]
    Failed(String),
}

/// Rule structure as the model emits it; everything is optional
#[derive(Debug, Deserialize)]
struct RawAiRule {
    #[serde(default)]
    nodes: Vec<RawAiNode>,
    #[serde(default)]
    connections: Vec<RawAiConnection>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default, rename = "coverageRate")]
    coverage_rate: Option<f64>,
    #[serde(default)]
    patterns: Vec<String>,
    #[serde(default)]
    insights: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawAiNode {
    #[serde(default)]
    id: String,
    #[serde(default, rename = "type")]
    node_type: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAiConnection {
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    label: Option<String>,
}

/// AI extraction result: the shared rule contract plus model commentary
#[derive(Debug, Clone)]
pub struct AiParsedRule {
    pub rule: ParsedRule,
    pub insights: Vec<String>,
}

/// LLM-backed rule parser
pub struct AiRuleParser {
    client: openai::Client,
    model: String,
}

impl AiRuleParser {
    /// Build the parser from the environment; `None` disables AI extraction
    pub fn from_env(model_override: Option<&str>) -> Option<Self> {
        let client = std::env::var(ENV_OPENAI_API_KEY).ok().and_then(|key| {
            match openai::Client::new(&key) {
                Ok(c) => Some(c),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to create OpenAI client");
                    None
                }
            }
        });

        match client {
            Some(client) => Some(Self {
                client,
                model: model_override.unwrap_or(DEFAULT_MODEL).to_string(),
            }),
            None => {
                tracing::warn!(
                    "OpenAI API key not found ({ENV_OPENAI_API_KEY}), AI extraction disabled"
                );
                None
            }
        }
    }

    /// Run one extraction attempt against the model
    pub async fn parse(&self, market: &MarketSnapshot) -> Result<AiParsedRule, AiExtractionError> {
        let prompt = build_prompt(market);

        let agent = self
            .client
            .agent(&self.model)
            .preamble(EXTRACTION_PREAMBLE)
            .build();

        let reply = agent.prompt(prompt).await.map_err(classify_error)?;

        let json = extract_json_object(&reply).ok_or(AiExtractionError::Unparseable)?;
        let raw: RawAiRule = serde_json::from_str(&json).map_err(|e| {
            tracing::debug!(error = %e, "AI reply carried malformed JSON");
            AiExtractionError::Unparseable
        })?;

        Ok(convert(raw))
    }
}

/// Classify a provider failure: quota/rate-limit wording is distinguished,
/// everything else collapses into the generic kind
fn classify_error(error: impl std::fmt::Display) -> AiExtractionError {
    let message = error.to_string();
    let lower = message.to_lowercase();
    if lower.contains("429") || lower.contains("quota") || lower.contains("limit") {
        AiExtractionError::QuotaExceeded(message)
    } else {
        AiExtractionError::Failed(message)
    }
}

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap());

/// Stage 1: pull a JSON object out of a fenced code block
fn extract_fenced_json(text: &str) -> Option<String> {
    FENCED_JSON
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Stage 2: take the first brace-balanced span, respecting strings
fn extract_balanced_json(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + offset + ch.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

/// Recover the first JSON object from a model reply
fn extract_json_object(text: &str) -> Option<String> {
    extract_fenced_json(text).or_else(|| extract_balanced_json(text))
}

fn parse_node_kind(raw: &str) -> NodeKind {
    match raw.to_lowercase().as_str() {
        "start" => NodeKind::Start,
        "decision" => NodeKind::Decision,
        "source" => NodeKind::Source,
        "outcome" => NodeKind::Outcome,
        _ => NodeKind::Process,
    }
}

/// Convert the raw model structure into the shared rule contract
fn convert(raw: RawAiRule) -> AiParsedRule {
    let nodes: Vec<LogicNode> = raw
        .nodes
        .into_iter()
        .map(|n| LogicNode {
            id: n.id,
            kind: parse_node_kind(&n.node_type),
            label: n.label,
            value: n.explanation,
            children: Vec::new(),
        })
        .collect();

    let connections: Vec<Connection> = raw
        .connections
        .into_iter()
        .map(|c| Connection {
            from: c.from,
            to: c.to,
            label: c.label,
        })
        .collect();

    let diagram_markup = diagram::compile_connections(&nodes, &connections);

    let mut tags = TagSet::new();
    for pattern in &raw.patterns {
        tags.insert(pattern);
    }

    let coverage_rate = raw
        .coverage_rate
        .map(|c| c.clamp(0.0, 100.0) as u8)
        .unwrap_or(DEFAULT_COVERAGE);

    AiParsedRule {
        rule: ParsedRule {
            nodes,
            diagram_markup,
            summary: raw
                .summary
                .unwrap_or_else(|| "AI-generated summary".to_string()),
            coverage_rate,
            detected_patterns: tags.into_vec(),
        },
        insights: raw.insights,
    }
}

const EXTRACTION_PREAMBLE: &str =
    "You are an expert at analyzing prediction market rules and creating flowcharts.";

/// Build the extraction prompt for a market
fn build_prompt(market: &MarketSnapshot) -> String {
    let mut prompt = format!(
        r#"Analyze this prediction market and create a detailed resolution flowchart structure.

**Market Question**: {}

**Full Description**:
{}
"#,
        market.question, market.description
    );

    if let Some(source) = &market.resolution_source {
        prompt.push_str(&format!("\n**Resolution Source**: {}\n", source));
    }

    if !market.markets.is_empty() {
        prompt.push_str(&format!(
            "\n**Available Outcome Options** ({} total):\n",
            market.markets.len()
        ));
        for (index, sub_market) in market.markets.iter().take(MAX_PROMPT_OPTIONS).enumerate() {
            prompt.push_str(&format!("{}. {}\n", index + 1, sub_market.question));
        }
        if market.markets.len() > MAX_PROMPT_OPTIONS {
            prompt.push_str(&format!(
                "... and {} more options\n",
                market.markets.len() - MAX_PROMPT_OPTIONS
            ));
        }
    }

    prompt.push_str(
        r#"
**Your Task**:
1. Identify ALL resolution steps in chronological order
2. Extract ALL conditional logic and decision points
3. Identify data sources and verification methods
4. Map out the decision flow from start to final outcomes
5. Detect edge cases and fallback conditions

**Output Requirements**:
Return ONLY a valid JSON object (no markdown, no explanations outside JSON) with this exact structure:

{
  "nodes": [
    {"id": "A", "type": "start", "label": "Market Opens", "explanation": "Starting point"},
    {"id": "B", "type": "process", "label": "Wait for FOMC Meeting", "explanation": "Scheduled event"},
    {"id": "C", "type": "decision", "label": "Statement Released?", "explanation": "Check if official statement exists"},
    {"id": "D", "type": "source", "label": "Federal Reserve Official Website", "explanation": "Data source"},
    {"id": "E", "type": "outcome", "label": "50+ bps decrease", "explanation": "Final outcome option"}
  ],
  "connections": [
    {"from": "A", "to": "B"},
    {"from": "B", "to": "C"},
    {"from": "C", "to": "D", "label": "Yes"},
    {"from": "C", "to": "E", "label": "No / Fallback"}
  ],
  "summary": "This market resolves based on ...",
  "coverageRate": 95,
  "patterns": ["time_based", "threshold_check", "official_source", "fallback_condition"],
  "insights": ["Notable edge cases or clarifications"]
}

**Important**:
- Use node IDs: A, B, C, D, E, F, G... (sequential letters)
- Types: "start", "process", "decision", "source", "outcome"
- Create enough nodes to capture the full resolution logic (typically 8-15 nodes)
- For markets with multiple outcomes, create separate outcome nodes
- Include data source nodes
- Map all conditional branches
- CRITICAL: Do NOT use special characters in labels: no brackets, parentheses, curly braces, or double quotes
- Keep labels simple and descriptive, under 60 characters"#,
    );

    prompt
}
