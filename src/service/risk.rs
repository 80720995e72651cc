//! Risk scoring for resolution-rule clarity
//!
//! Scores the raw rule text independently of the extracted graph: the score
//! starts at 100 and each factor applies a signed adjustment while recording
//! one finding. All scans run against the description and resolution source
//! alone, so the scorer can run concurrently with extraction.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{RiskAssessment, RiskLevel, SubMarket};

static VAGUE_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)approximately|around|about|roughly|near|close to").unwrap());
static SPECIFIC_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}|\d{1,2}:\d{2}|UTC|EST|GMT").unwrap());
static DEADLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)deadline|expires|ends on|until|by").unwrap());

static IF_BRANCH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(?:if|when|should)\b").unwrap());
static UNLESS_BRANCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:unless|except|however)\b").unwrap());
static FALLBACK_BRANCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:in case|otherwise|alternatively|default)\b").unwrap());

static ROUNDING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)round(?:ed)?|nearest|decimal|precision").unwrap());
static BASIS_POINTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)basis points?|bps").unwrap());
static PERCENTAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?%").unwrap());

const RELIABLE_SOURCES: &[&str] = &[
    "federal reserve",
    "official",
    "government",
    ".gov",
    "sec.gov",
    "federalregister",
    "census.gov",
    "bloomberg",
    "reuters",
];

const UNRELIABLE_SOURCES: &[&str] = &[
    "twitter",
    "reddit",
    "telegram",
    "discord",
    "poll",
    "vote",
    "community decision",
];

const AMBIGUOUS_TERMS: &[&str] = &[
    "may",
    "might",
    "could",
    "possibly",
    "likely",
    "probably",
    "significant",
    "substantial",
    "major",
    "minor",
];

const OBJECTIVE_KEYWORDS: &[&str] = &["price", "official announcement", "published", "reported"];
const SUBJECTIVE_KEYWORDS: &[&str] = &["intent", "opinion", "belief", "considers", "views as"];

static AMBIGUOUS_MATCHERS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    AMBIGUOUS_TERMS
        .iter()
        .map(|term| (*term, Regex::new(&format!(r"(?i)\b{}\b", term)).unwrap()))
        .collect()
});

/// Assess the clarity risk of a market's resolution rules
pub fn assess_market_risk(
    question: &str,
    description: &str,
    resolution_source: Option<&str>,
    markets: &[SubMarket],
) -> RiskAssessment {
    let mut score: i32 = 100;
    let mut risks = Vec::new();
    let mut warnings = Vec::new();
    let mut strengths = Vec::new();

    // 1. Rule length
    let desc_length = description.chars().count();
    if desc_length < 200 {
        score -= 15;
        risks.push("Rule description is very brief, may lack important details".to_string());
    } else if desc_length > 2000 {
        score -= 10;
        warnings.push("Very long rule description, contains many conditional clauses".to_string());
    } else {
        strengths.push("Rule length is appropriate, detailed yet clear".to_string());
    }

    // 2. Time ambiguity
    let has_vague_time = VAGUE_TIME.is_match(description);
    let has_specific_time = SPECIFIC_TIME.is_match(description);
    let has_deadline = DEADLINE.is_match(description);

    if has_vague_time {
        score -= 15;
        risks.push(
            "Contains vague time expressions (e.g., \"approximately\", \"around\")".to_string(),
        );
    }
    if !has_specific_time && has_deadline {
        score -= 10;
        warnings.push("Deadline mentioned but no specific timestamp provided".to_string());
    }
    if has_specific_time {
        strengths.push("Clear timestamp and timezone specified".to_string());
    }

    // 3. Data-source reliability
    match resolution_source {
        None => {
            score -= 20;
            risks.push("No official data source specified".to_string());
        }
        Some(source) => {
            let source_lower = source.to_lowercase();
            let reliable = RELIABLE_SOURCES.iter().any(|s| source_lower.contains(s));
            let unreliable = UNRELIABLE_SOURCES.iter().any(|s| source_lower.contains(s));

            if reliable {
                strengths.push("Uses official/authoritative data source".to_string());
            } else if unreliable {
                score -= 25;
                risks.push(
                    "Data source is social media or community-based, high subjectivity risk"
                        .to_string(),
                );
            } else {
                score -= 5;
                warnings.push("Data source reliability unclear".to_string());
            }
        }
    }

    // 4. Conditional branch complexity
    let if_count = IF_BRANCH.find_iter(description).count();
    let unless_count = UNLESS_BRANCH.find_iter(description).count();
    let fallback_count = FALLBACK_BRANCH.find_iter(description).count();
    let total_branches = if_count + unless_count + fallback_count;

    if total_branches > 5 {
        score -= 15;
        risks.push(format!(
            "Contains {} conditional branches, logic is complex",
            total_branches
        ));
    } else if total_branches > 2 {
        score -= 5;
        warnings.push(format!(
            "Contains {} conditional clauses, requires careful reading",
            total_branches
        ));
    }

    if unless_count > 0 {
        score -= (unless_count as i32) * 3;
        warnings.push(format!("Contains {} exception clause(s)", unless_count));
    }

    if fallback_count > 0 {
        strengths.push("Has clear fallback mechanism".to_string());
    } else if total_branches > 2 {
        score -= 8;
        warnings.push("Complex conditions but no fallback mechanism defined".to_string());
    }

    // 5. Multi-outcome option count
    if !markets.is_empty() {
        if markets.len() > 10 {
            score -= 5;
            warnings.push(format!(
                "Too many options ({}), verification may be complex",
                markets.len()
            ));
        } else {
            strengths.push(format!("Clear options ({} total)", markets.len()));
        }
    }

    // 6. Numeric precision and rounding
    let has_rounding = ROUNDING.is_match(description);
    let has_basis_points = BASIS_POINTS.is_match(description);

    if has_rounding || has_basis_points {
        if has_rounding {
            strengths.push("Explicit rounding rules defined".to_string());
        }
        if has_basis_points {
            strengths.push("Uses standard basis points notation".to_string());
        }
    } else if PERCENTAGE.is_match(description) {
        score -= 5;
        warnings.push("Contains percentages but rounding method unclear".to_string());
    }

    // 7. Hedge-word ambiguity
    let found_ambiguous: Vec<&str> = AMBIGUOUS_MATCHERS
        .iter()
        .filter(|(_, matcher)| matcher.is_match(description))
        .map(|(term, _)| *term)
        .collect();

    if !found_ambiguous.is_empty() {
        score -= (found_ambiguous.len() as i32) * 3;
        warnings.push(format!(
            "Contains ambiguous terms: {}",
            found_ambiguous
                .iter()
                .take(3)
                .copied()
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    // 8. Verification difficulty
    let description_lower = description.to_lowercase();
    let has_objective = OBJECTIVE_KEYWORDS
        .iter()
        .any(|kw| description_lower.contains(kw));
    let has_subjective = SUBJECTIVE_KEYWORDS
        .iter()
        .any(|kw| description_lower.contains(kw));

    if has_subjective {
        score -= 20;
        risks.push("Resolution requires subjective judgment, high dispute risk".to_string());
    } else if has_objective {
        strengths.push("Objective verification criteria".to_string());
    }

    let score = score.clamp(0, 100) as u8;
    let level = RiskLevel::from_score(score);

    tracing::debug!(
        question = %question,
        score = score,
        level = ?level,
        risks = risks.len(),
        warnings = warnings.len(),
        strengths = strengths.len(),
        "Assessed market risk"
    );

    RiskAssessment {
        score,
        level,
        risks,
        warnings,
        strengths,
    }
}
