//! Pattern library for resolution-rule text
//!
//! A fixed table of named, case-insensitive matchers over the bounded
//! vocabulary of prediction-market phrasing. The library is data: each
//! category maps to one compiled expression, and extraction strategies ask
//! for "all matches of category C in text T". Scans are independent; there
//! is no shared cursor, so the same text can be scanned repeatedly by any
//! number of categories.

use once_cell::sync::Lazy;
use regex::Regex;

/// Semantic category of a text-matching rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RulePattern {
    // Time windows
    TimeBefore,
    TimeAfter,
    TimeBy,
    ScheduledDate,
    MeetingDate,
    EndDate,

    // Numeric thresholds
    GreaterThan,
    LessThan,
    EqualTo,
    BasisPoints,
    Percentage,

    // Conditional connectives
    IfCondition,
    UnlessCondition,
    VersusPrior,

    // Data-source citations
    BasedOn,
    AccordingTo,
    SourceTag,
    OfficialSource,

    // Frequency / occurrence
    AtLeast,
    AtMost,
    Within,

    // Rounding rules
    RoundingRule,

    // Fallback / default phrasing
    NoStatement,
    DefaultResolution,

    // Timeline markers
    StatementRelease,
    DataPublication,
}

/// One match of a pattern: the full matched text plus its capture groups
#[derive(Debug, Clone)]
pub struct PatternHit {
    pub text: String,
    pub groups: Vec<String>,
}

impl PatternHit {
    /// First capture group, or the full match when the pattern has none
    pub fn capture(&self) -> &str {
        self.groups.first().map(String::as_str).unwrap_or(&self.text)
    }
}

const PATTERN_TABLE: &[(RulePattern, &str)] = &[
    (RulePattern::TimeBefore, r"(?i)before\s+([A-Za-z]+\s+\d+,?\s+\d{4})"),
    (RulePattern::TimeAfter, r"(?i)after\s+([A-Za-z]+\s+\d+,?\s+\d{4})"),
    (RulePattern::TimeBy, r"(?i)by\s+([A-Za-z]+\s+\d+,?\s+\d{4})"),
    (
        RulePattern::ScheduledDate,
        r"(?i)scheduled for\s+([A-Za-z]+\s+\d+(?:\s*-\s*\d+)?,?\s+\d{4})",
    ),
    (
        RulePattern::MeetingDate,
        r"(?i)meeting.*?(?:scheduled for|on)\s+([A-Za-z]+\s+\d+(?:\s*-\s*\d+)?,?\s+\d{4})",
    ),
    (RulePattern::EndDate, r"(?i)by\s+(?:the\s+)?end\s+(?:date\s+)?of\s+([^,.]+)"),
    (
        RulePattern::GreaterThan,
        r"(?i)(above|greater than|more than|exceeds?)\s+(\$?[\d,]+(?:\.\d+)?[kmb]?)",
    ),
    (
        RulePattern::LessThan,
        r"(?i)(below|less than|under|falls? below)\s+(\$?[\d,]+(?:\.\d+)?[kmb]?)",
    ),
    (RulePattern::EqualTo, r"(?i)(equal to|exactly)\s+(\$?[\d,]+(?:\.\d+)?[kmb]?)"),
    (RulePattern::BasisPoints, r"(?i)(\d+(?:\.\d+)?)\s*(?:basis points?|bps?)"),
    (RulePattern::Percentage, r"(\d+(?:\.\d+)?)%"),
    (RulePattern::IfCondition, r"(?i)if\s+([^,.]+?)(?:,|\.|then)"),
    (RulePattern::UnlessCondition, r"(?i)unless\s+([^,.]+?)(?:,|\.)"),
    (RulePattern::VersusPrior, r"(?i)versus\s+(?:the\s+)?(?:level|rate|value).*?prior to"),
    (RulePattern::BasedOn, r"(?i)based on\s+(.+?)(?:\.|,|$)"),
    (RulePattern::AccordingTo, r"(?i)according to\s+(.+?)(?:\.|,|$)"),
    (RulePattern::SourceTag, r"(?i)source[:\s]+(.+?)(?:\.|,|$)"),
    (
        RulePattern::OfficialSource,
        r"(?i)(?:resolution source|source|according to|based on|published at|official|announced by).*?(https?://\S+|[A-Z][a-zA-Z\s]+(?:Committee|Reserve|Bureau|Agency|Department|Board|Administration|Commission))",
    ),
    (RulePattern::AtLeast, r"(?i)at least\s+(\d+)"),
    (RulePattern::AtMost, r"(?i)at most\s+(\d+)"),
    (RulePattern::Within, r"(?i)within\s+(\d+\s+\w+)"),
    (
        RulePattern::RoundingRule,
        r"(?i)(?:rounded|will be rounded)\s+(?:up|down)?\s*to\s+(?:the\s+)?nearest\s+(\d+)",
    ),
    (RulePattern::NoStatement, r"(?i)if no statement.*?(?:by|before)\s+([^,.]+)"),
    (
        RulePattern::DefaultResolution,
        r#"(?i)will resolve to\s+(?:the\s+)?["']?([^"',.]+)["']?"#,
    ),
    (RulePattern::StatementRelease, r"(?i)statement|announcement|release"),
    (RulePattern::DataPublication, r"(?i)level.*(?:published|issued|reported)"),
];

static LIBRARY: Lazy<Vec<(RulePattern, Regex)>> = Lazy::new(|| {
    PATTERN_TABLE
        .iter()
        .map(|(pattern, expr)| {
            let regex = Regex::new(expr)
                .unwrap_or_else(|e| panic!("invalid pattern for {:?}: {}", pattern, e));
            (*pattern, regex)
        })
        .collect()
});

fn matcher(pattern: RulePattern) -> &'static Regex {
    LIBRARY
        .iter()
        .find(|(p, _)| *p == pattern)
        .map(|(_, regex)| regex)
        .expect("every RulePattern has a table entry")
}

/// Find all matches of a category in the text, with captured substrings
pub fn captures(pattern: RulePattern, text: &str) -> Vec<PatternHit> {
    matcher(pattern)
        .captures_iter(text)
        .map(|caps| PatternHit {
            text: caps.get(0).map(|m| m.as_str().to_string()).unwrap_or_default(),
            groups: caps
                .iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str().to_string())
                .collect(),
        })
        .collect()
}

/// Check whether the text contains at least one match of a category
pub fn is_match(pattern: RulePattern, text: &str) -> bool {
    matcher(pattern).is_match(text)
}
