//! Advanced rule-extraction strategy
//!
//! Models the richer structure of multi-outcome and process-driven markets:
//! a resolution timeline (scheduled meetings, statement release, data
//! extraction), cited data sources, branching decision logic (basis-point
//! brackets, if/unless clauses, prior-level comparisons), per-bracket
//! outcomes, and fallback/default conditions.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{LogicNode, NodeIdAllocator, NodeKind, ParsedRule, SubMarket, TagSet};
use crate::service::diagram;

use super::patterns::{self, RulePattern};

/// Outcome brackets rendered individually before collapsing into a summary node
const MAX_BRACKET_NODES: usize = 5;

/// Default-resolution captures longer than this are treated as prose, not values
const MAX_DEFAULT_VALUE_LEN: usize = 50;

static WILL_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^will\s+").unwrap());

/// Extract a resolution graph using the timeline/decision flow
pub fn extract(
    question: &str,
    description: &str,
    resolution_source: Option<&str>,
    markets: &[SubMarket],
) -> ParsedRule {
    let full_text = format!("{} {}", question, description);
    let mut tags = TagSet::new();
    let mut ids = NodeIdAllocator::new();
    let mut nodes = Vec::new();

    nodes.push(LogicNode::new(ids.next_id(), NodeKind::Start, "Market Opens"));

    let timeline_count = push_timeline(&full_text, &mut tags, &mut ids, &mut nodes);
    push_sources(&full_text, resolution_source, &mut tags, &mut ids, &mut nodes);
    let decision_count = push_decisions(&full_text, markets, &mut tags, &mut ids, &mut nodes);
    push_outcomes(markets, &mut tags, &mut ids, &mut nodes);
    push_fallbacks(&full_text, &mut tags, &mut ids, &mut nodes);

    let diagram_markup = diagram::compile_flow(&nodes);
    let summary = diagram::summarize_flow(question, &nodes, markets.len());
    let coverage_rate = coverage_rate(&tags, timeline_count, decision_count);

    ParsedRule {
        nodes,
        diagram_markup,
        summary,
        coverage_rate,
        detected_patterns: tags.into_vec(),
    }
}

/// Timeline steps: meetings, then statement release, then data extraction
fn push_timeline(
    text: &str,
    tags: &mut TagSet,
    ids: &mut NodeIdAllocator,
    nodes: &mut Vec<LogicNode>,
) -> usize {
    let before = nodes.len();

    let meetings = patterns::captures(RulePattern::MeetingDate, text);
    if !meetings.is_empty() {
        tags.insert("scheduled_event");
        for hit in &meetings {
            nodes.push(LogicNode::with_value(
                ids.next_id(),
                NodeKind::Process,
                format!("Await Meeting: {}", hit.capture()),
                hit.capture(),
            ));
        }
    }

    if patterns::is_match(RulePattern::StatementRelease, text) {
        tags.insert("awaiting_statement");
        nodes.push(LogicNode::with_value(
            ids.next_id(),
            NodeKind::Process,
            "Statement Released",
            "Official announcement",
        ));
    }

    if patterns::is_match(RulePattern::DataPublication, text) {
        tags.insert("data_extraction");
        nodes.push(LogicNode::with_value(
            ids.next_id(),
            NodeKind::Process,
            "Extract Data from Statement",
            "Parse official numbers",
        ));
    }

    nodes.len() - before
}

/// Source nodes from cited URLs and named authorities
fn push_sources(
    text: &str,
    resolution_source: Option<&str>,
    tags: &mut TagSet,
    ids: &mut NodeIdAllocator,
    nodes: &mut Vec<LogicNode>,
) {
    let hits = patterns::captures(RulePattern::OfficialSource, text);
    let has_explicit_source = resolution_source.map(|s| !s.is_empty()).unwrap_or(false);

    if hits.is_empty() && !has_explicit_source {
        return;
    }
    tags.insert("official_source");

    for hit in &hits {
        let citation = hit.capture();
        if citation.starts_with("http") {
            let domain = url::Url::parse(citation)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_else(|| citation.to_string());
            nodes.push(LogicNode::with_value(
                ids.next_id(),
                NodeKind::Source,
                format!("Source: {}", domain),
                citation,
            ));
        } else {
            nodes.push(LogicNode::new(
                ids.next_id(),
                NodeKind::Source,
                format!("Authority: {}", citation.trim()),
            ));
        }
    }
}

/// Decision nodes: bracket arithmetic for multi-outcome events, then
/// explicit if/unless clauses, then prior-level comparisons
fn push_decisions(
    text: &str,
    markets: &[SubMarket],
    tags: &mut TagSet,
    ids: &mut NodeIdAllocator,
    nodes: &mut Vec<LogicNode>,
) -> usize {
    let before = nodes.len();

    if markets.len() > 1 {
        tags.insert("multi_option_logic");

        if patterns::is_match(RulePattern::BasisPoints, text) {
            tags.insert("basis_points_change");
            nodes.push(LogicNode::with_value(
                ids.next_id(),
                NodeKind::Decision,
                "Calculate Change in bps",
                "Compare vs prior level",
            ));

            if let Some(rounding) = patterns::captures(RulePattern::RoundingRule, text).first() {
                tags.insert("rounding_rule");
                nodes.push(LogicNode::with_value(
                    ids.next_id(),
                    NodeKind::Decision,
                    format!("Round to nearest {} bps", rounding.capture()),
                    rounding.capture(),
                ));
            }

            nodes.push(LogicNode::with_value(
                ids.next_id(),
                NodeKind::Decision,
                "Match to bracket?",
                "Find corresponding option",
            ));
        }
    }

    let ifs = patterns::captures(RulePattern::IfCondition, text);
    if !ifs.is_empty() {
        tags.insert("if_condition");
    }
    for hit in &ifs {
        let clause = hit.capture().trim().to_string();
        nodes.push(LogicNode::with_value(
            ids.next_id(),
            NodeKind::Decision,
            format!("If: {}?", clause),
            clause.clone(),
        ));
    }

    let unless = patterns::captures(RulePattern::UnlessCondition, text);
    if !unless.is_empty() {
        tags.insert("unless_condition");
    }
    for hit in &unless {
        let clause = hit.capture().trim().to_string();
        nodes.push(LogicNode::with_value(
            ids.next_id(),
            NodeKind::Decision,
            format!("Unless: {}?", clause),
            clause.clone(),
        ));
    }

    if patterns::is_match(RulePattern::VersusPrior, text) {
        tags.insert("versus_comparison");
        nodes.push(LogicNode::with_value(
            ids.next_id(),
            NodeKind::Decision,
            "Compare vs Prior Level",
            "Before meeting vs after",
        ));
    }

    nodes.len() - before
}

/// Outcome nodes: one per bracket for multi-outcome events (capped, with a
/// summary node for the remainder), plain YES/NO otherwise
fn push_outcomes(
    markets: &[SubMarket],
    tags: &mut TagSet,
    ids: &mut NodeIdAllocator,
    nodes: &mut Vec<LogicNode>,
) {
    if markets.len() > 1 {
        tags.insert("multiple_outcomes");

        for market in markets.iter().take(MAX_BRACKET_NODES) {
            nodes.push(LogicNode::with_value(
                ids.next_id(),
                NodeKind::Outcome,
                bracket_label(&market.question),
                market.question.clone(),
            ));
        }

        if markets.len() > MAX_BRACKET_NODES {
            nodes.push(LogicNode::with_value(
                ids.next_id(),
                NodeKind::Outcome,
                format!("...{} more options", markets.len() - MAX_BRACKET_NODES),
                "Additional brackets",
            ));
        }
    } else {
        nodes.push(LogicNode::with_value(
            ids.next_id(),
            NodeKind::Outcome,
            "YES",
            "Condition met",
        ));
        nodes.push(LogicNode::with_value(
            ids.next_id(),
            NodeKind::Outcome,
            "NO",
            "Condition not met",
        ));
    }
}

/// Condense a sub-market question into a bracket label: drop the leading
/// "Will " and trailing "?", and cut at the first qualifier
fn bracket_label(question: &str) -> String {
    let stripped = WILL_PREFIX.replace(question, "");
    let stripped = stripped.strip_suffix('?').unwrap_or(&stripped);

    let cut = ["after", "following", "in"]
        .iter()
        .filter_map(|qualifier| stripped.find(qualifier))
        .min()
        .unwrap_or(stripped.len());

    stripped[..cut].trim().to_string()
}

/// Fallback decisions: missing-statement clauses and explicit defaults
fn push_fallbacks(
    text: &str,
    tags: &mut TagSet,
    ids: &mut NodeIdAllocator,
    nodes: &mut Vec<LogicNode>,
) {
    if patterns::is_match(RulePattern::NoStatement, text) {
        tags.insert("no_statement_fallback");
        nodes.push(LogicNode::with_value(
            ids.next_id(),
            NodeKind::Decision,
            "No statement released?",
            "Fallback condition",
        ));
    }

    let defaults = patterns::captures(RulePattern::DefaultResolution, text);
    if !defaults.is_empty() {
        tags.insert("default_resolution");
    }
    for hit in &defaults {
        let value = hit.capture().trim().to_string();
        if value.chars().count() < MAX_DEFAULT_VALUE_LEN {
            nodes.push(LogicNode::with_value(
                ids.next_id(),
                NodeKind::Decision,
                format!("Default: {}", value),
                value.clone(),
            ));
        }
    }
}

/// Coverage heuristic: base 50, bonuses for timeline depth, decision depth
/// and structural pattern tags, capped at 95
fn coverage_rate(tags: &TagSet, timeline_count: usize, decision_count: usize) -> u8 {
    let mut rate: u32 = 50;

    if timeline_count > 0 {
        rate += 15;
    }
    if timeline_count > 2 {
        rate += 10;
    }

    if decision_count > 0 {
        rate += 10;
    }
    if decision_count > 2 {
        rate += 5;
    }

    for tag in [
        "basis_points_change",
        "rounding_rule",
        "official_source",
        "multi_option_logic",
    ] {
        if tags.contains(tag) {
            rate += 5;
        }
    }

    rate.min(95) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeKind;

    fn sub_market(question: &str) -> SubMarket {
        SubMarket {
            question: question.to_string(),
            outcomes: vec!["Yes".to_string(), "No".to_string()],
            outcome_prices: vec!["0.5".to_string(), "0.5".to_string()],
        }
    }

    const FED_DESCRIPTION: &str = "The FOMC meeting is scheduled for December 9-10, 2025. \
        This market will resolve based on the target federal funds rate announced in the statement, \
        expressed in basis points versus the level in effect prior to the meeting. \
        The change will be rounded to the nearest 25 bps. \
        If no statement is released by December 31, the market will resolve to \"No change\".";

    #[test]
    fn six_submarkets_collapse_into_five_plus_summary() {
        let markets: Vec<SubMarket> = (0..6)
            .map(|i| sub_market(&format!("Will the Fed cut {} bps after the meeting?", 25 * i)))
            .collect();

        let rule = extract("Fed decision in December?", FED_DESCRIPTION, None, &markets);

        let outcomes: Vec<&LogicNode> = rule
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Outcome)
            .collect();
        assert_eq!(outcomes.len(), 6);
        assert_eq!(outcomes[5].label, "...1 more options");

        // The density cutoff: a dashed edge for the fourth outcome
        let last_decision = rule
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Decision)
            .next_back()
            .unwrap();
        assert!(rule
            .diagram_markup
            .contains(&format!("    {} -.-> {}\n", last_decision.id, outcomes[3].id)));
    }

    #[test]
    fn bracket_labels_drop_will_prefix_and_qualifiers() {
        assert_eq!(bracket_label("Will the Fed cut 50 bps after the meeting?"), "the Fed cut 50 bps");
        assert_eq!(bracket_label("Will rates hold?"), "rates hold");
    }

    #[test]
    fn timeline_orders_meetings_statement_extraction() {
        let description = "The committee meeting is scheduled for March 18-19, 2026. \
            The rate level will be published in the official statement.";
        let rule = extract("Rate decision?", description, None, &[]);

        let timeline: Vec<&LogicNode> = rule
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Process)
            .collect();
        assert_eq!(timeline.len(), 3);
        assert!(timeline[0].label.starts_with("Await Meeting:"));
        assert_eq!(timeline[1].label, "Statement Released");
        assert_eq!(timeline[2].label, "Extract Data from Statement");

        assert!(rule.detected_patterns.contains(&"scheduled_event".to_string()));
        assert!(rule.detected_patterns.contains(&"awaiting_statement".to_string()));
        assert!(rule.detected_patterns.contains(&"data_extraction".to_string()));
    }

    #[test]
    fn bracket_logic_requires_multiple_submarkets_and_bps() {
        let markets = vec![sub_market("Will A?"), sub_market("Will B?")];
        let rule = extract("Fed decision?", FED_DESCRIPTION, None, &markets);

        let decisions: Vec<&str> = rule
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Decision)
            .map(|n| n.label.as_str())
            .collect();
        assert!(decisions.contains(&"Calculate Change in bps"));
        assert!(decisions.contains(&"Round to nearest 25 bps"));
        assert!(decisions.contains(&"Match to bracket?"));

        assert!(rule.detected_patterns.contains(&"multi_option_logic".to_string()));
        assert!(rule.detected_patterns.contains(&"basis_points_change".to_string()));
        assert!(rule.detected_patterns.contains(&"rounding_rule".to_string()));

        // Single sub-market: no bracket arithmetic
        let rule = extract("Fed decision?", FED_DESCRIPTION, None, &[sub_market("Will A?")]);
        let decisions: Vec<&str> = rule
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Decision)
            .map(|n| n.label.as_str())
            .collect();
        assert!(!decisions.contains(&"Calculate Change in bps"));
    }

    #[test]
    fn fallback_nodes_come_last() {
        let rule = extract("Fed decision?", FED_DESCRIPTION, None, &[]);

        assert!(rule.detected_patterns.contains(&"no_statement_fallback".to_string()));
        assert!(rule.detected_patterns.contains(&"default_resolution".to_string()));

        let last = rule.nodes.last().unwrap();
        assert_eq!(last.label, "Default: No change");
        assert_eq!(last.kind, NodeKind::Decision);

        let ids: Vec<&String> = rule.nodes.iter().map(|n| &n.id).collect();
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
    }

    #[test]
    fn versus_and_conditionals_become_decisions() {
        let description = "If the index closes higher, the market resolves YES \
            unless trading is halted, measured versus the value prior to the event.";
        let rule = extract("Index up?", description, None, &[]);

        let labels: Vec<&str> = rule
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Decision)
            .map(|n| n.label.as_str())
            .collect();
        assert!(labels.iter().any(|l| l.starts_with("If:")));
        assert!(labels.iter().any(|l| l.starts_with("Unless:")));
        assert!(labels.contains(&"Compare vs Prior Level"));
    }

    #[test]
    fn empty_inputs_yield_base_coverage_and_yes_no() {
        let rule = extract("", "", None, &[]);
        assert_eq!(rule.coverage_rate, 50);
        let outcomes: Vec<&LogicNode> = rule
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Outcome)
            .collect();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].label, "YES");
        assert_eq!(outcomes[1].label, "NO");
    }

    #[test]
    fn coverage_stays_within_bounds() {
        let markets: Vec<SubMarket> = (0..8)
            .map(|i| sub_market(&format!("Will bracket {} hit?", i)))
            .collect();
        let samples: [(&str, &str, Option<&str>, &[SubMarket]); 3] = [
            ("", "", None, &[]),
            ("Q", "short", None, &[]),
            ("Fed decision?", FED_DESCRIPTION, Some("federalreserve.gov"), &markets),
        ];
        for (question, description, source, markets) in samples {
            let rule = extract(question, description, source, markets);
            assert!(rule.coverage_rate <= 95, "coverage {} > 95", rule.coverage_rate);
            assert!(rule.coverage_rate >= 50);
        }
    }
}
