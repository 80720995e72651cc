//! Basic rule-extraction strategy
//!
//! Builds a linear condition chain: every detected condition must hold for
//! YES, and any failed condition exits straight to NO. Suited to simple
//! yes/no markets without timelines or bracketed outcomes.

use crate::model::{LogicNode, NodeIdAllocator, NodeKind, ParsedRule, TagSet};
use crate::service::diagram;

use super::patterns::{self, RulePattern};

/// Extract a resolution graph using the linear condition chain
pub fn extract(question: &str, description: &str, resolution_source: Option<&str>) -> ParsedRule {
    let full_text = format!("{} {}", question, description);
    let mut tags = TagSet::new();
    let mut ids = NodeIdAllocator::new();
    let mut nodes = Vec::new();

    nodes.push(LogicNode::new(ids.next_id(), NodeKind::Start, "Market Start"));

    // Time conditions, in before/after/by category order
    let before = patterns::captures(RulePattern::TimeBefore, &full_text);
    let after = patterns::captures(RulePattern::TimeAfter, &full_text);
    let by = patterns::captures(RulePattern::TimeBy, &full_text);

    if !before.is_empty() || !after.is_empty() || !by.is_empty() {
        tags.insert("time_condition");
        for hit in &before {
            nodes.push(LogicNode::with_value(
                ids.next_id(),
                NodeKind::Decision,
                format!("Before {}?", hit.capture()),
                hit.capture(),
            ));
        }
        for hit in &after {
            nodes.push(LogicNode::with_value(
                ids.next_id(),
                NodeKind::Decision,
                format!("After {}?", hit.capture()),
                hit.capture(),
            ));
        }
        for hit in &by {
            nodes.push(LogicNode::with_value(
                ids.next_id(),
                NodeKind::Decision,
                format!("By {}?", hit.capture()),
                hit.capture(),
            ));
        }
    }

    // Numeric thresholds; the value sits in the second capture group
    let greater = patterns::captures(RulePattern::GreaterThan, &full_text);
    if !greater.is_empty() {
        tags.insert("threshold_greater");
        for hit in &greater {
            let value = hit.groups.get(1).cloned().unwrap_or_default();
            nodes.push(LogicNode::with_value(
                ids.next_id(),
                NodeKind::Decision,
                format!("Value > {}?", value),
                value.clone(),
            ));
        }
    }

    let less = patterns::captures(RulePattern::LessThan, &full_text);
    if !less.is_empty() {
        tags.insert("threshold_less");
        for hit in &less {
            let value = hit.groups.get(1).cloned().unwrap_or_default();
            nodes.push(LogicNode::with_value(
                ids.next_id(),
                NodeKind::Decision,
                format!("Value < {}?", value),
                value.clone(),
            ));
        }
    }

    // Frequency conditions
    let at_least = patterns::captures(RulePattern::AtLeast, &full_text);
    if !at_least.is_empty() {
        tags.insert("frequency");
        for hit in &at_least {
            nodes.push(LogicNode::with_value(
                ids.next_id(),
                NodeKind::Decision,
                format!("At least {} times?", hit.capture()),
                hit.capture(),
            ));
        }
    }

    // Data sources: the explicit resolution source plus cited phrases.
    // The tag is recorded once however many citations turn up.
    if let Some(source) = resolution_source.filter(|s| !s.is_empty()) {
        tags.insert("data_source");
        nodes.push(LogicNode::with_value(
            ids.next_id(),
            NodeKind::Source,
            format!("Data: {}", source),
            source,
        ));
    }

    for hit in patterns::captures(RulePattern::BasedOn, &full_text) {
        tags.insert("data_source");
        let citation = hit.capture().trim().to_string();
        nodes.push(LogicNode::with_value(
            ids.next_id(),
            NodeKind::Source,
            format!("Source: {}", citation),
            citation.clone(),
        ));
    }

    nodes.push(LogicNode::new(ids.next_id(), NodeKind::Outcome, "YES"));
    nodes.push(LogicNode::new(ids.next_id(), NodeKind::Outcome, "NO"));

    let diagram_markup = diagram::compile_chain(&nodes);
    let summary = diagram::summarize_chain(question, &nodes);
    let coverage_rate = coverage_rate(&tags);

    ParsedRule {
        nodes,
        diagram_markup,
        summary,
        coverage_rate,
        detected_patterns: tags.into_vec(),
    }
}

/// Coverage heuristic: ~20 points per detected category, bonuses for
/// time+threshold combinations or cited data sources, clamped to [40, 95]
fn coverage_rate(tags: &TagSet) -> u8 {
    let base = (tags.len() as u32 * 20).min(80);

    let rate = if tags.contains("time_condition")
        && (tags.contains("threshold_greater") || tags.contains("threshold_less"))
    {
        base + 15
    } else if tags.contains("data_source") {
        base + 10
    } else {
        base
    };

    rate.clamp(40, 95) as u8
}
