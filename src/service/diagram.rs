//! Mermaid flowchart compilation for resolution graphs
//!
//! Emits a line-oriented `flowchart TD` description: one statement per node,
//! one per edge, one style directive per node. Every label is sanitized
//! before it reaches the markup; unescaped structural characters would
//! corrupt the diagram syntax downstream, so this applies to AI-sourced
//! labels as much as to our own.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{LogicNode, NodeKind};

const MAX_LABEL_LEN: usize = 60;

/// A directed edge supplied by the AI extraction service
#[derive(Debug, Clone)]
pub struct Connection {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
}

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Sanitize a label for safe embedding in Mermaid markup
///
/// Strips braces and brackets, downgrades double quotes to single quotes,
/// replaces parentheses with spaces and `#` with "No.", collapses runs of
/// whitespace, trims, and truncates to 60 characters. Idempotent.
pub fn sanitize_label(label: &str) -> String {
    let mut cleaned = String::with_capacity(label.len());
    for ch in label.chars() {
        match ch {
            '{' | '}' | '[' | ']' => {}
            '"' => cleaned.push('\''),
            '(' | ')' => cleaned.push(' '),
            '#' => cleaned.push_str("No."),
            other => cleaned.push(other),
        }
    }

    let collapsed = WHITESPACE.replace_all(&cleaned, " ");
    collapsed
        .trim()
        .chars()
        .take(MAX_LABEL_LEN)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Node declaration statement, shape keyed by kind
fn node_statement(node: &LogicNode) -> String {
    let label = sanitize_label(&node.label);
    match node.kind {
        NodeKind::Start => format!("    {}([{}])\n", node.id, label),
        NodeKind::Process => format!("    {}[{}]\n", node.id, label),
        NodeKind::Decision => format!("    {}{{{}}}\n", node.id, label),
        NodeKind::Source => format!("    {}[[\"📊 {}\"]]\n", node.id, label),
        NodeKind::Outcome => format!("    {}[{}]\n", node.id, label),
    }
}

/// Style directive, keyed by kind; outcomes further keyed by label
fn style_statement(node: &LogicNode) -> String {
    let style = match node.kind {
        NodeKind::Start => "fill:#e1f5ff,stroke:#01579b,stroke-width:3px",
        NodeKind::Process => "fill:#f3e5f5,stroke:#4a148c,stroke-width:2px",
        NodeKind::Decision => "fill:#e0f2f1,stroke:#004d40,stroke-width:2px",
        NodeKind::Source => "fill:#fff8e1,stroke:#f57f17,stroke-width:2px",
        NodeKind::Outcome => match node.label.as_str() {
            "YES" => "fill:#c8e6c9,stroke:#1b5e20,stroke-width:3px",
            "NO" => "fill:#ffcdd2,stroke:#b71c1c,stroke-width:3px",
            _ => "fill:#e1bee7,stroke:#4a148c,stroke-width:2px",
        },
    };
    format!("    style {} {}\n", node.id, style)
}

fn by_kind<'a>(nodes: &'a [LogicNode], kind: NodeKind) -> Vec<&'a LogicNode> {
    nodes.iter().filter(|n| n.kind == kind).collect()
}

/// Compile the basic strategy's linear condition chain
///
/// Conditions form an AND-chain: each "Yes" branch feeds the next condition
/// (or the YES outcome at the end) and every "No" branch exits directly to
/// the NO outcome. Source nodes are rendered but not wired into the chain.
pub fn compile_chain(nodes: &[LogicNode]) -> String {
    let mut code = String::from("flowchart TD\n");

    for node in nodes {
        code.push_str(&node_statement(node));
    }

    let start = match nodes.iter().find(|n| n.kind == NodeKind::Start) {
        Some(start) => start,
        None => return code,
    };
    let conditions = by_kind(nodes, NodeKind::Decision);
    let outcomes = by_kind(nodes, NodeKind::Outcome);
    let yes = outcomes.first();
    let no = outcomes.get(1);

    if conditions.is_empty() {
        if let Some(yes) = yes {
            code.push_str(&format!("    {} --> {}\n", start.id, yes.id));
        }
        if let Some(no) = no {
            code.push_str(&format!("    {} --> {}\n", start.id, no.id));
        }
    } else {
        code.push_str(&format!("    {} --> {}\n", start.id, conditions[0].id));

        for (index, condition) in conditions.iter().enumerate() {
            match conditions.get(index + 1) {
                Some(next) => {
                    code.push_str(&format!("    {} -->|Yes| {}\n", condition.id, next.id));
                }
                None => {
                    if let Some(yes) = yes {
                        code.push_str(&format!("    {} -->|Yes| {}\n", condition.id, yes.id));
                    }
                }
            }
            if let Some(no) = no {
                code.push_str(&format!("    {} -->|No| {}\n", condition.id, no.id));
            }
        }
    }

    for node in nodes {
        code.push_str(&style_statement(node));
    }

    code
}

/// Compile the advanced strategy's timeline/decision flow
///
/// Timeline steps chain from the start; sources hang off the first timeline
/// node (or the start when no timeline exists) on dashed informational
/// edges; decisions chain with "Process" labels; the final decision fans out
/// to the outcomes. With more than two outcomes only the first three get
/// solid edges and the fourth a dashed one — a rendering-density cutoff, not
/// a statement about resolution logic.
pub fn compile_flow(nodes: &[LogicNode]) -> String {
    let mut code = String::from("flowchart TD\n");

    for node in nodes {
        code.push_str(&node_statement(node));
    }

    let start = match nodes.iter().find(|n| n.kind == NodeKind::Start) {
        Some(start) => start,
        None => return code,
    };
    let timeline = by_kind(nodes, NodeKind::Process);
    let sources = by_kind(nodes, NodeKind::Source);
    let decisions = by_kind(nodes, NodeKind::Decision);
    let outcomes = by_kind(nodes, NodeKind::Outcome);

    let mut current = start;
    for step in &timeline {
        code.push_str(&format!("    {} --> {}\n", current.id, step.id));
        current = step;
    }

    let source_anchor = timeline.first().copied().unwrap_or(start);
    for source in &sources {
        code.push_str(&format!("    {} -.-> {}\n", source_anchor.id, source.id));
    }

    if !decisions.is_empty() {
        code.push_str(&format!("    {} --> {}\n", current.id, decisions[0].id));

        for (index, decision) in decisions.iter().enumerate() {
            if let Some(next) = decisions.get(index + 1) {
                code.push_str(&format!("    {} -->|Process| {}\n", decision.id, next.id));
                continue;
            }

            // Final decision fans out to the outcomes
            if outcomes.len() <= 2 {
                if let Some(matched) = outcomes.first() {
                    code.push_str(&format!("    {} -->|Match| {}\n", decision.id, matched.id));
                }
                if let Some(unmatched) = outcomes.get(1) {
                    code.push_str(&format!("    {} -->|No Match| {}\n", decision.id, unmatched.id));
                }
            } else {
                for (outcome_index, outcome) in outcomes.iter().enumerate() {
                    if outcome_index < 3 {
                        code.push_str(&format!("    {} --> {}\n", decision.id, outcome.id));
                    } else if outcome_index == 3 {
                        code.push_str(&format!("    {} -.-> {}\n", decision.id, outcome.id));
                    }
                }
            }
        }
    } else {
        for outcome in outcomes.iter().take(2) {
            code.push_str(&format!("    {} --> {}\n", current.id, outcome.id));
        }
    }

    for node in nodes {
        code.push_str(&style_statement(node));
    }

    code
}

/// Compile an AI-supplied node/connection list
pub fn compile_connections(nodes: &[LogicNode], connections: &[Connection]) -> String {
    let mut code = String::from("flowchart TD\n");

    for node in nodes {
        code.push_str(&node_statement(node));
    }

    for connection in connections {
        match connection.label.as_deref() {
            Some(label) => {
                code.push_str(&format!(
                    "    {} -->|{}| {}\n",
                    connection.from,
                    sanitize_label(label),
                    connection.to
                ));
            }
            None => {
                code.push_str(&format!("    {} --> {}\n", connection.from, connection.to));
            }
        }
    }

    for node in nodes {
        code.push_str(&style_statement(node));
    }

    code
}

/// Summary for the basic strategy's condition chain
pub fn summarize_chain(question: &str, nodes: &[LogicNode]) -> String {
    let conditions = by_kind(nodes, NodeKind::Decision);

    if conditions.is_empty() {
        return format!(
            "This market asks: \"{}\". The resolution will be determined based on the outcome.",
            question
        );
    }

    let descriptions: Vec<String> = conditions
        .iter()
        .map(|c| {
            let plain = c.label.replacen('?', "", 1);
            if c.label.contains("Before") || c.label.contains("After") || c.label.contains("By") {
                plain.to_lowercase()
            } else if c.label.contains('>') || c.label.contains('<') {
                format!("the value meets the threshold ({})", plain)
            } else {
                plain.to_lowercase()
            }
        })
        .collect();

    let joined = match descriptions.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} and {}", rest.join(", "), last),
        _ => descriptions.join(""),
    };

    format!(
        "This market resolves to YES if {}, otherwise it resolves to NO.",
        joined
    )
}

/// Summary for the advanced strategy's timeline/decision flow
///
/// `sub_markets` is the sub-market count of the analyzed event; it drives
/// the bracket sentence and is the one structural count the node collection
/// does not carry itself.
pub fn summarize_flow(question: &str, nodes: &[LogicNode], sub_markets: usize) -> String {
    let timeline = by_kind(nodes, NodeKind::Process);
    let decisions = by_kind(nodes, NodeKind::Decision);
    let sources = by_kind(nodes, NodeKind::Source);

    let mut summary = format!("This market tracks: \"{}\". ", question);

    if !timeline.is_empty() {
        let steps: Vec<String> = timeline.iter().map(|t| t.label.to_lowercase()).collect();
        summary.push_str(&format!("Resolution process: {}. ", steps.join(" → ")));
    }

    if !decisions.is_empty() {
        let logic: Vec<String> = decisions
            .iter()
            .map(|d| d.label.replacen('?', "", 1))
            .collect();
        summary.push_str(&format!("Decision logic: {}. ", logic.join(", then ")));
    }

    if sub_markets > 2 {
        summary.push_str(&format!(
            "The market offers {} distinct outcome brackets. ",
            sub_markets
        ));
    }

    if !sources.is_empty() {
        summary.push_str("Data verified from official sources. ");
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeIdAllocator, NodeKind};

    fn node(id: &str, kind: NodeKind, label: &str) -> LogicNode {
        LogicNode::new(id.to_string(), kind, label)
    }

    #[test]
    fn sanitize_strips_structural_characters() {
        let cleaned = sanitize_label(r#"Rate {cut} [50 bps] "max" (or more) #1"#);
        assert!(!cleaned.contains('{'));
        assert!(!cleaned.contains('}'));
        assert!(!cleaned.contains('['));
        assert!(!cleaned.contains(']'));
        assert!(!cleaned.contains('"'));
        assert!(!cleaned.contains('#'));
        assert_eq!(cleaned, "Rate cut 50 bps 'max' or more No.1");
    }

    #[test]
    fn sanitize_truncates_to_sixty_chars() {
        let long = "x".repeat(200);
        assert_eq!(sanitize_label(&long).chars().count(), 60);
    }

    #[test]
    fn sanitize_is_idempotent() {
        let samples = [
            r#"Rate {cut} [50 bps] "max" (or more) #1"#,
            "plain label",
            "   spaced    out   ",
            &"#".repeat(40),
            &format!("{} trailing", "word ".repeat(20)),
        ];
        for sample in samples {
            let once = sanitize_label(sample);
            assert_eq!(sanitize_label(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn chain_links_conditions_with_early_exit_to_no() {
        let nodes = vec![
            node("A", NodeKind::Start, "Market Start"),
            node("B", NodeKind::Decision, "By January 1, 2026?"),
            node("C", NodeKind::Decision, "Value > 100?"),
            node("D", NodeKind::Outcome, "YES"),
            node("E", NodeKind::Outcome, "NO"),
        ];
        let code = compile_chain(&nodes);

        assert!(code.starts_with("flowchart TD\n"));
        assert!(code.contains("    A --> B\n"));
        assert!(code.contains("    B -->|Yes| C\n"));
        assert!(code.contains("    B -->|No| E\n"));
        assert!(code.contains("    C -->|Yes| D\n"));
        assert!(code.contains("    C -->|No| E\n"));
        assert!(code.contains("style D fill:#c8e6c9"));
        assert!(code.contains("style E fill:#ffcdd2"));
    }

    #[test]
    fn chain_without_conditions_connects_start_to_both_outcomes() {
        let nodes = vec![
            node("A", NodeKind::Start, "Market Start"),
            node("B", NodeKind::Outcome, "YES"),
            node("C", NodeKind::Outcome, "NO"),
        ];
        let code = compile_chain(&nodes);
        assert!(code.contains("    A --> B\n"));
        assert!(code.contains("    A --> C\n"));
    }

    #[test]
    fn flow_fans_out_with_dashed_fourth_outcome() {
        let mut ids = NodeIdAllocator::new();
        let mut nodes = vec![LogicNode::new(ids.next_id(), NodeKind::Start, "Market Opens")];
        let decision_id = ids.next_id();
        nodes.push(LogicNode::new(decision_id.clone(), NodeKind::Decision, "Match to bracket?"));
        let outcome_ids: Vec<String> = (0..6)
            .map(|i| {
                let id = ids.next_id();
                nodes.push(LogicNode::new(id.clone(), NodeKind::Outcome, format!("Bracket {}", i)));
                id
            })
            .collect();

        let code = compile_flow(&nodes);
        for id in &outcome_ids[..3] {
            assert!(code.contains(&format!("    {} --> {}\n", decision_id, id)));
        }
        assert!(code.contains(&format!("    {} -.-> {}\n", decision_id, outcome_ids[3])));
        // Outcomes past the fourth exist as nodes but get no edges
        assert!(!code.contains(&format!("> {}\n", outcome_ids[4])));
        assert!(!code.contains(&format!("> {}\n", outcome_ids[5])));
    }

    #[test]
    fn flow_labels_two_outcome_fanout_match_no_match() {
        let nodes = vec![
            node("A", NodeKind::Start, "Market Opens"),
            node("B", NodeKind::Decision, "If: value above target?"),
            node("C", NodeKind::Outcome, "YES"),
            node("D", NodeKind::Outcome, "NO"),
        ];
        let code = compile_flow(&nodes);
        assert!(code.contains("    B -->|Match| C\n"));
        assert!(code.contains("    B -->|No Match| D\n"));
    }

    #[test]
    fn flow_attaches_sources_to_start_without_timeline() {
        let nodes = vec![
            node("A", NodeKind::Start, "Market Opens"),
            node("B", NodeKind::Source, "Source: federalreserve.gov"),
        ];
        let code = compile_flow(&nodes);
        assert!(code.contains("    A -.-> B\n"));
    }

    #[test]
    fn flow_attaches_sources_to_first_timeline_step() {
        let nodes = vec![
            node("A", NodeKind::Start, "Market Opens"),
            node("B", NodeKind::Process, "Await Meeting: December 9-10, 2025"),
            node("C", NodeKind::Source, "Source: federalreserve.gov"),
        ];
        let code = compile_flow(&nodes);
        assert!(code.contains("    A --> B\n"));
        assert!(code.contains("    B -.-> C\n"));
    }

    #[test]
    fn connections_render_with_sanitized_labels() {
        let nodes = vec![
            node("A", NodeKind::Start, "Market Opens"),
            node("B", NodeKind::Decision, "Statement Released?"),
        ];
        let connections = vec![Connection {
            from: "A".to_string(),
            to: "B".to_string(),
            label: Some("Yes [confirmed]".to_string()),
        }];
        let code = compile_connections(&nodes, &connections);
        assert!(code.contains("    A -->|Yes confirmed| B\n"));
    }

    #[test]
    fn chain_summary_lists_conditions_with_and() {
        let nodes = vec![
            node("A", NodeKind::Start, "Market Start"),
            node("B", NodeKind::Decision, "By January 1, 2026?"),
            node("C", NodeKind::Decision, "Value > 100?"),
            node("D", NodeKind::Outcome, "YES"),
            node("E", NodeKind::Outcome, "NO"),
        ];
        let summary = summarize_chain("Will X happen", &nodes);
        assert_eq!(
            summary,
            "This market resolves to YES if by january 1, 2026 and the value meets the threshold (Value > 100), otherwise it resolves to NO."
        );
    }

    #[test]
    fn chain_summary_without_conditions_restates_the_question() {
        let nodes = vec![
            node("A", NodeKind::Start, "Market Start"),
            node("B", NodeKind::Outcome, "YES"),
            node("C", NodeKind::Outcome, "NO"),
        ];
        let summary = summarize_chain("Will X happen", &nodes);
        assert!(summary.starts_with("This market asks: \"Will X happen\"."));
    }

    #[test]
    fn flow_summary_mentions_timeline_brackets_and_sources() {
        let nodes = vec![
            node("A", NodeKind::Start, "Market Opens"),
            node("B", NodeKind::Process, "Statement Released"),
            node("C", NodeKind::Source, "Authority: Federal Reserve"),
            node("D", NodeKind::Decision, "Match to bracket?"),
        ];
        let summary = summarize_flow("Fed decision?", &nodes, 5);
        assert!(summary.contains("Resolution process: statement released."));
        assert!(summary.contains("Decision logic: Match to bracket."));
        assert!(summary.contains("The market offers 5 distinct outcome brackets."));
        assert!(summary.contains("Data verified from official sources."));
    }
}
