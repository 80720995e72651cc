//! Decision-graph model for parsed resolution rules

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind of a vertex in the resolution graph
///
/// Each kind maps to a distinct flowchart shape and style directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Entry point of the resolution flow
    Start,
    /// Timeline step (scheduled event, statement release, data extraction)
    Process,
    /// Yes/no branch point in the resolution logic
    Decision,
    /// Informational data-source reference
    Source,
    /// Terminal resolution option
    Outcome,
}

/// A single vertex in the resolution graph
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogicNode {
    /// Short stable token, unique within one extraction run
    pub id: String,
    pub kind: NodeKind,
    /// Display label (sanitized before diagram emission)
    pub label: String,
    /// Raw matched substring or computed descriptor, carried for summaries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Reserved for nested structure; always empty in the current extractors
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LogicNode>,
}

impl LogicNode {
    pub fn new(id: String, kind: NodeKind, label: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            label: label.into(),
            value: None,
            children: Vec::new(),
        }
    }

    pub fn with_value(id: String, kind: NodeKind, label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            label: label.into(),
            value: Some(value.into()),
            children: Vec::new(),
        }
    }
}

/// Monotonic node-ID allocator
///
/// Emits spreadsheet-style tokens: A..Z, then AA, AB, .. . One allocator is
/// shared across all node kinds of a single extraction run, so IDs are
/// pairwise unique and reflect creation order.
#[derive(Debug, Default)]
pub struct NodeIdAllocator {
    next: usize,
}

impl NodeIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next ID token
    pub fn next_id(&mut self) -> String {
        let id = Self::token(self.next);
        self.next += 1;
        id
    }

    // Bijective base-26: 0 -> "A", 25 -> "Z", 26 -> "AA", 701 -> "ZZ", ..
    fn token(mut index: usize) -> String {
        let mut buf = Vec::new();
        loop {
            buf.push(b'A' + (index % 26) as u8);
            index /= 26;
            if index == 0 {
                break;
            }
            index -= 1;
        }
        buf.reverse();
        String::from_utf8(buf).expect("ASCII token")
    }
}

/// Insertion-order-preserving set of detected-pattern tags
///
/// Membership is unique; iteration follows first-insertion order.
#[derive(Debug, Default, Clone)]
pub struct TagSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tag; returns false if it was already present
    pub fn insert(&mut self, tag: &str) -> bool {
        if self.seen.contains(tag) {
            return false;
        }
        self.seen.insert(tag.to_string());
        self.order.push(tag.to_string());
        true
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.seen.contains(tag)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.order
    }
}

/// Result of one rule-extraction run
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParsedRule {
    /// Graph vertices in creation order (the order edges get drawn in)
    pub nodes: Vec<LogicNode>,
    /// Mermaid `flowchart TD` rendering of the graph
    pub diagram_markup: String,
    /// Human-readable restatement of the resolution logic
    pub summary: String,
    /// Heuristic estimate of how much of the rule text was captured, 0-100
    pub coverage_rate: u8,
    /// Detected-pattern tags in first-detection order
    pub detected_patterns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_emits_single_letters_first() {
        let mut ids = NodeIdAllocator::new();
        let first: Vec<String> = (0..4).map(|_| ids.next_id()).collect();
        assert_eq!(first, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn allocator_rolls_over_to_two_letters() {
        let mut ids = NodeIdAllocator::new();
        let all: Vec<String> = (0..30).map(|_| ids.next_id()).collect();
        assert_eq!(all[25], "Z");
        assert_eq!(all[26], "AA");
        assert_eq!(all[27], "AB");
        assert_eq!(all[29], "AD");
    }

    #[test]
    fn allocator_ids_are_unique_over_long_runs() {
        let mut ids = NodeIdAllocator::new();
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(ids.next_id()));
        }
    }

    #[test]
    fn tag_set_deduplicates_and_preserves_order() {
        let mut tags = TagSet::new();
        assert!(tags.insert("time_condition"));
        assert!(tags.insert("data_source"));
        assert!(!tags.insert("time_condition"));
        assert!(tags.contains("data_source"));
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.into_vec(), vec!["time_condition", "data_source"]);
    }
}
