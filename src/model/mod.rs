pub mod config;
pub mod graph;
pub mod market;
pub mod risk;

pub use config::{AnalysisConfig, Config};
pub use graph::{LogicNode, NodeIdAllocator, NodeKind, ParsedRule, TagSet};
pub use market::{MarketPayload, MarketSnapshot, SubMarket};
pub use risk::{RiskAssessment, RiskLevel};
