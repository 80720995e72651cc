pub mod ai;
pub mod analysis;
pub mod diagram;
pub mod extraction;
pub mod risk;

pub use ai::AiRuleParser;
pub use analysis::{AnalysisService, MarketAnalysis};
