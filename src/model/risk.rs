//! Risk assessment model for resolution-rule clarity

use serde::Serialize;
use utoipa::ToSchema;

/// Discrete risk band derived from the clarity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Map a clamped clarity score onto its band: low >= 80, medium >= 60
    pub fn from_score(score: u8) -> Self {
        if score >= 80 {
            RiskLevel::Low
        } else if score >= 60 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

/// Scored assessment of a rule text, independent of the extracted graph
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RiskAssessment {
    /// Clarity score, clamped to 0-100 (higher is clearer)
    pub score: u8,
    pub level: RiskLevel,
    /// Findings that materially threaten a clean resolution
    pub risks: Vec<String>,
    /// Findings that warrant careful reading
    pub warnings: Vec<String>,
    /// Findings that support a clean resolution
    pub strengths: Vec<String>,
}
