//! Explainable risk breakdown produced by the scorer.

use serde::{Deserialize, Serialize};

use super::violation::RuleId;

/// Per-violation factor terms. Every term of the user-facing score is
/// recorded so the total is reconstructable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationContribution {
    pub rule_id: RuleId,
    pub file: String,
    pub line: u32,
    pub base_weight: f64,
    pub blast_radius_factor: f64,
    pub state_mutation_factor: f64,
    pub test_failure_factor: f64,
    pub async_boundary_factor: f64,
    pub total_factor: f64,
    pub weighted_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskBreakdown {
    /// Total score in [0, 100]; 0 iff there are no violations.
    pub total_score: u32,
    pub max_possible_score: f64,
    /// Ordered identically to the rule-engine emission order.
    pub contributions: Vec<ViolationContribution>,
    pub formula: String,
    pub summary: String,
}

impl RiskBreakdown {
    /// Breakdown for a clean scan.
    pub fn clean() -> Self {
        Self {
            total_score: 0,
            max_possible_score: 0.0,
            contributions: Vec::new(),
            formula: FORMULA.to_string(),
            summary: "No violations detected.".to_string(),
        }
    }
}

/// The scoring formula, carried verbatim in every breakdown.
pub const FORMULA: &str = "total = min(100, round(sum(base_weight * (1.0 + 0.3*blast_radius + 0.2*state_mutation + 0.3*test_failure + 0.2*async_boundary)) / sum(base_weight * 2.0) * 100))";

/// Severity bucket for a total score. Total over [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeverityBucket {
    Low,
    Medium,
    High,
    Critical,
}

impl SeverityBucket {
    pub fn for_score(score: u32) -> Self {
        match score {
            0..=20 => Self::Low,
            21..=50 => Self::Medium,
            51..=80 => Self::High,
            _ => Self::Critical,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for SeverityBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_is_total_on_score_range() {
        for score in 0..=100u32 {
            let bucket = SeverityBucket::for_score(score);
            match score {
                0..=20 => assert_eq!(bucket, SeverityBucket::Low),
                21..=50 => assert_eq!(bucket, SeverityBucket::Medium),
                51..=80 => assert_eq!(bucket, SeverityBucket::High),
                _ => assert_eq!(bucket, SeverityBucket::Critical),
            }
        }
    }
}
