//! User-facing report types. Field names are part of the contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::risk::RiskBreakdown;
use super::violation::Severity;

/// An advisory patch. Line ranges are constrained to the ±5-line envelope
/// of the matched violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub new_code: String,
}

/// A reported issue: one deterministic violation plus its explanation,
/// risk narrative, and advisory patches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub severity: Severity,
    pub file: String,
    pub line: u32,
    pub rule_id: String,
    pub issue: String,
    pub explanation: String,
    pub risk: String,
    pub evidence: Vec<String>,
    pub patches: Vec<Patch>,
    #[serde(rename = "testImpact")]
    pub test_impact: Option<String>,
}

/// The final report returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub issues: Vec<Issue>,
    #[serde(rename = "riskScore")]
    pub risk_score: u32,
    pub risk_breakdown: RiskBreakdown,
    pub summary: String,
    pub llm_used: bool,
    pub deterministic_only: bool,
    pub audit: AuditEntry,
}

/// One append-only audit record per scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub scan_id: String,
    pub timestamp: DateTime<Utc>,
    pub files_scanned: usize,
    pub violations_found: usize,
    pub risk_score: u32,
    pub llm_invoked: bool,
    pub llm_tokens_used: u64,
    pub duration_ms: u64,
    pub deterministic_only: bool,
}

/// Background scan lifecycle. Transitions are monotonic:
/// `queued → running → {complete | failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Queued,
    Running,
    Complete,
    Failed,
}

impl ScanStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    /// Whether `next` is a legal transition from `self`.
    pub fn can_transition_to(&self, next: ScanStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Queued, Self::Failed)
                | (Self::Running, Self::Complete)
                | (Self::Running, Self::Failed)
        )
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
