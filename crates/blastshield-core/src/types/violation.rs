//! Rule violations — the universal output type of the deterministic core.

use serde::{Deserialize, Serialize};

/// Violation severity. Order matters: `base_weight` feeds the risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Base weight used by the risk scorer.
    pub fn base_weight(&self) -> f64 {
        match self {
            Self::Critical => 10.0,
            Self::High => 7.0,
            Self::Medium => 4.0,
            Self::Low => 1.0,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifier of the rule (or synthetic marker) that produced a violation.
///
/// The variant order is the fixed registration order; violations are emitted
/// in `(registration order, file, line)` order regardless of intra-scan
/// parallelism. Synthetic markers sort after the eight rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    RaceCondition,
    MissingAwait,
    DangerousEval,
    UnsanitizedIo,
    SharedMutableState,
    MissingExceptionBoundary,
    RetryWithoutBackoff,
    BlockingIoInAsync,
    ParseError,
    UnsupportedLanguage,
    RuleError,
}

impl RuleId {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RaceCondition => "race_condition",
            Self::MissingAwait => "missing_await",
            Self::DangerousEval => "dangerous_eval",
            Self::UnsanitizedIo => "unsanitized_io",
            Self::SharedMutableState => "shared_mutable_state",
            Self::MissingExceptionBoundary => "missing_exception_boundary",
            Self::RetryWithoutBackoff => "retry_without_backoff",
            Self::BlockingIoInAsync => "blocking_io_in_async",
            Self::ParseError => "parse_error",
            Self::UnsupportedLanguage => "unsupported_language",
            Self::RuleError => "rule_error",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "race_condition" => Some(Self::RaceCondition),
            "missing_await" => Some(Self::MissingAwait),
            "dangerous_eval" => Some(Self::DangerousEval),
            "unsanitized_io" => Some(Self::UnsanitizedIo),
            "shared_mutable_state" => Some(Self::SharedMutableState),
            "missing_exception_boundary" => Some(Self::MissingExceptionBoundary),
            "retry_without_backoff" => Some(Self::RetryWithoutBackoff),
            "blocking_io_in_async" => Some(Self::BlockingIoInAsync),
            "parse_error" => Some(Self::ParseError),
            "unsupported_language" => Some(Self::UnsupportedLanguage),
            "rule_error" => Some(Self::RuleError),
            _ => None,
        }
    }

    /// Position in the deterministic emission order.
    pub fn registration_index(&self) -> usize {
        match self {
            Self::RaceCondition => 0,
            Self::MissingAwait => 1,
            Self::DangerousEval => 2,
            Self::UnsanitizedIo => 3,
            Self::SharedMutableState => 4,
            Self::MissingExceptionBoundary => 5,
            Self::RetryWithoutBackoff => 6,
            Self::BlockingIoInAsync => 7,
            Self::ParseError => 8,
            Self::UnsupportedLanguage => 9,
            Self::RuleError => 10,
        }
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Link from a violation to the scan's call graph. Either the node key
/// resolves in the graph, or the violation carries an explicit marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphNodeRef {
    Resolved { node: String },
    Unresolved,
}

impl GraphNodeRef {
    pub fn resolved(node: impl Into<String>) -> Self {
        Self::Resolved { node: node.into() }
    }

    pub fn node_key(&self) -> Option<&str> {
        match self {
            Self::Resolved { node } => Some(node),
            Self::Unresolved => None,
        }
    }
}

/// A deterministic finding emitted by a rule; the atomic unit the scorer and
/// the LLM refiner both consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleViolation {
    pub rule_id: RuleId,
    pub severity: Severity,
    pub file: String,
    pub line: u32,
    pub end_line: u32,
    pub title: String,
    pub description: String,
    /// Ordered chain of short English facts justifying the violation,
    /// reconstructable from the deterministic inputs.
    pub evidence: Vec<String>,
    pub affected_function: String,
    pub graph_node: GraphNodeRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_id_round_trips_through_name() {
        for rule in [
            RuleId::RaceCondition,
            RuleId::MissingAwait,
            RuleId::DangerousEval,
            RuleId::UnsanitizedIo,
            RuleId::SharedMutableState,
            RuleId::MissingExceptionBoundary,
            RuleId::RetryWithoutBackoff,
            RuleId::BlockingIoInAsync,
            RuleId::ParseError,
            RuleId::UnsupportedLanguage,
            RuleId::RuleError,
        ] {
            assert_eq!(RuleId::parse_str(rule.name()), Some(rule));
        }
    }

    #[test]
    fn severity_weights_are_ordered() {
        assert!(Severity::Critical.base_weight() > Severity::High.base_weight());
        assert!(Severity::High.base_weight() > Severity::Medium.base_weight());
        assert!(Severity::Medium.base_weight() > Severity::Low.base_weight());
    }
}
