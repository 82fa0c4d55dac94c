//! Risk scorer.
//!
//! ```text
//! base_weight(v) = {critical:10, high:7, medium:4, low:1}[v.severity]
//! factors(v)    = 1.0
//!               + 0.3 × clamp(blast_radius(v.node) / max_graph_depth, 0, 1)
//!               + 0.2 × [v.node mutates shared state]
//!               + 0.3 × [test_failure_present(v.node)]
//!               + 0.2 × [v.node crosses an async boundary]
//! weighted(v)   = base_weight(v) × factors(v)
//! total         = min(100, round(Σ weighted / max_possible × 100))
//! ```
//!
//! `max_possible` is `Σ base_weight × 2.0` (the factor ceiling); rounding is
//! half-to-even for cross-platform determinism. Every term lands in the
//! breakdown so the total is reconstructable.

use blastshield_core::types::risk::{RiskBreakdown, SeverityBucket, ViolationContribution, FORMULA};
use blastshield_core::types::violation::RuleViolation;
use blastshield_core::FxHashSet;

use crate::call_graph::traversal::{blast_radius, crosses_async_boundary};
use crate::call_graph::CallGraph;
use crate::flow::FlowIndex;

pub struct RiskScorer {
    max_graph_depth: usize,
}

impl RiskScorer {
    pub fn new(max_graph_depth: usize) -> Self {
        Self {
            max_graph_depth: max_graph_depth.max(1),
        }
    }

    /// Score a violation set. `violations` must already be in deterministic
    /// emission order; contributions preserve it.
    pub fn score(
        &self,
        violations: &[RuleViolation],
        graph: &CallGraph,
        flow: &FlowIndex,
        test_failures: &FxHashSet<String>,
    ) -> RiskBreakdown {
        if violations.is_empty() {
            return RiskBreakdown::clean();
        }

        let mut contributions = Vec::with_capacity(violations.len());
        let mut weighted_sum = 0.0f64;
        let mut max_possible = 0.0f64;

        for violation in violations {
            let base_weight = violation.severity.base_weight();
            let node_idx = violation
                .graph_node
                .node_key()
                .and_then(|key| graph.get_node(key));

            let radius = node_idx
                .map(|idx| blast_radius(graph, idx, self.max_graph_depth))
                .unwrap_or(0);
            let blast_radius_factor =
                0.3 * (radius as f64 / self.max_graph_depth as f64).clamp(0.0, 1.0);

            let mutates_state = violation
                .graph_node
                .node_key()
                .map(|key| flow.mutates_shared(key) || writes_shared_state(graph, key))
                .unwrap_or(false);
            let state_mutation_factor = if mutates_state { 0.2 } else { 0.0 };

            let test_failure_factor = violation
                .graph_node
                .node_key()
                .filter(|key| test_failures.contains(*key))
                .map(|_| 0.3)
                .unwrap_or(0.0);

            let async_boundary_factor = node_idx
                .filter(|&idx| crosses_async_boundary(graph, idx))
                .map(|_| 0.2)
                .unwrap_or(0.0);

            let total_factor = 1.0
                + blast_radius_factor
                + state_mutation_factor
                + test_failure_factor
                + async_boundary_factor;
            let weighted_score = base_weight * total_factor;

            weighted_sum += weighted_score;
            max_possible += base_weight * 2.0;

            contributions.push(ViolationContribution {
                rule_id: violation.rule_id,
                file: violation.file.clone(),
                line: violation.line,
                base_weight,
                blast_radius_factor,
                state_mutation_factor,
                test_failure_factor,
                async_boundary_factor,
                total_factor,
                weighted_score,
            });
        }

        let total_score =
            (weighted_sum / max_possible * 100.0).round_ties_even().min(100.0) as u32;
        let bucket = SeverityBucket::for_score(total_score);

        RiskBreakdown {
            total_score,
            max_possible_score: max_possible,
            contributions,
            formula: FORMULA.to_string(),
            summary: format!(
                "{} violation(s) scored {total_score}/100 ({bucket})",
                violations.len()
            ),
        }
    }
}

fn writes_shared_state(graph: &CallGraph, key: &str) -> bool {
    graph
        .shared_state
        .values()
        .any(|state| state.writers.contains(key))
}
