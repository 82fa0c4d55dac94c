//! `race_condition` — shared state written from concurrent async contexts.

use blastshield_core::types::violation::{GraphNodeRef, RuleId, RuleViolation, Severity};

use crate::call_graph::traversal::{async_reachable, boundary_crossing_functions};

use super::traits::{Rule, RuleContext, RuleScope};

pub struct RaceConditionRule;

impl Rule for RaceConditionRule {
    fn id(&self) -> RuleId {
        RuleId::RaceCondition
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Graph
    }

    fn evaluate(&self, ctx: &RuleContext) -> Vec<RuleViolation> {
        let async_reach = async_reachable(ctx.graph, ctx.config.max_graph_depth);
        let crossing = boundary_crossing_functions(ctx.graph);

        let mut keys: Vec<&String> = ctx.graph.shared_state.keys().collect();
        keys.sort();

        let mut violations = Vec::new();
        for key in keys {
            let state = &ctx.graph.shared_state[key];

            let mut async_writers: Vec<&String> = state
                .writers
                .iter()
                .filter(|w| async_reach.contains(w.as_str()))
                .collect();
            async_writers.sort();

            let mut crossing_writers: Vec<&String> = state
                .writers
                .iter()
                .filter(|w| crossing.contains(w.as_str()))
                .collect();
            crossing_writers.sort();

            if async_writers.len() < 2 && crossing_writers.is_empty() {
                continue;
            }

            let var = key.rsplit("::").next().unwrap_or(key);
            let mut evidence = vec![format!(
                "module-level {} `{var}` has {} writer(s)",
                state.container.name(),
                state.writers.len()
            )];
            for writer in &async_writers {
                evidence.push(format!("writer `{writer}` executes in an async context"));
            }
            for writer in &crossing_writers {
                if !async_writers.contains(writer) {
                    evidence.push(format!("writer `{writer}` crosses an async boundary"));
                }
            }

            let affected = async_writers
                .first()
                .or(crossing_writers.first())
                .map(|w| w.to_string())
                .unwrap_or_default();

            violations.push(RuleViolation {
                rule_id: RuleId::RaceCondition,
                severity: Severity::Critical,
                file: state.file.clone(),
                line: state.line,
                end_line: state.line,
                title: format!("Race condition on shared state `{var}`"),
                description: format!(
                    "`{var}` is written by multiple functions that can run concurrently, \
                     so updates may interleave and be lost."
                ),
                evidence,
                affected_function: affected.clone(),
                graph_node: if affected.is_empty() {
                    GraphNodeRef::Unresolved
                } else {
                    GraphNodeRef::resolved(affected)
                },
            });
        }
        violations
    }
}
