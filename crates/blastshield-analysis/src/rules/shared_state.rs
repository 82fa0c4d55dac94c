//! `shared_mutable_state` — any module-level mutable container with at
//! least one writer, race or not.

use blastshield_core::types::violation::{GraphNodeRef, RuleId, RuleViolation, Severity};

use super::traits::{Rule, RuleContext, RuleScope};

pub struct SharedMutableStateRule;

impl Rule for SharedMutableStateRule {
    fn id(&self) -> RuleId {
        RuleId::SharedMutableState
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Graph
    }

    fn evaluate(&self, ctx: &RuleContext) -> Vec<RuleViolation> {
        let mut keys: Vec<&String> = ctx.graph.shared_state.keys().collect();
        keys.sort();

        let mut violations = Vec::new();
        for key in keys {
            let state = &ctx.graph.shared_state[key];
            if state.writers.is_empty() {
                continue;
            }

            let var = key.rsplit("::").next().unwrap_or(key);
            let mut writers: Vec<&String> = state.writers.iter().collect();
            writers.sort();

            let mut evidence = vec![format!(
                "module-level {} `{var}` defined at line {}",
                state.container.name(),
                state.line
            )];
            for writer in &writers {
                evidence.push(format!("written by `{writer}`"));
            }

            let affected = writers[0].to_string();
            violations.push(RuleViolation {
                rule_id: RuleId::SharedMutableState,
                severity: Severity::Medium,
                file: state.file.clone(),
                line: state.line,
                end_line: state.line,
                title: format!("Shared mutable state `{var}`"),
                description: format!(
                    "`{var}` is a module-level {} mutated by {} function(s); shared \
                     mutable state couples callers and complicates recovery.",
                    state.container.name(),
                    writers.len()
                ),
                evidence,
                affected_function: affected.clone(),
                graph_node: GraphNodeRef::resolved(affected),
            });
        }
        violations
    }
}
