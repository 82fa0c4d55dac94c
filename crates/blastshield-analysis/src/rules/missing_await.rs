//! `missing_await` — an async callee invoked from an async function
//! without `await`, or an awaitable whose value is discarded; either way
//! the coroutine is created and never runs.

use blastshield_core::types::violation::{GraphNodeRef, RuleId, RuleViolation, Severity};

use super::traits::{Rule, RuleContext, RuleScope};

pub struct MissingAwaitRule;

impl Rule for MissingAwaitRule {
    fn id(&self) -> RuleId {
        RuleId::MissingAwait
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Graph
    }

    fn evaluate(&self, ctx: &RuleContext) -> Vec<RuleViolation> {
        let graph = ctx.graph;
        let mut violations = Vec::new();

        for edge_idx in graph.graph.edge_indices() {
            let edge = graph.graph[edge_idx];
            if edge.awaited {
                continue;
            }
            let Some((from, to)) = graph.graph.edge_endpoints(edge_idx) else {
                continue;
            };
            let caller = graph.node(from);
            let callee = graph.node(to);
            if !callee.is_async {
                continue;
            }
            // Either an async caller skips the await, or the awaitable is
            // discarded as a bare expression statement in any caller.
            if !caller.is_async && !edge.discarded {
                continue;
            }

            let context_fact = if caller.is_async {
                format!("enclosing function `{}` is async", caller.key)
            } else {
                "the returned awaitable is discarded".to_string()
            };

            violations.push(RuleViolation {
                rule_id: RuleId::MissingAwait,
                severity: Severity::High,
                file: caller.file.clone(),
                line: edge.line,
                end_line: edge.line,
                title: format!("Call to async `{}` is not awaited", callee.name),
                description: format!(
                    "`{}` calls async `{}` without awaiting it, so the coroutine \
                     never runs and its result is discarded.",
                    caller.name, callee.name
                ),
                evidence: vec![
                    format!("`{}` is declared async", callee.key),
                    format!("call at line {} is not awaited", edge.line),
                    context_fact,
                ],
                affected_function: caller.key.clone(),
                graph_node: GraphNodeRef::resolved(caller.key.clone()),
            });
        }

        violations
    }
}
