//! `retry_without_backoff` — a loop hammers an I/O sink with no sleep, or
//! with a constant-only sleep that never grows.

use blastshield_core::types::ast::{CallSite, FunctionDef, LoopSpan};
use blastshield_core::types::violation::{GraphNodeRef, RuleId, RuleViolation, Severity};
use blastshield_core::FxHashMap;

use crate::flow::analyzer::{canonical_callee, import_aliases, sink_kind};

use super::traits::{all_functions_deep, Rule, RuleContext, RuleScope};

/// Callee prefixes treated as network I/O in addition to the sink table.
const NETWORK_PREFIXES: &[&str] = &["requests.", "urllib.", "httpx.", "socket.", "http."];

pub struct RetryWithoutBackoffRule;

impl Rule for RetryWithoutBackoffRule {
    fn id(&self) -> RuleId {
        RuleId::RetryWithoutBackoff
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn scope(&self) -> RuleScope {
        RuleScope::File
    }

    fn evaluate(&self, ctx: &RuleContext) -> Vec<RuleViolation> {
        let mut violations = Vec::new();

        for module in ctx.modules {
            let aliases = import_aliases(&module.imports);
            for func in all_functions_deep(module) {
                for span in &func.loops {
                    if let Some(violation) =
                        self.check_loop(func, span, &aliases, ctx, &module.path)
                    {
                        violations.push(violation);
                    }
                }
            }
        }

        violations
    }
}

impl RetryWithoutBackoffRule {
    fn check_loop(
        &self,
        func: &FunctionDef,
        span: &LoopSpan,
        aliases: &FxHashMap<String, String>,
        ctx: &RuleContext,
        file: &str,
    ) -> Option<RuleViolation> {
        let in_loop: Vec<&CallSite> = func
            .call_sites
            .iter()
            .filter(|c| c.line >= span.line && c.line <= span.end_line)
            .collect();

        let io_call = in_loop.iter().find(|c| {
            let callee = canonical_callee(&c.callee, aliases);
            // A sleep equivalent is the backoff, never the sink being
            // retried — a pure cadence loop is not a retry loop.
            if ctx.config.sleep_equivalents.contains(&callee) {
                return false;
            }
            sink_kind(&callee).is_some()
                || NETWORK_PREFIXES.iter().any(|p| callee.starts_with(p))
                || ctx.config.blocking_sinks.contains(&callee)
        })?;
        let io_callee = canonical_callee(&io_call.callee, aliases);

        let sleeps: Vec<&&CallSite> = in_loop
            .iter()
            .filter(|c| {
                let callee = canonical_callee(&c.callee, aliases);
                ctx.config.sleep_equivalents.contains(&callee)
            })
            .collect();

        let evidence = if sleeps.is_empty() {
            vec![
                format!(
                    "loop at lines {}-{} calls I/O sink `{io_callee}`",
                    span.line, span.end_line
                ),
                "no sleep equivalent inside the loop".to_string(),
            ]
        } else if sleeps.iter().all(|s| has_constant_only_args(s)) {
            let sleep = sleeps[0];
            vec![
                format!(
                    "loop at lines {}-{} calls I/O sink `{io_callee}`",
                    span.line, span.end_line
                ),
                format!(
                    "`{}` at line {} sleeps a constant interval with no growth",
                    sleep.callee, sleep.line
                ),
            ]
        } else {
            return None;
        };

        Some(RuleViolation {
            rule_id: RuleId::RetryWithoutBackoff,
            severity: Severity::Medium,
            file: file.to_string(),
            line: span.line,
            end_line: span.end_line,
            title: "Retry loop without backoff".to_string(),
            description: format!(
                "`{}` retries `{io_callee}` in a loop without growing its delay, \
                 which amplifies load on an already-failing dependency.",
                func.name
            ),
            evidence,
            affected_function: func.qualified_name.clone(),
            graph_node: GraphNodeRef::resolved(func.qualified_name.clone()),
        })
    }
}

/// A sleep whose arguments are all plain numeric literals cannot grow.
fn has_constant_only_args(call: &CallSite) -> bool {
    call.args
        .iter()
        .all(|arg| arg.is_number_literal && arg.names.is_empty() && !arg.text.contains('*'))
}
