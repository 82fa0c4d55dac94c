//! `unsanitized_io` — a parameter reaches a filesystem/shell/subprocess/SQL
//! sink with no sanitiser interposed. Consumes flow facts.

use blastshield_core::types::violation::{GraphNodeRef, RuleId, RuleViolation, Severity};

use crate::flow::SinkKind;

use super::traits::{all_functions_deep, Rule, RuleContext, RuleScope};

pub struct UnsanitizedIoRule;

impl Rule for UnsanitizedIoRule {
    fn id(&self) -> RuleId {
        RuleId::UnsanitizedIo
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn scope(&self) -> RuleScope {
        RuleScope::File
    }

    fn evaluate(&self, ctx: &RuleContext) -> Vec<RuleViolation> {
        let mut violations = Vec::new();

        for module in ctx.modules {
            for func in all_functions_deep(module) {
                let Some(facts) = ctx.flow.get(&func.qualified_name) else {
                    continue;
                };
                for sink in &facts.tainted_sinks {
                    // Dynamic-code sinks belong to `dangerous_eval`.
                    if sink.kind == SinkKind::DynamicCode {
                        continue;
                    }

                    let flowed = sink.via_alias.as_deref().unwrap_or(&sink.parameter);
                    let mut evidence =
                        vec![format!("parameter `{}` is unsanitised", sink.parameter)];
                    if let Some(alias) = &sink.via_alias {
                        evidence.push(format!(
                            "aliased as `{alias}` before reaching the sink",
                        ));
                    }
                    evidence.push(format!(
                        "flows to call site `{}({flowed})` at line {}",
                        sink.sink, sink.line
                    ));

                    violations.push(RuleViolation {
                        rule_id: RuleId::UnsanitizedIo,
                        severity: Severity::High,
                        file: module.path.clone(),
                        line: sink.line,
                        end_line: sink.line,
                        title: format!("Unsanitised input reaches `{}`", sink.sink),
                        description: format!(
                            "Parameter `{}` of `{}` reaches the {} sink `{}` without \
                             passing through a sanitiser.",
                            sink.parameter,
                            func.name,
                            sink.kind.name(),
                            sink.sink
                        ),
                        evidence,
                        affected_function: func.qualified_name.clone(),
                        graph_node: GraphNodeRef::resolved(func.qualified_name.clone()),
                    });
                }
            }
        }

        violations
    }
}
