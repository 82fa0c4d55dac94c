//! Structured prompt assembly. The prompt carries facts, not source: the
//! serialised violation, the snippet spanning its lines, the N-hop call
//! subgraph, flow facts, and the file whitelist.

use blastshield_analysis::flow::FlowFacts;
use blastshield_core::types::violation::RuleViolation;
use serde_json::json;

/// Fixed system instructions. They forbid new rule ids, new file paths,
/// and patches outside the violation's ±5-line envelope; the validator
/// enforces the same constraints mechanically.
pub fn system_instructions() -> &'static str {
    "You are a deployment-risk analyst refining findings from a deterministic \
     static-analysis engine. You will receive one finding as structured JSON. \
     Respond with a single JSON object and nothing else, using exactly these \
     fields: rule_id, file, line, explanation, risk, patches. Rules: \
     (1) rule_id, file, and line must be copied from the finding unchanged; \
     (2) never reference any file outside the provided whitelist; \
     (3) each patch object has fields file, start_line, end_line, new_code, \
     and its line range must stay within 5 lines of the finding's range; \
     (4) patches are advisory and minimal; omit them if unsure; \
     (5) explanation and risk are short English paragraphs grounded only in \
     the provided evidence."
}

/// Build the user prompt for one violation.
pub fn build_prompt(
    violation: &RuleViolation,
    snippet: &[String],
    subgraph: &[(String, String, u32)],
    flow: Option<&FlowFacts>,
    whitelist: &[String],
) -> String {
    let finding = json!({
        "rule_id": violation.rule_id.name(),
        "severity": violation.severity.name(),
        "file": violation.file,
        "line": violation.line,
        "end_line": violation.end_line,
        "title": violation.title,
        "description": violation.description,
        "evidence": violation.evidence,
        "affected_function": violation.affected_function,
    });
    let calls: Vec<_> = subgraph
        .iter()
        .map(|(from, to, line)| json!({"from": from, "to": to, "line": line}))
        .collect();
    let payload = json!({
        "finding": finding,
        "source_lines": snippet,
        "call_subgraph": calls,
        "flow_facts": flow,
        "file_whitelist": whitelist,
    });
    serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blastshield_core::types::violation::{GraphNodeRef, RuleId, Severity};

    fn violation() -> RuleViolation {
        RuleViolation {
            rule_id: RuleId::DangerousEval,
            severity: Severity::Critical,
            file: "a.py".into(),
            line: 2,
            end_line: 2,
            title: "Dynamic code execution via `eval`".into(),
            description: "desc".into(),
            evidence: vec!["call to `eval` at line 2".into()],
            affected_function: "a::run".into(),
            graph_node: GraphNodeRef::resolved("a::run"),
        }
    }

    #[test]
    fn prompt_carries_facts_not_whole_files() {
        let snippet = vec!["    return eval(x)".to_string()];
        let prompt = build_prompt(&violation(), &snippet, &[], None, &["a.py".into()]);
        assert!(prompt.contains("dangerous_eval"));
        assert!(prompt.contains("return eval(x)"));
        assert!(prompt.contains("file_whitelist"));
        // Only the violation's own lines appear, nothing else.
        assert_eq!(prompt.matches("return eval").count(), 1);
    }

    #[test]
    fn system_instructions_pin_the_contract() {
        let system = system_instructions();
        assert!(system.contains("whitelist"));
        assert!(system.contains("5 lines"));
        assert!(system.contains("unchanged"));
    }
}
