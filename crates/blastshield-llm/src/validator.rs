//! Response validator — the hallucination guard.
//!
//! The refined batch is rejected as a whole if any response references a
//! file outside the input whitelist (V1), carries a patch outside the
//! ±5-line envelope of its violation (V2), names a rule id absent from the
//! deterministic set (V3), fails schema validation (V4), or misses a
//! mandatory field (V5). Partial acceptance is not supported.

use blastshield_core::types::violation::RuleViolation;
use blastshield_core::FxHashSet;
use serde::Deserialize;

/// Envelope half-width in lines around a violation's range.
pub const PATCH_ENVELOPE_LINES: u32 = 5;

/// The typed response model. `deny_unknown_fields` plus required fields
/// give V4/V5 directly from deserialization.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefinerResponse {
    pub rule_id: String,
    pub file: String,
    pub line: u32,
    pub explanation: String,
    pub risk: String,
    #[serde(default)]
    pub patches: Vec<PatchResponse>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchResponse {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub new_code: String,
}

pub struct ResponseValidator {
    whitelist: FxHashSet<String>,
    violations: Vec<RuleViolation>,
}

impl ResponseValidator {
    pub fn new(whitelist: impl IntoIterator<Item = String>, violations: &[RuleViolation]) -> Self {
        Self {
            whitelist: whitelist.into_iter().collect(),
            violations: violations.to_vec(),
        }
    }

    /// Parse one raw LLM reply into the typed model (V4/V5). Strips a
    /// markdown fence if the model wrapped its JSON.
    pub fn parse(&self, raw: &str) -> Result<RefinerResponse, String> {
        let body = extract_json(raw);
        serde_json::from_str(body).map_err(|e| format!("schema validation failed: {e}"))
    }

    /// Validate a parsed batch. Any single failure rejects the whole batch.
    pub fn validate(&self, responses: &[RefinerResponse]) -> Result<(), String> {
        for response in responses {
            // V1: file whitelist.
            if !self.whitelist.contains(&response.file) {
                return Err(format!(
                    "response references `{}`, which is not in the input file set",
                    response.file
                ));
            }

            // V3: rule id must exist in the deterministic set.
            let matched = self.violations.iter().find(|v| {
                v.rule_id.name() == response.rule_id
                    && v.file == response.file
                    && v.line == response.line
            });
            let Some(violation) = matched else {
                return Err(format!(
                    "response claims `{}` at {}:{}, which no deterministic violation matches",
                    response.rule_id, response.file, response.line
                ));
            };

            // V2: every patch stays inside the violation's envelope.
            let window_start = violation.line.saturating_sub(PATCH_ENVELOPE_LINES);
            let window_end = violation.end_line + PATCH_ENVELOPE_LINES;
            for patch in &response.patches {
                if !self.whitelist.contains(&patch.file) {
                    return Err(format!(
                        "patch references `{}`, which is not in the input file set",
                        patch.file
                    ));
                }
                if patch.file != violation.file
                    || patch.start_line < window_start
                    || patch.end_line > window_end
                    || patch.start_line > patch.end_line
                {
                    return Err(format!(
                        "patch {}:{}-{} falls outside the violation envelope {}:{}-{}",
                        patch.file,
                        patch.start_line,
                        patch.end_line,
                        violation.file,
                        window_start,
                        window_end
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Pull the JSON object out of a reply that may be fenced or prefixed.
fn extract_json(raw: &str) -> &str {
    let start = raw.find('{');
    let end = raw.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blastshield_core::types::violation::{GraphNodeRef, RuleId, Severity};

    fn violation_at(file: &str, line: u32) -> RuleViolation {
        RuleViolation {
            rule_id: RuleId::DangerousEval,
            severity: Severity::Critical,
            file: file.into(),
            line,
            end_line: line,
            title: String::new(),
            description: String::new(),
            evidence: vec![],
            affected_function: "a::run".into(),
            graph_node: GraphNodeRef::resolved("a::run"),
        }
    }

    fn validator() -> ResponseValidator {
        ResponseValidator::new(vec!["a.py".to_string()], &[violation_at("a.py", 7)])
    }

    fn response(file: &str, line: u32, patches: Vec<PatchResponse>) -> RefinerResponse {
        RefinerResponse {
            rule_id: "dangerous_eval".into(),
            file: file.into(),
            line,
            explanation: "e".into(),
            risk: "r".into(),
            patches,
        }
    }

    #[test]
    fn accepts_in_envelope_patch() {
        let patches = vec![PatchResponse {
            file: "a.py".into(),
            start_line: 6,
            end_line: 8,
            new_code: "# fix".into(),
        }];
        assert!(validator().validate(&[response("a.py", 7, patches)]).is_ok());
    }

    #[test]
    fn rejects_patch_outside_envelope() {
        let patches = vec![PatchResponse {
            file: "a.py".into(),
            start_line: 50,
            end_line: 52,
            new_code: "# fix".into(),
        }];
        let err = validator()
            .validate(&[response("a.py", 7, patches)])
            .unwrap_err();
        assert!(err.contains("envelope"));
    }

    #[test]
    fn rejects_unknown_file_and_unknown_rule() {
        assert!(validator().validate(&[response("b.py", 7, vec![])]).is_err());

        let mut bad_rule = response("a.py", 7, vec![]);
        bad_rule.rule_id = "made_up_rule".into();
        assert!(validator().validate(&[bad_rule]).is_err());
    }

    #[test]
    fn schema_rejects_unknown_and_missing_fields() {
        let validator = validator();
        assert!(validator
            .parse(r#"{"rule_id":"dangerous_eval","file":"a.py","line":7,"explanation":"e","risk":"r"}"#)
            .is_ok());
        // Missing mandatory `risk` (V5).
        assert!(validator
            .parse(r#"{"rule_id":"dangerous_eval","file":"a.py","line":7,"explanation":"e"}"#)
            .is_err());
        // Unknown field (V4).
        assert!(validator
            .parse(r#"{"rule_id":"dangerous_eval","file":"a.py","line":7,"explanation":"e","risk":"r","extra":1}"#)
            .is_err());
        // Fenced JSON still parses.
        assert!(validator
            .parse("```json\n{\"rule_id\":\"dangerous_eval\",\"file\":\"a.py\",\"line\":7,\"explanation\":\"e\",\"risk\":\"r\"}\n```")
            .is_ok());
    }
}
