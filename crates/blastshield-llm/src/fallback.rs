//! Template-driven fallback explainer. Always valid, total over rule ids;
//! this is the output whenever the LLM is gated off, times out, errors,
//! or is rejected by the validator. Patch hints are comment-only
//! insertions.

use blastshield_core::types::report::Patch;
use blastshield_core::types::violation::{RuleId, RuleViolation};

pub struct FallbackExplainer;

impl FallbackExplainer {
    /// Explanation, risk narrative, and patch hints for one violation.
    /// Both strings are always non-empty.
    pub fn explain(violation: &RuleViolation) -> (String, String, Vec<Patch>) {
        let func = if violation.affected_function.is_empty() {
            "this file".to_string()
        } else {
            format!("`{}`", violation.affected_function)
        };
        let at = format!("{}:{}", violation.file, violation.line);
        let evidence = violation.evidence.join("; ");

        let (explanation, risk, hint) = match violation.rule_id {
            RuleId::RaceCondition => (
                format!(
                    "Concurrent async writers mutate the same module-level state in {func} \
                     ({at}). {evidence}."
                ),
                "Interleaved writes can silently drop updates under load, producing \
                 corrupted state that only appears in production traffic."
                    .to_string(),
                Some("# TODO: guard writes to this container with an asyncio.Lock"),
            ),
            RuleId::MissingAwait => (
                format!(
                    "An async call in {func} is never awaited ({at}). {evidence}."
                ),
                "The coroutine is created but never scheduled, so its work silently \
                 does not happen and errors inside it are swallowed."
                    .to_string(),
                Some("# TODO: await this call"),
            ),
            RuleId::DangerousEval => (
                format!(
                    "{func} passes non-literal input to dynamic code execution ({at}). \
                     {evidence}."
                ),
                "Any caller who controls the argument can execute arbitrary code in \
                 the service process."
                    .to_string(),
                Some("# TODO: replace eval/exec with ast.literal_eval or explicit dispatch"),
            ),
            RuleId::UnsanitizedIo => (
                format!(
                    "A parameter of {func} reaches a system sink without sanitisation \
                     ({at}). {evidence}."
                ),
                "Crafted input can escape into shell, filesystem, or query context and \
                 escalate into injection."
                    .to_string(),
                Some("# TODO: sanitise this argument (e.g. shlex.quote) before the sink"),
            ),
            RuleId::SharedMutableState => (
                format!(
                    "A module-level mutable container is written by {func} ({at}). \
                     {evidence}."
                ),
                "Module-global state couples otherwise-independent call paths and makes \
                 failures order-dependent and hard to reproduce."
                    .to_string(),
                Some("# TODO: encapsulate this container or pass it explicitly"),
            ),
            RuleId::MissingExceptionBoundary => (
                format!(
                    "Entry point {func} has no effective error boundary ({at}). \
                     {evidence}."
                ),
                "Any unexpected exception becomes an unhandled request failure with no \
                 controlled response or logging."
                    .to_string(),
                Some("# TODO: wrap the handler body in try/except and return a typed error"),
            ),
            RuleId::RetryWithoutBackoff => (
                format!(
                    "A retry loop in {func} calls an I/O dependency without growing its \
                     delay ({at}). {evidence}."
                ),
                "During an outage the loop hammers the failing dependency, extending \
                 the outage and starving the caller."
                    .to_string(),
                Some("# TODO: use exponential backoff with jitter between attempts"),
            ),
            RuleId::BlockingIoInAsync => (
                format!(
                    "{func} is async but performs blocking I/O ({at}). {evidence}."
                ),
                "The event loop stalls for the duration of the call, freezing every \
                 other in-flight task."
                    .to_string(),
                Some("# TODO: use an async client here or offload via run_in_executor"),
            ),
            RuleId::ParseError => (
                format!("`{}` could not be parsed and was skipped.", violation.file),
                "Unparsed files receive no analysis, so defects in them are invisible \
                 to this report."
                    .to_string(),
                None,
            ),
            RuleId::UnsupportedLanguage => (
                format!(
                    "`{}` is written in a language this engine does not analyse.",
                    violation.file
                ),
                "The file is excluded from analysis; its risk is unknown rather than \
                 zero."
                    .to_string(),
                None,
            ),
            RuleId::RuleError => (
                format!(
                    "An internal rule failed while analysing `{}`; its findings for \
                     this file are incomplete.",
                    violation.file
                ),
                "Coverage for this file is partial; treat its absence of findings with \
                 caution."
                    .to_string(),
                None,
            ),
        };

        let patches = hint
            .map(|comment| {
                vec![Patch {
                    file: violation.file.clone(),
                    start_line: violation.line,
                    end_line: violation.line,
                    new_code: comment.to_string(),
                }]
            })
            .unwrap_or_default();

        (explanation, risk, patches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blastshield_core::types::violation::{GraphNodeRef, Severity};

    fn violation(rule_id: RuleId) -> RuleViolation {
        RuleViolation {
            rule_id,
            severity: Severity::Medium,
            file: "a.py".into(),
            line: 3,
            end_line: 4,
            title: String::new(),
            description: String::new(),
            evidence: vec!["fact one".into(), "fact two".into()],
            affected_function: "a::f".into(),
            graph_node: GraphNodeRef::resolved("a::f"),
        }
    }

    #[test]
    fn fallback_is_total_and_non_empty_over_all_rule_ids() {
        for rule_id in [
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
            let (explanation, risk, patches) = FallbackExplainer::explain(&violation(rule_id));
            assert!(!explanation.is_empty(), "{rule_id} explanation empty");
            assert!(!risk.is_empty(), "{rule_id} risk empty");
            for patch in patches {
                assert!(patch.new_code.starts_with('#'), "patch hints are comments");
                assert_eq!(patch.file, "a.py");
            }
        }
    }
}
