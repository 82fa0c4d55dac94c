//! Report assembler. Merges deterministic violations with validated LLM
//! refinements — or the template fallback — into the final report.

use blastshield_core::types::report::{AuditEntry, Issue, ScanReport};
use blastshield_core::types::risk::{RiskBreakdown, SeverityBucket};
use blastshield_core::types::violation::{RuleViolation, Severity};
use blastshield_core::FxHashSet;
use blastshield_llm::refiner::{violation_key, RefinementOutcome};
use blastshield_llm::FallbackExplainer;
use chrono::Utc;

use crate::api::ScanMode;

pub struct AssembleInput<'a> {
    pub scan_id: &'a str,
    pub mode: ScanMode,
    pub violations: &'a [RuleViolation],
    pub breakdown: RiskBreakdown,
    pub refinement: &'a RefinementOutcome,
    pub test_failures: &'a FxHashSet<String>,
    pub files_scanned: usize,
    pub skipped: &'a [String],
    pub duration_ms: u64,
}

pub fn assemble(input: AssembleInput) -> ScanReport {
    let mut issues = Vec::with_capacity(input.violations.len());

    for (index, violation) in input.violations.iter().enumerate() {
        let refined = input.refinement.refined.get(&violation_key(violation));
        let (explanation, risk, patches) = match refined {
            Some(refined) => (
                refined.explanation.clone(),
                refined.risk.clone(),
                refined.patches.clone(),
            ),
            None => FallbackExplainer::explain(violation),
        };

        let test_impact = violation
            .graph_node
            .node_key()
            .filter(|key| input.test_failures.contains(*key))
            .map(|key| {
                format!("Synthesised boundary inputs produced unhandled failures in `{key}`.")
            });

        issues.push(Issue {
            id: format!("BS-{:03}", index + 1),
            severity: violation.severity,
            file: violation.file.clone(),
            line: violation.line,
            rule_id: violation.rule_id.name().to_string(),
            issue: violation.title.clone(),
            explanation,
            risk,
            evidence: violation.evidence.clone(),
            patches,
            test_impact,
        });
    }

    let llm_used = input.refinement.llm_used;
    let risk_score = input.breakdown.total_score;
    let summary = build_summary(&input, &issues, risk_score);

    let audit = AuditEntry {
        scan_id: input.scan_id.to_string(),
        timestamp: Utc::now(),
        files_scanned: input.files_scanned,
        violations_found: input.violations.len(),
        risk_score,
        llm_invoked: llm_used,
        llm_tokens_used: input.refinement.tokens_used,
        duration_ms: input.duration_ms,
        deterministic_only: !llm_used,
    };

    ScanReport {
        issues,
        risk_score,
        risk_breakdown: input.breakdown,
        summary,
        llm_used,
        deterministic_only: !llm_used,
        audit,
    }
}

fn build_summary(input: &AssembleInput, issues: &[Issue], risk_score: u32) -> String {
    let bucket = SeverityBucket::for_score(risk_score);
    let count_of = |severity: Severity| issues.iter().filter(|i| i.severity == severity).count();
    let breakdown = format!(
        "{} critical, {} high, {} medium, {} low",
        count_of(Severity::Critical),
        count_of(Severity::High),
        count_of(Severity::Medium),
        count_of(Severity::Low),
    );

    let mut summary = match input.mode {
        ScanMode::Full => {
            if issues.is_empty() {
                format!(
                    "Scanned {} file(s); no deployment risks detected.",
                    input.files_scanned
                )
            } else {
                format!(
                    "Scanned {} file(s); found {} issue(s) ({breakdown}); risk {risk_score}/100 ({bucket}).",
                    input.files_scanned,
                    issues.len(),
                )
            }
        }
        ScanMode::Pr => {
            if issues.is_empty() {
                "BlastShield PR scan: no deployment risks in the changed files.".to_string()
            } else {
                let top = &issues[0];
                format!(
                    "BlastShield PR scan: {} issue(s) in the changed files ({breakdown}); \
                     risk {risk_score}/100 ({bucket}). Top concern: {} at {}:{}.",
                    issues.len(),
                    top.issue,
                    top.file,
                    top.line,
                )
            }
        }
    };

    if !input.skipped.is_empty() {
        summary.push_str(&format!(
            " {} file(s) skipped for exceeding the size limit.",
            input.skipped.len()
        ));
    }

    summary
}
