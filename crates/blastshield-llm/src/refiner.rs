//! LLM refiner — gated invocation, per-violation fan-out under a
//! concurrency cap, per-scan token budget, all-or-nothing validation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use blastshield_analysis::flow::FlowFacts;
use blastshield_core::types::report::Patch;
use blastshield_core::types::violation::{RuleViolation, Severity};
use blastshield_core::{FxHashMap, LlmError};
use futures_util::stream::{self, StreamExt};

use crate::client::{CompletionClient, CompletionRequest};
use crate::prompt;
use crate::validator::{RefinerResponse, ResponseValidator};

/// Structured facts for one violation, assembled by the pipeline.
#[derive(Debug, Clone)]
pub struct ViolationContext {
    pub violation: RuleViolation,
    /// Source lines spanning the violation — never more.
    pub snippet: Vec<String>,
    /// Call edges within N hops of the violation node.
    pub subgraph: Vec<(String, String, u32)>,
    pub flow: Option<FlowFacts>,
}

/// Identifies which violation a refinement belongs to.
pub type ViolationKey = (String, String, u32);

pub fn violation_key(violation: &RuleViolation) -> ViolationKey {
    (
        violation.rule_id.name().to_string(),
        violation.file.clone(),
        violation.line,
    )
}

/// Validated refinement for one violation.
#[derive(Debug, Clone)]
pub struct RefinedViolation {
    pub explanation: String,
    pub risk: String,
    pub patches: Vec<Patch>,
}

#[derive(Debug, Default)]
pub struct RefinementOutcome {
    pub refined: FxHashMap<ViolationKey, RefinedViolation>,
    pub tokens_used: u64,
    pub llm_used: bool,
}

pub struct LlmRefiner {
    client: Arc<dyn CompletionClient>,
    temperature: f32,
    max_tokens_per_call: u32,
    token_budget: u64,
    concurrency: usize,
}

impl LlmRefiner {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        temperature: f32,
        token_budget: u64,
        concurrency: usize,
    ) -> Self {
        Self {
            client,
            temperature,
            max_tokens_per_call: 1024,
            token_budget,
            concurrency: concurrency.max(1),
        }
    }

    /// Invocation gate: deterministic score at or above the threshold, or
    /// any critical violation.
    pub fn should_refine(score: u32, threshold: u32, violations: &[RuleViolation]) -> bool {
        score >= threshold || violations.iter().any(|v| v.severity == Severity::Critical)
    }

    /// Refine a violation set. Failures never propagate: a transport,
    /// timeout, JSON, or validator failure discards the whole refinement
    /// and the caller falls back to templates. Budget exhaustion merely
    /// stops further calls and keeps what was already refined.
    pub async fn refine(
        &self,
        contexts: Vec<ViolationContext>,
        whitelist: Vec<String>,
        deterministic: &[RuleViolation],
    ) -> RefinementOutcome {
        let validator = ResponseValidator::new(whitelist.clone(), deterministic);
        let spent = Arc::new(AtomicU64::new(0));

        let results: Vec<Result<(ViolationKey, RefinerResponse, u64), LlmError>> =
            stream::iter(contexts.into_iter().map(|ctx| {
                let client = Arc::clone(&self.client);
                let spent = Arc::clone(&spent);
                let whitelist = whitelist.clone();
                let temperature = self.temperature;
                let max_tokens = self.max_tokens_per_call;
                let budget = self.token_budget;
                async move {
                    if spent.load(Ordering::Relaxed) >= budget {
                        return Err(LlmError::BudgetExhausted);
                    }
                    let request = CompletionRequest {
                        system: prompt::system_instructions().to_string(),
                        prompt: prompt::build_prompt(
                            &ctx.violation,
                            &ctx.snippet,
                            &ctx.subgraph,
                            ctx.flow.as_ref(),
                            &whitelist,
                        ),
                        max_tokens,
                        temperature,
                    };
                    let response = client.complete(request).await?;
                    let tokens = response.total_tokens();
                    spent.fetch_add(tokens, Ordering::Relaxed);
                    Ok((violation_key(&ctx.violation), response, tokens))
                }
            }))
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .map(|result| {
                result.and_then(|(key, response, tokens)| {
                    let parsed = validator
                        .parse(&response.text)
                        .map_err(|reason| LlmError::Rejected { reason })?;
                    Ok((key, parsed, tokens))
                })
            })
            .collect();

        let tokens_used = spent.load(Ordering::Relaxed);

        let mut parsed: Vec<(ViolationKey, RefinerResponse)> = Vec::new();
        for result in results {
            match result {
                Ok((key, response, _)) => parsed.push((key, response)),
                // Budget exhaustion is not an error; the violation simply
                // stays on the fallback path.
                Err(LlmError::BudgetExhausted) => {}
                Err(error) => {
                    tracing::warn!(error = %error, "LLM refinement failed, using fallback");
                    return RefinementOutcome {
                        refined: FxHashMap::default(),
                        tokens_used,
                        llm_used: false,
                    };
                }
            }
        }

        let responses: Vec<RefinerResponse> = parsed.iter().map(|(_, r)| r.clone()).collect();
        if let Err(reason) = validator.validate(&responses) {
            tracing::warn!(reason = %reason, "LLM response rejected by validator, using fallback");
            return RefinementOutcome {
                refined: FxHashMap::default(),
                tokens_used,
                llm_used: false,
            };
        }

        let mut refined = FxHashMap::default();
        for (key, response) in parsed {
            refined.insert(
                key,
                RefinedViolation {
                    explanation: response.explanation,
                    risk: response.risk,
                    patches: response
                        .patches
                        .into_iter()
                        .map(|p| Patch {
                            file: p.file,
                            start_line: p.start_line,
                            end_line: p.end_line,
                            new_code: p.new_code,
                        })
                        .collect(),
                },
            );
        }

        let llm_used = !refined.is_empty();
        RefinementOutcome {
            refined,
            tokens_used,
            llm_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blastshield_core::types::violation::{GraphNodeRef, RuleId};

    fn violation(severity: Severity) -> RuleViolation {
        RuleViolation {
            rule_id: RuleId::DangerousEval,
            severity,
            file: "a.py".into(),
            line: 2,
            end_line: 2,
            title: String::new(),
            description: String::new(),
            evidence: vec![],
            affected_function: "a::run".into(),
            graph_node: GraphNodeRef::resolved("a::run"),
        }
    }

    #[test]
    fn gate_opens_on_threshold_or_critical() {
        let critical = [violation(Severity::Critical)];
        let medium = [violation(Severity::Medium)];
        assert!(LlmRefiner::should_refine(80, 50, &medium));
        assert!(LlmRefiner::should_refine(10, 50, &critical));
        assert!(!LlmRefiner::should_refine(10, 50, &medium));
    }
}
