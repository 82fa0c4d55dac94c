//! The staged scan pipeline.
//!
//! validate → cache/parse → call graph → flow → file-scoped rules
//! (cached per file) → graph-scoped rules → deterministic sort → test
//! harness → risk score → LLM refine/validate → assemble → audit.
//!
//! Every stage except the LLM refiner and the harness is deterministic;
//! results are merged by a deterministic sort before scoring, so
//! intra-scan parallelism never changes the report.

use std::sync::Arc;
use std::time::{Duration, Instant};

use blastshield_analysis::call_graph::traversal::subgraph_within;
use blastshield_analysis::call_graph::CallGraphBuilder;
use blastshield_analysis::flow::{FlowAnalyzer, FlowIndex};
use blastshield_analysis::parsers::cache::{AnalysisCache, CachedFile};
use blastshield_analysis::parsers::hasher::hash_content;
use blastshield_analysis::parsers::ParserManager;
use blastshield_analysis::rules::traits::sort_violations;
use blastshield_analysis::rules::{RuleConfig, RuleContext, RuleRegistry};
use blastshield_analysis::scoring::RiskScorer;
use blastshield_core::types::ast::{FileInput, ModuleAST};
use blastshield_core::types::report::ScanReport;
use blastshield_core::types::violation::RuleViolation;
use blastshield_core::{EngineConfig, FxHashSet};
use blastshield_llm::refiner::{LlmRefiner, RefinementOutcome, ViolationContext};
use blastshield_llm::CompletionClient;
use rayon::prelude::*;

use crate::api::ScanMode;
use crate::assembler::{assemble, AssembleInput};
use crate::audit::AuditSink;
use crate::harness::TestHarness;

pub struct Pipeline {
    config: EngineConfig,
    manager: ParserManager,
    cache: AnalysisCache,
    registry: RuleRegistry,
    rule_config: RuleConfig,
    scorer: RiskScorer,
    audit: AuditSink,
    llm: Option<Arc<dyn CompletionClient>>,
}

impl Pipeline {
    pub fn new(config: EngineConfig, llm: Option<Arc<dyn CompletionClient>>) -> Self {
        let rule_config = RuleConfig::from_engine_config(&config);
        let cache = AnalysisCache::new(
            10_000,
            Duration::from_secs(config.effective_cache_ttl_s()),
        );
        let scorer = RiskScorer::new(config.effective_max_graph_depth());
        let audit = AuditSink::new(config.audit_log_path.clone());
        Self {
            config,
            manager: ParserManager::new(),
            cache,
            registry: RuleRegistry::with_default_rules(),
            rule_config,
            scorer,
            audit,
            llm,
        }
    }

    pub fn invalidate(&self, path: &str) {
        self.cache.invalidate(path);
    }

    /// Run one scan to completion. Infallible by design: everything past
    /// request validation degrades locally.
    pub async fn run(
        &self,
        scan_id: &str,
        mode: ScanMode,
        mut files: Vec<FileInput>,
        progress: &(dyn Fn(f32) + Send + Sync),
    ) -> ScanReport {
        let start = Instant::now();

        // Path order must not influence the report.
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let max_size = self.config.effective_max_file_size_bytes();
        let (kept, oversize): (Vec<FileInput>, Vec<FileInput>) = files
            .into_iter()
            .partition(|f| f.content.len() as u64 <= max_size);
        let skipped: Vec<String> = oversize.into_iter().map(|f| f.path).collect();
        for path in &skipped {
            tracing::warn!(file = %path, "file exceeds size limit, skipped");
        }

        // Stage 1: per-file extraction, cache-first, misses in parallel.
        let hashes: Vec<String> = kept.iter().map(|f| hash_content(&f.content)).collect();
        let cached: Vec<Option<CachedFile>> = kept
            .iter()
            .zip(&hashes)
            .map(|(f, hash)| self.cache.get(&f.path, hash))
            .collect();

        let extracted: Vec<Option<(ModuleAST, Vec<RuleViolation>)>> = kept
            .par_iter()
            .zip(&cached)
            .map(|(input, hit)| {
                if hit.is_some() {
                    return None;
                }
                let out = self.manager.extract(input);
                let synthetic: Vec<RuleViolation> = out.synthetic.into_iter().collect();
                Some((out.ast, synthetic))
            })
            .collect();

        let modules: Vec<ModuleAST> = cached
            .iter()
            .zip(&extracted)
            .map(|(hit, miss)| match (hit, miss) {
                (Some(hit), _) => hit.ast.clone(),
                (None, Some((ast, _))) => ast.clone(),
                (None, None) => unreachable!("file is either cached or extracted"),
            })
            .collect();
        progress(0.2);

        // Stage 2: call graph, fully constructed before any rule runs.
        let builder = CallGraphBuilder::new(self.config.effective_max_graph_depth());
        let (graph, _stats) = builder.build(&modules);
        progress(0.35);

        // Stage 3: intra-procedural flow facts.
        let analyzer = FlowAnalyzer::new(self.config.effective_sanitizers());
        let flow = analyzer.analyze(&modules);
        progress(0.45);

        // Stage 4: rules. File-scoped output is cached per (path, hash);
        // graph-scoped rules always recompute because they depend on the
        // whole file set.
        let mut violations: Vec<RuleViolation> = Vec::new();
        for (index, ((input, hash), hit)) in kept.iter().zip(&hashes).zip(&cached).enumerate() {
            let module = &modules[index];
            let file_violations = match hit {
                Some(hit) => hit.violations.clone(),
                None => {
                    let ctx = RuleContext {
                        modules: std::slice::from_ref(module),
                        graph: &graph,
                        flow: &flow,
                        config: &self.rule_config,
                    };
                    let mut found = self.registry.run_file_scoped(&ctx);
                    if let Some((_, synthetic)) = extracted[index].as_ref() {
                        found.extend(synthetic.iter().cloned());
                    }
                    self.cache.put(
                        &input.path,
                        hash,
                        CachedFile {
                            ast: module.clone(),
                            violations: found.clone(),
                        },
                    );
                    found
                }
            };
            violations.extend(file_violations);
        }

        let graph_ctx = RuleContext {
            modules: &modules,
            graph: &graph,
            flow: &flow,
            config: &self.rule_config,
        };
        violations.extend(self.registry.run_graph_scoped(&graph_ctx));
        sort_violations(&mut violations);
        progress(0.6);

        // Stage 5 (optional): boundary-input harness.
        let test_failures = if self.config.effective_test_harness_enabled() {
            let harness = TestHarness::new(
                Duration::from_secs(self.config.effective_test_harness_timeout_s()),
                self.config.effective_test_harness_allow_network(),
                self.config.effective_test_harness_max_arity(),
            );
            harness.run(&kept, &modules).await
        } else {
            FxHashSet::default()
        };
        progress(0.7);

        // Stage 6: explainable risk score.
        let breakdown = self.scorer.score(&violations, &graph, &flow, &test_failures);
        progress(0.8);

        // Stage 7 (optional): LLM refinement, strictly validated.
        let whitelist: Vec<String> = kept.iter().map(|f| f.path.clone()).collect();
        let refinement = match &self.llm {
            Some(client)
                if !violations.is_empty()
                    && LlmRefiner::should_refine(
                        breakdown.total_score,
                        self.config.effective_llm_risk_threshold(),
                        &violations,
                    ) =>
            {
                let contexts =
                    build_contexts(&violations, &kept, &graph, &flow, &self.config);
                let refiner = LlmRefiner::new(
                    Arc::clone(client),
                    self.config.effective_llm_temperature(),
                    self.config.effective_llm_max_tokens_per_scan(),
                    self.config.effective_llm_max_concurrency(),
                );
                refiner.refine(contexts, whitelist, &violations).await
            }
            _ => RefinementOutcome::default(),
        };
        progress(0.9);

        // Stage 8: assemble and audit.
        let report = assemble(AssembleInput {
            scan_id,
            mode,
            violations: &violations,
            breakdown,
            refinement: &refinement,
            test_failures: &test_failures,
            files_scanned: kept.len(),
            skipped: &skipped,
            duration_ms: start.elapsed().as_millis() as u64,
        });
        self.audit.append(&report.audit);
        progress(1.0);

        tracing::info!(
            scan_id,
            files = kept.len(),
            violations = report.issues.len(),
            risk_score = report.risk_score,
            llm_used = report.llm_used,
            duration_ms = report.audit.duration_ms,
            "scan complete"
        );

        report
    }
}

/// Assemble per-violation structured facts for the refiner: the snippet
/// spanning the violation, the N-hop call subgraph, and the node's flow
/// facts. Never more source than the violation's own lines.
fn build_contexts(
    violations: &[RuleViolation],
    files: &[FileInput],
    graph: &blastshield_analysis::call_graph::CallGraph,
    flow: &FlowIndex,
    config: &EngineConfig,
) -> Vec<ViolationContext> {
    let hops = config.effective_llm_subgraph_hops();
    violations
        .iter()
        .map(|violation| {
            let snippet = files
                .iter()
                .find(|f| f.path == violation.file)
                .map(|f| {
                    f.content
                        .lines()
                        .skip(violation.line.saturating_sub(1) as usize)
                        .take((violation.end_line - violation.line + 1) as usize)
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();

            let subgraph = violation
                .graph_node
                .node_key()
                .and_then(|key| graph.get_node(key))
                .map(|idx| subgraph_within(graph, idx, hops))
                .unwrap_or_default();

            let flow_facts = violation
                .graph_node
                .node_key()
                .and_then(|key| flow.get(key))
                .filter(|facts| !facts.is_empty())
                .cloned();

            ViolationContext {
                violation: violation.clone(),
                snippet,
                subgraph,
                flow: flow_facts,
            }
        })
        .collect()
}
