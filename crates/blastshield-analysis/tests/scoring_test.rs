//! Risk-scorer tests: the exact formula, factor attribution, ordering,
//! and bucket boundaries.

use blastshield_analysis::call_graph::CallGraphBuilder;
use blastshield_analysis::flow::FlowAnalyzer;
use blastshield_analysis::parsers::python;
use blastshield_analysis::rules::traits::sort_violations;
use blastshield_analysis::rules::{RuleConfig, RuleContext, RuleRegistry};
use blastshield_analysis::scoring::RiskScorer;
use blastshield_core::types::ast::ModuleAST;
use blastshield_core::types::risk::{RiskBreakdown, SeverityBucket};
use blastshield_core::types::violation::RuleId;
use blastshield_core::{EngineConfig, FxHashSet};

fn score_sources(sources: &[(&str, &str)], test_failures: &[&str]) -> RiskBreakdown {
    let modules: Vec<ModuleAST> = sources
        .iter()
        .map(|(path, source)| python::extract(source, path))
        .collect();

    let engine_config = EngineConfig::default();
    let rule_config = RuleConfig::from_engine_config(&engine_config);
    let (graph, _) = CallGraphBuilder::new(rule_config.max_graph_depth).build(&modules);
    let flow = FlowAnalyzer::new(engine_config.effective_sanitizers()).analyze(&modules);
    let registry = RuleRegistry::with_default_rules();

    let mut violations = Vec::new();
    for module in &modules {
        let ctx = RuleContext {
            modules: std::slice::from_ref(module),
            graph: &graph,
            flow: &flow,
            config: &rule_config,
        };
        violations.extend(registry.run_file_scoped(&ctx));
    }
    let ctx = RuleContext {
        modules: &modules,
        graph: &graph,
        flow: &flow,
        config: &rule_config,
    };
    violations.extend(registry.run_graph_scoped(&ctx));
    sort_violations(&mut violations);

    let failures: FxHashSet<String> = test_failures.iter().map(|s| s.to_string()).collect();
    RiskScorer::new(rule_config.max_graph_depth).score(&violations, &graph, &flow, &failures)
}

// ---- The formula, exactly ----

#[test]
fn lone_dangerous_eval_scores_exactly_fifty() {
    // One critical violation, radius 0, no other factors:
    // round(10 × 1.0 / 20 × 100) = 50 → bucket Medium.
    let breakdown = score_sources(&[("a.py", "def run(x):\n    return eval(x)\n")], &[]);
    assert_eq!(breakdown.total_score, 50);
    assert_eq!(breakdown.max_possible_score, 20.0);
    assert_eq!(SeverityBucket::for_score(breakdown.total_score), SeverityBucket::Medium);

    let contribution = &breakdown.contributions[0];
    assert_eq!(contribution.rule_id, RuleId::DangerousEval);
    assert_eq!(contribution.base_weight, 10.0);
    assert_eq!(contribution.total_factor, 1.0);
    assert_eq!(contribution.weighted_score, 10.0);
}

#[test]
fn async_boundary_factor_lands_on_the_offending_node() {
    let breakdown = score_sources(
        &[("s2.py", "async def a():\n    pass\n\nasync def b():\n    a()\n")],
        &[],
    );
    let contribution = &breakdown.contributions[0];
    assert_eq!(contribution.rule_id, RuleId::MissingAwait);
    assert_eq!(contribution.async_boundary_factor, 0.2);
    // b → a is one resolved hop.
    assert!(contribution.blast_radius_factor > 0.0);
}

#[test]
fn state_mutation_factor_applies_to_race_and_shared_state() {
    let breakdown = score_sources(
        &[(
            "s3.py",
            "state = {}\n\nasync def wa():\n    state['a'] = 1\n\nasync def wb():\n    state['b'] = 2\n",
        )],
        &[],
    );
    assert_eq!(breakdown.contributions.len(), 2);
    for contribution in &breakdown.contributions {
        assert_eq!(
            contribution.state_mutation_factor, 0.2,
            "factor missing for {:?}",
            contribution.rule_id
        );
    }
}

#[test]
fn test_failure_factor_requires_a_harness_fact() {
    let without = score_sources(&[("a.py", "def run(x):\n    return eval(x)\n")], &[]);
    assert_eq!(without.contributions[0].test_failure_factor, 0.0);

    let with = score_sources(
        &[("a.py", "def run(x):\n    return eval(x)\n")],
        &["a::run"],
    );
    assert_eq!(with.contributions[0].test_failure_factor, 0.3);
    assert!(with.total_score > without.total_score);
}

#[test]
fn clean_code_scores_zero_with_no_contributions() {
    let breakdown = score_sources(&[("a.py", "def add(a, b):\n    return a + b\n")], &[]);
    assert_eq!(breakdown.total_score, 0);
    assert!(breakdown.contributions.is_empty());
}

#[test]
fn score_never_exceeds_one_hundred_and_formula_is_carried() {
    let breakdown = score_sources(
        &[(
            "s3.py",
            "state = {}\n\nasync def wa():\n    state['a'] = 1\n\nasync def wb():\n    state['b'] = 2\n",
        )],
        &["s3::wa", "s3::wb"],
    );
    assert!(breakdown.total_score <= 100);
    assert!(breakdown.formula.contains("base_weight"));
    assert!(!breakdown.summary.is_empty());
}

// ---- Ordering ----

#[test]
fn contributions_follow_violation_emission_order() {
    let breakdown = score_sources(
        &[
            ("b.py", "import os\n\ndef run(cmd):\n    os.system(cmd)\n"),
            ("a.py", "def run(x):\n    return eval(x)\n"),
        ],
        &[],
    );
    let order: Vec<RuleId> = breakdown.contributions.iter().map(|c| c.rule_id).collect();
    assert_eq!(order, vec![RuleId::DangerousEval, RuleId::UnsanitizedIo]);
}

// ---- Properties ----

proptest::proptest! {
    /// Any mix of severities stays inside [0, 100] and lands in a bucket.
    #[test]
    fn score_is_bounded_for_any_severity_mix(seed in proptest::collection::vec(0usize..4usize, 1..24)) {
        use blastshield_core::types::violation::{GraphNodeRef, RuleViolation, Severity};

        let severities = [Severity::Critical, Severity::High, Severity::Medium, Severity::Low];
        let violations: Vec<RuleViolation> = seed
            .iter()
            .enumerate()
            .map(|(index, pick)| RuleViolation {
                rule_id: RuleId::SharedMutableState,
                severity: severities[*pick],
                file: "m.py".to_string(),
                line: index as u32 + 1,
                end_line: index as u32 + 1,
                title: String::new(),
                description: String::new(),
                evidence: vec![],
                affected_function: String::new(),
                graph_node: GraphNodeRef::Unresolved,
            })
            .collect();

        let graph = blastshield_analysis::call_graph::CallGraph::new();
        let flow = blastshield_analysis::flow::FlowIndex::default();
        let breakdown = RiskScorer::new(10).score(
            &violations,
            &graph,
            &flow,
            &FxHashSet::default(),
        );

        proptest::prop_assert!(breakdown.total_score <= 100);
        proptest::prop_assert!(breakdown.total_score > 0);
        // Bucket assignment is total.
        let _ = SeverityBucket::for_score(breakdown.total_score);
        proptest::prop_assert_eq!(breakdown.contributions.len(), violations.len());
    }
}

// ---- Buckets ----

#[test]
fn bucket_boundaries_match_the_contract() {
    assert_eq!(SeverityBucket::for_score(0), SeverityBucket::Low);
    assert_eq!(SeverityBucket::for_score(20), SeverityBucket::Low);
    assert_eq!(SeverityBucket::for_score(21), SeverityBucket::Medium);
    assert_eq!(SeverityBucket::for_score(50), SeverityBucket::Medium);
    assert_eq!(SeverityBucket::for_score(51), SeverityBucket::High);
    assert_eq!(SeverityBucket::for_score(80), SeverityBucket::High);
    assert_eq!(SeverityBucket::for_score(81), SeverityBucket::Critical);
    assert_eq!(SeverityBucket::for_score(100), SeverityBucket::Critical);
}
