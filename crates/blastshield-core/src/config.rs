//! Engine configuration. All options have defaults; `from_env` overlays the
//! `BLASTSHIELD_*` environment surface. Loading `.env` files is the host's
//! job, not the engine's.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for a BlastShield engine instance.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// LLM API key. Absence forces deterministic-only scans.
    pub llm_api_key: Option<String>,
    /// LLM model id.
    pub model_id: Option<String>,
    /// Wall-clock bound for a single LLM call, in seconds.
    pub llm_timeout_s: Option<u64>,
    /// Retries per LLM call, exponential backoff 1s → 2s → 4s.
    pub llm_max_retries: Option<u32>,
    /// LLM sampling temperature.
    pub llm_temperature: Option<f32>,
    /// Per-scan LLM token budget. Exhaustion aborts further calls.
    pub llm_max_tokens_per_scan: Option<u64>,
    /// Minimum deterministic score before the LLM is invoked.
    pub llm_risk_threshold: Option<u32>,
    /// Concurrency cap for fanned-out LLM calls.
    pub llm_max_concurrency: Option<usize>,
    /// Hops of call-graph context included per violation in the prompt.
    pub llm_subgraph_hops: Option<usize>,
    /// Per-file byte cap; oversize files are skipped, not fatal.
    pub max_file_size_bytes: Option<u64>,
    /// File count above which a scan runs in the background.
    pub background_file_threshold: Option<usize>,
    /// Enable the boundary-input test harness.
    pub test_harness_enabled: Option<bool>,
    /// Per-test-case wall clock, in seconds.
    pub test_harness_timeout_s: Option<u64>,
    /// Allow the harness to run functions from network-importing modules.
    pub test_harness_allow_network: Option<bool>,
    /// Maximum parameter count for harness-eligible functions.
    pub test_harness_max_arity: Option<usize>,
    /// Cache entry expiry, in seconds.
    pub cache_ttl_s: Option<u64>,
    /// BFS depth bound for blast-radius computation.
    pub max_graph_depth: Option<usize>,
    /// Audit sink location. None disables the file sink; the report still
    /// carries its audit entry.
    pub audit_log_path: Option<PathBuf>,
    /// Callee names recognised as sleep equivalents by retry analysis.
    #[serde(default)]
    pub sleep_equivalents: Vec<String>,
    /// Callee names recognised as sanitisers by taint analysis.
    #[serde(default)]
    pub sanitizers: Vec<String>,
    /// Callee names treated as blocking inside async functions.
    #[serde(default)]
    pub blocking_sinks: Vec<String>,
}

impl EngineConfig {
    /// Build a config from `BLASTSHIELD_*` environment variables, falling
    /// back to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        fn var(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.is_empty())
        }
        fn parse<T: std::str::FromStr>(name: &str) -> Option<T> {
            var(name).and_then(|v| v.parse().ok())
        }

        Self {
            llm_api_key: var("ANTHROPIC_API_KEY"),
            model_id: var("BLASTSHIELD_MODEL_ID"),
            llm_timeout_s: parse("BLASTSHIELD_LLM_TIMEOUT_S"),
            llm_max_retries: parse("BLASTSHIELD_LLM_MAX_RETRIES"),
            llm_temperature: parse("BLASTSHIELD_LLM_TEMPERATURE"),
            llm_max_tokens_per_scan: parse("BLASTSHIELD_LLM_MAX_TOKENS_PER_SCAN"),
            llm_risk_threshold: parse("BLASTSHIELD_LLM_RISK_THRESHOLD"),
            llm_max_concurrency: parse("BLASTSHIELD_LLM_MAX_CONCURRENCY"),
            llm_subgraph_hops: parse("BLASTSHIELD_LLM_SUBGRAPH_HOPS"),
            max_file_size_bytes: parse("BLASTSHIELD_MAX_FILE_SIZE_BYTES"),
            background_file_threshold: parse("BLASTSHIELD_BACKGROUND_FILE_THRESHOLD"),
            test_harness_enabled: parse("BLASTSHIELD_TEST_HARNESS_ENABLED"),
            test_harness_timeout_s: parse("BLASTSHIELD_TEST_HARNESS_TIMEOUT_S"),
            test_harness_allow_network: parse("BLASTSHIELD_TEST_HARNESS_ALLOW_NETWORK"),
            test_harness_max_arity: parse("BLASTSHIELD_TEST_HARNESS_MAX_ARITY"),
            cache_ttl_s: parse("BLASTSHIELD_CACHE_TTL_S"),
            max_graph_depth: parse("BLASTSHIELD_MAX_GRAPH_DEPTH"),
            audit_log_path: var("BLASTSHIELD_AUDIT_LOG_PATH").map(PathBuf::from),
            sleep_equivalents: Vec::new(),
            sanitizers: Vec::new(),
            blocking_sinks: Vec::new(),
        }
    }

    pub fn effective_model_id(&self) -> &str {
        self.model_id.as_deref().unwrap_or("claude-sonnet-4-20250514")
    }

    pub fn effective_llm_timeout_s(&self) -> u64 {
        self.llm_timeout_s.unwrap_or(30)
    }

    pub fn effective_llm_max_retries(&self) -> u32 {
        self.llm_max_retries.unwrap_or(3)
    }

    pub fn effective_llm_temperature(&self) -> f32 {
        self.llm_temperature.unwrap_or(0.2)
    }

    pub fn effective_llm_max_tokens_per_scan(&self) -> u64 {
        self.llm_max_tokens_per_scan.unwrap_or(20_000)
    }

    pub fn effective_llm_risk_threshold(&self) -> u32 {
        self.llm_risk_threshold.unwrap_or(50)
    }

    pub fn effective_llm_max_concurrency(&self) -> usize {
        self.llm_max_concurrency.unwrap_or(4).max(1)
    }

    pub fn effective_llm_subgraph_hops(&self) -> usize {
        self.llm_subgraph_hops.unwrap_or(2)
    }

    /// Default per-file cap: 500 KB.
    pub fn effective_max_file_size_bytes(&self) -> u64 {
        self.max_file_size_bytes.unwrap_or(500 * 1024)
    }

    pub fn effective_background_file_threshold(&self) -> usize {
        self.background_file_threshold.unwrap_or(10)
    }

    pub fn effective_test_harness_enabled(&self) -> bool {
        self.test_harness_enabled.unwrap_or(false)
    }

    pub fn effective_test_harness_timeout_s(&self) -> u64 {
        self.test_harness_timeout_s.unwrap_or(5)
    }

    pub fn effective_test_harness_allow_network(&self) -> bool {
        self.test_harness_allow_network.unwrap_or(false)
    }

    pub fn effective_test_harness_max_arity(&self) -> usize {
        self.test_harness_max_arity.unwrap_or(4)
    }

    pub fn effective_cache_ttl_s(&self) -> u64 {
        self.cache_ttl_s.unwrap_or(3600)
    }

    pub fn effective_max_graph_depth(&self) -> usize {
        self.max_graph_depth.unwrap_or(10)
    }

    pub fn effective_sleep_equivalents(&self) -> Vec<String> {
        if self.sleep_equivalents.is_empty() {
            vec![
                "time.sleep".into(),
                "asyncio.sleep".into(),
                "sleep".into(),
            ]
        } else {
            self.sleep_equivalents.clone()
        }
    }

    pub fn effective_sanitizers(&self) -> Vec<String> {
        if self.sanitizers.is_empty() {
            vec![
                "shlex.quote".into(),
                "re.escape".into(),
                "html.escape".into(),
                "urllib.parse.quote".into(),
                "int".into(),
            ]
        } else {
            self.sanitizers.clone()
        }
    }

    pub fn effective_blocking_sinks(&self) -> Vec<String> {
        if self.blocking_sinks.is_empty() {
            vec![
                "time.sleep".into(),
                "requests.get".into(),
                "requests.post".into(),
                "requests.put".into(),
                "requests.delete".into(),
                "requests.request".into(),
                "open".into(),
                "urllib.request.urlopen".into(),
                "socket.create_connection".into(),
                "psycopg2.connect".into(),
                "sqlite3.connect".into(),
                "pymysql.connect".into(),
            ]
        } else {
            self.blocking_sinks.clone()
        }
    }

    /// Whether LLM refinement can run at all.
    pub fn llm_configured(&self) -> bool {
        self.llm_api_key.as_deref().map(|k| !k.is_empty()).unwrap_or(false)
    }
}
