//! Flow-fact types consumed by the rules and the scorer.

use blastshield_core::FxHashMap;
use serde::{Deserialize, Serialize};

/// What kind of dangerous call a tainted value reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    DynamicCode,
    Shell,
    Subprocess,
    Filesystem,
    Sql,
}

impl SinkKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DynamicCode => "dynamic_code",
            Self::Shell => "shell",
            Self::Subprocess => "subprocess",
            Self::Filesystem => "filesystem",
            Self::Sql => "sql",
        }
    }
}

/// A parameter that reaches a sink without an intervening sanitiser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaintedSink {
    pub parameter: String,
    /// The alias the value travelled through, when not used directly.
    pub via_alias: Option<String>,
    /// Canonical callee of the sink call (`os.system`, `subprocess.run`).
    pub sink: String,
    pub kind: SinkKind,
    pub line: u32,
}

/// Per-function flow facts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowFacts {
    /// Declared non-optional return annotation with a null/bare/fall-through
    /// return path.
    pub nullable_return: bool,
    pub tainted_sinks: Vec<TaintedSink>,
    /// Module-level containers this function mutates.
    pub mutated_shared: Vec<String>,
}

impl FlowFacts {
    pub fn is_empty(&self) -> bool {
        !self.nullable_return && self.tainted_sinks.is_empty() && self.mutated_shared.is_empty()
    }
}

/// Flow facts for every function in the scan, keyed by qualified name.
#[derive(Debug, Clone, Default)]
pub struct FlowIndex {
    facts: FxHashMap<String, FlowFacts>,
}

impl FlowIndex {
    pub fn insert(&mut self, key: String, facts: FlowFacts) {
        self.facts.insert(key, facts);
    }

    pub fn get(&self, key: &str) -> Option<&FlowFacts> {
        self.facts.get(key)
    }

    pub fn mutates_shared(&self, key: &str) -> bool {
        self.get(key).map(|f| !f.mutated_shared.is_empty()).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}
