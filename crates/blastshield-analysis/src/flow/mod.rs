//! Intra-procedural, path-insensitive data-flow facts.

pub mod analyzer;
pub mod types;

pub use analyzer::FlowAnalyzer;
pub use types::{FlowFacts, FlowIndex, SinkKind, TaintedSink};
