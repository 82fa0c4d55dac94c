//! # blastshield-analysis
//!
//! Deterministic analysis core for the BlastShield engine.
//! Contains the AST extractor, parse cache, call-graph builder,
//! intra-procedural data-flow analyser, rule engine, and risk scorer.

pub mod call_graph;
pub mod flow;
pub mod parsers;
pub mod rules;
pub mod scoring;
