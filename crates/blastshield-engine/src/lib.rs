//! # blastshield-engine
//!
//! The scan pipeline orchestrator. Composes the deterministic analysis
//! core with the optional LLM refiner and test harness, runs large scans
//! in the background, and appends one audit record per scan.

pub mod api;
pub mod assembler;
pub mod audit;
pub mod background;
pub mod engine;
pub mod harness;
pub mod pipeline;

pub use api::{Health, ScanMode, ScanRequest, ScanResponse, StatusResponse};
pub use engine::Engine;
