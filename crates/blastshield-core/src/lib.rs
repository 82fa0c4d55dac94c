//! # blastshield-core
//!
//! Foundation crate for the BlastShield analysis engine.
//! Defines the data model, errors, and configuration.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod errors;
pub mod types;

// Re-export the most commonly used types at the crate root.
pub use config::EngineConfig;
pub use errors::{AuditError, HarnessError, LlmError, RequestError};
pub use types::ast::{FileInput, Language, ModuleAST};
pub use types::collections::{FxHashMap, FxHashSet};
pub use types::report::{AuditEntry, Issue, Patch, ScanReport, ScanStatus};
pub use types::risk::{RiskBreakdown, SeverityBucket, ViolationContribution};
pub use types::violation::{GraphNodeRef, RuleId, RuleViolation, Severity};
