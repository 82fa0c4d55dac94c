//! The deterministic rule bank. A rule is a pure function
//! `(ModuleAST*, CallGraph, FlowFacts) → RuleViolation*`; rules never
//! mutate their inputs and never touch the clock, RNG, or environment.

pub mod blocking_io;
pub mod dangerous_eval;
pub mod exception_boundary;
pub mod missing_await;
pub mod race_condition;
pub mod registry;
pub mod retry_backoff;
pub mod shared_state;
pub mod traits;
pub mod unsanitized_io;

pub use registry::RuleRegistry;
pub use traits::{Rule, RuleConfig, RuleContext, RuleScope};
