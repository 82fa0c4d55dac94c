//! Optional boundary-input test harness. Advisory and fail-closed: a
//! harness error never fails the scan, it just withholds the
//! test-failure factor.

pub mod inputs;
pub mod runner;

pub use runner::TestHarness;
