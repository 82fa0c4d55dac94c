//! Error taxonomy. Only request-validation errors bubble to the caller;
//! every other failure degrades locally per the stage's recovery policy.

/// Machine-readable error codes surfaced on request-level failures.
pub mod error_code {
    pub const EMPTY_FILE_SET: &str = "EMPTY_FILE_SET";
    pub const MALFORMED_REQUEST: &str = "MALFORMED_REQUEST";
    pub const UNKNOWN_SCAN: &str = "UNKNOWN_SCAN";
}

/// Request-validation failures. No scan is created for these.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("The scan request contains no files.")]
    EmptyFileSet,

    #[error("The scan request is malformed: {reason}")]
    Malformed { reason: String },

    #[error("No scan exists with id {scan_id}.")]
    UnknownScan { scan_id: String },
}

impl RequestError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyFileSet => error_code::EMPTY_FILE_SET,
            Self::Malformed { .. } => error_code::MALFORMED_REQUEST,
            Self::UnknownScan { .. } => error_code::UNKNOWN_SCAN,
        }
    }
}

/// LLM-layer failures. Never propagated out of the refiner; the assembler
/// reverts to the deterministic fallback path.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM credentials are not configured")]
    MissingCredentials,

    #[error("LLM request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("LLM transport error: {0}")]
    Transport(String),

    #[error("LLM returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("LLM response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("LLM response rejected by validator: {reason}")]
    Rejected { reason: String },

    #[error("Per-scan token budget exhausted")]
    BudgetExhausted,
}

/// Test-harness failures. Advisory; internal errors are swallowed and the
/// function simply contributes no test-failure factor.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("failed to spawn interpreter: {0}")]
    Spawn(String),

    #[error("test case exceeded {seconds}s wall clock")]
    Timeout { seconds: u64 },

    #[error("harness I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Audit-sink failures. Best-effort: a write error degrades the audit
/// channel but never fails a scan.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit entry serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
