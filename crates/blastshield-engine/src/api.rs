//! Request and response types for the four operations the engine exposes
//! to its HTTP host. Field names are part of the contract.

use blastshield_core::types::ast::FileInput;
use blastshield_core::types::report::{ScanReport, ScanStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    #[default]
    Full,
    Pr,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub files: Vec<FileInput>,
    #[serde(default)]
    pub scan_mode: Option<ScanMode>,
    /// Deprecated single-string input, accepted for back-compatibility
    /// only and converted to one `FileInput`.
    #[serde(default)]
    pub combined: Option<String>,
}

impl ScanRequest {
    /// Resolve the effective file set, folding the legacy `combined` field
    /// into a single input when no files are given.
    pub fn into_files(self) -> Vec<FileInput> {
        if self.files.is_empty() {
            if let Some(combined) = self.combined.filter(|c| !c.is_empty()) {
                return vec![FileInput::new("combined.py", combined)];
            }
        }
        self.files
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    pub message: String,
    pub scan_id: String,
    /// Present iff the scan ran inline; otherwise the caller polls.
    pub report: Option<ScanReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub scan_id: String,
    pub status: ScanStatus,
    pub progress: f32,
    pub report: Option<ScanReport>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub model: String,
    pub version: String,
    pub engine: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_combined_converts_to_single_file() {
        let request = ScanRequest {
            files: vec![],
            scan_mode: None,
            combined: Some("def f(): pass".into()),
        };
        let files = request.into_files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "combined.py");
    }

    #[test]
    fn combined_is_ignored_when_files_are_present() {
        let request = ScanRequest {
            files: vec![FileInput::new("a.py", "x = 1")],
            scan_mode: None,
            combined: Some("ignored".into()),
        };
        let files = request.into_files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "a.py");
    }
}
