//! Append-only audit sink: newline-delimited JSON, one entry per scan.
//! Best-effort — a write failure degrades the audit channel but never
//! fails a scan.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use blastshield_core::types::report::AuditEntry;
use blastshield_core::AuditError;
use parking_lot::Mutex;

pub struct AuditSink {
    path: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl AuditSink {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Append one entry. Errors are logged and swallowed.
    pub fn append(&self, entry: &AuditEntry) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(error) = self.try_append(path.clone(), entry) {
            tracing::warn!(error = %error, "audit append failed");
        }
    }

    fn try_append(&self, path: PathBuf, entry: &AuditEntry) -> Result<(), AuditError> {
        let line = serde_json::to_string(entry)?;
        let _guard = self.write_lock.lock();
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(scan_id: &str) -> AuditEntry {
        AuditEntry {
            scan_id: scan_id.into(),
            timestamp: Utc::now(),
            files_scanned: 2,
            violations_found: 1,
            risk_score: 50,
            llm_invoked: false,
            llm_tokens_used: 0,
            duration_ms: 12,
            deterministic_only: true,
        }
    }

    #[test]
    fn appends_one_json_line_per_scan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.ndjson");
        let sink = AuditSink::new(Some(path.clone()));
        sink.append(&entry("scan-1"));
        sink.append(&entry("scan-2"));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: AuditEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.scan_id, "scan-1");
    }

    #[test]
    fn disabled_sink_is_a_no_op() {
        let sink = AuditSink::new(None);
        sink.append(&entry("scan-1"));
    }
}
