//! Background scan registry. Scans above the file-count threshold run off
//! the request path; the caller polls by `scan_id`. Lifecycle transitions
//! are monotonic (`queued → running → {complete | failed}`) and results
//! have a bounded lifetime in memory.

use std::time::{Duration, Instant};

use blastshield_core::types::report::{ScanReport, ScanStatus};
use blastshield_core::FxHashMap;
use parking_lot::RwLock;
use tokio::task::AbortHandle;
use uuid::Uuid;

/// How long a terminal entry stays queryable.
const RETENTION: Duration = Duration::from_secs(3600);

struct ScanEntry {
    status: ScanStatus,
    progress: f32,
    report: Option<ScanReport>,
    error: Option<String>,
    finished_at: Option<Instant>,
    handle: Option<AbortHandle>,
}

/// A point-in-time view of one scan, for the status operation.
#[derive(Debug, Clone)]
pub struct ScanView {
    pub status: ScanStatus,
    pub progress: f32,
    pub report: Option<ScanReport>,
    pub error: Option<String>,
}

#[derive(Default)]
pub struct ScanRegistry {
    scans: RwLock<FxHashMap<Uuid, ScanEntry>>,
}

impl ScanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new scan in `queued` state and return its id.
    pub fn enqueue(&self) -> Uuid {
        let scan_id = Uuid::new_v4();
        let mut scans = self.scans.write();
        evict_expired(&mut scans);
        scans.insert(
            scan_id,
            ScanEntry {
                status: ScanStatus::Queued,
                progress: 0.0,
                report: None,
                error: None,
                finished_at: None,
                handle: None,
            },
        );
        scan_id
    }

    pub fn attach_handle(&self, scan_id: Uuid, handle: AbortHandle) {
        if let Some(entry) = self.scans.write().get_mut(&scan_id) {
            entry.handle = Some(handle);
        }
    }

    pub fn mark_running(&self, scan_id: Uuid) {
        self.transition(scan_id, ScanStatus::Running, None, None);
    }

    pub fn set_progress(&self, scan_id: Uuid, progress: f32) {
        if let Some(entry) = self.scans.write().get_mut(&scan_id) {
            if entry.status == ScanStatus::Running {
                entry.progress = progress.clamp(0.0, 1.0);
            }
        }
    }

    pub fn mark_complete(&self, scan_id: Uuid, report: ScanReport) {
        self.transition(scan_id, ScanStatus::Complete, Some(report), None);
    }

    pub fn mark_failed(&self, scan_id: Uuid, error: String) {
        self.transition(scan_id, ScanStatus::Failed, None, Some(error));
    }

    fn transition(
        &self,
        scan_id: Uuid,
        next: ScanStatus,
        report: Option<ScanReport>,
        error: Option<String>,
    ) {
        let mut scans = self.scans.write();
        let Some(entry) = scans.get_mut(&scan_id) else {
            return;
        };
        if !entry.status.can_transition_to(next) {
            tracing::warn!(
                %scan_id,
                from = entry.status.name(),
                to = next.name(),
                "ignoring non-monotonic scan transition"
            );
            return;
        }
        entry.status = next;
        if matches!(next, ScanStatus::Complete | ScanStatus::Failed) {
            entry.progress = 1.0;
            entry.finished_at = Some(Instant::now());
            entry.handle = None;
        }
        entry.report = report.or(entry.report.take());
        entry.error = error.or(entry.error.take());
    }

    pub fn view(&self, scan_id: Uuid) -> Option<ScanView> {
        let scans = self.scans.read();
        scans.get(&scan_id).map(|entry| ScanView {
            status: entry.status,
            progress: entry.progress,
            report: entry.report.clone(),
            error: entry.error.clone(),
        })
    }

    /// Abort a queued or running scan. The in-flight task is dropped;
    /// a cancelled LLM call is simply discarded.
    pub fn cancel(&self, scan_id: Uuid) -> bool {
        let handle = {
            let mut scans = self.scans.write();
            let Some(entry) = scans.get_mut(&scan_id) else {
                return false;
            };
            if matches!(entry.status, ScanStatus::Complete | ScanStatus::Failed) {
                return false;
            }
            entry.handle.take()
        };
        if let Some(handle) = handle {
            handle.abort();
        }
        self.mark_failed(scan_id, "scan cancelled by caller".to_string());
        true
    }
}

fn evict_expired(scans: &mut FxHashMap<Uuid, ScanEntry>) {
    scans.retain(|_, entry| match entry.finished_at {
        Some(finished) => finished.elapsed() < RETENTION,
        None => true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_is_monotonic() {
        let registry = ScanRegistry::new();
        let id = registry.enqueue();
        assert_eq!(registry.view(id).unwrap().status, ScanStatus::Queued);

        registry.mark_running(id);
        assert_eq!(registry.view(id).unwrap().status, ScanStatus::Running);

        registry.mark_failed(id, "boom".into());
        let view = registry.view(id).unwrap();
        assert_eq!(view.status, ScanStatus::Failed);
        assert_eq!(view.error.as_deref(), Some("boom"));

        // Terminal states never regress.
        registry.mark_running(id);
        assert_eq!(registry.view(id).unwrap().status, ScanStatus::Failed);
    }

    #[test]
    fn progress_only_moves_while_running() {
        let registry = ScanRegistry::new();
        let id = registry.enqueue();
        registry.set_progress(id, 0.5);
        assert_eq!(registry.view(id).unwrap().progress, 0.0);
        registry.mark_running(id);
        registry.set_progress(id, 0.5);
        assert_eq!(registry.view(id).unwrap().progress, 0.5);
    }
}
