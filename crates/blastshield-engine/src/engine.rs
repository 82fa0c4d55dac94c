//! Engine facade — the four operations exposed to the HTTP host:
//! scan, PR-scan, status, health.

use std::sync::Arc;
use std::time::Duration;

use blastshield_core::{EngineConfig, RequestError};
use blastshield_llm::{AnthropicClient, CompletionClient};
use uuid::Uuid;

use crate::api::{Health, ScanMode, ScanRequest, ScanResponse, StatusResponse};
use crate::background::ScanRegistry;
use crate::pipeline::Pipeline;

const ENGINE_NAME: &str = "blastshield";

struct EngineInner {
    config: EngineConfig,
    pipeline: Pipeline,
    registry: ScanRegistry,
}

/// The BlastShield analysis engine. Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Build an engine from configuration. Missing LLM credentials force
    /// deterministic-only operation.
    pub fn new(config: EngineConfig) -> Self {
        let llm: Option<Arc<dyn CompletionClient>> = match &config.llm_api_key {
            Some(key) => AnthropicClient::new(
                key.clone(),
                config.effective_model_id().to_string(),
                Duration::from_secs(config.effective_llm_timeout_s()),
                config.effective_llm_max_retries(),
            )
            .map(|client| Arc::new(client) as Arc<dyn CompletionClient>)
            .map_err(|error| {
                tracing::warn!(%error, "LLM client unavailable, running deterministic-only");
            })
            .ok(),
            None => None,
        };
        Self::with_client(config, llm)
    }

    /// Build an engine with an explicit completion client (or none). The
    /// seam tests and alternative providers plug into.
    pub fn with_client(config: EngineConfig, llm: Option<Arc<dyn CompletionClient>>) -> Self {
        let pipeline = Pipeline::new(config.clone(), llm);
        Self {
            inner: Arc::new(EngineInner {
                config,
                pipeline,
                registry: ScanRegistry::new(),
            }),
        }
    }

    /// Scan a file set. Runs inline below the background threshold;
    /// otherwise returns a `scan_id` for polling.
    pub async fn scan(&self, request: ScanRequest) -> Result<ScanResponse, RequestError> {
        let mode = request.scan_mode.unwrap_or_default();
        let files = request.into_files();
        if files.is_empty() {
            return Err(RequestError::EmptyFileSet);
        }

        if files.len() > self.inner.config.effective_background_file_threshold() {
            return Ok(self.spawn_background(mode, files));
        }

        let scan_id = Uuid::new_v4().to_string();
        let report = self
            .inner
            .pipeline
            .run(&scan_id, mode, files, &|_| {})
            .await;
        Ok(ScanResponse {
            message: "Scan complete.".to_string(),
            scan_id,
            report: Some(report),
        })
    }

    /// PR scan: always inline, PR-framed summary.
    pub async fn pr_scan(&self, request: ScanRequest) -> Result<ScanResponse, RequestError> {
        let files = request.into_files();
        if files.is_empty() {
            return Err(RequestError::EmptyFileSet);
        }
        let scan_id = Uuid::new_v4().to_string();
        let report = self
            .inner
            .pipeline
            .run(&scan_id, ScanMode::Pr, files, &|_| {})
            .await;
        Ok(ScanResponse {
            message: "PR scan complete.".to_string(),
            scan_id,
            report: Some(report),
        })
    }

    fn spawn_background(
        &self,
        mode: ScanMode,
        files: Vec<blastshield_core::FileInput>,
    ) -> ScanResponse {
        let scan_id = self.inner.registry.enqueue();
        let inner = Arc::clone(&self.inner);

        let worker = tokio::spawn(async move {
            inner.registry.mark_running(scan_id);
            let report = inner
                .pipeline
                .run(&scan_id.to_string(), mode, files, &|p| {
                    inner.registry.set_progress(scan_id, p)
                })
                .await;
            inner.registry.mark_complete(scan_id, report);
        });
        self.inner.registry.attach_handle(scan_id, worker.abort_handle());

        // Supervisor: a panicked or aborted worker must still surface a
        // terminal status.
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            if let Err(error) = worker.await {
                if !error.is_cancelled() {
                    inner
                        .registry
                        .mark_failed(scan_id, "Scan failed internally.".to_string());
                }
            }
        });

        ScanResponse {
            message: "Scan accepted; poll the status endpoint.".to_string(),
            scan_id: scan_id.to_string(),
            report: None,
        }
    }

    /// Status of a background scan.
    pub fn status(&self, scan_id: &str) -> Result<StatusResponse, RequestError> {
        let parsed = Uuid::parse_str(scan_id).map_err(|_| RequestError::UnknownScan {
            scan_id: scan_id.to_string(),
        })?;
        let view = self
            .inner
            .registry
            .view(parsed)
            .ok_or_else(|| RequestError::UnknownScan {
                scan_id: scan_id.to_string(),
            })?;
        Ok(StatusResponse {
            scan_id: scan_id.to_string(),
            status: view.status,
            progress: view.progress,
            report: view.report,
            error: view.error,
        })
    }

    /// Cancel a queued or running background scan.
    pub fn cancel(&self, scan_id: &str) -> bool {
        Uuid::parse_str(scan_id)
            .map(|id| self.inner.registry.cancel(id))
            .unwrap_or(false)
    }

    pub fn health(&self) -> Health {
        Health {
            status: "ok".to_string(),
            model: self.inner.config.effective_model_id().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            engine: ENGINE_NAME.to_string(),
        }
    }

    /// Explicit cache invalidation for one path.
    pub fn invalidate(&self, path: &str) {
        self.inner.pipeline.invalidate(path);
    }
}
