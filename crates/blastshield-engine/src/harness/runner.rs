//! Sandboxed execution: each synthesised case runs in a subordinate
//! `python3` process with a hard wall-clock timeout. Source is passed on
//! the command line; the engine never writes file contents to disk.

use std::process::Stdio;
use std::time::Duration;

use blastshield_core::types::ast::{FileInput, FunctionDef, ModuleAST};
use blastshield_core::{FxHashSet, HarnessError};
use tokio::process::Command;

use super::inputs::synthesize_cases;

/// Module imports that mark a file as network-touching. The harness never
/// runs those without an explicit opt-in.
const NETWORK_MODULES: &[&str] = &["requests", "urllib", "socket", "http", "aiohttp", "httpx"];

pub struct TestHarness {
    timeout: Duration,
    allow_network: bool,
    max_arity: usize,
}

impl TestHarness {
    pub fn new(timeout: Duration, allow_network: bool, max_arity: usize) -> Self {
        Self {
            timeout,
            allow_network,
            max_arity,
        }
    }

    /// Run boundary cases for every eligible top-level function and return
    /// the keys of functions with at least one failing case.
    pub async fn run(&self, files: &[FileInput], modules: &[ModuleAST]) -> FxHashSet<String> {
        let mut failures = FxHashSet::default();

        for module in modules {
            if module.parse_error || !module.language.is_supported() {
                continue;
            }
            if !self.allow_network && imports_network(module) {
                tracing::debug!(module = %module.module_id, "harness skipping network-touching module");
                continue;
            }
            let Some(source) = files
                .iter()
                .find(|f| f.path == module.path)
                .map(|f| f.content.as_str())
            else {
                continue;
            };

            for func in &module.functions {
                if func.params.len() > self.max_arity {
                    continue;
                }
                if self.function_fails(source, func).await {
                    failures.insert(func.qualified_name.clone());
                }
            }
        }

        failures
    }

    async fn function_fails(&self, source: &str, func: &FunctionDef) -> bool {
        for case in synthesize_cases(&func.params) {
            let args = case.join(", ");
            let invocation = if func.is_async {
                format!("import asyncio\nasyncio.run({}({args}))", func.name)
            } else {
                format!("{}({args})", func.name)
            };
            let driver = format!("{source}\n\n{invocation}\n");

            match self.run_case(&driver).await {
                Ok(true) => return true,
                Ok(false) => {}
                // Harness-internal error: swallowed, no signal either way.
                Err(error) => {
                    tracing::debug!(error = %error, "harness case failed internally");
                    return false;
                }
            }
        }
        false
    }

    /// `Ok(true)` when the case failed (non-zero exit or timeout),
    /// `Ok(false)` when it passed.
    async fn run_case(&self, driver: &str) -> Result<bool, HarnessError> {
        let child = Command::new("python3")
            .arg("-c")
            .arg(driver)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| HarnessError::Spawn(e.to_string()))?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(!output.status.success()),
            Ok(Err(error)) => Err(HarnessError::Io(error)),
            // A hung case counts as a failure signal.
            Err(_) => Ok(true),
        }
    }
}

fn imports_network(module: &ModuleAST) -> bool {
    module.imports.iter().any(|import| {
        let root = import.module.split('.').next().unwrap_or(&import.module);
        NETWORK_MODULES.contains(&root)
    })
}
