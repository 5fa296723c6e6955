use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use machinery_core::{BuildArtifact, Dialect, ValidationOutcome};

use crate::error::{Result, SandboxError};
use crate::harness::harness_script;
use crate::CodeValidator;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Command used to evaluate the harness. `Custom` exists for tests and for
/// operators with a non-standard runtime install.
#[derive(Debug, Clone)]
pub enum SandboxRuntime {
    Node,
    Deno,
    Custom { program: String, args: Vec<String> },
}

impl SandboxRuntime {
    fn program(&self) -> &str {
        match self {
            Self::Node => "node",
            Self::Deno => "deno",
            Self::Custom { program, .. } => program,
        }
    }

    fn command(&self, scratch_dir: &Path, harness: &Path) -> Command {
        let mut cmd = Command::new(self.program());
        match self {
            Self::Node => {}
            // No ambient permissions beyond reading the bundle directory.
            Self::Deno => {
                cmd.arg("run")
                    .arg("--quiet")
                    .arg("--no-prompt")
                    .arg(format!("--allow-read={}", scratch_dir.display()));
            }
            Self::Custom { args, .. } => {
                cmd.args(args);
            }
        }
        cmd.arg(harness);
        cmd
    }
}

/// Runs the generated harness in a separate short-lived subprocess and
/// reports whether the artifact satisfies the definition contract.
pub struct ProcessValidator {
    runtime: SandboxRuntime,
    timeout: Duration,
}

impl ProcessValidator {
    pub fn new() -> Self {
        Self {
            runtime: SandboxRuntime::Node,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Picks the runtime matching the artifact's dialect; raw scripts
    /// default to node.
    pub fn for_dialect(dialect: Option<Dialect>) -> Self {
        let runtime = match dialect {
            Some(Dialect::Deno) => SandboxRuntime::Deno,
            _ => SandboxRuntime::Node,
        };
        Self {
            runtime,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_runtime(mut self, runtime: SandboxRuntime) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn write_inputs(
        &self,
        artifact: &BuildArtifact,
        scratch_dir: &Path,
    ) -> Result<PathBuf> {
        // A fresh copy, never the caller's original file. The fully-inlined
        // variant is the one that loads standalone; the externalized variant
        // keeps a bare runtime import no scratch directory can satisfy.
        let bytes = artifact.bundled.as_deref().unwrap_or(&artifact.code);
        let bundle_path = scratch_dir.join("bundle.mjs");
        tokio::fs::write(&bundle_path, bytes).await?;

        let bundle_abs = bundle_path.canonicalize()?;
        let harness_path = scratch_dir.join("check.mjs");
        let script = harness_script(&format!("file://{}", bundle_abs.display()));
        tokio::fs::write(&harness_path, script).await?;
        Ok(harness_path)
    }
}

impl Default for ProcessValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodeValidator for ProcessValidator {
    async fn check(
        &self,
        artifact: &BuildArtifact,
        scratch_dir: &Path,
    ) -> Result<ValidationOutcome> {
        let harness_path = self.write_inputs(artifact, scratch_dir).await?;

        debug!(
            runtime = self.runtime.program(),
            file = %artifact.file_name,
            "running sandboxed validation"
        );

        let mut cmd = self.runtime.command(scratch_dir, &harness_path);
        cmd.current_dir(scratch_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| SandboxError::Spawn {
            runtime: self.runtime.program().to_string(),
            source,
        })?;

        // kill_on_drop reaps the child if the wait future is dropped by the
        // timeout below.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "validation subprocess did not exit in time"
                );
                return Ok(ValidationOutcome::failed(
                    None,
                    format!(
                        "validation timed out after {} seconds",
                        self.timeout.as_secs()
                    ),
                ));
            }
        };

        let diagnostics = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if output.status.success() {
            Ok(ValidationOutcome::passed())
        } else {
            Ok(ValidationOutcome::failed(output.status.code(), diagnostics))
        }
    }
}
