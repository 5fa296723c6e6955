//! Isolated execution boundary for untrusted bundles.
//!
//! Artifacts are validated by loading them inside a separate, time-bounded
//! subprocess with a minimal permission surface. The `CodeValidator` trait
//! is the seam: any implementation that can answer "does this artifact
//! satisfy the definition contract?" is acceptable.

use std::path::Path;

use async_trait::async_trait;

use machinery_core::{BuildArtifact, ValidationOutcome};

mod error;
mod harness;
mod process;

pub use error::{Result, SandboxError};
pub use harness::harness_script;
pub use process::{ProcessValidator, SandboxRuntime};

/// Capability to validate an artifact's structural contract.
///
/// `scratch_dir` is a caller-owned directory the implementation may write
/// its working copies into; the caller is responsible for removing it.
#[async_trait]
pub trait CodeValidator: Send + Sync {
    async fn check(
        &self,
        artifact: &BuildArtifact,
        scratch_dir: &Path,
    ) -> Result<ValidationOutcome>;
}
