//! Scoped temporary directory for one publish invocation.
//!
//! Creation and removal are paired regardless of which pipeline transition
//! is taken: the orchestrator calls `close` on its single exit point, and
//! `Drop` covers cancellation. Cleanup failures are logged, not escalated,
//! so they never mask the primary failure.

use std::path::Path;

use tempfile::TempDir;
use tracing::{debug, warn};

pub struct TempWorkspace {
    dir: Option<TempDir>,
}

impl TempWorkspace {
    pub fn new() -> std::io::Result<Self> {
        let dir = TempDir::with_prefix("machinery-publish-")?;
        debug!(path = %dir.path().display(), "created publish workspace");
        Ok(Self { dir: Some(dir) })
    }

    pub fn path(&self) -> &Path {
        match &self.dir {
            Some(dir) => dir.path(),
            // Only possible after `close`, which consumes self.
            None => Path::new(""),
        }
    }

    /// Removes the workspace, logging failures instead of returning them.
    pub fn close(mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => debug!(path = %path.display(), "removed publish workspace"),
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to remove publish workspace"
                ),
            }
        }
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        if let Some(dir) = &self.dir {
            debug!(
                path = %dir.path().display(),
                "publish workspace dropped, removing"
            );
        }
    }
}
