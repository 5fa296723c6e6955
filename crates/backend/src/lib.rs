//! Client for the machines backend's three-phase publish protocol.
//!
//! Publishing a version is create -> upload -> finalize; phase n+1 consumes
//! phase n's output, so the calls are strictly sequential. The orchestrator
//! talks to the `PublishProtocol` trait so tests can swap in a recording
//! double.

use async_trait::async_trait;

use machinery_core::{PublishRequest, VersionCreationTicket};

mod client;
mod error;
mod types;

pub use client::MachinesClient;
pub use error::{BackendError, Result};
pub use types::FinalizeVersionRequest;

#[async_trait]
pub trait PublishProtocol: Send + Sync {
    /// Phase 1: create the version record and obtain an upload ticket.
    async fn create_version(&self, machine: &str) -> Result<VersionCreationTicket>;

    /// Phase 2: submit the compressed artifact as a multipart payload.
    async fn upload_code(
        &self,
        ticket: &VersionCreationTicket,
        file_name: &str,
        code: Vec<u8>,
    ) -> Result<()>;

    /// Phase 3: attach the version reference and current-version flag.
    async fn finalize_version(
        &self,
        machine: &str,
        machine_version_id: &str,
        request: &PublishRequest,
    ) -> Result<()>;
}
