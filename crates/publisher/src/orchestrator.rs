use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use backend::PublishProtocol;
use bundler::{BuildError, Bundler};
use machinery_core::{
    BuildArtifact, Dialect, PublishRequest, PublishedVersion, SourceInputs, SourceSpec,
};
use sandbox::CodeValidator;

use crate::compress::compress;
use crate::error::{PublishError, Result};
use crate::phase::{PhaseMachine, PublishPhase};
use crate::workspace::TempWorkspace;

/// Drives one publish invocation end to end:
/// select source, build, (optionally) validate, compress, then the
/// three-phase create/upload/finalize protocol. The orchestrator owns the
/// temporary workspace for the whole call and never retries a phase.
pub struct PublishOrchestrator {
    protocol: Arc<dyn PublishProtocol>,
    validator: Arc<dyn CodeValidator>,
    skip_validation: bool,
}

impl PublishOrchestrator {
    pub fn new(protocol: Arc<dyn PublishProtocol>, validator: Arc<dyn CodeValidator>) -> Self {
        Self {
            protocol,
            validator,
            skip_validation: false,
        }
    }

    pub fn skip_validation(mut self, skip: bool) -> Self {
        self.skip_validation = skip;
        self
    }

    pub async fn publish(
        &self,
        inputs: SourceInputs,
        request: PublishRequest,
    ) -> Result<PublishedVersion> {
        let mut phases = PhaseMachine::new();
        let result = self.run(&mut phases, inputs, &request).await;

        match &result {
            Ok(version) => info!(
                machine = %version.machine,
                machine_version_id = %version.machine_version_id,
                "publish complete"
            ),
            Err(e) => {
                phases.fail();
                debug!(
                    phase = phases.current().as_str(),
                    category = e.category(),
                    "publish failed"
                );
            }
        }
        result
    }

    async fn run(
        &self,
        phases: &mut PhaseMachine,
        inputs: SourceInputs,
        request: &PublishRequest,
    ) -> Result<PublishedVersion> {
        // Source selection is pure validation; no workspace exists yet.
        let spec = inputs.resolve()?;

        phases.advance(PublishPhase::Building)?;
        let workspace = TempWorkspace::new()?;

        let result = self
            .run_in_workspace(phases, &workspace, &spec, request)
            .await;

        // Single release point: success, failure and everything between.
        workspace.close();
        result
    }

    async fn run_in_workspace(
        &self,
        phases: &mut PhaseMachine,
        workspace: &TempWorkspace,
        spec: &SourceSpec,
        request: &PublishRequest,
    ) -> Result<PublishedVersion> {
        let artifact = self.build_artifact(workspace, spec).await?;

        if self.skip_validation {
            debug!("validation explicitly skipped");
        } else {
            phases.advance(PublishPhase::Validating)?;
            let outcome = self.validator.check(&artifact, workspace.path()).await?;
            if !outcome.passed {
                return Err(PublishError::Validation {
                    diagnostics: outcome.diagnostics,
                });
            }
        }

        phases.advance(PublishPhase::Compressing)?;
        let compressed = compress(&artifact.code)?;
        let upload_name = format!("{}.gz", artifact.file_name);

        phases.advance(PublishPhase::CreatingVersion)?;
        let ticket = self.protocol.create_version(&request.machine).await?;

        // Past the point of no return: a version record now exists on the
        // backend and is not rolled back if upload or finalize fails.
        phases.advance(PublishPhase::UploadingCode)?;
        if let Err(e) = self
            .protocol
            .upload_code(&ticket, &upload_name, compressed)
            .await
        {
            warn!(
                machine_version_id = %ticket.machine_version_id,
                "upload failed; version record remains on the backend without code"
            );
            return Err(e.into());
        }

        phases.advance(PublishPhase::Finalizing)?;
        if let Err(e) = self
            .protocol
            .finalize_version(&request.machine, &ticket.machine_version_id, request)
            .await
        {
            warn!(
                machine_version_id = %ticket.machine_version_id,
                "finalize failed; uploaded version remains unreferenced"
            );
            return Err(e.into());
        }

        phases.advance(PublishPhase::Done)?;
        Ok(PublishedVersion {
            machine: request.machine.clone(),
            machine_version_id: ticket.machine_version_id,
            version_reference: request.version_reference.clone(),
            current: request.make_current,
        })
    }

    async fn build_artifact(
        &self,
        workspace: &TempWorkspace,
        spec: &SourceSpec,
    ) -> Result<BuildArtifact> {
        match spec {
            SourceSpec::RawScript(path) => {
                debug!(path = %path.display(), "using pre-built script");
                let code = tokio::fs::read(path)
                    .await
                    .map_err(|e| PublishError::Build(BuildError::Io(e)))?;
                if code.is_empty() {
                    return Err(PublishError::Build(BuildError::EmptyOutput(path.clone())));
                }
                Ok(BuildArtifact::new(file_name_of(path), code))
            }
            SourceSpec::NodeEntry(path) | SourceSpec::DenoEntry(path) => {
                let dialect = spec.dialect().unwrap_or(Dialect::Node);
                let variants = Bundler::new(dialect).build_variants(path).await?;

                let file_name = format!(
                    "{}.js",
                    path.file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or("bundle")
                );
                // Intermediate on-disk copy, owned and removed with the
                // workspace rather than by the bundler.
                tokio::fs::write(
                    workspace.path().join(&file_name),
                    variants.externalized.as_bytes(),
                )
                .await
                .map_err(PublishError::Workspace)?;

                Ok(
                    BuildArtifact::new(file_name, variants.externalized.into_bytes())
                        .with_bundled(variants.inlined.into_bytes()),
                )
            }
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("bundle.js")
        .to_string()
}
