use thiserror::Error;

use backend::BackendError;
use bundler::BuildError;
use machinery_core::CoreError;
use sandbox::SandboxError;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("{0}")]
    Configuration(#[from] CoreError),

    #[error("build failed: {0}")]
    Build(#[from] BuildError),

    #[error("validation failed: {diagnostics}")]
    Validation { diagnostics: String },

    #[error("validation sandbox failed: {0}")]
    Sandbox(#[from] SandboxError),

    #[error(transparent)]
    Network(#[from] BackendError),

    #[error("workspace error: {0}")]
    Workspace(#[from] std::io::Error),

    #[error("invalid publish transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

impl PublishError {
    /// Stable category label for the single-line CLI diagnostic.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Build(_) => "build",
            Self::Validation { .. } | Self::Sandbox(_) => "validation",
            Self::Network(_) => "network",
            Self::Workspace(_) => "filesystem",
            Self::InvalidTransition { .. } => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, PublishError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let err = PublishError::Validation {
            diagnostics: "missing allowWrite export".to_string(),
        };
        assert_eq!(err.category(), "validation");
        assert!(err.to_string().contains("missing allowWrite export"));

        let err = PublishError::Network(BackendError::Status {
            status: 500,
            body: "boom".to_string(),
        });
        assert_eq!(err.category(), "network");
    }
}
