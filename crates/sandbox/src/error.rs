use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to launch validation runtime `{runtime}`: {source}")]
    Spawn {
        runtime: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SandboxError>;
