use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },
}

pub type Result<T> = std::result::Result<T, BackendError>;
