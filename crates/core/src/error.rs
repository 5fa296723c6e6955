use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("exactly one source required: {0}")]
    SourceSelection(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CoreError::SourceSelection("got 0 of --script, --node, --deno".to_string());
        assert!(error.to_string().contains("exactly one source required"));
    }
}
