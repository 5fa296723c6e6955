/// Output of one bundling pass.
///
/// `code` is the canonical artifact and is never empty on success. When the
/// pipeline requested the externalized/fully-inlined pairing, `code` holds the
/// externalized variant and `bundled` the fully-inlined companion.
#[derive(Debug, Clone)]
pub struct BuildArtifact {
    pub file_name: String,
    pub code: Vec<u8>,
    pub bundled: Option<Vec<u8>>,
}

impl BuildArtifact {
    pub fn new(file_name: impl Into<String>, code: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            code,
            bundled: None,
        }
    }

    pub fn with_bundled(mut self, bundled: Vec<u8>) -> Self {
        self.bundled = Some(bundled);
        self
    }
}

/// Result of one sandboxed validation run, discarded once consumed.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub passed: bool,
    pub exit_code: Option<i32>,
    pub diagnostics: String,
}

impl ValidationOutcome {
    pub fn passed() -> Self {
        Self {
            passed: true,
            exit_code: Some(0),
            diagnostics: String::new(),
        }
    }

    pub fn failed(exit_code: Option<i32>, diagnostics: impl Into<String>) -> Self {
        Self {
            passed: false,
            exit_code,
            diagnostics: diagnostics.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_builder() {
        let artifact =
            BuildArtifact::new("machine.js", b"export {};".to_vec()).with_bundled(b"x".to_vec());

        assert_eq!(artifact.file_name, "machine.js");
        assert!(!artifact.code.is_empty());
        assert_eq!(artifact.bundled.as_deref(), Some(b"x".as_ref()));
    }

    #[test]
    fn test_outcome_constructors() {
        let ok = ValidationOutcome::passed();
        assert!(ok.passed);
        assert_eq!(ok.exit_code, Some(0));

        let bad = ValidationOutcome::failed(Some(1), "missing allowWrite export");
        assert!(!bad.passed);
        assert!(bad.diagnostics.contains("allowWrite"));
    }
}
