use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("entrypoint not found: {}", .0.display())]
    MissingEntry(PathBuf),

    #[error("cannot resolve \"{specifier}\" imported from {}: {reason}", .importer.display())]
    UnresolvedImport {
        specifier: String,
        importer: PathBuf,
        reason: String,
    },

    #[error("{}: {message}", .file.display())]
    Syntax { file: PathBuf, message: String },

    #[error("circular import through {}", .0.display())]
    CircularImport(PathBuf),

    #[error("bundle for {} produced no output", .0.display())]
    EmptyOutput(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    pub fn unresolved(
        specifier: impl Into<String>,
        importer: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnresolvedImport {
            specifier: specifier.into(),
            importer: importer.into(),
            reason: reason.into(),
        }
    }

    pub fn syntax(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Syntax {
            file: file.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
