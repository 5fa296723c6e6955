use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Module-resolution convention of a source entrypoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    Node,
    Deno,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Deno => "deno",
        }
    }
}

/// The single source a publish call builds from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// A pre-bundled script, shipped as-is.
    RawScript(PathBuf),
    /// A Node-dialect entrypoint to bundle.
    NodeEntry(PathBuf),
    /// A Deno-dialect entrypoint to bundle.
    DenoEntry(PathBuf),
}

impl SourceSpec {
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::RawScript(p) | Self::NodeEntry(p) | Self::DenoEntry(p) => p,
        }
    }

    pub fn dialect(&self) -> Option<Dialect> {
        match self {
            Self::RawScript(_) => None,
            Self::NodeEntry(_) => Some(Dialect::Node),
            Self::DenoEntry(_) => Some(Dialect::Deno),
        }
    }
}

/// Raw source flags as supplied by the caller, before the
/// exactly-one-source rule has been applied.
#[derive(Debug, Clone, Default)]
pub struct SourceInputs {
    pub script: Option<PathBuf>,
    pub node_entry: Option<PathBuf>,
    pub deno_entry: Option<PathBuf>,
}

impl SourceInputs {
    /// Collapse the three mutually exclusive inputs into one `SourceSpec`.
    ///
    /// Pure validation, no filesystem access. Zero or more than one
    /// populated input is a configuration error.
    pub fn resolve(self) -> Result<SourceSpec, CoreError> {
        match (self.script, self.node_entry, self.deno_entry) {
            (Some(path), None, None) => Ok(SourceSpec::RawScript(path)),
            (None, Some(path), None) => Ok(SourceSpec::NodeEntry(path)),
            (None, None, Some(path)) => Ok(SourceSpec::DenoEntry(path)),
            (script, node, deno) => {
                let populated = [script.is_some(), node.is_some(), deno.is_some()]
                    .into_iter()
                    .filter(|p| *p)
                    .count();
                Err(CoreError::SourceSelection(format!(
                    "got {populated} of --script, --node, --deno"
                )))
            }
        }
    }
}
