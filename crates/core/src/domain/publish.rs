use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Caller-supplied publish parameters, carried unchanged through all three
/// protocol phases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    pub machine: String,
    pub version_reference: String,
    pub make_current: bool,
}

impl PublishRequest {
    pub fn new(machine: impl Into<String>, version_reference: impl Into<String>) -> Self {
        Self {
            machine: machine.into(),
            version_reference: version_reference.into(),
            make_current: false,
        }
    }

    pub fn make_current(mut self) -> Self {
        self.make_current = true;
        self
    }
}

/// Phase-1 response of the publish protocol. Consumed immediately by the
/// upload phase; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionCreationTicket {
    pub machine_version_id: String,
    pub upload_url: String,
    #[serde(default)]
    pub upload_fields: HashMap<String, String>,
}

/// Identifying metadata of a successfully published version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedVersion {
    pub machine: String,
    pub machine_version_id: String,
    pub version_reference: String,
    pub current: bool,
}
