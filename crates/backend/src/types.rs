use serde::{Deserialize, Serialize};

/// Phase-3 payload attaching metadata to an already-uploaded version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeVersionRequest {
    pub version_reference: String,
    pub make_current: bool,
}
