// Diagnostics snapshot of the bridge components.

use serde::{Deserialize, Serialize};

/// Detailed component initialization state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentState {
    pub status: InitStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InitStatus {
    Ok,
    Missing,
}

impl ComponentState {
    pub fn ok(detail: String) -> Self {
        Self {
            status: InitStatus::Ok,
            detail: Some(detail),
        }
    }

    pub fn missing(error: String) -> Self {
        Self {
            status: InitStatus::Missing,
            detail: Some(error),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == InitStatus::Ok
    }
}

/// Startup status logged for troubleshooting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeStatus {
    pub version: String,
    pub pipe: String,
    pub speech_engine: ComponentState,
    pub screen_reader_running: bool,
}

impl BridgeStatus {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
