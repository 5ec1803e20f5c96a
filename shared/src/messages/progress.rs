//! Server-pushed processing progress events

use serde::{Deserialize, Serialize};

/// One `data:` payload of a progress stream
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProgressEvent {
    #[serde(default)]
    pub percentage: f64,
    #[serde(default)]
    pub status: ProgressStatus,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Status carried by a progress event. Anything the client does not
/// recognize is treated as still processing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ProgressStatus {
    #[default]
    Processing,
    Finished,
    Error,
    Other(String),
}

impl ProgressStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressStatus::Finished | ProgressStatus::Error)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProgressStatus::Processing => "processing",
            ProgressStatus::Finished => "finished",
            ProgressStatus::Error => "error",
            ProgressStatus::Other(status) => status,
        }
    }
}

impl From<&str> for ProgressStatus {
    fn from(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "processing" | "progress" | "running" => ProgressStatus::Processing,
            "finished" | "complete" | "completed" | "done" => ProgressStatus::Finished,
            "error" | "failed" => ProgressStatus::Error,
            _ => ProgressStatus::Other(status.to_string()),
        }
    }
}

impl Serialize for ProgressStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProgressStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ProgressStatus::from(raw.as_str()))
    }
}

impl ProgressEvent {
    pub fn processing(percentage: f64) -> Self {
        Self { percentage, status: ProgressStatus::Processing, metadata: None, message: None }
    }

    pub fn finished(metadata: Option<serde_json::Value>) -> Self {
        Self { percentage: 100.0, status: ProgressStatus::Finished, metadata, message: None }
    }
}
