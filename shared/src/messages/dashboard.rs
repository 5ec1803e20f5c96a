//! Dashboard feed frames

use serde::{Deserialize, Serialize};
use crate::types::FeedMessage;

/// Frames pushed by the backend on a dashboard feed
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardFrame {
    StationUpdate {
        station_id: String,
        data: serde_json::Value,
    },
    GlobalUpdate {
        data: serde_json::Value,
    },
    History { messages: Vec<FeedMessage> },
    Error { message: String },
}
