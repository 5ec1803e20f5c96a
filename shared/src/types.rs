//! Core shared types and identifiers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::{SharedError, SharedResult};

/// Name of a real-time feed, used as the path segment under `/api/ws/`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedName(String);

impl FeedName {
    pub const CHAT: &'static str = "chat";
    pub const DASHBOARD: &'static str = "dashboard";

    /// Validate and wrap a feed name. Only URL-safe path characters are accepted.
    pub fn new(name: &str) -> SharedResult<Self> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(SharedError::InvalidFeedName { input: name.to_string() });
        }
        Ok(Self(name.to_string()))
    }

    pub fn chat() -> Self {
        Self(Self::CHAT.to_string())
    }

    pub fn dashboard() -> Self {
        Self(Self::DASHBOARD.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who a feed message came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageOrigin {
    User,
    Bot,
    System,
    /// Dashboard update scoped to a single station
    Station,
    /// Dashboard update that applies to every station
    Global,
}

impl fmt::Display for MessageOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageOrigin::User => write!(f, "user"),
            MessageOrigin::Bot => write!(f, "bot"),
            MessageOrigin::System => write!(f, "system"),
            MessageOrigin::Station => write!(f, "station"),
            MessageOrigin::Global => write!(f, "global"),
        }
    }
}

/// A unit of chat or dashboard payload
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedMessage {
    pub id: String,
    #[serde(alias = "sender")]
    pub origin: MessageOrigin,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Set while the message is still being assembled from streamed chunks
    #[serde(default)]
    pub is_chunk: bool,
}

impl FeedMessage {
    /// Build a message locally, with a fresh identifier and the current time
    pub fn new(origin: MessageOrigin, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            origin,
            content: content.into(),
            timestamp: Utc::now(),
            is_chunk: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}
