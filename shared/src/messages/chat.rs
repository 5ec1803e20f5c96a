//! Chat feed frames
//!
//! Frames are JSON objects discriminated by a `type` field.

use serde::{Deserialize, Serialize};
use crate::types::FeedMessage;

/// Frames pushed by the backend on the chat feed
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatFrame {
    /// A complete message delivered in one piece
    Message { message: FeedMessage },
    /// Snapshot of recent messages, replaces the local list
    History { messages: Vec<FeedMessage> },
    /// Incremental content of a message that is still being generated
    Chunk {
        content: String,
        #[serde(default)]
        message_id: Option<String>,
    },
    /// End of a streamed message. May carry the final authoritative message.
    MessageComplete {
        #[serde(default)]
        message: Option<FeedMessage>,
    },
    ProcessingStatus { status: String },
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageOrigin;

    #[test]
    fn test_chunk_frame_without_id() {
        let frame: ChatFrame = serde_json::from_str(r#"{"type":"chunk","content":"Hel"}"#).unwrap();
        assert_eq!(frame, ChatFrame::Chunk { content: "Hel".to_string(), message_id: None });
    }

    #[test]
    fn test_message_frame() {
        let raw = r#"{"type":"message","message":{"id":"1","origin":"user","content":"hi"}}"#;
        match serde_json::from_str::<ChatFrame>(raw).unwrap() {
            ChatFrame::Message { message } => {
                assert_eq!(message.origin, MessageOrigin::User);
                assert_eq!(message.content, "hi");
            }
            other => panic!("Wrong frame: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(serde_json::from_str::<ChatFrame>(r#"{"type":"typing"}"#).is_err());
        assert!(serde_json::from_str::<ChatFrame>(r#"{"content":"no tag"}"#).is_err());
    }
}
