//! Feed protocols: decoding each feed's frames into normalized events
//!
//! Pure logic with no I/O dependencies

use shared::{ChatFrame, DashboardFrame, FeedMessage, FeedName, MessageOrigin, SharedResult};

use crate::traits::FeedProtocol;

/// Inbound event after feed-specific decoding
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Message(FeedMessage),
    History(Vec<FeedMessage>),
    Chunk { content: String, message_id: Option<String> },
    Complete(Option<FeedMessage>),
    Status(String),
    Error(String),
}

/// Listener chat feed, optionally scoped to a session
#[derive(Debug, Clone)]
pub struct ChatProtocol {
    feed: FeedName,
    session: Option<String>,
}

impl ChatProtocol {
    pub fn new(session: Option<String>) -> Self {
        Self { feed: FeedName::chat(), session }
    }
}

impl FeedProtocol for ChatProtocol {
    fn feed(&self) -> &FeedName {
        &self.feed
    }

    fn sub_resource(&self) -> Option<&str> {
        self.session.as_deref()
    }

    fn decode(&self, text: &str) -> SharedResult<FeedEvent> {
        let event = match serde_json::from_str::<ChatFrame>(text)? {
            ChatFrame::Message { message } => FeedEvent::Message(message),
            ChatFrame::History { messages } => FeedEvent::History(messages),
            ChatFrame::Chunk { content, message_id } => FeedEvent::Chunk { content, message_id },
            ChatFrame::MessageComplete { message } => FeedEvent::Complete(message),
            ChatFrame::ProcessingStatus { status } => FeedEvent::Status(status),
            ChatFrame::Error { message } => FeedEvent::Error(message),
        };
        Ok(event)
    }
}

/// Broadcaster dashboard feed: one global socket, or one per station
#[derive(Debug, Clone)]
pub struct DashboardProtocol {
    feed: FeedName,
    station: Option<String>,
}

impl DashboardProtocol {
    pub fn new(station: Option<String>) -> Self {
        Self { feed: FeedName::dashboard(), station }
    }
}

impl FeedProtocol for DashboardProtocol {
    fn feed(&self) -> &FeedName {
        &self.feed
    }

    fn sub_resource(&self) -> Option<&str> {
        self.station.as_deref()
    }

    fn decode(&self, text: &str) -> SharedResult<FeedEvent> {
        let event = match serde_json::from_str::<DashboardFrame>(text)? {
            DashboardFrame::StationUpdate { station_id, data } => {
                // Ids stay unique per update; the station is kept as prefix
                let message = FeedMessage::new(MessageOrigin::Station, data.to_string());
                let id = format!("{station_id}:{}", message.id);
                FeedEvent::Message(message.with_id(id))
            }
            DashboardFrame::GlobalUpdate { data } => {
                FeedEvent::Message(FeedMessage::new(MessageOrigin::Global, data.to_string()))
            }
            DashboardFrame::History { messages } => FeedEvent::History(messages),
            DashboardFrame::Error { message } => FeedEvent::Error(message),
        };
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::SharedError;

    #[test]
    fn test_chat_decoding() {
        let chat = ChatProtocol::new(None);
        assert_eq!(
            chat.decode(r#"{"type":"processing_status","status":"thinking"}"#).unwrap(),
            FeedEvent::Status("thinking".to_string())
        );
        assert_eq!(
            chat.decode(r#"{"type":"message_complete"}"#).unwrap(),
            FeedEvent::Complete(None)
        );
        assert_eq!(chat.feed().as_str(), "chat");
        assert_eq!(chat.sub_resource(), None);
    }

    #[test]
    fn test_malformed_payloads_are_decode_errors() {
        let chat = ChatProtocol::new(Some("s1".to_string()));
        assert!(matches!(chat.decode("not json"), Err(SharedError::DeserializationError { .. })));
        assert!(matches!(chat.decode(r#"{"type":"unknown"}"#), Err(SharedError::DeserializationError { .. })));
        assert!(matches!(chat.decode(r#"{"type":"chunk"}"#), Err(SharedError::DeserializationError { .. })));
    }

    #[test]
    fn test_dashboard_station_update() {
        let dashboard = DashboardProtocol::new(Some("kx-101".to_string()));
        let raw = r#"{"type":"station_update","station_id":"kx-101","data":{"listeners":42}}"#;

        match dashboard.decode(raw).unwrap() {
            FeedEvent::Message(message) => {
                assert!(message.id.starts_with("kx-101:"));
                assert_eq!(message.origin, MessageOrigin::Station);
                assert_eq!(message.content, r#"{"listeners":42}"#);
            }
            other => panic!("Wrong event: {other:?}"),
        }
        assert_eq!(dashboard.sub_resource(), Some("kx-101"));
    }

    #[test]
    fn test_dashboard_global_update_and_error() {
        let dashboard = DashboardProtocol::new(None);
        match dashboard.decode(r#"{"type":"global_update","data":"maintenance at 2am"}"#).unwrap() {
            FeedEvent::Message(message) => assert_eq!(message.origin, MessageOrigin::Global),
            other => panic!("Wrong event: {other:?}"),
        }
        assert_eq!(
            dashboard.decode(r#"{"type":"error","message":"forbidden station"}"#).unwrap(),
            FeedEvent::Error("forbidden station".to_string())
        );
    }
}
