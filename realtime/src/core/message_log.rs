//! Durable message list plus the single in-flight streaming message
//!
//! Pure business logic with no I/O dependencies

use std::collections::VecDeque;

use shared::{FeedMessage, MessageOrigin};

use crate::core::feed::FeedEvent;

/// A streamed message still being assembled from chunks
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMessage {
    pub id: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct MessageLog {
    messages: VecDeque<FeedMessage>,
    pending: Option<PendingMessage>,
    processing_status: Option<String>,
    max_messages: usize,
}

impl MessageLog {
    pub fn new(max_messages: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            pending: None,
            processing_status: None,
            max_messages: max_messages.max(1),
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = &FeedMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn pending(&self) -> Option<&PendingMessage> {
        self.pending.as_ref()
    }

    pub fn processing_status(&self) -> Option<&str> {
        self.processing_status.as_deref()
    }

    /// Apply an inbound event. Returns the feed error text for `Error` events.
    pub fn apply(&mut self, event: FeedEvent) -> Option<String> {
        match event {
            FeedEvent::Message(message) => self.push(message),
            FeedEvent::History(messages) => {
                self.messages.clear();
                for message in messages {
                    self.push(message);
                }
            }
            FeedEvent::Chunk { content, message_id } => {
                let pending = self.pending.get_or_insert_with(|| PendingMessage { id: None, content: String::new() });
                if pending.id.is_none() {
                    pending.id = message_id;
                }
                pending.content.push_str(&content);
            }
            FeedEvent::Complete(message) => self.finish_streaming(message),
            FeedEvent::Status(status) => self.processing_status = Some(status),
            FeedEvent::Error(error) => {
                self.pending = None;
                self.processing_status = None;
                return Some(error);
            }
        }
        None
    }

    /// Drop the in-flight streaming message without flushing it
    pub fn abort_streaming(&mut self) {
        self.pending = None;
        self.processing_status = None;
    }

    fn finish_streaming(&mut self, message: Option<FeedMessage>) {
        let pending = self.pending.take();
        self.processing_status = None;

        let finished = match (message, pending) {
            (Some(mut message), _) => {
                message.is_chunk = false;
                Some(message)
            }
            (None, Some(pending)) if !pending.content.is_empty() => {
                let message = FeedMessage::new(MessageOrigin::Bot, pending.content);
                Some(match pending.id {
                    Some(id) => message.with_id(id),
                    None => message,
                })
            }
            (None, _) => None,
        };

        if let Some(message) = finished {
            self.push(message);
        }
    }

    fn push(&mut self, message: FeedMessage) {
        self.messages.push_back(message);
        while self.messages.len() > self.max_messages {
            self.messages.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str) -> FeedEvent {
        FeedEvent::Chunk { content: content.to_string(), message_id: Some("r1".to_string()) }
    }

    #[test]
    fn test_chunks_stay_pending_until_complete() {
        let mut log = MessageLog::new(10);
        log.apply(chunk("Now "));
        log.apply(chunk("playing"));

        assert!(log.is_empty());
        assert_eq!(log.pending().unwrap().content, "Now playing");

        log.apply(FeedEvent::Complete(None));
        assert!(log.pending().is_none());
        let flushed: Vec<_> = log.messages().collect();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].id, "r1");
        assert_eq!(flushed[0].content, "Now playing");
        assert_eq!(flushed[0].origin, MessageOrigin::Bot);
    }

    #[test]
    fn test_complete_with_message_is_authoritative() {
        let mut log = MessageLog::new(10);
        log.apply(chunk("partial"));
        let mut final_message = FeedMessage::new(MessageOrigin::Bot, "full answer").with_id("r1");
        final_message.is_chunk = true;
        log.apply(FeedEvent::Complete(Some(final_message)));

        let messages: Vec<_> = log.messages().collect();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "full answer");
        assert!(!messages[0].is_chunk);
    }

    #[test]
    fn test_error_clears_streaming_without_flush() {
        let mut log = MessageLog::new(10);
        log.apply(FeedEvent::Status("generating".to_string()));
        log.apply(chunk("half an ans"));

        let error = log.apply(FeedEvent::Error("model unavailable".to_string()));
        assert_eq!(error.as_deref(), Some("model unavailable"));
        assert!(log.pending().is_none());
        assert!(log.processing_status().is_none());
        assert!(log.is_empty());

        // Completion after an error has nothing to flush
        log.apply(FeedEvent::Complete(None));
        assert!(log.is_empty());
    }

    #[test]
    fn test_history_replaces_and_cap_evicts_oldest() {
        let mut log = MessageLog::new(3);
        log.apply(FeedEvent::Message(FeedMessage::new(MessageOrigin::User, "old")));

        let history = (0..5)
            .map(|n| FeedMessage::new(MessageOrigin::User, format!("m{n}")))
            .collect();
        log.apply(FeedEvent::History(history));

        let contents: Vec<_> = log.messages().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn test_messages_do_not_disturb_pending_stream() {
        let mut log = MessageLog::new(10);
        log.apply(chunk("streaming"));
        log.apply(FeedEvent::Message(FeedMessage::new(MessageOrigin::User, "interjection")));

        assert_eq!(log.len(), 1);
        assert_eq!(log.pending().unwrap().content, "streaming");
    }
}
