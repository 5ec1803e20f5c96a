//! Frame fixtures for realtime integration tests

use realtime::ClientConfig;
use serde_json::json;

pub fn quiet_config() -> ClientConfig {
    ClientConfig { request_history_on_open: false, ..ClientConfig::default() }
}

pub fn chat_message(id: &str, origin: &str, content: &str) -> String {
    json!({
        "type": "message",
        "message": { "id": id, "origin": origin, "content": content }
    })
    .to_string()
}

pub fn chunk(content: &str, message_id: Option<&str>) -> String {
    json!({ "type": "chunk", "content": content, "message_id": message_id }).to_string()
}

pub fn complete() -> String {
    json!({ "type": "message_complete" }).to_string()
}

pub fn feed_error(message: &str) -> String {
    json!({ "type": "error", "message": message }).to_string()
}

pub fn history(contents: &[&str]) -> String {
    let messages: Vec<_> = contents
        .iter()
        .enumerate()
        .map(|(i, content)| json!({ "id": format!("h{i}"), "sender": "user", "content": content }))
        .collect();
    json!({ "type": "history", "messages": messages }).to_string()
}
