//! Client → backend actions
//!
//! Outbound frames are JSON objects discriminated by an `action` field.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    SendMessage { content: String },
    GetHistory { limit: u32 },
}

impl ClientAction {
    pub fn to_json(&self) -> crate::SharedResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_format() {
        let send = ClientAction::SendMessage { content: "hello".to_string() };
        assert_eq!(send.to_json().unwrap(), r#"{"action":"send_message","content":"hello"}"#);

        let history = ClientAction::GetHistory { limit: 50 };
        assert_eq!(history.to_json().unwrap(), r#"{"action":"get_history","limit":50}"#);
    }
}
