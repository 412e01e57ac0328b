//! Message format sent to the backend service.

use serde::{Deserialize, Serialize};

use crate::envelope::{InboundMessage, MSG_TYPE_TEXT};
use crate::util::clock::unix_now;

/// JSON body posted to the backend for each inbound text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardPayload {
    /// Sender openid, used by the backend to push the answer later
    pub openid: String,
    /// Trimmed message body
    pub text: String,
    /// Message kind tag
    pub msg_type: String,
    /// Unix seconds at forward time
    pub ts: u64,
    /// Platform message id, `null` when absent
    pub msg_id: Option<String>,
}

impl ForwardPayload {
    /// Build the payload for an inbound text message.
    pub fn from_text_message(message: &InboundMessage) -> Self {
        Self {
            openid: message.from_user_name().to_string(),
            text: message.content().trim().to_string(),
            msg_type: MSG_TYPE_TEXT.to_string(),
            ts: unix_now(),
            msg_id: message.msg_id().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_message() {
        let mut msg = InboundMessage::new();
        msg.insert("FromUserName", "oUser42");
        msg.insert("MsgType", "text");
        msg.insert("Content", "  hello there \n");
        msg.insert("MsgId", "1234567890");

        let payload = ForwardPayload::from_text_message(&msg);

        assert_eq!(payload.openid, "oUser42");
        assert_eq!(payload.text, "hello there");
        assert_eq!(payload.msg_type, "text");
        assert_eq!(payload.msg_id.as_deref(), Some("1234567890"));
        assert!(payload.ts > 0);
    }

    #[test]
    fn test_serialization_shape() {
        let payload = ForwardPayload {
            openid: "oUser42".to_string(),
            text: "hi".to_string(),
            msg_type: "text".to_string(),
            ts: 1700000000,
            msg_id: None,
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "openid": "oUser42",
                "text": "hi",
                "msg_type": "text",
                "ts": 1700000000,
                "msg_id": null
            })
        );
    }
}
