//! Envelope types for inbound callbacks and outbound replies.

use crate::util::clock::unix_now;

/// `MsgType` value for plain text messages.
pub const MSG_TYPE_TEXT: &str = "text";

// =============================================================================
// Inbound Message
// =============================================================================

/// Decoded inbound callback.
///
/// Fields keep document order. Keys are the literal tag names of the root's
/// children; values are their text content, or an empty string for empty
/// elements. A repeated tag overwrites the earlier value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundMessage {
    fields: Vec<(String, String)>,
}

impl InboundMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value for the same tag.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Raw value for a tag, if the tag was present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Value for a tag, or an empty string when absent.
    pub fn field(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    pub fn msg_type(&self) -> &str {
        self.field("MsgType")
    }

    /// Sender openid.
    pub fn from_user_name(&self) -> &str {
        self.field("FromUserName")
    }

    /// Official account id the message was sent to.
    pub fn to_user_name(&self) -> &str {
        self.field("ToUserName")
    }

    pub fn content(&self) -> &str {
        self.field("Content")
    }

    /// Message id; `None` when absent or empty (events carry none).
    pub fn msg_id(&self) -> Option<&str> {
        self.get("MsgId").filter(|id| !id.is_empty())
    }

    pub fn is_text(&self) -> bool {
        self.msg_type() == MSG_TYPE_TEXT
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// =============================================================================
// Outbound Reply
// =============================================================================

/// Passive text reply returned in the callback response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub to_user_name: String,
    pub from_user_name: String,
    /// Unix seconds
    pub create_time: u64,
    pub content: String,
}

impl OutboundReply {
    /// Create a text reply stamped with the current time.
    pub fn new(to_user_name: impl Into<String>, from_user_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            to_user_name: to_user_name.into(),
            from_user_name: from_user_name.into(),
            create_time: unix_now(),
            content: content.into(),
        }
    }

    /// Create a reply to `message`, swapping sender and recipient.
    pub fn reply_to(message: &InboundMessage, content: impl Into<String>) -> Self {
        Self::new(message.from_user_name(), message.to_user_name(), content)
    }

    pub fn with_create_time(mut self, create_time: u64) -> Self {
        self.create_time = create_time;
        self
    }

    /// Render the reply document.
    ///
    /// Text fields go verbatim into CDATA sections. A value containing `]]>`
    /// ends its section early and yields malformed XML; WeChat sees exactly
    /// the bytes written here, so no escaping is attempted.
    pub fn to_xml(&self) -> String {
        format!(
            "<xml>\n\
             <ToUserName><![CDATA[{}]]></ToUserName>\n\
             <FromUserName><![CDATA[{}]]></FromUserName>\n\
             <CreateTime>{}</CreateTime>\n\
             <MsgType><![CDATA[{}]]></MsgType>\n\
             <Content><![CDATA[{}]]></Content>\n\
             </xml>",
            self.to_user_name, self.from_user_name, self.create_time, MSG_TYPE_TEXT, self.content
        )
    }
}
