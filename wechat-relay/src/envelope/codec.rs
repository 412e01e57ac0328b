//! XML codec for WeChat envelopes.
//!
//! Inbound documents are a single root (usually `<xml>`) holding flat child
//! elements. Values arrive either as CDATA or as escaped text.

use quick_xml::errors::{Error as XmlError, SyntaxError};
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use tracing::debug;

use super::types::{InboundMessage, OutboundReply};

/// Reasons an inbound body could not be decoded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// No root element at all (empty or whitespace-only body).
    #[error("envelope has no root element")]
    Empty,
    /// Input ended inside a tag, CDATA section or comment, or while
    /// elements were still open.
    #[error("envelope ended before the root element was closed")]
    Truncated,
    /// Not well-formed XML or not valid UTF-8.
    #[error("malformed envelope: {0}")]
    Malformed(String),
}

/// Decode a callback body into its field list.
///
/// Each direct child of the root contributes one entry. Required fields are
/// not checked here; absent tags are simply missing from the result.
pub fn decode(bytes: &[u8]) -> Result<InboundMessage, DecodeError> {
    let mut reader = Reader::from_reader(bytes);

    let mut message = InboundMessage::new();
    let mut depth: usize = 0;
    let mut seen_root = false;
    // Child currently being read: (tag, accumulated text)
    let mut current: Option<(String, String)> = None;

    loop {
        let event = reader.read_event().map_err(classify_xml_error)?;

        match event {
            Event::Start(e) => {
                match depth {
                    0 => open_root(&mut seen_root)?,
                    1 => current = Some((tag_name(e.name().as_ref())?, String::new())),
                    _ => {}
                }
                depth += 1;
            }
            Event::Empty(e) => match depth {
                0 => open_root(&mut seen_root)?,
                1 => message.insert(tag_name(e.name().as_ref())?, ""),
                _ => {}
            },
            Event::End(_) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| DecodeError::Malformed("unexpected closing tag".to_string()))?;
                if depth == 1 {
                    if let Some((name, value)) = current.take() {
                        message.insert(name, value);
                    }
                }
            }
            Event::Text(e) => {
                if depth == 0 && !e.iter().all(u8::is_ascii_whitespace) {
                    return Err(DecodeError::Malformed("text outside root element".to_string()));
                }
                if depth == 2 {
                    let text = e
                        .unescape()
                        .map_err(|err| DecodeError::Malformed(err.to_string()))?;
                    if let Some((_, value)) = current.as_mut() {
                        value.push_str(&text);
                    }
                }
            }
            Event::CData(e) => {
                if depth == 0 {
                    return Err(DecodeError::Malformed("CDATA outside root element".to_string()));
                }
                if depth == 2 {
                    let text = std::str::from_utf8(&e)
                        .map_err(|err| DecodeError::Malformed(err.to_string()))?;
                    if let Some((_, value)) = current.as_mut() {
                        value.push_str(text);
                    }
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if !seen_root {
        return Err(DecodeError::Empty);
    }
    if depth != 0 {
        return Err(DecodeError::Truncated);
    }

    debug!(field_count = message.len(), "envelope_decoded");

    Ok(message)
}

/// Encode a passive text reply stamped with the current time.
///
/// `to_user` is the recipient openid and `from_user` the official account,
/// i.e. already swapped relative to the inbound message.
pub fn encode(to_user: &str, from_user: &str, content: &str) -> String {
    OutboundReply::new(to_user, from_user, content).to_xml()
}

/// Every syntax error except bad `<!` markup is quick-xml hitting end of input.
fn classify_xml_error(error: XmlError) -> DecodeError {
    match error {
        XmlError::Syntax(SyntaxError::InvalidBangMarkup) => DecodeError::Malformed(error.to_string()),
        XmlError::Syntax(_) => DecodeError::Truncated,
        other => DecodeError::Malformed(other.to_string()),
    }
}

fn open_root(seen_root: &mut bool) -> Result<(), DecodeError> {
    if *seen_root {
        return Err(DecodeError::Malformed("multiple root elements".to_string()));
    }
    *seen_root = true;
    Ok(())
}

fn tag_name(raw: &[u8]) -> Result<String, DecodeError> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| DecodeError::Malformed(e.to_string()))
}
