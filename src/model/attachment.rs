//! Attachments as delivered by the decoder, and as handed to the renderer.

use serde::{Deserialize, Serialize};

/// MIME headers of an attachment part.
///
/// Values are raw header text: `content_type` entries keep their parameters
/// (`image/png; name="x.png"`) and `content_id` entries keep their angle
/// brackets (`<img1>`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentHeader {
    #[serde(rename = "content-type")]
    pub content_type: Vec<String>,
    #[serde(rename = "content-id", default)]
    pub content_id: Vec<String>,
}

impl ContentHeader {
    /// The first `Content-Type` value, with parameters.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.first().map(String::as_str)
    }

    /// The first `Content-ID` value, with angle brackets.
    pub fn content_id(&self) -> Option<&str> {
        self.content_id.first().map(String::as_str)
    }

    /// Whether the attachment is itself a full message.
    pub fn is_message(&self) -> bool {
        self.content_type()
            .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("message/rfc822"))
    }
}

/// An attachment part of a decoded email.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attachment {
    /// MIME headers; `None` when the decoder could not recover them.
    pub content_header: Option<ContentHeader>,
    /// Base64 text of the decoded payload (not the raw wire bytes).
    pub raw: Option<String>,
    /// Filename from `Content-Disposition` / `Content-Type` parameters.
    pub filename: Option<String>,
}

/// A standalone attachment bound to the final document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttachment {
    /// Final filename, extension completed where it could be inferred.
    pub filename: String,
    /// Decoded binary payload.
    pub data: Vec<u8>,
}
