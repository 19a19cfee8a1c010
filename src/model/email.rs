//! The decoded email handed to the assembly pipeline.
//!
//! Everything here is produced by an [`EmailDecoder`](crate::parser::eml::EmailDecoder)
//! and is read-only to the pipeline.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attachment::Attachment;

/// A fully decoded message: headers, body parts and attachments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedEmail {
    /// Decoded header fields.
    pub header: EmailHeader,
    /// Body parts in message order.
    pub bodies: Vec<BodyPart>,
    /// Attachments in message order.
    pub attachments: Vec<Attachment>,
}

/// Decoded header fields of a message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailHeader {
    /// Bare sender address (no display name).
    pub from: String,
    /// Subject with RFC 2047 encoded-words resolved.
    pub subject: String,
    /// Bare `To:` addresses.
    pub to: Vec<String>,
    /// Bare `Cc:` addresses.
    pub cc: Vec<String>,
    /// The message's own `Date:`.
    pub date: Option<DateTime<Utc>>,
    /// One entry per `Received:` hop, topmost (most recent) first.
    pub received: Vec<Received>,
    /// Raw header values, keeping display names the decoded fields drop.
    pub header: Option<RawHeaders>,
}

/// A single `Received:` hop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Received {
    /// The full unfolded header value.
    pub src: String,
    /// Timestamp after the final `;`, if it parsed.
    pub date: Option<DateTime<Utc>>,
}

/// Raw header values keyed by lower-cased field name.
///
/// Values are unfolded and RFC 2047 decoded but otherwise untouched, so
/// `"Jane Doe <jane@example.com>"` keeps its display name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawHeaders(BTreeMap<String, Vec<String>>);

impl RawHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value for `name` (case-insensitive).
    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        self.0
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// All values recorded for `name`.
    pub fn get(&self, name: &str) -> &[String] {
        self.0
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The first value recorded for `name`, if any.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name).first().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (k, v) in iter {
            let name: String = k.into();
            headers.push(&name, v);
        }
        headers
    }
}

/// One textual body part.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BodyPart {
    /// Media type such as `text/html`; `None` when the part declared none.
    pub content_type: Option<String>,
    /// Decoded text content.
    pub content: String,
}

impl BodyPart {
    pub fn typed(content_type: &str, content: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.to_string()),
            content: content.into(),
        }
    }

    pub fn untyped(content: impl Into<String>) -> Self {
        Self {
            content_type: None,
            content: content.into(),
        }
    }

    /// Whether this part is of `media_type`, ignoring case and parameters.
    pub fn is(&self, media_type: &str) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.split(';').next().unwrap_or("").trim())
            .is_some_and(|ct| ct.eq_ignore_ascii_case(media_type))
    }
}
