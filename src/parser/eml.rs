//! Decoding `.eml` files (bare RFC 5322 messages) into [`ParsedEmail`].

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders};

use crate::error::{ConvertError, Result};
use crate::model::attachment::{Attachment, ContentHeader};
use crate::model::email::{BodyPart, EmailHeader, ParsedEmail};
use crate::parser::header;

/// Anything that can turn raw message bytes into a [`ParsedEmail`].
///
/// The attachment resolver re-decodes nested `message/rfc822` attachments
/// through this trait.
pub trait EmailDecoder {
    fn decode(&self, raw: &[u8]) -> Result<ParsedEmail>;
}

/// [`EmailDecoder`] backed by `mail-parser` for both MIME structure and
/// header fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct MailDecoder;

impl EmailDecoder for MailDecoder {
    fn decode(&self, raw: &[u8]) -> Result<ParsedEmail> {
        let message_bytes = skip_bom(raw);
        let parser = MessageParser::default();
        let msg = parser
            .parse(message_bytes)
            .ok_or_else(|| ConvertError::Decode("no RFC 5322 header block found".into()))?;

        Ok(ParsedEmail {
            header: build_header(&msg, message_bytes),
            bodies: collect_bodies(&msg),
            attachments: collect_attachments(&msg, message_bytes),
        })
    }
}

/// Read a single `.eml` file.
pub fn read_eml(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConvertError::FileNotFound(path.to_path_buf())
        } else {
            ConvertError::io(path, e)
        }
    })
}

fn build_header(msg: &Message<'_>, message_bytes: &[u8]) -> EmailHeader {
    let headers = msg.headers();
    EmailHeader {
        from: header::bare_addresses(msg.from())
            .into_iter()
            .next()
            .unwrap_or_default(),
        subject: msg.subject().unwrap_or_default().to_string(),
        to: header::bare_addresses(msg.to()),
        cc: header::bare_addresses(msg.cc()),
        date: msg.date().and_then(header::to_utc),
        received: headers
            .iter()
            .filter(|h| h.name.as_str().eq_ignore_ascii_case("received"))
            .map(|h| header::received_hop(message_bytes, h))
            .collect(),
        header: Some(header::raw_header_map(message_bytes, headers)),
    }
}

/// Text and HTML body parts, in the order they appear in the message.
fn collect_bodies(msg: &Message<'_>) -> Vec<BodyPart> {
    let mut parts: Vec<&MessagePart<'_>> = msg
        .text_bodies()
        .chain(msg.html_bodies())
        .filter(|part| part.is_text())
        .collect();
    parts.sort_by_key(|part| part.raw_header_offset());
    parts.dedup_by_key(|part| part.raw_header_offset());

    parts
        .into_iter()
        .map(|part| BodyPart {
            content_type: part.content_type().map(media_type),
            content: part
                .text_contents()
                .map(String::from)
                .unwrap_or_else(|| String::from_utf8_lossy(part.contents()).into_owned()),
        })
        .collect()
}

fn collect_attachments(msg: &Message<'_>, message_bytes: &[u8]) -> Vec<Attachment> {
    msg.attachments()
        .map(|part| {
            let values = |name: &str| -> Vec<String> {
                part.headers
                    .iter()
                    .filter(|h| h.name.as_str().eq_ignore_ascii_case(name))
                    .map(|h| header::raw_value(message_bytes, h))
                    .collect()
            };

            let mut content_type = values("content-type");
            if content_type.is_empty() {
                content_type.push(
                    part.content_type()
                        .map(media_type)
                        .unwrap_or_else(|| "application/octet-stream".to_string()),
                );
            }

            Attachment {
                content_header: Some(ContentHeader {
                    content_type,
                    content_id: values("content-id"),
                }),
                raw: Some(STANDARD.encode(part.contents())),
                filename: part.attachment_name().map(String::from),
            }
        })
        .collect()
}

fn media_type(ct: &mail_parser::ContentType<'_>) -> String {
    match ct.subtype() {
        Some(sub) => format!("{}/{}", ct.ctype(), sub).to_ascii_lowercase(),
        None => ct.ctype().to_ascii_lowercase(),
    }
}

fn skip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELATED: &str = "From: Alice Example <alice@example.com>\r\n\
To: Bob <bob@example.com>, carol@example.com\r\n\
Subject: =?UTF-8?Q?Caf=C3=A9?=\r\n\
Date: Thu, 04 Jan 2024 10:00:00 +0000\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/related; boundary=\"XYZ\"\r\n\
\r\n\
--XYZ\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<p>Hi <img src=\"cid:img1\"></p>\r\n\
--XYZ\r\n\
Content-Type: image/png; name=\"dot.png\"\r\n\
Content-ID: <img1>\r\n\
Content-Transfer-Encoding: base64\r\n\
Content-Disposition: inline; filename=\"dot.png\"\r\n\
\r\n\
AAAA\r\n\
--XYZ--\r\n";

    #[test]
    fn test_decode_header_fields() {
        let email = MailDecoder.decode(RELATED.as_bytes()).unwrap();
        assert_eq!(email.header.from, "alice@example.com");
        assert_eq!(email.header.to, vec!["bob@example.com", "carol@example.com"]);
        assert!(email.header.cc.is_empty());
        assert_eq!(email.header.subject, "Café");
        assert!(email.header.date.is_some());
        let raw = email.header.header.as_ref().unwrap();
        assert_eq!(raw.first("from"), Some("Alice Example <alice@example.com>"));
        assert!(raw.get("bcc").is_empty());
    }

    #[test]
    fn test_decode_html_body() {
        let email = MailDecoder.decode(RELATED.as_bytes()).unwrap();
        let html: Vec<_> = email.bodies.iter().filter(|b| b.is("text/html")).collect();
        assert_eq!(html.len(), 1);
        assert!(html[0].content.contains("cid:img1"));
    }

    #[test]
    fn test_decode_inline_attachment_headers() {
        let email = MailDecoder.decode(RELATED.as_bytes()).unwrap();
        assert_eq!(email.attachments.len(), 1);
        let att = &email.attachments[0];
        let ch = att.content_header.as_ref().unwrap();
        assert_eq!(ch.content_id(), Some("<img1>"));
        assert!(ch.content_type().unwrap().starts_with("image/png"));
        assert_eq!(att.filename.as_deref(), Some("dot.png"));
        let decoded = STANDARD.decode(att.raw.as_ref().unwrap()).unwrap();
        assert_eq!(decoded, vec![0u8, 0, 0]);
    }

    #[test]
    fn test_decode_plain_message_without_content_type() {
        let raw = b"From: a@x.com\nTo: b@x.com\nSubject: Hi\n\nHello there\n";
        let email = MailDecoder.decode(raw).unwrap();
        assert_eq!(email.bodies.len(), 1);
        assert!(email.bodies[0].content_type.is_none());
        assert!(email.bodies[0].content.contains("Hello there"));
        assert!(email.attachments.is_empty());
    }

    #[test]
    fn test_decode_received_hops() {
        let raw = b"Received: from a by b; Fri, 05 Jan 2024 08:30:00 +0000\n\
Received: from c by d; Thu, 04 Jan 2024 10:00:00 +0000\n\
From: a@x.com\nSubject: Hi\n\nBody\n";
        let email = MailDecoder.decode(raw).unwrap();
        assert_eq!(email.header.received.len(), 2);
        let first = email.header.received[0].date.unwrap();
        assert_eq!(first.format("%Y-%m-%d").to_string(), "2024-01-05");
    }

    #[test]
    fn test_decode_encoded_display_name_with_comma() {
        let raw = b"From: =?UTF-8?Q?Smith,_Ann?= <ann@x.com>\r\n\
To: =?UTF-8?Q?Doe,_John?= <j@x.com>\r\n\
Cc: =?UTF-8?B?Um9lLCBKYW5l?= <jane@x.com>, bob@x.com\r\n\
Subject: s\r\n\r\nbody\r\n";
        let email = MailDecoder.decode(raw).unwrap();
        assert_eq!(email.header.from, "ann@x.com");
        assert_eq!(email.header.to, vec!["j@x.com"]);
        assert_eq!(email.header.cc, vec!["jane@x.com", "bob@x.com"]);
        let raw = email.header.header.as_ref().unwrap();
        assert_eq!(raw.first("cc"), Some("\"Roe, Jane\" <jane@x.com>, bob@x.com"));
    }

    #[test]
    fn test_read_eml_missing_file() {
        let err = read_eml("/definitely/not/here.eml").unwrap_err();
        assert!(matches!(err, ConvertError::FileNotFound(_)));
    }
}
