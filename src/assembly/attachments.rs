//! Deciding, per attachment, whether it is inlined into the body as a
//! `data:` URI, attached standalone, or left to a nested message.

use std::collections::HashSet;

use base64::Engine;
use tracing::{debug, warn};

use crate::error::{ConvertError, Result};
use crate::model::attachment::{Attachment, ResolvedAttachment};
use crate::model::email::ParsedEmail;
use crate::parser::eml::EmailDecoder;
use crate::parser::LENIENT_BASE64;

/// Filename given to attached messages whose own name has no extension.
pub const MAIL_ATTACHMENT_FILENAME: &str = "Mail Attachment.eml";

/// Stem used when the decoder delivered no filename at all.
const UNNAMED_STEM: &str = "attachment";

/// Outcome of resolving a message's attachments against its body.
#[derive(Debug, Clone, Default)]
pub struct AttachmentResolution {
    /// Standalone attachments, in message order.
    pub attachments: Vec<ResolvedAttachment>,
    /// Display filenames of `attachments`, same order.
    pub filenames: Vec<String>,
    /// The body with every matched `cid:` reference replaced.
    pub body: String,
    /// Number of attachments substituted into the body.
    pub inlined: usize,
    /// Number of attachments dropped because a nested message owns them.
    pub nested: usize,
    /// Number of attachments skipped for missing headers or payload.
    pub skipped: usize,
}

/// Resolve the attachments of `email` against `body`.
///
/// Nested `message/rfc822` attachments are re-decoded through `decoder`
/// (one level deep) only to learn which content-ids belong to them.
pub fn resolve_attachments(
    email: &ParsedEmail,
    decoder: &dyn EmailDecoder,
    body: String,
) -> Result<AttachmentResolution> {
    let nested_ids = nested_content_ids(&email.attachments, decoder)?;
    let mut out = AttachmentResolution {
        body,
        ..Default::default()
    };

    for (idx, attachment) in email.attachments.iter().enumerate() {
        let (Some(header), Some(raw)) = (&attachment.content_header, &attachment.raw) else {
            warn!(index = idx, "Skipping attachment without content header or payload");
            out.skipped += 1;
            continue;
        };
        let full_type = header.content_type().unwrap_or_default();

        if let Some(cid) = header.content_id() {
            if nested_ids.contains(cid) {
                debug!(index = idx, content_id = cid, "Attachment belongs to a nested message");
                out.nested += 1;
                continue;
            }
            if inline_into(&mut out.body, cid, full_type, raw) {
                debug!(index = idx, content_id = cid, "Inlined attachment");
                out.inlined += 1;
                continue;
            }
        }

        let data = LENIENT_BASE64
            .decode(raw)
            .map_err(|e| ConvertError::base64(format!("attachment #{idx}"), e))?;
        let filename = complete_filename(attachment.filename.as_deref(), full_type);
        debug!(index = idx, filename = %filename, size = data.len(), "Standalone attachment");
        out.filenames.push(filename.clone());
        out.attachments.push(ResolvedAttachment { filename, data });
    }

    Ok(out)
}

/// Content-ids of every attachment inside the message's attached messages.
///
/// Only direct children are scanned; messages nested deeper are not.
fn nested_content_ids(
    attachments: &[Attachment],
    decoder: &dyn EmailDecoder,
) -> Result<HashSet<String>> {
    let mut ids = HashSet::new();

    for (idx, attachment) in attachments.iter().enumerate() {
        let Some(header) = &attachment.content_header else {
            continue;
        };
        let Some(raw) = attachment.raw.as_deref().filter(|_| header.is_message()) else {
            continue;
        };

        let bytes = LENIENT_BASE64
            .decode(raw)
            .map_err(|e| ConvertError::base64(format!("nested message #{idx}"), e))?;
        let nested = decoder.decode(&bytes)?;
        for inner in &nested.attachments {
            if let Some(inner_header) = &inner.content_header {
                ids.extend(inner_header.content_id.iter().cloned());
            }
        }
    }

    if !ids.is_empty() {
        debug!(count = ids.len(), "Collected nested content-ids");
    }
    Ok(ids)
}

/// Replace every `cid:<id>` in `body` with a `data:` URI built from the
/// attachment. Returns `false` (leaving `body` untouched) when the body
/// never references the id or the content type is empty.
fn inline_into(body: &mut String, content_id: &str, content_type: &str, payload: &str) -> bool {
    let id = strip_angle_brackets(content_id);
    let media_type = media_type(content_type);
    if id.is_empty() || media_type.is_empty() {
        return false;
    }

    let token = format!("cid:{id}");
    if !body.contains(&token) {
        return false;
    }
    *body = body.replace(&token, &format!("data:{media_type};base64,{payload}"));
    true
}

/// `<abc@host>` → `abc@host`; values without brackets pass through.
fn strip_angle_brackets(content_id: &str) -> &str {
    let trimmed = content_id.trim();
    trimmed
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(trimmed)
}

/// The media type without parameters: `image/png; name="x"` → `image/png`.
fn media_type(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or_default().trim()
}

/// Give extensionless filenames an extension inferred from the content type.
///
/// Attached messages become [`MAIL_ATTACHMENT_FILENAME`]; `image/<subtype>`
/// gets `.<subtype>` appended. Other types keep their name as is.
pub fn complete_filename(filename: Option<&str>, content_type: &str) -> String {
    let name = filename
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(UNNAMED_STEM);
    if name.contains('.') {
        return name.to_string();
    }

    let media_type = media_type(content_type).to_ascii_lowercase();
    if media_type.starts_with("message/rfc822") {
        return MAIL_ATTACHMENT_FILENAME.to_string();
    }
    match media_type.strip_prefix("image/") {
        Some(subtype) if !subtype.is_empty() => format!("{name}.{subtype}"),
        _ => name.to_string(),
    }
}
