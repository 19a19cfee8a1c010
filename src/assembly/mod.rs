//! Turning a [`ParsedEmail`] into a renderable HTML document.
//!
//! The steps run in a fixed order:
//!
//! 1. [`body::select_body`] picks the HTML or plain-text body.
//! 2. [`attachments::resolve_attachments`] inlines `cid:` references and
//!    collects the standalone attachments.
//! 3. [`header::HeaderFields`] derives the metadata block, which the
//!    [`header::HeaderTemplate`] renders.
//! 4. HTML bodies go through [`correct`] and [`compose::compose_html`];
//!    plain text is wrapped by [`compose::compose_plain_text`].

pub mod attachments;
pub mod body;
pub mod compose;
pub mod correct;
pub mod header;
pub mod style;

use tracing::{debug, info_span};

use crate::error::Result;
use crate::model::attachment::ResolvedAttachment;
use crate::model::email::ParsedEmail;
use crate::parser::eml::EmailDecoder;

use self::attachments::resolve_attachments;
use self::body::select_body;
use self::header::{HeaderFields, HeaderTemplate};

/// An assembled document, ready for a renderer.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// The complete HTML, header included.
    pub html: String,
    /// Attachments to embed alongside the HTML.
    pub attachments: Vec<ResolvedAttachment>,
    /// Whether the body came from an HTML part.
    pub is_html: bool,
    /// Attachments substituted into the body as `data:` URIs.
    pub inlined: usize,
}

/// Assemble `email` into a [`Document`].
///
/// `decoder` is only used for nested `message/rfc822` attachments.
pub fn assemble(
    email: &ParsedEmail,
    decoder: &dyn EmailDecoder,
    template: &HeaderTemplate,
) -> Result<Document> {
    let span = info_span!("assemble", subject = %email.header.subject);
    let _guard = span.enter();

    let selected = select_body(&email.bodies);
    debug!(is_html = selected.is_html, len = selected.content.len(), "Selected body");

    let resolution = resolve_attachments(email, decoder, selected.content)?;
    debug!(
        standalone = resolution.attachments.len(),
        inlined = resolution.inlined,
        nested = resolution.nested,
        skipped = resolution.skipped,
        "Resolved attachments"
    );

    let fields = HeaderFields::derive(email, &resolution.filenames);
    let header_html = template.render(&fields)?;

    let html = if selected.is_html {
        let has_attachments = !resolution.attachments.is_empty();
        let tree = correct::parse_document(&resolution.body);
        let (tree, _) = correct::correct(tree, has_attachments);
        compose::compose_html(tree, &header_html)?
    } else {
        compose::compose_plain_text(&resolution.body, &header_html)
    };

    Ok(Document {
        html,
        attachments: resolution.attachments,
        is_html: selected.is_html,
        inlined: resolution.inlined,
    })
}
