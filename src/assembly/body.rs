//! Choosing the one body part that gets rendered.

use crate::model::email::BodyPart;

pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html";

/// Only this many leading body parts compete for the primary body. Emails
/// that carry another full email can list its typed bodies after these.
const CANDIDATE_PARTS: usize = 2;

/// The body chosen for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedBody {
    pub content: String,
    /// `false` means the content is plain text and must be escaped into a `<pre>` block.
    pub is_html: bool,
}

/// Pick the primary body from `bodies`.
///
/// Among the first two parts, the first `text/html` wins, then the first
/// `text/plain`. Without either, the leading untyped parts are concatenated
/// up to the first typed one.
pub fn select_body(bodies: &[BodyPart]) -> SelectedBody {
    let candidates = &bodies[..bodies.len().min(CANDIDATE_PARTS)];
    let first_of = |media_type: &str| candidates.iter().find(|b| b.is(media_type));

    if let Some(html) = first_of(TEXT_HTML) {
        return SelectedBody {
            content: html.content.clone(),
            is_html: true,
        };
    }
    if let Some(plain) = first_of(TEXT_PLAIN) {
        return SelectedBody {
            content: plain.content.clone(),
            is_html: false,
        };
    }

    let content = bodies
        .iter()
        .take_while(|b| b.content_type.is_none())
        .map(|b| b.content.as_str())
        .collect();
    SelectedBody {
        content,
        is_html: false,
    }
}
