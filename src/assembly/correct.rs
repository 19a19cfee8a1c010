//! Fix-ups applied to the parsed HTML body before it reaches the renderer.
//!
//! Both passes take the tree by value and hand it back, so a caller can
//! compare the tree before and after a pass.

use kuchikiki::traits::*;
use kuchikiki::{ElementData, NodeDataRef, NodeRef};
use tracing::debug;

use super::style::without_inline_block_full_width;
use crate::error::{ConvertError, Result};

/// Counts of what the corrector changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Corrections {
    /// `id` attributes removed.
    pub ids_removed: usize,
    /// `name` attributes removed from anchors.
    pub anchor_names_removed: usize,
    /// Inline styles rewritten.
    pub styles_rewritten: usize,
}

/// Parse an HTML string into a document tree.
pub fn parse_document(html: &str) -> NodeRef {
    kuchikiki::parse_html().one(html)
}

/// Run both passes. Identifier stripping only happens when the document
/// will carry standalone attachments.
pub fn correct(document: NodeRef, has_attachments: bool) -> (NodeRef, Corrections) {
    let mut corrections = Corrections::default();

    let document = if has_attachments {
        let (document, ids, names) = strip_identifiers(document);
        corrections.ids_removed = ids;
        corrections.anchor_names_removed = names;
        document
    } else {
        document
    };
    let (document, rewritten) = fix_inline_block_full_width(document);
    corrections.styles_rewritten = rewritten;

    debug!(?corrections, "Corrected HTML tree");
    (document, corrections)
}

/// Remove `id` from every element and `name` from every anchor.
///
/// Fragment identifiers break attachment embedding in the renderer.
/// Returns the tree with the number of `id` and `name` attributes removed.
pub fn strip_identifiers(document: NodeRef) -> (NodeRef, usize, usize) {
    let mut ids = 0;
    let mut names = 0;

    for element in elements(&document) {
        let is_anchor = &*element.name.local == "a";
        let mut attributes = element.attributes.borrow_mut();
        if attributes.remove("id").is_some() {
            ids += 1;
        }
        if is_anchor && attributes.remove("name").is_some() {
            names += 1;
        }
    }

    (document, ids, names)
}

/// Drop `display: inline-block` from inline styles that also set
/// `width: 100%`; that pairing truncates content at page breaks.
/// Returns the tree with the number of styles rewritten.
pub fn fix_inline_block_full_width(document: NodeRef) -> (NodeRef, usize) {
    let mut rewritten = 0;

    for element in elements(&document) {
        let fixed = element
            .attributes
            .borrow()
            .get("style")
            .and_then(without_inline_block_full_width);
        if let Some(style) = fixed {
            element.attributes.borrow_mut().insert("style", style);
            rewritten += 1;
        }
    }

    (document, rewritten)
}

/// Every element of the tree, collected up front so passes can mutate freely.
fn elements(document: &NodeRef) -> Vec<NodeDataRef<ElementData>> {
    document.inclusive_descendants().elements().collect()
}

/// Serialize a tree back to HTML.
pub fn serialize(document: &NodeRef) -> Result<String> {
    let mut bytes = Vec::new();
    document
        .serialize(&mut bytes)
        .map_err(|e| ConvertError::Html(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ConvertError::Html(e.to_string()))
}
