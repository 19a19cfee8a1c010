//! Joining the rendered header block with the message body.

use handlebars::html_escape;
use kuchikiki::traits::*;
use kuchikiki::NodeRef;
use tracing::debug;

use super::correct::{parse_document, serialize};
use crate::error::Result;

/// Elements whose children a browser never renders as flow content: void
/// and raw-text elements, form controls, embedded fallback containers and
/// foreign (SVG, MathML) roots. The header is never nested inside one of these.
const NO_FLOW_CONTENT: &[&str] = &[
    "area", "audio", "base", "br", "canvas", "col", "datalist", "embed", "hr", "iframe", "img",
    "input", "link", "math", "meta", "noscript", "object", "param", "picture", "script", "select",
    "source", "style", "svg", "template", "textarea", "title", "track", "video", "wbr",
];

/// Place `header_html` at the start of an HTML body.
///
/// The header's nodes become the first children of the body's first child
/// element, ahead of everything already there. When the body is missing or
/// has no child element able to hold content, the header is put in front of
/// the serialized document instead.
pub fn compose_html(document: NodeRef, header_html: &str) -> Result<String> {
    if insert_header(&document, header_html) {
        return serialize(&document);
    }
    debug!("No container element in body; prefixing header");
    Ok(format!("{header_html}{}", serialize(&document)?))
}

/// Place `header_html` above a plain-text body shown as preformatted text.
pub fn compose_plain_text(text: &str, header_html: &str) -> String {
    format!("{header_html}<pre>{}</pre>", html_escape(text))
}

fn insert_header(document: &NodeRef, header_html: &str) -> bool {
    let Ok(body) = document.select_first("body") else {
        return false;
    };
    let Some(target) = body.as_node().children().elements().next() else {
        return false;
    };
    if NO_FLOW_CONTENT.contains(&&*target.name.local) {
        return false;
    }

    let fragment = parse_document(header_html);
    let Ok(fragment_body) = fragment.select_first("body") else {
        return false;
    };
    let nodes: Vec<NodeRef> = fragment_body.as_node().children().collect();
    for node in nodes.into_iter().rev() {
        target.as_node().prepend(node);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"<div class="h">From: a</div>"#;

    #[test]
    fn test_header_goes_into_first_child_element() {
        let doc = parse_document("<div><p>one</p></div><p>two</p>");
        let html = compose_html(doc, HEADER).unwrap();
        assert!(
            html.contains(r#"<body><div><div class="h">From: a</div><p>one</p></div><p>two</p>"#),
            "{html}"
        );
    }

    #[test]
    fn test_leading_text_ends_up_after_header() {
        let doc = parse_document("hello <div>world</div>");
        let html = compose_html(doc, HEADER).unwrap();
        assert!(
            html.contains(r#"<body>hello <div><div class="h">From: a</div>world</div>"#),
            "{html}"
        );
    }

    #[test]
    fn test_text_only_body_is_prefixed() {
        let doc = parse_document("just text");
        let html = compose_html(doc, HEADER).unwrap();
        assert!(html.starts_with(r#"<div class="h">From: a</div><html>"#), "{html}");
        assert!(html.contains("<body>just text</body>"), "{html}");
    }

    #[test]
    fn test_void_first_child_not_used_as_container() {
        let doc = parse_document(r#"<img src="x.png"><p>after</p>"#);
        let html = compose_html(doc, HEADER).unwrap();
        assert!(html.starts_with(r#"<div class="h">From: a</div>"#), "{html}");
        assert!(html.contains(r#"<body><img src="x.png"><p>after</p>"#), "{html}");
    }

    #[test]
    fn test_foreign_and_control_first_child_not_used_as_container() {
        for first in [
            r#"<svg width="10" height="10"><rect width="10" height="10"></rect></svg>"#,
            "<math><mi>x</mi></math>",
            "<select><option>a</option></select>",
            r#"<object data="x.swf"></object>"#,
        ] {
            let doc = parse_document(&format!("{first}<p>after</p>"));
            let html = compose_html(doc, HEADER).unwrap();
            assert!(html.starts_with(HEADER), "{html}");
            assert_eq!(html.matches("From: a").count(), 1, "{html}");
        }
    }

    #[test]
    fn test_header_appears_once() {
        let doc = parse_document("<table><tr><td>x</td></tr></table>");
        let html = compose_html(doc, HEADER).unwrap();
        assert_eq!(html.matches("From: a").count(), 1);
    }

    #[test]
    fn test_plain_text_is_escaped_inside_pre() {
        let html = compose_plain_text("Hi <b>&</b>", "<h/>");
        assert_eq!(html, "<h/><pre>Hi &lt;b&gt;&amp;&lt;/b&gt;</pre>");
    }
}
