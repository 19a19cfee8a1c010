//! Inline `style` attribute handling.
//!
//! A declaration list is split on top-level `;` only: separators inside
//! quoted strings, parentheses (`url(data:image/png;base64,...)`) and
//! comments do not end a declaration.

/// One `;`-separated item of a declaration list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration<'a> {
    /// The item as written, trimmed.
    pub text: &'a str,
    /// Property name with comments removed.
    pub name: Option<String>,
    /// Value with comments and surrounding whitespace removed (includes `!important`).
    pub value: String,
}

impl<'a> Declaration<'a> {
    fn parse(text: &'a str) -> Self {
        let bare = strip_comments(text);
        match bare.split_once(':') {
            Some((name, value)) if !name.trim().is_empty() => Self {
                text,
                name: Some(name.trim().to_string()),
                value: value.trim().to_string(),
            },
            _ => Self {
                text,
                name: None,
                value: String::new(),
            },
        }
    }

    fn is_property(&self, property: &str) -> bool {
        self.name
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case(property))
    }

    /// First component of the value: `100% !important` → `100%`.
    fn first_value(&self) -> &str {
        self.value
            .split(|c: char| c.is_whitespace() || c == '!')
            .next()
            .unwrap_or_default()
    }

    /// `display: inline-block`, keyword matched case-insensitively.
    pub fn is_display_inline_block(&self) -> bool {
        self.is_property("display") && self.first_value().eq_ignore_ascii_case("inline-block")
    }

    /// `width: 100%`, comparing the percentage numerically (`100.0%` counts).
    pub fn is_full_width(&self) -> bool {
        if !self.is_property("width") {
            return false;
        }
        self.first_value()
            .strip_suffix('%')
            .and_then(|n| n.parse::<f64>().ok())
            .is_some_and(|n| n == 100.0)
    }
}

/// Split an inline style into its declarations, dropping empty items.
pub fn parse_declarations(style: &str) -> Vec<Declaration<'_>> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut in_comment = false;
    let mut escaped = false;
    let mut start = 0;

    let mut chars = style.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if escaped {
            escaped = false;
            continue;
        }
        if in_comment {
            if c == '*' && chars.peek().is_some_and(|&(_, n)| n == '/') {
                chars.next();
                in_comment = false;
            }
            continue;
        }
        match (c, quote) {
            ('\\', _) => escaped = true,
            (q, Some(open)) if q == open => quote = None,
            (_, Some(_)) => {}
            ('"' | '\'', None) => quote = Some(c),
            ('/', None) if chars.peek().is_some_and(|&(_, n)| n == '*') => {
                chars.next();
                in_comment = true;
            }
            ('(', None) => depth += 1,
            (')', None) => depth = depth.saturating_sub(1),
            (';', None) if depth == 0 => {
                push_item(&mut items, &style[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    push_item(&mut items, &style[start..]);

    items
}

/// Replace each `/* ... */` outside quoted strings with a space.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match quote {
            Some(open) => {
                if c == open {
                    quote = None;
                }
                out.push(c);
            }
            None if c == '/' && chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
                out.push(' ');
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                }
                out.push(c);
            }
        }
    }
    out
}

fn push_item<'a>(items: &mut Vec<Declaration<'a>>, raw: &'a str) {
    let text = raw.trim();
    if !text.is_empty() {
        items.push(Declaration::parse(text));
    }
}

/// Drop `display: inline-block` from a style that also sets `width: 100%`.
///
/// Returns the rebuilt style, or `None` when the style doesn't set both
/// and should stay untouched. Remaining declarations keep their order.
pub fn without_inline_block_full_width(style: &str) -> Option<String> {
    let declarations = parse_declarations(style);
    let inline_block = declarations.iter().any(Declaration::is_display_inline_block);
    let full_width = declarations.iter().any(Declaration::is_full_width);
    if !(inline_block && full_width) {
        return None;
    }

    let kept: Vec<&str> = declarations
        .iter()
        .filter(|d| !d.is_display_inline_block())
        .map(|d| d.text)
        .collect();
    Some(kept.join(";"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_list() {
        let decls = parse_declarations("color: red; width:100%;");
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].name.as_deref(), Some("color"));
        assert_eq!(decls[0].value, "red");
        assert_eq!(decls[1].text, "width:100%");
    }

    #[test]
    fn test_semicolon_inside_url_is_not_a_separator() {
        let style = "background:url(data:image/png;base64,AAAA);color:red";
        let decls = parse_declarations(style);
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].value, "url(data:image/png;base64,AAAA)");
    }

    #[test]
    fn test_semicolon_inside_quotes_and_comments() {
        let decls = parse_declarations("font-family:'a;b'; /* x;y */ color:red");
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].value, "'a;b'");
        assert!(decls[1].text.ends_with("color:red"));
        assert_eq!(decls[1].name.as_deref(), Some("color"));
    }

    #[test]
    fn test_comments_ignored_in_names_and_values() {
        assert_eq!(
            without_inline_block_full_width("/* box */ display:inline-block; width:100%").as_deref(),
            Some("width:100%")
        );
        assert_eq!(
            without_inline_block_full_width("display:inline-block;width:/* full */100% /* wide */")
                .as_deref(),
            Some("width:/* full */100% /* wide */")
        );
        let decls = parse_declarations("content:'/* kept */'");
        assert_eq!(decls[0].value, "'/* kept */'");
    }

    #[test]
    fn test_removes_inline_block_when_full_width() {
        assert_eq!(
            without_inline_block_full_width("display:inline-block;width:100%").as_deref(),
            Some("width:100%")
        );
    }

    #[test]
    fn test_declaration_order_irrelevant() {
        assert_eq!(
            without_inline_block_full_width("width: 100%; color: red; display: inline-block")
                .as_deref(),
            Some("width: 100%;color: red")
        );
    }

    #[test]
    fn test_case_insensitive_keywords() {
        assert_eq!(
            without_inline_block_full_width("DISPLAY: Inline-Block; Width: 100.0% !important")
                .as_deref(),
            Some("Width: 100.0% !important")
        );
    }

    #[test]
    fn test_single_property_left_alone() {
        assert_eq!(without_inline_block_full_width("display:inline-block"), None);
        assert_eq!(without_inline_block_full_width("width:100%"), None);
        assert_eq!(
            without_inline_block_full_width("display:inline-block;width:50%"),
            None
        );
        assert_eq!(
            without_inline_block_full_width("display:block;width:100%"),
            None
        );
    }

    #[test]
    fn test_width_in_pixels_is_not_full_width() {
        assert_eq!(
            without_inline_block_full_width("display:inline-block;width:100px"),
            None
        );
    }
}
