//! The metadata block (From/Subject/Date/To/Cc/Bcc/Attachments) placed at
//! the top of every document.
//!
//! Field values are derived by [`HeaderFields`] and poured into a Handlebars
//! fragment by [`HeaderTemplate`]. The template sees exactly these names:
//!
//! | field | content |
//! |---|---|
//! | `from` | sender |
//! | `subject` | subject |
//! | `date` | hop-received or sent date, or `Unknown` |
//! | `to` | recipients |
//! | `cc_display` / `cc` | `table-row` or `none`, carbon-copy recipients |
//! | `bcc_display` / `bcc` | `table-row` or `none`, blind-copy recipients |
//! | `attachments_display` / `attachments` | `table-row` or `none`, standalone filenames |
//!
//! Values are HTML-escaped once, when the template is rendered.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Local, TimeZone, Utc};
use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{ConvertError, Result};
use crate::model::email::ParsedEmail;

/// Template fields in their stable order.
pub const FIELD_ORDER: [&str; 10] = [
    "from",
    "subject",
    "date",
    "to",
    "cc_display",
    "cc",
    "bcc_display",
    "bcc",
    "attachments_display",
    "attachments",
];

/// `strftime` format of the Date row, e.g. `4 January 2024 at 10:00:00 AM`.
pub const DATE_FORMAT: &str = "%-d %B %Y at %-I:%M:%S %p";

/// Shown when neither a received nor a sent date is known.
pub const UNKNOWN_DATE: &str = "Unknown";

const BUNDLED_TEMPLATE: &str = include_str!("../../assets/header.html");
const TEMPLATE_NAME: &str = "header";

/// CSS `display` value of an optional header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowDisplay {
    #[serde(rename = "table-row")]
    Visible,
    #[serde(rename = "none")]
    Hidden,
}

impl RowDisplay {
    fn when(visible: bool) -> Self {
        if visible {
            Self::Visible
        } else {
            Self::Hidden
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Visible => "table-row",
            Self::Hidden => "none",
        }
    }
}

impl fmt::Display for RowDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values of the header block, unescaped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderFields {
    pub from: String,
    pub subject: String,
    pub date: String,
    pub to: String,
    pub cc_display: RowDisplay,
    pub cc: String,
    pub bcc_display: RowDisplay,
    pub bcc: String,
    pub attachments_display: RowDisplay,
    pub attachments: String,
}

impl HeaderFields {
    /// Derive the fields with dates shown in the local time zone.
    pub fn derive(email: &ParsedEmail, attachment_filenames: &[String]) -> Self {
        Self::derive_in(email, attachment_filenames, &Local)
    }

    /// Derive the fields with dates shown in `tz`.
    ///
    /// Each field is resolved on its own. The raw-header sub-map overrides
    /// From, To and Cc because it keeps display names. Bcc is taken from the
    /// raw-header sub-map only.
    pub fn derive_in<Tz>(email: &ParsedEmail, attachment_filenames: &[String], tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let header = &email.header;
        let raw_first = |name: &str| header.header.as_ref().and_then(|raw| raw.first(name));

        let from = raw_first("from").unwrap_or(header.from.as_str()).to_string();
        let to = raw_first("to")
            .map(String::from)
            .unwrap_or_else(|| header.to.join(", "));

        let show_cc = !header.cc.is_empty();
        let cc = if show_cc {
            raw_first("cc")
                .map(String::from)
                .unwrap_or_else(|| header.cc.join(", "))
        } else {
            String::new()
        };

        let bcc = raw_first("bcc").map(String::from);

        // The first hop's timestamp reflects delivery; fall back to the sent date.
        let date = header
            .received
            .first()
            .and_then(|hop| hop.date)
            .or(header.date)
            .map(|dt| format_date(&dt, tz))
            .unwrap_or_else(|| UNKNOWN_DATE.to_string());

        Self {
            from,
            subject: header.subject.clone(),
            date,
            to,
            cc_display: RowDisplay::when(show_cc),
            cc,
            bcc_display: RowDisplay::when(bcc.is_some()),
            bcc: bcc.unwrap_or_default(),
            attachments_display: RowDisplay::when(!attachment_filenames.is_empty()),
            attachments: attachment_filenames.join(", "),
        }
    }
}

/// Format a timestamp for the Date row in `tz`.
pub fn format_date<Tz>(dt: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    dt.with_timezone(tz).format(DATE_FORMAT).to_string()
}

/// A validated header template.
pub struct HeaderTemplate {
    registry: Handlebars<'static>,
}

impl fmt::Debug for HeaderTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderTemplate").finish_non_exhaustive()
    }
}

impl HeaderTemplate {
    /// The template shipped with the crate.
    pub fn bundled() -> Result<Self> {
        Self::from_source(BUNDLED_TEMPLATE)
    }

    /// Load a replacement template from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        Self::from_source(&source)
    }

    /// Compile `source` and check that it shows every field.
    ///
    /// Unknown field names fail at render time (strict mode); a template
    /// that never shows one of the fields is rejected here.
    pub fn from_source(source: &str) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_template_string(TEMPLATE_NAME, source)?;

        let probe: serde_json::Map<String, serde_json::Value> = FIELD_ORDER
            .iter()
            .map(|name| (name.to_string(), serde_json::Value::from(sentinel(name))))
            .collect();
        let rendered = registry.render(TEMPLATE_NAME, &probe)?;
        if let Some(missing) = FIELD_ORDER
            .iter()
            .find(|name| !rendered.contains(&sentinel(name)))
        {
            return Err(ConvertError::Template(format!(
                "template never shows the `{missing}` field"
            )));
        }

        Ok(Self { registry })
    }

    /// Fill the template.
    pub fn render(&self, fields: &HeaderFields) -> Result<String> {
        Ok(self.registry.render(TEMPLATE_NAME, fields)?)
    }
}

fn sentinel(name: &str) -> String {
    format!("@@{name}@@")
}
