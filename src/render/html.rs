//! Standalone HTML output: `<stem>.html` plus a `<stem>_attachments/` folder.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{write_attachments, Renderer};
use crate::assembly::Document;
use crate::error::{ConvertError, Result};

/// Writes the document as a self-contained HTML file.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    stylesheet: String,
}

impl HtmlRenderer {
    pub fn new(stylesheet: String) -> Self {
        Self { stylesheet }
    }

    /// Directory receiving the attachments of `target`.
    pub fn attachments_dir(target: &Path) -> PathBuf {
        let stem = target
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        target.with_file_name(format!("{stem}_attachments"))
    }
}

impl Renderer for HtmlRenderer {
    fn extension(&self) -> &str {
        "html"
    }

    /// The document is staged next to `target` and only moved into place
    /// once every attachment is on disk, so a failed render leaves no
    /// `.html` behind.
    fn render(&self, document: &Document, target: &Path) -> Result<PathBuf> {
        let html = with_stylesheet(&document.html, &self.stylesheet);
        let parent = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut staged =
            tempfile::NamedTempFile::new_in(parent).map_err(|e| ConvertError::io(target, e))?;
        staged
            .write_all(html.as_bytes())
            .map_err(|e| ConvertError::io(target, e))?;

        let written = write_attachments(document, &Self::attachments_dir(target))?;
        staged
            .persist(target)
            .map_err(|e| ConvertError::io(target, e.error))?;
        debug!(
            path = %target.display(),
            attachments = written.len(),
            "Wrote HTML document"
        );
        Ok(target.to_path_buf())
    }
}

/// Put `stylesheet` in a `<style>` element at the end of `<head>`, or in
/// front of everything when the document has no head.
pub fn with_stylesheet(html: &str, stylesheet: &str) -> String {
    let style = format!("<style>\n{stylesheet}\n</style>");
    match html.find("</head>") {
        Some(pos) => format!("{}{style}{}", &html[..pos], &html[pos..]),
        None => format!("{style}{html}"),
    }
}
