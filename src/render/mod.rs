//! Renderers that turn an assembled [`Document`] into a file on disk.

pub mod command;
pub mod html;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::assembly::Document;
use crate::config::{Backend, RenderConfig};
use crate::error::{ConvertError, Result};

pub use command::CommandRenderer;
pub use html::HtmlRenderer;

/// Stylesheet shipped with the crate.
pub const BUNDLED_STYLESHEET: &str = include_str!("../../assets/stylesheet.css");

/// Longest filename (in characters) written for an attachment.
const MAX_FILENAME_LEN: usize = 150;

/// Output side of a conversion.
pub trait Renderer: Send + Sync {
    /// Extension of the files this renderer produces, without the dot.
    fn extension(&self) -> &str;

    /// Render `document` to `target` and return the path written.
    fn render(&self, document: &Document, target: &Path) -> Result<PathBuf>;
}

/// Build the renderer selected by `config`.
pub fn from_config(config: &RenderConfig) -> Result<Box<dyn Renderer>> {
    let stylesheet = load_stylesheet(config.stylesheet.as_deref())?;
    Ok(match config.backend {
        Backend::Html => Box::new(HtmlRenderer::new(stylesheet)),
        Backend::Command => {
            if config.command.trim().is_empty() {
                return Err(ConvertError::Config(
                    "render.command must name a program".into(),
                ));
            }
            Box::new(CommandRenderer::new(
                config.command.clone(),
                config.extra_args.clone(),
                config.extension.clone(),
                stylesheet,
            ))
        }
    })
}

/// Read a replacement stylesheet, or use the bundled one.
pub fn load_stylesheet(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e)),
        None => Ok(BUNDLED_STYLESHEET.to_string()),
    }
}

/// Make an attachment filename safe to write.
///
/// Path separators and control characters become `_`, leading dots are
/// dropped and the result is truncated to a sane length.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
            {
                '_'
            } else {
                c
            }
        })
        .take(MAX_FILENAME_LEN)
        .collect();
    let trimmed = sanitized.trim().trim_start_matches('.').trim();

    if trimmed.is_empty() {
        "attachment".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sanitized attachment filenames for one document, disambiguated so no two
/// collide (`a.png`, `a_1.png`, `a_2.png`).
pub fn unique_filenames<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut taken = HashSet::new();
    names
        .into_iter()
        .map(|name| {
            let name = sanitize_filename(name);
            let unique = if taken.contains(&name.to_lowercase()) {
                disambiguate(&name, &taken)
            } else {
                name
            };
            taken.insert(unique.to_lowercase());
            unique
        })
        .collect()
}

/// `stem_1.ext`, `stem_2.ext`, ... until one is free.
fn disambiguate(name: &str, taken: &HashSet<String>) -> String {
    let path = Path::new(name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    (1..)
        .map(|i| {
            if ext.is_empty() {
                format!("{stem}_{i}")
            } else {
                format!("{stem}_{i}.{ext}")
            }
        })
        .find(|candidate| !taken.contains(&candidate.to_lowercase()))
        .unwrap_or_else(|| name.to_string())
}

/// Write each attachment into `dir` under its unique filename.
pub(crate) fn write_attachments(document: &Document, dir: &Path) -> Result<Vec<PathBuf>> {
    if document.attachments.is_empty() {
        return Ok(Vec::new());
    }
    std::fs::create_dir_all(dir).map_err(|e| ConvertError::io(dir, e))?;

    let names = unique_filenames(document.attachments.iter().map(|a| a.filename.as_str()));
    let mut paths = Vec::with_capacity(names.len());
    for (attachment, name) in document.attachments.iter().zip(names) {
        let path = dir.join(name);
        std::fs::write(&path, &attachment.data).map_err(|e| ConvertError::io(&path, e))?;
        paths.push(path);
    }
    Ok(paths)
}
