//! Rendering through an external HTML-to-PDF program.
//!
//! The program is called as
//! `<command> <extra_args>... -s <stylesheet> [-a <attachment>]... <input.html> <output>`,
//! which is the `weasyprint` command line.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use super::{write_attachments, Renderer};
use crate::assembly::Document;
use crate::error::{ConvertError, Result};

/// Hands the document to an external converter.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    extra_args: Vec<String>,
    extension: String,
    stylesheet: String,
}

impl CommandRenderer {
    pub fn new(
        program: String,
        extra_args: Vec<String>,
        extension: String,
        stylesheet: String,
    ) -> Self {
        Self {
            program,
            extra_args,
            extension,
            stylesheet,
        }
    }
}

impl Renderer for CommandRenderer {
    fn extension(&self) -> &str {
        &self.extension
    }

    fn render(&self, document: &Document, target: &Path) -> Result<PathBuf> {
        // Removed on drop, whichever way this function returns.
        let workdir = tempfile::tempdir().map_err(|e| ConvertError::io(std::env::temp_dir(), e))?;

        let input = workdir.path().join("document.html");
        std::fs::write(&input, &document.html).map_err(|e| ConvertError::io(&input, e))?;
        let stylesheet = workdir.path().join("stylesheet.css");
        std::fs::write(&stylesheet, &self.stylesheet)
            .map_err(|e| ConvertError::io(&stylesheet, e))?;
        let attachments = write_attachments(document, &workdir.path().join("attachments"))?;

        let mut command = Command::new(&self.program);
        command.args(&self.extra_args).arg("-s").arg(&stylesheet);
        for attachment in &attachments {
            command.arg("-a").arg(attachment);
        }
        command.arg(&input).arg(target);
        debug!(?command, "Running renderer");

        let output = command
            .output()
            .map_err(|e| ConvertError::Render(format!("failed to run '{}': {e}", self.program)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConvertError::Render(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        info!(program = %self.program, path = %target.display(), "Rendered document");
        Ok(target.to_path_buf())
    }
}
