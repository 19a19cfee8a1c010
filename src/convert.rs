//! File-level conversion: read, decode, assemble, render.

use std::any::Any;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, info_span, warn, Span};

use crate::assembly::header::HeaderTemplate;
use crate::assembly::{assemble, Document};
use crate::config::{self, Config};
use crate::error::{ConvertError, Result};
use crate::model::email::ParsedEmail;
use crate::parser::eml::{read_eml, EmailDecoder, MailDecoder};
use crate::render::{self, Renderer};

/// Extension of accepted input files (compared case-insensitively).
pub const EML_EXTENSION: &str = "eml";

const DEBUG_EMAIL_FILE: &str = "email.json";
const DEBUG_DOCUMENT_FILE: &str = "document.html";

/// Everything needed to convert files, built once per run.
pub struct Converter {
    decoder: Box<dyn EmailDecoder + Send + Sync>,
    template: HeaderTemplate,
    renderer: Box<dyn Renderer>,
    output_dir: Option<PathBuf>,
    stack_size: usize,
    debug_dir: Option<PathBuf>,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("extension", &self.renderer.extension())
            .field("output_dir", &self.output_dir)
            .field("stack_size", &self.stack_size)
            .field("debug_dir", &self.debug_dir)
            .finish_non_exhaustive()
    }
}

impl Converter {
    /// A converter with the default decoder, no output directory and no
    /// debug dumps.
    pub fn new(template: HeaderTemplate, renderer: Box<dyn Renderer>) -> Self {
        Self {
            decoder: Box::new(MailDecoder),
            template,
            renderer,
            output_dir: None,
            stack_size: mib(config::LimitsConfig::default().stack_size_mb),
            debug_dir: None,
        }
    }

    /// Build a converter from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let template = match &config.render.header_template {
            Some(path) => HeaderTemplate::load(path)?,
            None => HeaderTemplate::bundled()?,
        };
        let renderer = render::from_config(&config.render)?;
        if config.limits.stack_size_mb == 0 {
            return Err(ConvertError::Config(
                "limits.stack_size_mb must be at least 1".into(),
            ));
        }

        Ok(Self::new(template, renderer)
            .with_output_dir(config.output.directory.clone())
            .with_stack_size_mb(config.limits.stack_size_mb)
            .with_debug_dir(config.debug.enabled.then(|| config::debug_dir(config))))
    }

    pub fn with_decoder(mut self, decoder: Box<dyn EmailDecoder + Send + Sync>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = dir;
        self
    }

    pub fn with_stack_size_mb(mut self, mb: usize) -> Self {
        self.stack_size = mib(mb.max(1));
        self
    }

    /// Write debug dumps into `dir` for every conversion (`None` disables them).
    pub fn with_debug_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.debug_dir = dir;
        self
    }

    /// Where the document for `input` is written.
    pub fn output_path(&self, input: &Path) -> PathBuf {
        let file_name = Path::new(input.file_name().unwrap_or(input.as_os_str()))
            .with_extension(self.renderer.extension());
        match &self.output_dir {
            Some(dir) => dir.join(file_name),
            None => input.with_file_name(file_name),
        }
    }
}

fn mib(mb: usize) -> usize {
    mb.saturating_mul(1024 * 1024)
}

/// Convert one `.eml` file and return the path of the rendered document.
pub fn convert_file(path: &Path, converter: &Converter) -> Result<PathBuf> {
    let span = info_span!("convert", path = %path.display());
    let _guard = span.enter();
    let start = Instant::now();

    let raw = read_eml(path)?;
    let email = converter.decoder.decode(&raw)?;
    debug!(
        bodies = email.bodies.len(),
        attachments = email.attachments.len(),
        "Decoded message"
    );
    if let Some(dir) = &converter.debug_dir {
        dump_email(dir, &email);
    }

    let target = converter.output_path(path);
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConvertError::io(parent, e))?;
    }

    let written = with_stack_budget(converter.stack_size, || {
        let document = assemble(&email, converter.decoder.as_ref(), &converter.template)?;
        if let Some(dir) = &converter.debug_dir {
            dump_document(dir, &document);
        }
        converter.renderer.render(&document, &target)
    })?;

    info!(
        output = %written.display(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Converted"
    );
    Ok(written)
}

/// Run `work` on a scoped worker thread with `stack_size` bytes of stack.
///
/// Deeply nested HTML recurses deeply in the tree code; the larger stack is
/// only held while `work` runs.
fn with_stack_budget<T, F>(stack_size: usize, work: F) -> Result<T>
where
    T: Send,
    F: FnOnce() -> Result<T> + Send,
{
    let span = Span::current();
    std::thread::scope(|scope| {
        let handle = std::thread::Builder::new()
            .name("emldoc-worker".into())
            .stack_size(stack_size)
            .spawn_scoped(scope, move || {
                let _guard = span.enter();
                work()
            })
            .map_err(|e| ConvertError::Render(format!("failed to start worker thread: {e}")))?;
        handle
            .join()
            .map_err(|panic| ConvertError::Render(panic_message(panic.as_ref())))?
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("conversion panicked: {detail}")
}

fn dump_email(dir: &Path, email: &ParsedEmail) {
    let json = match serde_json::to_string_pretty(email) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "Failed to serialize debug dump");
            return;
        }
    };
    write_dump(dir, DEBUG_EMAIL_FILE, json.as_bytes());
}

fn dump_document(dir: &Path, document: &Document) {
    write_dump(dir, DEBUG_DOCUMENT_FILE, document.html.as_bytes());
}

/// Debug dumps never fail a conversion.
fn write_dump(dir: &Path, name: &str, contents: &[u8]) {
    let path = dir.join(name);
    let result = std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, contents));
    match result {
        Ok(()) => debug!(path = %path.display(), "Wrote debug dump"),
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to write debug dump"),
    }
}

/// Whether `path` has the `.eml` extension.
pub fn is_eml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(EML_EXTENSION))
}

/// Outputs that a batch over `paths` would overwrite.
pub fn existing_outputs(paths: &[PathBuf], converter: &Converter) -> Vec<PathBuf> {
    paths
        .iter()
        .filter(|p| p.exists() && is_eml(p))
        .map(|p| converter.output_path(p))
        .filter(|out| out.exists())
        .collect()
}

/// A file that failed to convert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFile {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of [`convert_batch`].
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Rendered documents, in input order.
    pub converted: Vec<PathBuf>,
    pub failed: Vec<FailedFile>,
    /// Inputs that do not exist.
    pub missing: Vec<PathBuf>,
    /// Inputs skipped because they are not `.eml` files.
    pub skipped: Vec<PathBuf>,
}

impl BatchReport {
    /// No input failed or was missing.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.missing.is_empty()
    }
}

/// Convert `paths` one at a time. A failing file is recorded and the batch
/// continues.
pub fn convert_batch(
    paths: &[PathBuf],
    converter: &Converter,
    progress: Option<&dyn Fn(usize, usize)>,
) -> BatchReport {
    let mut report = BatchReport::default();
    let total = paths.len();

    for (i, path) in paths.iter().enumerate() {
        if let Some(cb) = progress {
            cb(i, total);
        }

        if !path.exists() {
            warn!(path = %path.display(), "Input file not found");
            report.missing.push(path.clone());
            continue;
        }
        if !is_eml(path) {
            warn!(path = %path.display(), "Skipping file without .eml extension");
            report.skipped.push(path.clone());
            continue;
        }

        match convert_file(path, converter) {
            Ok(output) => report.converted.push(output),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Conversion failed");
                report.failed.push(FailedFile {
                    path: path.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    if let Some(cb) = progress {
        cb(total, total);
    }

    info!(
        converted = report.converted.len(),
        failed = report.failed.len(),
        missing = report.missing.len(),
        skipped = report.skipped.len(),
        "Batch finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HtmlRenderer;

    fn html_converter() -> Converter {
        Converter::new(
            HeaderTemplate::bundled().unwrap(),
            Box::new(HtmlRenderer::new(String::new())),
        )
    }

    #[test]
    fn test_output_path_next_to_input() {
        let conv = html_converter();
        assert_eq!(
            conv.output_path(Path::new("/mail/inbox/hello.eml")),
            PathBuf::from("/mail/inbox/hello.html")
        );
    }

    #[test]
    fn test_output_path_in_output_dir() {
        let conv = html_converter().with_output_dir(Some(PathBuf::from("/out")));
        assert_eq!(
            conv.output_path(Path::new("/mail/hello.EML")),
            PathBuf::from("/out/hello.html")
        );
    }

    #[test]
    fn test_is_eml() {
        assert!(is_eml(Path::new("a.eml")));
        assert!(is_eml(Path::new("a.EML")));
        assert!(!is_eml(Path::new("a.msg")));
        assert!(!is_eml(Path::new("eml")));
    }

    #[test]
    fn test_stack_budget_returns_value() {
        let value = with_stack_budget(mib(1), || Ok(21 * 2)).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_stack_budget_propagates_error() {
        let err = with_stack_budget::<(), _>(mib(1), || Err(ConvertError::Html("bad".into())))
            .unwrap_err();
        assert!(matches!(err, ConvertError::Html(_)));
    }

    #[test]
    fn test_panic_becomes_render_error() {
        let err = with_stack_budget::<(), _>(mib(1), || panic!("boom")).unwrap_err();
        match err {
            ConvertError::Render(msg) => assert!(msg.contains("boom"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_stack_rejected_by_config() {
        let mut config = Config::default();
        config.limits.stack_size_mb = 0;
        assert!(matches!(
            Converter::from_config(&config),
            Err(ConvertError::Config(_))
        ));
    }
}
