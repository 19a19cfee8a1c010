//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$EMLDOC_CONFIG` (environment variable)
//! 2. `~/.config/emldoc/config.toml` (Linux/macOS)
//!    `%APPDATA%\emldoc\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Where and how output documents are written.
    pub output: OutputConfig,
    /// Rendering backend settings.
    pub render: RenderConfig,
    /// Resource limits for a single conversion.
    pub limits: LimitsConfig,
    /// Intermediate debug dumps.
    pub debug: DebugConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs and debug dumps.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Output placement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write documents here instead of next to each input file.
    pub directory: Option<PathBuf>,
    /// Overwrite existing output documents without `--force`.
    pub overwrite: bool,
}

/// Which renderer to hand the assembled document to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Write a standalone `.html` file plus an attachments folder.
    Html,
    /// Pipe through an external HTML-to-PDF program.
    Command,
}

/// Rendering backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Renderer used for the final document.
    pub backend: Backend,
    /// Program invoked by the `command` backend.
    pub command: String,
    /// Extra arguments placed before the generated ones.
    pub extra_args: Vec<String>,
    /// Output file extension of the `command` backend.
    pub extension: String,
    /// Replacement stylesheet (defaults to the bundled one).
    pub stylesheet: Option<PathBuf>,
    /// Replacement header template (defaults to the bundled one).
    pub header_template: Option<PathBuf>,
}

/// Resource limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Stack size in MiB for the assemble-and-render span.
    /// Deeply nested HTML needs far more than the default thread stack.
    pub stack_size_mb: usize,
}

/// Intermediate debug dumps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Write `email.json` and `document.html` for every conversion.
    pub enabled: bool,
    /// Override the dump directory (default: `<cache_dir>/debug`).
    pub dir: Option<PathBuf>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Html,
            command: "weasyprint".to_string(),
            extra_args: Vec::new(),
            extension: "pdf".to_string(),
            stylesheet: None,
            header_template: None,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { stack_size_mb: 64 }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("EMLDOC_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("emldoc").join("config.toml"))
}

/// Return the cache directory for logs and debug dumps.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("emldoc")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("emldoc.log")
}

/// Return the directory that receives debug dumps.
pub fn debug_dir(config: &Config) -> PathBuf {
    match config.debug.dir {
        Some(ref dir) => dir.clone(),
        None => cache_dir(config).join("debug"),
    }
}
