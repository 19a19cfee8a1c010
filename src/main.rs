//! CLI entry point for `emldoc`.

use std::path::PathBuf;
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use emldoc::config::{self, Backend, Config};
use emldoc::convert::{self, BatchReport, Converter};

#[derive(Parser)]
#[command(
    name = "emldoc",
    version,
    about = "Convert .eml messages into printable documents",
    subcommand_negates_reqs = true,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// EML files to convert
    #[arg(value_name = "FILES", required = true)]
    files: Vec<PathBuf>,

    /// Overwrite existing output documents
    #[arg(short, long)]
    force: bool,

    /// Write documents here instead of next to each input
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Rendering backend
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Write the decoded message and final HTML to the debug directory
    #[arg(long)]
    debug: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => return cmd_completions(shell),
        Some(Commands::Manpage) => return cmd_manpage(),
        None => {}
    }

    let mut config = config::load_config();
    apply_overrides(&mut config, &cli);

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    let report = cmd_convert(&cli.files, &config)?;
    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

/// Command-line flags win over the configuration file.
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if cli.force {
        config.output.overwrite = true;
    }
    if let Some(dir) = &cli.output_dir {
        config.output.directory = Some(dir.clone());
    }
    if let Some(backend) = cli.backend {
        config.render.backend = backend;
    }
    if cli.debug {
        config.debug.enabled = true;
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "emldoc.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "emldoc", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Convert every input file and print a summary.
fn cmd_convert(files: &[PathBuf], config: &Config) -> anyhow::Result<BatchReport> {
    let converter = Converter::from_config(config)?;

    if !config.output.overwrite {
        let existing = convert::existing_outputs(files, &converter);
        if !existing.is_empty() {
            eprintln!("  The following output files already exist:");
            for path in &existing {
                eprintln!("    {}", path.display());
            }
            anyhow::bail!("refusing to overwrite {} file(s); use --force", existing.len());
        }
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Converting [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let report = convert::convert_batch(
        files,
        &converter,
        Some(&|current: usize, total: usize| {
            pb.set_length(total as u64);
            pb.set_position(current as u64);
        }),
    );
    pb.finish_and_clear();

    print_summary(&report, start.elapsed());
    Ok(report)
}

fn print_summary(report: &BatchReport, elapsed: std::time::Duration) {
    use humansize::{format_size, BINARY};

    let output_size: u64 = report
        .converted
        .iter()
        .filter_map(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .sum();

    println!();
    println!("  {:<20} {}", "Converted", report.converted.len());
    println!("  {:<20} {}", "Output size", format_size(output_size, BINARY));
    println!("  {:<20} {:.2?}", "Time", elapsed);

    for path in &report.skipped {
        println!("  Skipped (not an .eml file): {}", path.display());
    }
    for path in &report.missing {
        println!("  File not found: {}", path.display());
    }

    println!();
    if report.failed.is_empty() && report.missing.is_empty() {
        println!("  All files were converted successfully!");
    } else if !report.failed.is_empty() {
        println!("  The following files failed to convert:");
        for failed in &report.failed {
            println!("    {}: {}", failed.path.display(), failed.error);
        }
    }
    println!();
}
