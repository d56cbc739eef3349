//! paraminfer - infer types for untyped TypeScript function parameters.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use log::{error, LevelFilter};
use paraminfer::prelude::*;
use paraminfer::utils::find_source_files;

/// Command-line interface for paraminfer.
#[derive(Parser, Debug)]
#[command(
    name = "paraminfer",
    version,
    about = "Usage-based type inference for untyped function parameters",
    long_about = None
)]
struct Cli {
    /// Sets the verbosity level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// JSON file with inference options
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Infer parameter types in a file or directory
    Infer {
        /// Path to a .ts file or a directory searched recursively
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Method-call interpretation (refined, baseline); overrides the config file
        #[arg(short, long)]
        strategy: Option<StrategyKind>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn setup_logging(level: &str) {
    let log_level = match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Warn,
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
}

fn load_options(config: Option<&Path>, strategy: Option<StrategyKind>) -> anyhow::Result<InferenceOptions> {
    let mut options = match config {
        Some(path) => InferenceOptions::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => InferenceOptions::default(),
    };
    if let Some(strategy) = strategy {
        options.strategy = strategy;
    }
    Ok(options)
}

fn print_text(report: &FileReport) {
    for function in &report.functions {
        println!(
            "{}:{}: {}({})",
            report.path,
            function.line,
            function.name.as_deref().unwrap_or("<anonymous>"),
            function
        );
    }
}

/// Returns true when every file was analyzed.
fn run_infer(path: &Path, format: OutputFormat, options: InferenceOptions) -> anyhow::Result<bool> {
    if !path.exists() {
        bail!("path not found: {}", path.display());
    }

    let files: Vec<PathBuf> = find_source_files(path).collect();
    if files.is_empty() {
        eprintln!("No TypeScript files found under {}", path.display());
        return Ok(true);
    }

    let inferrer = Inferrer::new(options);
    let mut reports = Vec::with_capacity(files.len());
    let mut all_ok = true;
    for file in &files {
        match inferrer.infer_file(file) {
            Ok(report) => {
                if format == OutputFormat::Text {
                    print_text(&report);
                }
                reports.push(report);
            },
            Err(e) => {
                error!("skipping {}", file.display());
                eprintln!("{}", e);
                all_ok = false;
            },
        }
    }

    if format == OutputFormat::Json {
        let json = serde_json::to_string_pretty(&reports).context("failed to serialize reports")?;
        println!("{}", json);
    }
    Ok(all_ok)
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    match cli.command {
        Commands::Infer { path, format, strategy } => {
            let options = load_options(cli.config.as_deref(), strategy)?;
            let all_ok = run_infer(&path, format, options)?;
            Ok(if all_ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        },
    }
}
