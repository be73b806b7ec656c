pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rigquote_core::config::{AppConfig, ExtractionMode, LoadOptions, LogFormat, LoggingConfig};

#[derive(Debug, Parser)]
#[command(
    name = "rigquote",
    about = "Rigquote operator CLI",
    long_about = "Render equipment-rental quote emails, extract form fields from pasted text, and inspect configuration.",
    after_help = "Examples:\n  rigquote render --input request.json\n  rigquote extract --input work-order.txt --mode rules\n  rigquote doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a rigquote.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Normalize a quote request (JSON) and print the rendered email")]
    Render {
        #[arg(long, help = "Read the request from a file instead of stdin")]
        input: Option<PathBuf>,
        #[arg(long, help = "Emit the full quote result as JSON")]
        json: bool,
    },
    #[command(about = "Extract quote form fields from free text")]
    Extract {
        #[arg(long, help = "Read the text from a file instead of stdin")]
        input: Option<PathBuf>,
        #[arg(long, help = "Merge the extracted fields into this request JSON")]
        request: Option<PathBuf>,
        #[arg(long, help = "Extraction mode: rules, llm or auto")]
        mode: Option<ExtractionMode>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, the quote template, and extraction readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions {
        require_file: cli.config.is_some(),
        config_path: cli.config,
        ..LoadOptions::default()
    };

    let logging = AppConfig::load(options.clone())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    init_logging(&logging);

    let result = match cli.command {
        Command::Render { input, json } => commands::render::run(&options, input.as_deref(), json),
        Command::Extract { input, request, mode } => {
            commands::extract::run(&options, input.as_deref(), request.as_deref(), mode)
        }
        Command::Config => commands::config::run(&options),
        Command::Doctor { json } => commands::doctor::run(&options, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_logging(config: &LoggingConfig) {
    use tracing::Level;

    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
