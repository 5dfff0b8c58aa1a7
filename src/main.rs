//! IPPcode19 interpreter - CLI

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::info;

use ippcode19::util::logger::LogLevel;
use ippcode19::{run_file, NAME, VERSION};

/// Log level enum for the CLI, mapped onto `util::logger::LogLevel`.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevelArg {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevelArg> for LogLevel {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Error => LogLevel::Error,
        }
    }
}

/// Interpreter for IPPcode19, a three-address XML intermediate code.
#[derive(Parser, Debug)]
#[command(name = "ippcode19")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    /// XML source file to interpret
    #[arg(long, value_name = "PATH")]
    source: Option<PathBuf>,

    /// File providing `READ`'s input (defaults to stdin)
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Set log level (debug, info, warn, error)
    #[arg(long, value_enum)]
    log_level: Option<LogLevelArg>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match args.log_level {
        Some(level) => ippcode19::util::logger::init_with_level(level.into()),
        None => ippcode19::util::logger::init_cli(),
    }

    let Some(source) = args.source else {
        eprintln!("error: --source=PATH is required");
        return ExitCode::from(10);
    };

    info!("{} {}", NAME, VERSION);

    match run_file(&source, args.input.as_deref()) {
        Ok(code) => exit_code(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(11)
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(code.clamp(0, 255) as u8)
}
