mod commands;

use std::io;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use tracing::debug;

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl From<LogFormat> for logutil::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Pretty => logutil::LogFormat::HumanReadable,
            LogFormat::Json => logutil::LogFormat::Json,
        }
    }
}

#[derive(Parser)]
#[clap(name = "identtool")]
#[clap(version)]
#[clap(about = "Inspect catalog internal ids and OID assignment", long_about = None)]
struct Cli {
    /// Log verbosity.
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format.
    #[clap(long, value_enum, env = "IDENTTOOL_LOG_FORMAT", global = true)]
    log_format: Option<LogFormat>,

    #[clap(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they never mix with command output.
    logutil::configure_global_logger(
        logutil::level_from_verbosity(cli.verbose),
        cli.log_format.unwrap_or_default().into(),
        io::stderr,
    );

    debug!(version = env!("CARGO_PKG_VERSION"), "starting...");

    let output = cli.command.run()?;
    println!("{output}");

    Ok(())
}
