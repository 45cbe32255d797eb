mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::exit::USAGE;
use crate::logging::{build_filter, init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "frameparse", version, about = "Framed byte stream diagnostics")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "warn",
        env = "FRAMEPARSE_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    /// Full tracing filter (e.g. `frameparse_frame=trace,warn`). Overrides --log-level.
    #[arg(long, value_name = "DIRECTIVES", env = "FRAMEPARSE_LOG_FILTER", global = true)]
    log_filter: Option<String>,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    match build_filter(cli.log_level, cli.log_filter.as_deref()) {
        Ok(filter) => init_logging(cli.log_format, filter),
        Err(err) => {
            eprintln!("error: invalid --log-filter: {err}");
            std::process::exit(USAGE);
        }
    }

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
