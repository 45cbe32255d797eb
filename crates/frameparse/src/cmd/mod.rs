use clap::builder::RangedU64ValueParser;
use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use frameparse_engine::ProcessingMode;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod replay;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Feed a capture through an engine running the reference protocol.
    Replay(ReplayArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Replay(args) => replay::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Parse on the writing thread.
    Inline,
    /// Parse on a background worker.
    Queued,
}

impl From<ModeArg> for ProcessingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Inline => ProcessingMode::Inline,
            ModeArg::Queued => ProcessingMode::Queued,
        }
    }
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Capture file to replay, or `-` for stdin.
    pub input: PathBuf,
    /// Treat the input as hex text (whitespace ignored).
    #[arg(long)]
    pub hex: bool,
    /// Bytes per write, to mimic how the capture arrived.
    #[arg(
        long,
        default_value = "4096",
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub chunk_size: usize,
    /// Sync marker as hex, or `none`. Reference frames start with 0xAA, so a
    /// marker must too (e.g. aa, 0xAA01). Overrides --config.
    #[arg(long, value_name = "HEX")]
    pub sync: Option<String>,
    /// Processing mode. Overrides --config.
    #[arg(long)]
    pub mode: Option<ModeArg>,
    /// Retries for frames that fail to deserialize. Overrides --config.
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,
    /// Engine configuration file (JSON).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Registered frame types as hex (comma-separated). Default: all 256.
    #[arg(long, value_delimiter = ',', value_parser = parse_type_id)]
    pub types: Option<Vec<u8>>,
    /// Exit with a data error if anything was discarded.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_type_id(text: &str) -> Result<u8, String> {
    let digits = text
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    u8::from_str_radix(digits, 16).map_err(|err| format!("invalid type id `{text}`: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_ids_are_hex() {
        assert_eq!(parse_type_id("01"), Ok(0x01));
        assert_eq!(parse_type_id("0xFF"), Ok(0xFF));
        assert_eq!(parse_type_id(" a0 "), Ok(0xA0));
        assert!(parse_type_id("100").is_err());
        assert!(parse_type_id("").is_err());
    }

    #[test]
    fn mode_arg_maps_to_processing_mode() {
        assert_eq!(ProcessingMode::from(ModeArg::Inline), ProcessingMode::Inline);
        assert_eq!(ProcessingMode::from(ModeArg::Queued), ProcessingMode::Queued);
    }
}
