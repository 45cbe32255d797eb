use std::io::Read;
use std::path::Path;

use frameparse_engine::{parse_sync_marker, ChannelSink, Engine, EngineConfig};
use frameparse_frame::{FrameImageParser, ReferenceProtocol, SYNC_BYTE};
use tracing::{debug, info};

use crate::cmd::ReplayArgs;
use crate::exit::{engine_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_raw, print_report, EventRecord, OutputFormat, ReplayEvent, ReplayReport};

pub fn run(args: ReplayArgs, format: OutputFormat) -> CliResult<i32> {
    let config = build_config(&args)?;
    let capture = read_capture(&args.input, args.hex)?;
    debug!(
        bytes = capture.len(),
        chunk_size = args.chunk_size,
        mode = %config.mode,
        "replaying capture"
    );

    let type_ids: Vec<u8> = match &args.types {
        Some(ids) => ids.clone(),
        None => (0..=u8::MAX).collect(),
    };
    let parser = FrameImageParser::new(ReferenceProtocol::raw(type_ids));
    let (sink, events) = ChannelSink::<ReplayEvent>::unbounded();
    let mut engine = Engine::new(parser, config, sink);

    engine
        .start()
        .map_err(|err| engine_error("engine start failed", err))?;
    for chunk in capture.chunks(args.chunk_size) {
        engine
            .write(chunk)
            .map_err(|err| engine_error("write failed", err))?;
    }
    engine.flush();
    engine.stop();

    let status = engine.status();
    info!(
        frames = status.frames_parsed,
        discards = status.discards,
        "replay complete"
    );

    let clean = status.discards == 0 && status.processing_errors == 0;
    let events: Vec<ReplayEvent> = events.try_iter().collect();
    if matches!(format, OutputFormat::Raw) {
        for event in events {
            if let Some(frame) = event.into_output() {
                print_raw(&frame.payload);
            }
        }
    } else {
        let report = ReplayReport {
            input: args.input.display().to_string(),
            chunk_size: args.chunk_size,
            events: events
                .iter()
                .enumerate()
                .map(|(index, event)| EventRecord::from_event(index, event))
                .collect(),
            status,
        };
        print_report(&report, format);
    }

    if args.strict && !clean {
        return Err(CliError::new(
            DATA_INVALID,
            "capture contained bytes that did not parse",
        ));
    }
    Ok(SUCCESS)
}

fn build_config(args: &ReplayArgs) -> CliResult<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)
            .map_err(|err| engine_error(&format!("failed to load {}", path.display()), err))?,
        None => EngineConfig {
            name: "frameparse-replay".to_string(),
            ..EngineConfig::default()
        },
    };

    if let Some(sync) = &args.sync {
        config.sync_marker = parse_sync_marker(sync).map_err(|err| {
            CliError::new(USAGE, format!("invalid --sync value `{sync}`: {err}"))
        })?;
    }
    if let Some(mode) = args.mode {
        config.mode = mode.into();
    }
    if let Some(max_retries) = args.max_retries {
        config.max_retry_attempts = max_retries;
    }
    if let Some(&first) = config.sync_marker.as_ref().and_then(|m| m.first()) {
        if first != SYNC_BYTE {
            return Err(CliError::new(
                USAGE,
                format!(
                    "sync marker must start with {SYNC_BYTE:#04x} to match reference frames, got {}",
                    config.sync_marker_hex().unwrap_or_default()
                ),
            ));
        }
    }
    config
        .validate()
        .map_err(|err| engine_error("invalid engine config", err))?;
    Ok(config)
}

fn read_capture(input: &Path, as_hex: bool) -> CliResult<Vec<u8>> {
    let mut raw = Vec::new();
    if input == Path::new("-") {
        std::io::stdin()
            .read_to_end(&mut raw)
            .map_err(|err| io_error("failed to read stdin", err))?;
    } else {
        raw = std::fs::read(input)
            .map_err(|err| io_error(&format!("failed to read {}", input.display()), err))?;
    }

    if !as_hex {
        return Ok(raw);
    }
    let digits: String = String::from_utf8_lossy(&raw)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    hex::decode(&digits)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid hex input: {err}")))
}
