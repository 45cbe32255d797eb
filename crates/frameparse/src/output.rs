use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use frameparse_engine::{EngineStatus, ParseEvent};
use frameparse_frame::RawFrame;
use serde::Serialize;

/// Events produced by the replay engine.
pub type ReplayEvent = ParseEvent<(), RawFrame, u8>;

const PREVIEW_BYTES: usize = 16;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    /// Parsed payloads only, written back to back.
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub index: usize,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_id: Option<String>,
    pub size: usize,
    /// Payload or discarded bytes as hex.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl EventRecord {
    pub fn from_event(index: usize, event: &ReplayEvent) -> Self {
        let mut record = Self {
            index,
            kind: event.kind(),
            type_id: None,
            size: 0,
            data: None,
            detail: None,
        };
        match event {
            ParseEvent::Parsed { output, .. } => {
                record.type_id = Some(type_label(output.frame_type));
                record.size = output.payload.len();
                record.data = Some(hex::encode(&output.payload));
            }
            ParseEvent::Discarded { bytes, reason, .. } => {
                record.size = bytes.len();
                record.data = Some(hex::encode(bytes));
                record.detail = Some(reason.to_string());
            }
            ParseEvent::UnknownType { type_id, .. } => {
                record.type_id = Some(type_label(*type_id));
                record.detail = Some("no output type registered".to_string());
            }
            ParseEvent::ProcessingError { error, .. } => {
                record.detail = Some(error.to_string());
            }
            ParseEvent::DuplicateType {
                type_id,
                registered,
                duplicate,
            } => {
                record.type_id = Some(type_label(*type_id));
                record.detail = Some(format!("kept {registered}, ignored {duplicate}"));
            }
        }
        record
    }
}

#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub input: String,
    pub chunk_size: usize,
    pub events: Vec<EventRecord>,
    pub status: EngineStatus,
}

pub fn print_report(report: &ReplayReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut events = Table::new();
            events
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "KIND", "TYPE", "SIZE", "DATA", "DETAIL"]);
            for record in &report.events {
                events.add_row(vec![
                    record.index.to_string(),
                    record.kind.to_string(),
                    record.type_id.clone().unwrap_or_default(),
                    record.size.to_string(),
                    record.data.as_deref().map(preview).unwrap_or_default(),
                    record.detail.clone().unwrap_or_default(),
                ]);
            }
            println!("{events}");

            let mut status = Table::new();
            status
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["STATUS", "VALUE"]);
            for (label, value) in report.status.rows() {
                status.add_row(vec![label.to_string(), value]);
            }
            println!("{status}");
        }
        OutputFormat::Pretty => {
            for record in &report.events {
                let mut line = format!("#{} {}", record.index, record.kind);
                if let Some(type_id) = &record.type_id {
                    line.push_str(&format!(" type={type_id}"));
                }
                line.push_str(&format!(" size={}", record.size));
                if let Some(data) = &record.data {
                    line.push_str(&format!(" data={}", preview(data)));
                }
                if let Some(detail) = &record.detail {
                    line.push_str(&format!(" ({detail})"));
                }
                println!("{line}");
            }
            println!();
            print!("{}", report.status);
        }
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn type_label(type_id: u8) -> String {
    format!("0x{type_id:02x}")
}

fn preview(hex: &str) -> String {
    if hex.len() <= PREVIEW_BYTES * 2 {
        hex.to_string()
    } else {
        format!("{}..", &hex[..PREVIEW_BYTES * 2])
    }
}
