use std::fmt;
use std::path::Path;
use std::str::FromStr;

use bytes::Bytes;
use frameparse_frame::{
    ReassemblerConfig, RetryBudget, StreamAligner, DEFAULT_MAX_LEFTOVER, SYNC_BYTE,
};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Where buffers are parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// On the writing thread, before `write` returns.
    Inline,
    /// On one background worker draining a FIFO in batches.
    #[default]
    Queued,
}

impl ProcessingMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Queued => "queued",
        }
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "queued" => Ok(Self::Queued),
            other => Err(EngineError::Config(format!(
                "unknown processing mode '{other}' (expected inline or queued)"
            ))),
        }
    }
}

/// Engine configuration.
///
/// Loadable from JSON; the sync marker is written as a hex string
/// (`"aa"`, `"eb90"`) and `null` disables alignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Name used for the worker thread and in logs.
    pub name: String,
    /// Marker searched for before the first frame and after malformed data.
    #[serde(with = "marker_hex")]
    pub sync_marker: Option<Bytes>,
    /// Inline or queued processing.
    pub mode: ProcessingMode,
    /// Times a frame that failed to deserialize is recombined with the next
    /// buffer before it is discarded. Default: 0.
    pub max_retry_attempts: u32,
    /// Maximum bytes carried forward per source. Default: 16 MiB.
    pub max_leftover: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "frameparse".to_string(),
            sync_marker: Some(Bytes::from_static(&[SYNC_BYTE])),
            mode: ProcessingMode::default(),
            max_retry_attempts: 0,
            max_leftover: DEFAULT_MAX_LEFTOVER,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document; omitted fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|err| EngineError::Config(format!("failed to read {}: {err}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values no engine can run with.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(EngineError::Config("name must not be empty".to_string()));
        }
        if self.max_leftover == 0 {
            return Err(EngineError::Config(
                "max_leftover must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Sync marker as lowercase hex, if configured.
    pub fn sync_marker_hex(&self) -> Option<String> {
        self.sync_marker.as_deref().map(hex::encode)
    }

    pub(crate) fn reassembler_config(&self) -> ReassemblerConfig {
        ReassemblerConfig {
            aligner: match &self.sync_marker {
                Some(marker) => StreamAligner::new(marker.clone()),
                None => StreamAligner::none(),
            },
            retry: RetryBudget::new(self.max_retry_attempts),
            max_leftover: self.max_leftover,
        }
    }
}

/// Parse a sync marker from hex (`"aa"`, `"0xEB90"`, `"eb 90"`).
///
/// An empty string or `"none"` means no marker.
pub fn parse_sync_marker(text: &str) -> Result<Option<Bytes>> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    let digits: String = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    let marker = hex::decode(&digits)
        .map_err(|err| EngineError::Config(format!("invalid sync marker '{text}': {err}")))?;
    Ok((!marker.is_empty()).then(|| Bytes::from(marker)))
}

mod marker_hex {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(marker: &Option<Bytes>, serializer: S) -> Result<S::Ok, S::Error> {
        match marker {
            Some(bytes) => serializer.serialize_some(&hex::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Bytes>, D::Error> {
        let text: Option<String> = Option::deserialize(deserializer)?;
        match text {
            None => Ok(None),
            Some(text) => super::parse_sync_marker(&text).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.sync_marker.as_deref(), Some(&[0xAA][..]));
        assert_eq!(config.mode, ProcessingMode::Queued);
        assert_eq!(config.max_retry_attempts, 0);
        assert_eq!(config.max_leftover, 16 * 1024 * 1024);
        assert_eq!(config.sync_marker_hex().as_deref(), Some("aa"));
    }

    #[test]
    fn json_with_partial_fields() {
        let config = EngineConfig::from_json_str(
            r#"{"name":"pmu","sync_marker":"0xEB90","mode":"inline","max_retry_attempts":2}"#,
        )
        .unwrap();

        assert_eq!(config.name, "pmu");
        assert_eq!(config.sync_marker.as_deref(), Some(&[0xEB, 0x90][..]));
        assert_eq!(config.mode, ProcessingMode::Inline);
        assert_eq!(config.max_retry_attempts, 2);
        assert_eq!(config.max_leftover, DEFAULT_MAX_LEFTOVER);
    }

    #[test]
    fn null_marker_disables_alignment() {
        let config = EngineConfig::from_json_str(r#"{"sync_marker":null}"#).unwrap();
        assert!(config.sync_marker.is_none());
        assert!(!config.reassembler_config().aligner.uses_sync());
    }

    #[test]
    fn json_roundtrip_keeps_marker() {
        let config = EngineConfig {
            sync_marker: Some(Bytes::from_static(&[0x55, 0xAA])),
            ..EngineConfig::default()
        };
        let json = config.to_json_string().unwrap();
        assert!(json.contains("\"55aa\""));
        assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"sync_marker":"zz"}"#),
            Err(EngineError::Json(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"max_leftover":0}"#),
            Err(EngineError::Config(_))
        ));
        assert!(EngineConfig::from_json_str(r#"{"unknown":1}"#).is_err());
    }

    #[test]
    fn marker_parsing() {
        assert_eq!(parse_sync_marker("aa").unwrap().as_deref(), Some(&[0xAA][..]));
        assert_eq!(
            parse_sync_marker("eb 90").unwrap().as_deref(),
            Some(&[0xEB, 0x90][..])
        );
        assert_eq!(parse_sync_marker("none").unwrap(), None);
        assert_eq!(parse_sync_marker("").unwrap(), None);
        assert!(parse_sync_marker("abc").is_err());
    }

    #[test]
    fn mode_from_str() {
        assert_eq!("Inline".parse::<ProcessingMode>().unwrap(), ProcessingMode::Inline);
        assert_eq!("queued".parse::<ProcessingMode>().unwrap(), ProcessingMode::Queued);
        assert!("threaded".parse::<ProcessingMode>().is_err());
    }
}
