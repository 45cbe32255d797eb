use clap::ValueEnum;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Crates whose events `--log-level` governs; everything else is capped at warn.
const ENGINE_TARGETS: [&str; 5] = [
    "frameparse",
    "frameparse_engine",
    "frameparse_frame",
    "frameparse_registry",
    "frameparse_image",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Level applied to targets outside [`ENGINE_TARGETS`].
    fn dependency_level(self) -> LogLevel {
        match self {
            LogLevel::Off | LogLevel::Error => self,
            _ => LogLevel::Warn,
        }
    }
}

/// `EnvFilter` directives putting the engine crates at `level`.
pub fn engine_directives(level: LogLevel) -> String {
    let mut directives = vec![level.dependency_level().as_str().to_string()];
    directives.extend(
        ENGINE_TARGETS
            .iter()
            .map(|target| format!("{target}={}", level.as_str())),
    );
    directives.join(",")
}

/// An explicit `--log-filter` wins over the per-crate directives for `level`.
pub fn build_filter(level: LogLevel, custom: Option<&str>) -> Result<EnvFilter, ParseError> {
    match custom {
        Some(directives) => EnvFilter::try_new(directives),
        None => EnvFilter::try_new(engine_directives(level)),
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays parseable.
pub fn init_logging(format: LogFormat, filter: EnvFilter) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_level_targets_engine_crates_only() {
        let directives = engine_directives(LogLevel::Debug);
        let parts: Vec<&str> = directives.split(',').collect();
        assert_eq!(parts[0], "warn");
        assert!(parts.contains(&"frameparse_engine=debug"));
        assert!(parts.contains(&"frameparse_frame=debug"));
        assert_eq!(parts.len(), ENGINE_TARGETS.len() + 1);
    }

    #[test]
    fn quiet_levels_apply_everywhere() {
        assert!(engine_directives(LogLevel::Off)
            .split(',')
            .all(|d| d.ends_with("off")));
        assert!(engine_directives(LogLevel::Error).starts_with("error,"));
    }

    #[test]
    fn custom_filter_is_validated() {
        assert!(build_filter(LogLevel::Warn, None).is_ok());
        assert!(build_filter(LogLevel::Warn, Some("frameparse_frame=trace")).is_ok());
        assert!(build_filter(LogLevel::Warn, Some("frameparse_frame=loud")).is_err());
    }
}
