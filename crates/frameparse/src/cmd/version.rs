use frameparse_engine::EngineConfig;
use serde::Serialize;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct VersionOutput {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    build: Option<BuildInfo>,
}

#[derive(Serialize)]
struct BuildInfo {
    target: String,
    profile: &'static str,
    target_os: &'static str,
    target_arch: &'static str,
    default_mode: String,
    default_sync_marker: Option<String>,
}

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    let output = VersionOutput {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        build: args.extended.then(build_info),
    };

    match (format, &output.build) {
        (OutputFormat::Json, _) => println!(
            "{}",
            serde_json::to_string(&output).unwrap_or_else(|_| "{}".to_string())
        ),
        (_, None) => println!("{} {}", output.name, output.version),
        (_, Some(build)) => {
            println!("name: {}", output.name);
            println!("version: {}", output.version);
            println!("target: {}", build.target);
            println!("profile: {}", build.profile);
            println!("target_os: {}", build.target_os);
            println!("target_arch: {}", build.target_arch);
            println!("default_mode: {}", build.default_mode);
            println!(
                "default_sync_marker: {}",
                build.default_sync_marker.as_deref().unwrap_or("none")
            );
        }
    }
    Ok(SUCCESS)
}

fn build_info() -> BuildInfo {
    let defaults = EngineConfig::default();
    BuildInfo {
        target: option_env!("FRAMEPARSE_BUILD_TARGET")
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS)),
        profile: option_env!("FRAMEPARSE_BUILD_PROFILE").unwrap_or("unknown"),
        target_os: std::env::consts::OS,
        target_arch: std::env::consts::ARCH,
        default_mode: defaults.mode.to_string(),
        default_sync_marker: defaults.sync_marker_hex(),
    }
}
