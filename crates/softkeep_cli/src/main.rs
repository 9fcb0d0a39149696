//! Operator CLI for opaque identifiers.
//!
//! # Responsibility
//! - Translate between record ids and tokens with the configured secret.
//! - Print the core version when called without arguments.
//!
//! Reads `SOFTKEEP_SECRET_KEY` (required for `encode`/`decode`),
//! `SOFTKEEP_TOKEN_MIN_LENGTH` and `SOFTKEEP_TOKEN_ALPHABET`.
//! File logging starts when `SOFTKEEP_LOG_DIR` is set; `SOFTKEEP_LOG_LEVEL`
//! overrides the build default level.

use softkeep_core::{core_version, default_log_level, init_logging, CodecConfig, IdCodec};
use std::process::ExitCode;

const USAGE: &str = "usage: softkeep [encode <id> | decode <token>]";
const ENV_LOG_DIR: &str = "SOFTKEEP_LOG_DIR";
const ENV_LOG_LEVEL: &str = "SOFTKEEP_LOG_LEVEL";

fn main() -> ExitCode {
    if let Err(message) = configure_logging(|key| std::env::var(key).ok()) {
        eprintln!("{message}");
        return ExitCode::FAILURE;
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

/// Starts file logging when a log directory is configured.
fn configure_logging<F>(lookup: F) -> Result<(), String>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(log_dir) = lookup(ENV_LOG_DIR) else {
        return Ok(());
    };
    let level = lookup(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string());
    init_logging(&level, &log_dir).map_err(|err| format!("logging setup failed: {err}"))
}

fn run(args: &[String]) -> Result<String, String> {
    match args {
        [] => Ok(format!("softkeep_core version={}", core_version())),
        [command, value] if command == "encode" => {
            let id: i64 = value
                .parse()
                .map_err(|_| format!("`{value}` is not an integer id"))?;
            load_codec()?
                .encode(id)
                .ok_or_else(|| format!("id must be positive, got {id}"))
        }
        [command, value] if command == "decode" => load_codec()?
            .decode(value)
            .map(|id| id.to_string())
            .ok_or_else(|| "not found".to_string()),
        _ => Err(USAGE.to_string()),
    }
}

fn load_codec() -> Result<IdCodec, String> {
    let config = CodecConfig::from_env().map_err(|err| err.to_string())?;
    IdCodec::new(&config).map_err(|err| err.to_string())
}
