//! Engine locations and pacing.
//!
//! Resolution order, lowest to highest priority: built-in defaults (engines next
//! to the running binary), the JSON config file, then CLI flags.

use crate::engine::EngineCommand;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENCRYPT_TOOL_NAME: &str = "encrypt_tool";
pub const COMPRESS_TOOL_NAME: &str = "huffman_cli";
pub const DEFAULT_PROGRESS_DURATION: Duration = Duration::from_secs(3);

/// Fully resolved configuration handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppConfig {
    pub encrypt_tool: EngineCommand,
    pub compress_tool: EngineCommand,
    #[serde(with = "humantime_serde")]
    pub progress_duration: Duration,
}

/// Optional on-disk settings. Every field may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub encrypt_tool: Option<EngineCommand>,
    pub compress_tool: Option<EngineCommand>,
    #[serde(with = "humantime_serde")]
    pub progress_duration: Option<Duration>,
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub encrypt_tool: Option<PathBuf>,
    pub compress_tool: Option<PathBuf>,
    pub progress_duration: Option<Duration>,
}

impl AppConfig {
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Self {
        let dir = engine_dir();
        let encrypt_tool = overrides
            .encrypt_tool
            .map(EngineCommand::new)
            .or(file.encrypt_tool)
            .unwrap_or_else(|| EngineCommand::new(dir.join(executable(ENCRYPT_TOOL_NAME))));
        let compress_tool = overrides
            .compress_tool
            .map(EngineCommand::new)
            .or(file.compress_tool)
            .unwrap_or_else(|| EngineCommand::new(dir.join(executable(COMPRESS_TOOL_NAME))));
        let progress_duration = overrides
            .progress_duration
            .or(file.progress_duration)
            .unwrap_or(DEFAULT_PROGRESS_DURATION);

        Self {
            encrypt_tool,
            compress_tool,
            progress_duration,
        }
    }
}

/// `<config_dir>/secure-file-tool/config.json`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("secure-file-tool").join("config.json"))
}

/// Load the config file. An explicit path must exist; the default path is
/// optional and silently skipped when absent.
pub fn load_file(explicit: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let (path, required) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => match default_config_path() {
            Some(p) => (p, false),
            None => return Ok(FileConfig::default()),
        },
    };

    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(FileConfig::default())
        }
        Err(source) => return Err(ConfigError::Read { path, source }),
    };

    let cfg = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(cfg)
}

/// Directory of the running binary; engines ship alongside it.
fn engine_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn executable(name: &str) -> String {
    format!("{name}{}", std::env::consts::EXE_SUFFIX)
}
