use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chesspilot_bridge::BridgeConfig;
use chesspilot_types::{CastlingRights, Color, ExecutionStyle};
use chesspilot_uci::UciConfig;
use serde::Deserialize;
use thiserror::Error;

/// `~/.chesspilot/config.toml`, all sections optional.
#[derive(Debug, Default, Deserialize)]
pub struct PilotConfig {
    pub pilot: Option<PilotSection>,
    /// UCI engine process.
    pub engine: Option<UciConfig>,
    /// Sensor bridge helper process.
    pub bridge: Option<BridgeConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid {field}: {value:?}")]
    Invalid { field: &'static str, value: String },
}

impl ConfigError {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Invalid { .. } => None,
        }
    }
}

/// ```toml
/// [pilot]
/// side = "auto"
/// auto_play = false
/// style = "drag"
/// castling = "KQkq"
/// depth = 22
/// poll_interval_ms = 300
/// stall_timeout_secs = 30
/// ```
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PilotSection {
    pub side: Option<String>,
    #[serde(default)]
    pub auto_play: bool,
    pub style: Option<String>,
    /// FEN castling field, `-` for none.
    pub castling: Option<String>,
    pub depth: Option<u32>,
    /// Must be non-zero.
    pub poll_interval_ms: Option<u64>,
    pub settle_ms: Option<u64>,
    pub retry_pause_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    /// 0 disables the stall notice.
    pub stall_timeout_secs: Option<u64>,
}

/// Which side to play, or detect it from the first reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SidePreference {
    #[default]
    Auto,
    Fixed(Color),
}

impl FromStr for SidePreference {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        s.parse::<Color>()
            .map(Self::Fixed)
            .map_err(|_| ConfigError::Invalid {
                field: "side",
                value: s.to_string(),
            })
    }
}

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PilotSettings {
    pub side: SidePreference,
    pub auto_play: bool,
    pub style: ExecutionStyle,
    /// Rights reported to the engine until the board rules them out.
    pub castling: CastlingRights,
    pub depth: u32,
    pub poll_interval: Duration,
    pub settle_delay: Duration,
    pub retry_pause: Duration,
    pub max_attempts: u32,
    /// `None` disables the stall notice.
    pub stall_timeout: Option<Duration>,
}

impl Default for PilotSettings {
    fn default() -> Self {
        Self {
            side: SidePreference::Auto,
            auto_play: false,
            style: ExecutionStyle::Drag,
            castling: CastlingRights::ALL,
            depth: 22,
            poll_interval: Duration::from_millis(300),
            settle_delay: Duration::from_millis(500),
            retry_pause: Duration::from_millis(100),
            max_attempts: 3,
            stall_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl PilotSettings {
    /// Overlay the file section on the defaults.
    pub fn from_section(section: &PilotSection) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let side = match &section.side {
            Some(side) => side.parse()?,
            None => defaults.side,
        };
        let style = match &section.style {
            Some(style) => style.parse().map_err(|_| ConfigError::Invalid {
                field: "style",
                value: style.clone(),
            })?,
            None => defaults.style,
        };
        let castling = match &section.castling {
            Some(castling) => castling.parse().map_err(|_| ConfigError::Invalid {
                field: "castling",
                value: castling.clone(),
            })?,
            None => defaults.castling,
        };
        if section.max_attempts == Some(0) {
            return Err(ConfigError::Invalid {
                field: "max_attempts",
                value: "0".to_string(),
            });
        }
        if section.depth == Some(0) {
            return Err(ConfigError::Invalid {
                field: "depth",
                value: "0".to_string(),
            });
        }
        if section.poll_interval_ms == Some(0) {
            return Err(ConfigError::Invalid {
                field: "poll_interval_ms",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            side,
            auto_play: section.auto_play,
            style,
            castling,
            depth: section.depth.unwrap_or(defaults.depth),
            poll_interval: section
                .poll_interval_ms
                .map_or(defaults.poll_interval, Duration::from_millis),
            settle_delay: section
                .settle_ms
                .map_or(defaults.settle_delay, Duration::from_millis),
            retry_pause: section
                .retry_pause_ms
                .map_or(defaults.retry_pause, Duration::from_millis),
            max_attempts: section.max_attempts.unwrap_or(defaults.max_attempts),
            stall_timeout: match section.stall_timeout_secs {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.stall_timeout,
            },
        })
    }
}

impl PilotConfig {
    /// Load the default config file. A missing file is not an error.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {}: {err}", path.display());
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {}: {err}", path.display());
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    pub fn settings(&self) -> Result<PilotSettings, ConfigError> {
        match &self.pilot {
            Some(section) => PilotSettings::from_section(section),
            None => Ok(PilotSettings::default()),
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }
}

/// `~/.chesspilot`, the home of the config file and logs.
#[must_use]
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".chesspilot"))
}

fn config_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("config.toml"))
}
