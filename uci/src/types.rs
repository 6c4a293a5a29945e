//! Public types consumed by the engine crate.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chesspilot_types::UciMove;
use serde::Deserialize;

fn default_command() -> String {
    "stockfish".to_string()
}

fn default_options() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("Hash".to_string(), "1024".to_string()),
        ("Threads".to_string(), "4".to_string()),
    ])
}

const fn default_handshake_timeout_secs() -> u64 {
    10
}

const fn default_search_timeout_secs() -> u64 {
    60
}

/// Configuration for the UCI engine process.
///
/// ```toml
/// [engine]
/// command = "stockfish"
/// args = []
/// options_file = "~/.chesspilot/engine_options.txt"
///
/// [engine.options]
/// Hash = "1024"
/// Threads = "4"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct UciConfig {
    /// Executable name or path, resolved through `PATH`.
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Sent as `setoption name <key> value <value>` after the handshake.
    #[serde(default = "default_options")]
    pub options: BTreeMap<String, String>,
    /// Extra raw commands, one per line. Blank lines and `#` comments are skipped.
    pub options_file: Option<PathBuf>,
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
    /// Upper bound on a single `go depth` search.
    #[serde(default = "default_search_timeout_secs")]
    pub search_timeout_secs: u64,
}

impl Default for UciConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: Vec::new(),
            options: default_options(),
            options_file: None,
            handshake_timeout_secs: default_handshake_timeout_secs(),
            search_timeout_secs: default_search_timeout_secs(),
        }
    }
}

/// Result of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestMove {
    pub mv: UciMove,
    /// The engine reported a forced mate in one (for either side) during the search.
    pub mate_in_one: bool,
}
