use serde::Deserialize;

fn default_command() -> String {
    "chesspilot-sensor".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    10
}

/// How to launch the sensor bridge helper.
///
/// ```toml
/// [bridge]
/// command = "chesspilot-sensor"
/// args = ["--model", "~/.chesspilot/board.onnx"]
/// request_timeout_secs = 10
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: Vec::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}
