//! Wire types for the bridge's JSON-RPC methods.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chesspilot_types::{
    BoardLayout, BoardRect, Color, Coordinate, DetectionBox, ExecutionStyle, Square,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct Request<'a, P> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<P>,
}

impl<'a, P: Serialize> Request<'a, P> {
    pub fn new(id: u64, method: &'a str, params: Option<P>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

/// A parsed message from the helper.
#[derive(Debug)]
pub(crate) enum Incoming {
    Response {
        id: u64,
        outcome: Result<serde_json::Value, String>,
    },
    HelperRequest {
        id: serde_json::Value,
        method: String,
    },
    Notification {
        method: String,
        params: Option<serde_json::Value>,
    },
}

pub(crate) fn classify(message: &serde_json::Value) -> Option<Incoming> {
    let id = message.get("id");
    let method = message.get("method").and_then(|m| m.as_str());

    match (id, method) {
        (Some(id), Some(method)) => Some(Incoming::HelperRequest {
            id: id.clone(),
            method: method.to_string(),
        }),
        (None, Some(method)) => Some(Incoming::Notification {
            method: method.to_string(),
            params: message.get("params").cloned(),
        }),
        (Some(id), None) => {
            let id = id.as_u64()?;
            let outcome = if let Some(error) = message.get("error") {
                Err(error
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown error")
                    .to_string())
            } else {
                Ok(message.get("result").cloned()?)
            };
            Some(Incoming::Response { id, outcome })
        }
        (None, None) => None,
    }
}

pub(crate) fn method_not_found(id: serde_json::Value, method: &str) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": -32601,
            "message": format!("Method not found: {method}")
        }
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct CaptureResult {
    pub frame_id: u64,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct FrameParams {
    pub frame_id: u64,
}

/// Either explicit square midpoints or a board rectangle to derive them from.
#[derive(Debug, Deserialize)]
pub(crate) struct DetectResult {
    #[serde(default)]
    pub boxes: Vec<DetectionBox>,
    pub squares: Option<HashMap<String, Coordinate>>,
    pub board_rect: Option<BoardRect>,
    pub jitter_radius: Option<f64>,
}

impl DetectResult {
    /// Build a layout; `bottom` orients a bare board rectangle.
    pub fn into_layout(self, bottom: Color) -> Result<Option<BoardLayout>> {
        if let Some(named) = self.squares {
            let mut squares = HashMap::with_capacity(named.len());
            for (name, coordinate) in named {
                let square: Square = name
                    .parse()
                    .with_context(|| format!("helper sent unknown square {name:?}"))?;
                squares.insert(square, coordinate);
            }
            return Ok(Some(BoardLayout::new(
                self.boxes,
                squares,
                self.jitter_radius.unwrap_or(0.0),
            )));
        }
        Ok(self
            .board_rect
            .map(|rect| BoardLayout::from_board_rect(rect, bottom, self.boxes)))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct EncodeParams<'a> {
    pub frame_id: u64,
    pub perspective: Color,
    pub boxes: &'a [DetectionBox],
}

/// Raw encoder output. Validation happens on the caller's side.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EncodeResult {
    pub placement: String,
    pub active_color: String,
}

impl EncodeResult {
    /// The two leading FEN fields.
    #[must_use]
    pub fn fen_prefix(&self) -> String {
        format!("{} {}", self.placement.trim(), self.active_color.trim())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ActParams {
    #[serde(rename = "move")]
    pub mv: String,
    pub from: Coordinate,
    pub to: Coordinate,
    pub style: ExecutionStyle,
    pub jitter: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LogParams {
    #[serde(default)]
    pub level: String,
    pub message: String,
}
