//! Client for the sensor bridge: a helper process that owns screen capture,
//! the board detector, the position encoder and input injection.
//!
//! The helper speaks JSON-RPC 2.0 over stdio with `Content-Length` framing.

pub mod codec;
pub mod types;

pub(crate) mod protocol;

mod client;

pub use client::BridgeClient;
pub use protocol::EncodeResult;
pub use types::BridgeConfig;
