//! Core of ChessPilot: turn tracking, pacing and single-flight move execution.
//!
//! This crate decides *when* to move and makes sure a chosen move lands
//! exactly once. Perception, the move oracle and input injection are
//! consumed through the traits in [`collaborators`].

pub mod adapters;
pub mod collaborators;
pub mod dispatch;
pub mod driver;
pub mod executor;
pub mod guard;
pub mod pacing;
pub mod session;
pub mod side;
pub mod status;
pub mod tracker;
pub mod verify;

mod config;
mod error;

pub use config::{ConfigError, PilotConfig, PilotSection, PilotSettings, SidePreference, data_dir};
pub use error::PilotError;

pub use collaborators::{
    ActuationRequest, BoardDetector, CollabFut, Collaborators, InputActuator, MoveOracle,
    MoveVerifier, OracleMove, PositionEncoder, ScreenCapture, StatusSink,
};
pub use dispatch::{play_move, spawn_play_move};
pub use driver::{CycleOutcome, DrivingLoop, STALL_NOTICE};
pub use executor::{ExecutionOutcome, MoveRequest};
pub use guard::{DispatchGuard, DispatchPermit};
pub use session::{SenseError, Session, SessionFlags};
pub use tracker::{TurnSignal, TurnTracker};

pub use chesspilot_types as types;
