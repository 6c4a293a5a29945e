//! Seams to the outside world.
//!
//! Everything the core consumes but does not implement sits behind one of
//! these traits: capture, detection, encoding, the move oracle, input
//! injection, post-move verification and status reporting. Production
//! adapters live in [`crate::adapters`]; tests substitute fakes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chesspilot_types::{
    BoardLayout, BoardReading, Color, Coordinate, ExecutionStyle, Frame, Placement, UciMove,
};

/// Future returned by collaborator methods.
pub type CollabFut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait ScreenCapture: Send + Sync {
    fn capture(&self) -> CollabFut<'_, anyhow::Result<Frame>>;
}

pub trait BoardDetector: Send + Sync {
    /// `None` when no board is visible in the frame.
    fn detect<'a>(&'a self, frame: &'a Frame) -> CollabFut<'a, Option<BoardLayout>>;
}

pub trait PositionEncoder: Send + Sync {
    /// `None` when the geometry does not decode to a consistent position.
    fn encode<'a>(
        &'a self,
        frame: &'a Frame,
        perspective: Color,
        layout: &'a BoardLayout,
    ) -> CollabFut<'a, Option<BoardReading>>;
}

/// The oracle's recommendation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleMove {
    pub mv: UciMove,
    /// Placement after `mv` is played.
    pub resulting_placement: Placement,
    /// The move delivers (or allows) mate in one.
    pub mate: bool,
}

pub trait MoveOracle: Send + Sync {
    /// `Ok(None)` when the position has no legal move.
    fn best_move<'a>(
        &'a self,
        fen: &'a str,
        depth: u32,
    ) -> CollabFut<'a, anyhow::Result<Option<OracleMove>>>;
}

/// One on-screen move for the actuator.
#[derive(Debug, Clone, PartialEq)]
pub struct ActuationRequest {
    pub mv: UciMove,
    pub from: Coordinate,
    pub to: Coordinate,
    pub style: ExecutionStyle,
    /// Maximum random offset in pixels around each midpoint.
    pub jitter: f64,
}

pub trait InputActuator: Send + Sync {
    fn act<'a>(&'a self, request: &'a ActuationRequest) -> CollabFut<'a, anyhow::Result<()>>;
}

pub trait MoveVerifier: Send + Sync {
    fn verify_moved(
        &self,
        perspective: Color,
        before: &Placement,
        after: &Placement,
        mv: &UciMove,
    ) -> bool;
}

/// Receives human-readable progress. Must not block.
pub trait StatusSink: Send + Sync {
    fn report(&self, text: &str);
}

/// The full set of collaborators a session drives.
#[derive(Clone)]
pub struct Collaborators {
    pub capture: Arc<dyn ScreenCapture>,
    pub detector: Arc<dyn BoardDetector>,
    pub encoder: Arc<dyn PositionEncoder>,
    pub oracle: Arc<dyn MoveOracle>,
    pub actuator: Arc<dyn InputActuator>,
    pub verifier: Arc<dyn MoveVerifier>,
    pub status: Arc<dyn StatusSink>,
}
