//! Shared fakes for integration tests.
//!
//! `FakeBoard` stands in for capture, detection and encoding; the actuator
//! mutates it so a "played" move shows up on the next reading.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chesspilot_engine::types::{
    BoardLayout, BoardReading, BoardRect, Color, ExecutionStyle, Frame, Placement, UciMove,
};
use chesspilot_engine::verify::PlacementVerifier;
use chesspilot_engine::{
    ActuationRequest, BoardDetector, CollabFut, Collaborators, InputActuator, MoveOracle,
    OracleMove, PilotSettings, PositionEncoder, ScreenCapture, Session, SessionFlags,
    SidePreference, StatusSink,
};

pub const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";
pub const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR";
pub const AFTER_E4_E5: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR";

pub fn reading(placement: &str, active: Color) -> BoardReading {
    BoardReading::new(Placement::parse(placement).unwrap(), active)
}

// ============================================================================
// Board: capture + detect + encode
// ============================================================================

#[derive(Default)]
struct BoardState {
    current: Option<BoardReading>,
    /// Readings served before falling back to `current`. `None` fails encoding.
    queued: VecDeque<Option<BoardReading>>,
    fail_capture: bool,
    hide_board: bool,
}

#[derive(Default)]
pub struct FakeBoard {
    state: Mutex<BoardState>,
    captures: AtomicUsize,
}

impl FakeBoard {
    pub fn showing(current: BoardReading) -> Arc<Self> {
        let board = Self::default();
        board.state.lock().unwrap().current = Some(current);
        Arc::new(board)
    }

    pub fn set(&self, current: BoardReading) {
        self.state.lock().unwrap().current = Some(current);
    }

    pub fn current(&self) -> Option<BoardReading> {
        self.state.lock().unwrap().current.clone()
    }

    pub fn queue(&self, reading: Option<BoardReading>) {
        self.state.lock().unwrap().queued.push_back(reading);
    }

    pub fn fail_capture(&self, fail: bool) {
        self.state.lock().unwrap().fail_capture = fail;
    }

    pub fn hide_board(&self, hide: bool) {
        self.state.lock().unwrap().hide_board = hide;
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    /// Play `request.mv` on the current placement and hand the turn over.
    fn land(&self, request: &ActuationRequest) {
        let mut state = self.state.lock().unwrap();
        if let Some(current) = state.current.take() {
            let placement = current
                .placement
                .apply_move(&request.mv)
                .unwrap_or_else(|| current.placement.clone());
            state.current = Some(BoardReading::new(
                placement,
                current.active_color.opponent(),
            ));
        }
    }
}

impl ScreenCapture for FakeBoard {
    fn capture(&self) -> CollabFut<'_, anyhow::Result<Frame>> {
        Box::pin(async move {
            let id = self.captures.fetch_add(1, Ordering::SeqCst) as u64;
            if self.state.lock().unwrap().fail_capture {
                anyhow::bail!("display unavailable");
            }
            Ok(Frame::handle(id, 800, 800))
        })
    }
}

impl BoardDetector for FakeBoard {
    fn detect<'a>(&'a self, _frame: &'a Frame) -> CollabFut<'a, Option<BoardLayout>> {
        Box::pin(async move {
            if self.state.lock().unwrap().hide_board {
                return None;
            }
            let rect = BoardRect {
                x: 0.0,
                y: 0.0,
                width: 800.0,
                height: 800.0,
            };
            Some(BoardLayout::from_board_rect(rect, Color::White, Vec::new()))
        })
    }
}

impl PositionEncoder for FakeBoard {
    fn encode<'a>(
        &'a self,
        _frame: &'a Frame,
        _perspective: Color,
        _layout: &'a BoardLayout,
    ) -> CollabFut<'a, Option<BoardReading>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            match state.queued.pop_front() {
                Some(next) => next,
                None => state.current.clone(),
            }
        })
    }
}

// ============================================================================
// Oracle
// ============================================================================

pub struct FakeOracle {
    mv: Option<&'static str>,
    mate: bool,
    think: Duration,
    fail: bool,
    calls: AtomicUsize,
    fens: Mutex<Vec<String>>,
}

impl FakeOracle {
    pub fn suggesting(mv: &'static str) -> Arc<Self> {
        Arc::new(Self::plain(mv))
    }

    pub fn mating(mv: &'static str) -> Arc<Self> {
        Arc::new(Self {
            mate: true,
            ..Self::plain(mv)
        })
    }

    pub fn slow(mv: &'static str, think: Duration) -> Arc<Self> {
        Arc::new(Self {
            think,
            ..Self::plain(mv)
        })
    }

    pub fn without_move() -> Arc<Self> {
        Arc::new(Self {
            mv: None,
            ..Self::plain("a2a3")
        })
    }

    pub fn broken() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::plain("a2a3")
        })
    }

    fn plain(mv: &'static str) -> Self {
        Self {
            mv: Some(mv),
            mate: false,
            think: Duration::ZERO,
            fail: false,
            calls: AtomicUsize::new(0),
            fens: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every position the oracle was asked about, in order.
    pub fn fens(&self) -> Vec<String> {
        self.fens.lock().unwrap().clone()
    }
}

impl MoveOracle for FakeOracle {
    fn best_move<'a>(
        &'a self,
        fen: &'a str,
        _depth: u32,
    ) -> CollabFut<'a, anyhow::Result<Option<OracleMove>>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.fens.lock().unwrap().push(fen.to_string());
            if !self.think.is_zero() {
                tokio::time::sleep(self.think).await;
            }
            if self.fail {
                anyhow::bail!("engine crashed");
            }
            let Some(mv) = self.mv else {
                return Ok(None);
            };
            let mv: UciMove = mv.parse()?;
            let placement = Placement::parse(fen)?;
            let resulting_placement = placement.apply_move(&mv).unwrap_or(placement);
            Ok(Some(OracleMove {
                mv,
                resulting_placement,
                mate: self.mate,
            }))
        })
    }
}

// ============================================================================
// Actuator
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActOutcome {
    /// The move shows up on the board.
    Land,
    /// The call succeeds but the board does not change.
    Ignore,
    /// The call itself fails.
    Error,
    /// The call returns at once; the move shows up after the delay.
    LandAfter(Duration),
}

pub struct FakeActuator {
    board: Arc<FakeBoard>,
    script: Mutex<VecDeque<ActOutcome>>,
    fallback: ActOutcome,
    requests: Mutex<Vec<ActuationRequest>>,
}

impl FakeActuator {
    pub fn new(board: Arc<FakeBoard>, fallback: ActOutcome) -> Arc<Self> {
        Self::scripted(board, &[], fallback)
    }

    pub fn scripted(board: Arc<FakeBoard>, script: &[ActOutcome], fallback: ActOutcome) -> Arc<Self> {
        Arc::new(Self {
            board,
            script: Mutex::new(script.iter().copied().collect()),
            fallback,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ActuationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl InputActuator for FakeActuator {
    fn act<'a>(&'a self, request: &'a ActuationRequest) -> CollabFut<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request.clone());
            let outcome = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(self.fallback);
            match outcome {
                ActOutcome::Land => {
                    self.board.land(request);
                    Ok(())
                }
                ActOutcome::Ignore => Ok(()),
                ActOutcome::LandAfter(delay) => {
                    let board = Arc::clone(&self.board);
                    let request = request.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        board.land(&request);
                    });
                    Ok(())
                }
                ActOutcome::Error => anyhow::bail!("input injection refused"),
            }
        })
    }
}

// ============================================================================
// Status
// ============================================================================

#[derive(Default)]
pub struct RecordingStatus {
    lines: Mutex<Vec<String>>,
}

impl RecordingStatus {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn count(&self, text: &str) -> usize {
        self.lines().iter().filter(|line| *line == text).count()
    }
}

impl StatusSink for RecordingStatus {
    fn report(&self, text: &str) {
        self.lines.lock().unwrap().push(text.to_string());
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub session: Arc<Session>,
    pub board: Arc<FakeBoard>,
    pub oracle: Arc<FakeOracle>,
    pub actuator: Arc<FakeActuator>,
    pub status: Arc<RecordingStatus>,
}

impl Harness {
    pub fn flags(&self) -> &Arc<SessionFlags> {
        self.session.flags()
    }
}

pub fn settings(side: SidePreference) -> PilotSettings {
    PilotSettings {
        side,
        ..PilotSettings::default()
    }
}

pub fn harness(
    settings: PilotSettings,
    board: Arc<FakeBoard>,
    oracle: Arc<FakeOracle>,
    actuator: Arc<FakeActuator>,
) -> Harness {
    let status = Arc::new(RecordingStatus::default());
    let collab = Collaborators {
        capture: board.clone(),
        detector: board.clone(),
        encoder: board.clone(),
        oracle: oracle.clone(),
        actuator: actuator.clone(),
        verifier: Arc::new(PlacementVerifier),
        status: status.clone(),
    };
    let flags = Arc::new(SessionFlags::new(None, ExecutionStyle::Drag, settings.auto_play));
    let session = Arc::new(Session::with_seed(settings, collab, flags, 42));
    Harness {
        session,
        board,
        oracle,
        actuator,
        status,
    }
}

/// Poll `condition` on the (paused) clock until it holds or `limit` passes.
pub async fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
