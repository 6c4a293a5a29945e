//! Session context shared by the driving loop, the manual trigger and the
//! reply tasks.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use chesspilot_types::{
    BoardLayout, BoardReading, CastlingRights, Color, ExecutionStyle, Frame, Placement,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tokio::sync::Notify;

use crate::collaborators::Collaborators;
use crate::config::{PilotSettings, SidePreference};
use crate::error::PilotError;
use crate::guard::DispatchGuard;
use crate::pacing;
use crate::side::detect_side;
use crate::tracker::TurnTracker;

const NO_SIDE: u8 = 0;
const WHITE: u8 = 1;
const BLACK: u8 = 2;

const fn encode_side(side: Option<Color>) -> u8 {
    match side {
        None => NO_SIDE,
        Some(Color::White) => WHITE,
        Some(Color::Black) => BLACK,
    }
}

const fn decode_side(raw: u8) -> Option<Color> {
    match raw {
        WHITE => Some(Color::White),
        BLACK => Some(Color::Black),
        _ => None,
    }
}

/// Front-end owned mode flags.
///
/// The core only ever clears auto mode. Every change wakes sleeping loop
/// phases so they can re-check whether to keep running.
#[derive(Debug, Default)]
pub struct SessionFlags {
    auto_mode: AtomicBool,
    closing: AtomicBool,
    perspective: AtomicU8,
    click_style: AtomicBool,
    wake: Notify,
}

impl SessionFlags {
    #[must_use]
    pub fn new(perspective: Option<Color>, style: ExecutionStyle, auto_mode: bool) -> Self {
        Self {
            auto_mode: AtomicBool::new(auto_mode),
            closing: AtomicBool::new(false),
            perspective: AtomicU8::new(encode_side(perspective)),
            click_style: AtomicBool::new(style == ExecutionStyle::Click),
            wake: Notify::new(),
        }
    }

    #[must_use]
    pub fn auto_mode(&self) -> bool {
        self.auto_mode.load(Ordering::Acquire)
    }

    pub fn set_auto_mode(&self, enabled: bool) {
        self.auto_mode.store(enabled, Ordering::Release);
        self.wake.notify_waiters();
    }

    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    pub fn close(&self) {
        self.closing.store(true, Ordering::Release);
        self.wake.notify_waiters();
    }

    #[must_use]
    pub fn perspective(&self) -> Option<Color> {
        decode_side(self.perspective.load(Ordering::Acquire))
    }

    pub(crate) fn store_perspective(&self, side: Option<Color>) {
        self.perspective.store(encode_side(side), Ordering::Release);
    }

    #[must_use]
    pub fn style(&self) -> ExecutionStyle {
        if self.click_style.load(Ordering::Acquire) {
            ExecutionStyle::Click
        } else {
            ExecutionStyle::Drag
        }
    }

    pub fn set_style(&self, style: ExecutionStyle) {
        self.click_style
            .store(style == ExecutionStyle::Click, Ordering::Release);
    }

    /// The automatic loop should keep going.
    #[must_use]
    pub fn should_run(&self) -> bool {
        self.auto_mode() && !self.is_closing()
    }

    /// Sleep for `duration` unless auto mode is turned off or the session
    /// closes first. Returns whether the loop should continue.
    pub async fn pause(&self, duration: Duration) -> bool {
        let notified = self.wake.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if !self.should_run() {
            return false;
        }
        if !duration.is_zero() {
            tokio::select! {
                () = tokio::time::sleep(duration) => {}
                () = notified => {}
            }
        }
        self.should_run()
    }
}

/// Why a sensing pass produced no reading.
#[derive(Debug, Error)]
pub enum SenseError {
    #[error("capture failed: {0:#}")]
    Capture(anyhow::Error),
    #[error("no board detected")]
    NoBoard,
    #[error("board did not decode to a position")]
    NoReading,
}

impl SenseError {
    /// Status line shown to the user.
    #[must_use]
    pub fn status_text(&self) -> &'static str {
        match self {
            SenseError::Capture(_) => "Screenshot capture failed.",
            SenseError::NoBoard => "No board detected.",
            SenseError::NoReading => "Could not detect FEN.",
        }
    }
}

impl From<SenseError> for PilotError {
    fn from(value: SenseError) -> Self {
        match value {
            SenseError::NoReading => PilotError::EncodingInconsistent,
            other => PilotError::PerceptionUnavailable(other.to_string()),
        }
    }
}

/// One successful capture, detect and encode pass.
#[derive(Debug, Clone)]
pub struct Sensed {
    pub frame: Frame,
    pub layout: Arc<BoardLayout>,
    pub reading: BoardReading,
}

/// Everything the core needs, shared as `Arc<Session>`.
pub struct Session {
    flags: Arc<SessionFlags>,
    settings: PilotSettings,
    collab: Collaborators,
    tracker: TurnTracker,
    guard: Arc<DispatchGuard>,
    layout: RwLock<Option<Arc<BoardLayout>>>,
    castling: Mutex<CastlingRights>,
    rng: Mutex<StdRng>,
}

impl Session {
    #[must_use]
    pub fn new(settings: PilotSettings, collab: Collaborators, flags: Arc<SessionFlags>) -> Self {
        Self::with_rng(settings, collab, flags, StdRng::from_os_rng())
    }

    /// Deterministic pacing for tests.
    #[must_use]
    pub fn with_seed(
        settings: PilotSettings,
        collab: Collaborators,
        flags: Arc<SessionFlags>,
        seed: u64,
    ) -> Self {
        Self::with_rng(settings, collab, flags, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        settings: PilotSettings,
        collab: Collaborators,
        flags: Arc<SessionFlags>,
        rng: StdRng,
    ) -> Self {
        if let SidePreference::Fixed(side) = settings.side
            && flags.perspective().is_none()
        {
            flags.store_perspective(Some(side));
        }
        let castling = Mutex::new(settings.castling);
        Self {
            flags,
            settings,
            collab,
            tracker: TurnTracker::new(),
            guard: Arc::new(DispatchGuard::new()),
            layout: RwLock::new(None),
            castling,
            rng: Mutex::new(rng),
        }
    }

    #[must_use]
    pub fn flags(&self) -> &Arc<SessionFlags> {
        &self.flags
    }

    #[must_use]
    pub fn settings(&self) -> &PilotSettings {
        &self.settings
    }

    #[must_use]
    pub fn collaborators(&self) -> &Collaborators {
        &self.collab
    }

    #[must_use]
    pub fn tracker(&self) -> &TurnTracker {
        &self.tracker
    }

    #[must_use]
    pub fn guard(&self) -> &Arc<DispatchGuard> {
        &self.guard
    }

    #[must_use]
    pub fn perspective(&self) -> Option<Color> {
        self.flags.perspective()
    }

    /// Assign (or clear) our side. Turn memory is reset on every change.
    pub fn set_perspective(&self, side: Option<Color>) {
        self.flags.store_perspective(side);
        self.tracker.reset();
        match side {
            Some(side) => tracing::info!("Playing as {side}"),
            None => tracing::info!("Side cleared"),
        }
    }

    pub fn report(&self, text: &str) {
        self.collab.status.report(text);
    }

    /// Latest published layout.
    #[must_use]
    pub fn layout(&self) -> Option<Arc<BoardLayout>> {
        self.layout
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn publish_layout(&self, layout: Arc<BoardLayout>) {
        *self.layout.write().unwrap_or_else(PoisonError::into_inner) = Some(layout);
    }

    /// Castling rights still believed available.
    #[must_use]
    pub fn castling(&self) -> CastlingRights {
        *self.castling.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_castling(&self, rights: CastlingRights) {
        *self.castling.lock().unwrap_or_else(PoisonError::into_inner) = rights;
        tracing::info!(%rights, "Castling rights set");
    }

    /// Drop rights the observed placement rules out. Once lost, a right is
    /// not restored by a later reading.
    fn observe_castling(&self, placement: &Placement) {
        let mut rights = self.castling.lock().unwrap_or_else(PoisonError::into_inner);
        let kept = rights.retain_possible(placement);
        if kept != *rights {
            tracing::info!(from = %*rights, to = %kept, "Castling rights lost");
            *rights = kept;
        }
    }

    /// Randomized think time scaled by how long the opponent took.
    pub fn think_delay(&self) -> Duration {
        let elapsed = self.tracker.opponent_think_time();
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        pacing::think_delay(elapsed, &mut *rng)
    }

    /// Capture, detect and encode once for `perspective`. A detected layout
    /// is published even when encoding fails. The reading also updates the
    /// castling rights.
    pub async fn sense(&self, perspective: Color) -> Result<Sensed, SenseError> {
        let sensed = self.read_board(perspective).await?;
        self.observe_castling(&sensed.reading.placement);
        Ok(sensed)
    }

    async fn read_board(&self, perspective: Color) -> Result<Sensed, SenseError> {
        let frame = self
            .collab
            .capture
            .capture()
            .await
            .map_err(SenseError::Capture)?;
        let layout = self
            .collab
            .detector
            .detect(&frame)
            .await
            .ok_or(SenseError::NoBoard)?;
        let layout = Arc::new(layout);
        self.publish_layout(Arc::clone(&layout));

        let reading = self
            .collab
            .encoder
            .encode(&frame, perspective, &layout)
            .await
            .ok_or(SenseError::NoReading)?;
        Ok(Sensed {
            frame,
            layout,
            reading,
        })
    }

    /// Our side, detecting it from the board when none is assigned and the
    /// settings allow it. `Ok(None)` means no side and no detection allowed.
    pub async fn resolve_perspective(&self) -> Result<Option<Color>, SenseError> {
        if let Some(side) = self.perspective() {
            return Ok(Some(side));
        }
        if self.settings.side != SidePreference::Auto {
            return Ok(None);
        }
        // Orientation is unknown here, so castling rights are left alone.
        let sensed = self.read_board(Color::White).await?;
        let side = detect_side(&sensed.reading.placement);
        self.set_perspective(Some(side));
        Ok(Some(side))
    }
}
