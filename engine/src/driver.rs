//! Automatic driving loop.
//!
//! `Idle -> Sensing -> Classifying -> (Waiting | Dispatching) -> Sensing`
//! for as long as auto mode is on and the session is open. Every sleep is
//! interruptible so turning auto mode off stops the loop within one interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::dispatch;
use crate::session::Session;
use crate::tracker::TurnSignal;

pub const STALL_NOTICE: &str = "Waiting for opponent move (press play to move now)";

/// What one pass of the loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A move is in flight; nothing was sensed.
    GuardBusy,
    /// Capture, detection or encoding failed.
    SenseFailed,
    /// No side assigned and detection disabled.
    NoSide,
    Classified(TurnSignal),
    /// A reply task was spawned.
    Dispatched,
    /// Auto mode was turned off or the session closed mid-cycle.
    Stopped,
}

/// Reports a stalled turn once per episode.
///
/// An episode starts at the first reading where it is our move and nothing
/// changed, and ends at any reading that is not.
#[derive(Debug)]
pub struct StallMonitor {
    timeout: Option<Duration>,
    since: Option<Instant>,
    reported: bool,
}

impl StallMonitor {
    #[must_use]
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            since: None,
            reported: false,
        }
    }

    /// Feed one reading; returns `true` when the notice should be shown.
    pub fn observe(&mut self, waiting_on_us: bool, now: Instant) -> bool {
        if !waiting_on_us {
            self.reset();
            return false;
        }
        let Some(timeout) = self.timeout else {
            return false;
        };
        let since = *self.since.get_or_insert(now);
        if self.reported || now.duration_since(since) < timeout {
            return false;
        }
        self.reported = true;
        true
    }

    pub fn reset(&mut self) {
        self.since = None;
        self.reported = false;
    }
}

pub struct DrivingLoop {
    session: Arc<Session>,
    stall: StallMonitor,
}

impl DrivingLoop {
    #[must_use]
    pub fn new(session: Arc<Session>) -> Self {
        let stall = StallMonitor::new(session.settings().stall_timeout);
        Self { session, stall }
    }

    /// Start the loop on its own task.
    pub fn spawn(session: Arc<Session>) -> JoinHandle<()> {
        tokio::spawn(Self::new(session).run())
    }

    pub async fn run(mut self) {
        let flags = Arc::clone(self.session.flags());
        let interval = self.session.settings().poll_interval;
        self.session.tracker().reset();
        tracing::info!("Auto-play started");

        while flags.should_run() {
            let started = Instant::now();
            let outcome = self.cycle().await;
            tracing::trace!(?outcome, "Cycle finished");
            if outcome == CycleOutcome::Stopped {
                break;
            }
            let remaining = interval.saturating_sub(started.elapsed());
            if !flags.pause(remaining).await {
                break;
            }
        }
        tracing::info!("Auto-play stopped");
    }

    pub async fn cycle(&mut self) -> CycleOutcome {
        let session = &self.session;
        if session.guard().is_busy() {
            return CycleOutcome::GuardBusy;
        }

        let me = match session.resolve_perspective().await {
            Ok(Some(side)) => side,
            Ok(None) => return CycleOutcome::NoSide,
            Err(e) => {
                tracing::trace!("Side detection skipped: {e}");
                return CycleOutcome::SenseFailed;
            }
        };

        let sensed = match session.sense(me).await {
            Ok(sensed) => sensed,
            Err(e) => {
                tracing::trace!("Sensing skipped: {e}");
                return CycleOutcome::SenseFailed;
            }
        };

        let signal = session.tracker().classify(me, &sensed.reading);
        if signal != TurnSignal::ReplyNeeded {
            let waiting_on_us =
                signal == TurnSignal::NoChange && sensed.reading.active_color == me;
            if self.stall.observe(waiting_on_us, Instant::now()) {
                tracing::info!("Our move has been pending without an opponent move");
                session.report(STALL_NOTICE);
            }
            return CycleOutcome::Classified(signal);
        }

        self.stall.reset();
        let delay = session.think_delay();
        tracing::info!(?delay, "Reply needed");
        if !session.flags().pause(delay).await {
            return CycleOutcome::Stopped;
        }

        match session.guard().try_permit() {
            Some(permit) => {
                dispatch::spawn_reply(Arc::clone(session), permit);
                CycleOutcome::Dispatched
            }
            None => {
                tracing::debug!("Another move took the guard during the think delay");
                CycleOutcome::GuardBusy
            }
        }
    }
}
