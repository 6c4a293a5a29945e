//! Turn state tracker.
//!
//! Remembers the last placement seen for each color and turns each new
//! reading into a [`TurnSignal`]. Readings arrive noisily and repeatedly;
//! only a changed placement counts as a move.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chesspilot_types::{BoardReading, Color, Placement};
use tokio::time::Instant;

/// What a reading means for us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnSignal {
    NoChange,
    /// The opponent is to move on a placement we had not seen.
    OpponentAdvanced,
    /// We are to move and the placement changed since we last recorded it.
    ReplyNeeded,
}

/// Last-observed placement per color.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnMemory {
    placements: [Option<Placement>; 2],
}

impl TurnMemory {
    #[must_use]
    pub fn get(&self, color: Color) -> Option<&Placement> {
        self.placements[color.index()].as_ref()
    }

    pub fn set(&mut self, color: Color, placement: Placement) {
        self.placements[color.index()] = Some(placement);
    }

    pub fn clear(&mut self) {
        self.placements = [None, None];
    }
}

#[derive(Debug)]
struct TrackerState {
    memory: TurnMemory,
    last_opponent_move: Instant,
}

/// Linearizable turn memory plus the pacing timestamp.
#[derive(Debug)]
pub struct TurnTracker {
    state: Mutex<TrackerState>,
}

impl Default for TurnTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TrackerState {
                memory: TurnMemory::default(),
                last_opponent_move: Instant::now(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forget both placements and restart the think clock.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.memory.clear();
        state.last_opponent_move = Instant::now();
    }

    pub fn classify(&self, my_side: Color, reading: &BoardReading) -> TurnSignal {
        let opponent = my_side.opponent();
        let mut state = self.lock();
        let seen = state.memory.get(opponent);

        if reading.active_color == opponent {
            if seen == Some(&reading.placement) {
                return TurnSignal::NoChange;
            }
            state.memory.set(opponent, reading.placement.clone());
            state.last_opponent_move = Instant::now();
            tracing::debug!(placement = %reading.placement, "Opponent to move on new placement");
            return TurnSignal::OpponentAdvanced;
        }

        match seen {
            None => TurnSignal::NoChange,
            Some(previous) if *previous == reading.placement => TurnSignal::NoChange,
            Some(_) => {
                state.memory.set(opponent, reading.placement.clone());
                tracing::info!(placement = %reading.placement, "Opponent moved; reply needed");
                TurnSignal::ReplyNeeded
            }
        }
    }

    /// Classify raw `"<placement> <active>"` text. Unparseable readings are
    /// dropped as noise.
    pub fn classify_fen(&self, my_side: Color, fen: &str) -> TurnSignal {
        match BoardReading::from_fen(fen) {
            Ok(reading) => self.classify(my_side, &reading),
            Err(e) => {
                tracing::debug!("Discarding reading {fen:?}: {e}");
                TurnSignal::NoChange
            }
        }
    }

    /// Record the placement our own move is expected to produce.
    pub fn record_own(&self, my_side: Color, placement: Placement) {
        self.lock().memory.set(my_side, placement);
    }

    #[must_use]
    pub fn memory(&self) -> TurnMemory {
        self.lock().memory.clone()
    }

    /// Time since the opponent was last seen to move.
    #[must_use]
    pub fn opponent_think_time(&self) -> Duration {
        self.lock().last_opponent_move.elapsed()
    }
}
