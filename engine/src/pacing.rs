//! Think-time heuristic.
//!
//! Replies are delayed in proportion to how long the opponent thought,
//! with jitter, so moves do not land instantly or at a fixed cadence.

use std::time::Duration;

use rand::Rng;

pub const MIN_THINK: Duration = Duration::from_millis(500);
pub const MAX_THINK: Duration = Duration::from_secs(5);

/// `elapsed * U(0.5, 0.8) + U(0.2, 0.5)` seconds, clamped to `[0.5, 5.0]`.
pub fn think_delay<R: Rng + ?Sized>(elapsed: Duration, rng: &mut R) -> Duration {
    let scale: f64 = rng.random_range(0.5..0.8);
    let base: f64 = rng.random_range(0.2..0.5);
    let seconds = elapsed.as_secs_f64() * scale + base;
    Duration::from_secs_f64(seconds.clamp(MIN_THINK.as_secs_f64(), MAX_THINK.as_secs_f64()))
}
