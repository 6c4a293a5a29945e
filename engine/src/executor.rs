//! Move execution state machine.
//!
//! One move is driven through `Snapshot -> Act -> Observe -> Verify`, looping
//! through `Retry` on any failure until the attempt budget is spent. Each
//! state is a variant of [`Step`]; [`ExecutionRun::advance`] performs the
//! side effects of one state and returns the next.
//!
//! Once the actuator has been driven, every later snapshot is first compared
//! with the board as it stood before that first actuation. A move that
//! landed after its own observation window ends the run as a success instead
//! of being entered a second time.

use std::time::Duration;

use chesspilot_types::{Color, Placement, UciMove};

use crate::collaborators::ActuationRequest;
use crate::error::PilotError;
use crate::guard::DispatchPermit;
use crate::session::Session;

/// The move to execute and what the oracle said about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub mv: UciMove,
    /// Placement the oracle expects once the move lands.
    pub expected: Placement,
    pub mate: bool,
}

/// Record of one try. Logged when the attempt ends, never shared.
#[derive(Debug, Clone)]
pub struct MoveAttempt {
    pub number: u32,
    pub mv: UciMove,
    /// Board before the first actuation of this move, carried across retries.
    pub baseline: Option<Placement>,
    pub original: Option<Placement>,
    pub actuator_outcome: Option<Result<(), String>>,
    pub post: Option<Placement>,
    pub verified: bool,
}

impl MoveAttempt {
    fn new(number: u32, mv: UciMove) -> Self {
        Self {
            number,
            mv,
            baseline: None,
            original: None,
            actuator_outcome: None,
            post: None,
            verified: false,
        }
    }
}

#[derive(Debug)]
pub enum ExecutionOutcome {
    Success { attempts: u32, mate: bool },
    Failure { attempts: u32, last_error: PilotError },
}

impl ExecutionOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[derive(Debug)]
pub(crate) enum Step {
    Snapshot(MoveAttempt),
    Act(MoveAttempt),
    Observe(MoveAttempt),
    Verify(MoveAttempt),
    Retry { attempt: MoveAttempt, error: PilotError },
    Done(ExecutionOutcome),
}

/// Where a failed attempt leads: another attempt, or the end.
pub(crate) fn after_failure(attempt: MoveAttempt, error: PilotError, max_attempts: u32) -> Step {
    if attempt.number < max_attempts {
        Step::Retry { attempt, error }
    } else {
        tracing::warn!(
            attempts = attempt.number,
            "Giving up on {}: {error}",
            attempt.mv
        );
        Step::Done(ExecutionOutcome::Failure {
            attempts: attempt.number,
            last_error: PilotError::ExhaustedRetries {
                mv: attempt.mv,
                attempts: attempt.number,
            },
        })
    }
}

fn log_attempt(attempt: &MoveAttempt) {
    tracing::debug!(
        attempt = attempt.number,
        mv = %attempt.mv,
        original = ?attempt.original.as_ref().map(Placement::as_str),
        actuator = ?attempt.actuator_outcome,
        post = ?attempt.post.as_ref().map(Placement::as_str),
        verified = attempt.verified,
        "Move attempt finished"
    );
}

struct ExecutionRun<'a> {
    session: &'a Session,
    perspective: Color,
    request: &'a MoveRequest,
    max_attempts: u32,
    retry_pause: Duration,
    settle_delay: Duration,
}

impl ExecutionRun<'_> {
    fn fail(&self, attempt: MoveAttempt, error: PilotError) -> Step {
        log_attempt(&attempt);
        after_failure(attempt, error, self.max_attempts)
    }

    /// Whether `now` shows the move already played relative to `baseline`.
    fn already_landed(&self, baseline: &Placement, now: &Placement) -> bool {
        *now == self.request.expected
            || self.session.collaborators().verifier.verify_moved(
                self.perspective,
                baseline,
                now,
                &self.request.mv,
            )
    }

    async fn advance(&self, step: Step) -> Step {
        match step {
            Step::Snapshot(mut attempt) => match self.session.sense(self.perspective).await {
                Ok(sensed) => {
                    let now = sensed.reading.placement;
                    if let Some(baseline) = &attempt.baseline
                        && self.already_landed(baseline, &now)
                    {
                        tracing::info!(
                            attempt = attempt.number,
                            "Move {} landed late; not entering it again",
                            attempt.mv
                        );
                        attempt.post = Some(now);
                        attempt.verified = true;
                        log_attempt(&attempt);
                        return Step::Done(ExecutionOutcome::Success {
                            attempts: attempt.number,
                            mate: self.request.mate,
                        });
                    }
                    attempt.original = Some(now);
                    Step::Act(attempt)
                }
                Err(e) => self.fail(attempt, e.into()),
            },
            Step::Act(mut attempt) => {
                let mv = self.request.mv;
                let Some(layout) = self.session.layout() else {
                    return self.fail(
                        attempt,
                        PilotError::PerceptionUnavailable("no board layout".to_string()),
                    );
                };
                let (Some(from), Some(to)) = (layout.midpoint(mv.from()), layout.midpoint(mv.to()))
                else {
                    return self.fail(
                        attempt,
                        PilotError::PerceptionUnavailable(format!("squares of {mv} not on screen")),
                    );
                };
                let actuation = ActuationRequest {
                    mv,
                    from,
                    to,
                    style: self.session.flags().style(),
                    jitter: layout.jitter_radius(),
                };
                if attempt.baseline.is_none() {
                    attempt.baseline.clone_from(&attempt.original);
                }
                match self.session.collaborators().actuator.act(&actuation).await {
                    Ok(()) => {
                        attempt.actuator_outcome = Some(Ok(()));
                        Step::Observe(attempt)
                    }
                    Err(e) => {
                        attempt.actuator_outcome = Some(Err(format!("{e:#}")));
                        self.fail(
                            attempt,
                            PilotError::ActuationFailure {
                                mv,
                                reason: format!("{e:#}"),
                            },
                        )
                    }
                }
            }
            Step::Observe(mut attempt) => {
                tokio::time::sleep(self.settle_delay).await;
                match self.session.sense(self.perspective).await {
                    Ok(sensed) => {
                        attempt.post = Some(sensed.reading.placement);
                        Step::Verify(attempt)
                    }
                    Err(e) => self.fail(attempt, e.into()),
                }
            }
            Step::Verify(mut attempt) => {
                let verified = match (&attempt.original, &attempt.post) {
                    (Some(before), Some(after)) => {
                        self.session.collaborators().verifier.verify_moved(
                            self.perspective,
                            before,
                            after,
                            &self.request.mv,
                        )
                    }
                    _ => false,
                };
                attempt.verified = verified;
                if !verified {
                    return self.fail(attempt, PilotError::VerificationFailure(self.request.mv));
                }
                if attempt.post.as_ref() != Some(&self.request.expected) {
                    tracing::debug!("Board after {} differs from the oracle's", self.request.mv);
                }
                log_attempt(&attempt);
                Step::Done(ExecutionOutcome::Success {
                    attempts: attempt.number,
                    mate: self.request.mate,
                })
            }
            Step::Retry { attempt, error } => {
                tracing::debug!(attempt = attempt.number, "Retrying {}: {error}", attempt.mv);
                tokio::time::sleep(self.retry_pause).await;
                let mut next = MoveAttempt::new(attempt.number + 1, attempt.mv);
                next.baseline = attempt.baseline;
                Step::Snapshot(next)
            }
            done @ Step::Done(_) => done,
        }
    }
}

/// Play `request` on screen and confirm it landed.
///
/// Holding `_permit` proves no other execution is in flight. Reports the
/// result to the status sink; auto mode is cleared on failure and on mate.
pub async fn execute(
    session: &Session,
    _permit: &DispatchPermit,
    perspective: Color,
    request: &MoveRequest,
) -> ExecutionOutcome {
    let settings = session.settings();
    let run = ExecutionRun {
        session,
        perspective,
        request,
        max_attempts: settings.max_attempts.max(1),
        retry_pause: settings.retry_pause,
        settle_delay: settings.settle_delay,
    };

    let mut step = Step::Snapshot(MoveAttempt::new(1, request.mv));
    let outcome = loop {
        step = match run.advance(step).await {
            Step::Done(outcome) => break outcome,
            next => next,
        };
    };

    match &outcome {
        ExecutionOutcome::Success { attempts, mate } => {
            tracing::info!(attempts, "Move {} played", request.mv);
            if *mate {
                session.report(&format!("Move Played: {}\nCheckmate!", request.mv));
                session.flags().set_auto_mode(false);
            } else {
                session.report(&format!("Move Played: {}", request.mv));
            }
        }
        ExecutionOutcome::Failure { .. } => {
            session.report(&format!("Move failed to register: {}", request.mv));
            session.flags().set_auto_mode(false);
        }
    }
    outcome
}
