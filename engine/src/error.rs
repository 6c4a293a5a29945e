use chesspilot_types::UciMove;
use thiserror::Error;

/// Failures along the perceive / decide / act pipeline.
#[derive(Debug, Error)]
pub enum PilotError {
    /// Capture or detection produced nothing usable this cycle.
    #[error("perception unavailable: {0}")]
    PerceptionUnavailable(String),
    #[error("board encoding inconsistent")]
    EncodingInconsistent,
    #[error("move oracle unavailable: {0}")]
    OracleUnavailable(String),
    #[error("actuation failed for {mv}: {reason}")]
    ActuationFailure { mv: UciMove, reason: String },
    #[error("move {0} not observed on the board")]
    VerificationFailure(UciMove),
    #[error("move {mv} failed after {attempts} attempts")]
    ExhaustedRetries { mv: UciMove, attempts: u32 },
    #[error("move already being processed")]
    AlreadyProcessing,
    #[error("no side assigned")]
    NoPerspective,
}
