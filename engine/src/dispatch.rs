//! The end-to-end reply: sense, ask the oracle, execute.
//!
//! Entered from the manual trigger through [`play_move`] and from the
//! driving loop through [`spawn_reply`] with a permit the loop already took.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::error::PilotError;
use crate::executor::{self, ExecutionOutcome, MoveRequest};
use crate::guard::DispatchPermit;
use crate::session::Session;

/// Manual trigger. Rejected without side effects while another move is in flight.
pub async fn play_move(session: &Session) -> Result<ExecutionOutcome, PilotError> {
    let Some(permit) = session.guard().try_permit() else {
        session.report("Move already being processed.");
        return Err(PilotError::AlreadyProcessing);
    };
    reply(session, &permit).await
}

/// Run [`play_move`] as its own task.
pub fn spawn_play_move(session: Arc<Session>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = play_move(&session).await {
            tracing::debug!("Manual move ended early: {e}");
        }
    })
}

/// Run a reply on its own task; the permit is released when it finishes.
pub fn spawn_reply(session: Arc<Session>, permit: DispatchPermit) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = reply(&session, &permit).await {
            tracing::debug!("Reply ended early: {e}");
        }
        drop(permit);
    })
}

/// The reply pipeline. The caller holds the dispatch guard for its whole duration.
pub async fn reply(
    session: &Session,
    permit: &DispatchPermit,
) -> Result<ExecutionOutcome, PilotError> {
    session.report("Processing move...");

    let perspective = match session.resolve_perspective().await {
        Ok(Some(side)) => side,
        Ok(None) => {
            session.report("No side selected.");
            return Err(PilotError::NoPerspective);
        }
        Err(e) => {
            session.report(e.status_text());
            return Err(e.into());
        }
    };

    let sensed = match session.sense(perspective).await {
        Ok(sensed) => sensed,
        Err(e) => {
            tracing::debug!("Sensing before reply failed: {e}");
            session.report(e.status_text());
            return Err(e.into());
        }
    };

    let fen = sensed.reading.to_fen(session.castling());
    let depth = session.settings().depth;
    let suggestion = match session
        .collaborators()
        .oracle
        .best_move(&fen, depth)
        .await
    {
        Ok(Some(suggestion)) => suggestion,
        Ok(None) => {
            session.report("No valid move found.");
            return Err(PilotError::OracleUnavailable(format!("no move for {fen}")));
        }
        Err(e) => {
            tracing::warn!("Move oracle failed on {fen}: {e:#}");
            session.report("No valid move found.");
            return Err(PilotError::OracleUnavailable(format!("{e:#}")));
        }
    };

    tracing::info!(fen = %fen, depth, "Oracle chose {}", suggestion.mv);
    session
        .tracker()
        .record_own(perspective, suggestion.resulting_placement.clone());

    let request = MoveRequest {
        mv: suggestion.mv,
        expected: suggestion.resulting_placement,
        mate: suggestion.mate,
    };
    Ok(executor::execute(session, permit, perspective, &request).await)
}
