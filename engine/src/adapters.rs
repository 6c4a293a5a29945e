//! Production collaborators backed by the UCI engine and the sensor bridge.

use std::sync::Arc;

use chesspilot_bridge::BridgeClient;
use chesspilot_types::{BoardLayout, BoardReading, Color, Frame, Placement};
use chesspilot_uci::UciEngine;

use crate::collaborators::{
    ActuationRequest, BoardDetector, CollabFut, InputActuator, MoveOracle, OracleMove,
    PositionEncoder, ScreenCapture,
};
use crate::session::SessionFlags;

impl MoveOracle for UciEngine {
    fn best_move<'a>(
        &'a self,
        fen: &'a str,
        depth: u32,
    ) -> CollabFut<'a, anyhow::Result<Option<OracleMove>>> {
        Box::pin(async move {
            let Some(best) = UciEngine::best_move(self, fen, depth).await? else {
                return Ok(None);
            };
            let placement = Placement::parse(fen)?;
            let Some(resulting_placement) = placement.apply_move(&best.mv) else {
                anyhow::bail!("engine move {} starts on an empty square", best.mv);
            };
            Ok(Some(OracleMove {
                mv: best.mv,
                resulting_placement,
                mate: best.mate_in_one,
            }))
        })
    }
}

impl ScreenCapture for BridgeClient {
    fn capture(&self) -> CollabFut<'_, anyhow::Result<Frame>> {
        Box::pin(BridgeClient::capture(self))
    }
}

/// Detector over the bridge. A bare board rectangle is oriented with our
/// side at the bottom (White while no side is assigned).
pub struct BridgeDetector {
    client: Arc<BridgeClient>,
    flags: Arc<SessionFlags>,
}

impl BridgeDetector {
    #[must_use]
    pub fn new(client: Arc<BridgeClient>, flags: Arc<SessionFlags>) -> Self {
        Self { client, flags }
    }
}

impl BoardDetector for BridgeDetector {
    fn detect<'a>(&'a self, frame: &'a Frame) -> CollabFut<'a, Option<BoardLayout>> {
        Box::pin(async move {
            let bottom = self.flags.perspective().unwrap_or(Color::White);
            match self.client.detect(frame, bottom).await {
                Ok(layout) => layout,
                Err(e) => {
                    tracing::debug!("Board detection failed: {e:#}");
                    None
                }
            }
        })
    }
}

impl PositionEncoder for BridgeClient {
    fn encode<'a>(
        &'a self,
        frame: &'a Frame,
        perspective: Color,
        layout: &'a BoardLayout,
    ) -> CollabFut<'a, Option<BoardReading>> {
        Box::pin(async move {
            let encoded = match BridgeClient::encode(self, frame, perspective, layout).await {
                Ok(Some(encoded)) => encoded,
                Ok(None) => return None,
                Err(e) => {
                    tracing::debug!("Position encoding failed: {e:#}");
                    return None;
                }
            };
            match BoardReading::from_fen(&encoded.fen_prefix()) {
                Ok(reading) => Some(reading),
                Err(e) => {
                    tracing::debug!("Discarding encoder output {:?}: {e}", encoded.fen_prefix());
                    None
                }
            }
        })
    }
}

impl InputActuator for BridgeClient {
    fn act<'a>(&'a self, request: &'a ActuationRequest) -> CollabFut<'a, anyhow::Result<()>> {
        Box::pin(BridgeClient::act(
            self,
            request.mv,
            request.from,
            request.to,
            request.style,
            request.jitter,
        ))
    }
}

/// Logs moves instead of performing them.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunActuator;

impl InputActuator for DryRunActuator {
    fn act<'a>(&'a self, request: &'a ActuationRequest) -> CollabFut<'a, anyhow::Result<()>> {
        Box::pin(async move {
            tracing::info!(
                style = request.style.as_str(),
                from = ?request.from,
                to = ?request.to,
                "Dry run: would play {}",
                request.mv
            );
            Ok(())
        })
    }
}
