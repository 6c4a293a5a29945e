//! Status sink for the console front end.

use tokio::sync::mpsc;

use crate::collaborators::StatusSink;

/// Forwards status lines to a front end over an unbounded channel.
///
/// Reporting never blocks; lines are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelStatus {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelStatus {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StatusSink for ChannelStatus {
    fn report(&self, text: &str) {
        tracing::info!(target: "chesspilot::status", "{text}");
        let _ = self.tx.send(text.to_string());
    }
}
