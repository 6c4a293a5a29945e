//! Bridge handle: owns the helper process and routes JSON-RPC traffic.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use chesspilot_types::{BoardLayout, Color, Coordinate, ExecutionStyle, Frame, UciMove};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::codec::{MessageReader, MessageWriter};
use crate::protocol::{
    self, ActParams, CaptureResult, DetectResult, EncodeParams, EncodeResult, FrameParams,
    Incoming, LogParams, Request,
};
use crate::types::BridgeConfig;

const SHUTDOWN_TIMEOUT_SECS: u64 = 2;

const WRITER_CHANNEL_CAPACITY: usize = 64;

type Reply = Result<serde_json::Value, String>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Reply>>>>;

enum WriterCommand {
    Send(serde_json::Value),
    Shutdown,
}

/// Connection to a running sensor bridge.
///
/// All methods take `&self`; concurrent requests are matched to responses by id.
pub struct BridgeClient {
    writer_tx: mpsc::Sender<WriterCommand>,
    next_id: AtomicU64,
    pending: PendingMap,
    request_timeout: Duration,
    child: Mutex<Option<Child>>,
    reader_handle: JoinHandle<()>,
    #[allow(dead_code)]
    writer_handle: JoinHandle<()>,
}

impl BridgeClient {
    /// Spawn the helper named in `config`.
    pub async fn start(config: &BridgeConfig) -> Result<Self> {
        let resolved_cmd = which::which(&config.command)
            .with_context(|| format!("{} not found in PATH", config.command))?;
        let mut child = Command::new(&resolved_cmd)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning {}", config.command))?;

        let stdout = child.stdout.take().context("no stdout from helper")?;
        let stdin = child.stdin.take().context("no stdin from helper")?;

        let client = Self::from_transport(
            stdout,
            stdin,
            Duration::from_secs(config.request_timeout_secs),
        );
        *client.child.lock().await = Some(child);
        tracing::info!("Sensor bridge '{}' started", resolved_cmd.display());
        Ok(client)
    }

    /// Talk to a helper over an existing pair of streams.
    pub fn from_transport<R, W>(reader: R, writer: W, request_timeout: Duration) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        let (writer_tx, mut writer_rx) = mpsc::channel::<WriterCommand>(WRITER_CHANNEL_CAPACITY);
        let writer_handle = tokio::spawn(async move {
            let mut writer = MessageWriter::new(writer);
            while let Some(cmd) = writer_rx.recv().await {
                match cmd {
                    WriterCommand::Send(message) => {
                        if let Err(e) = writer.write_message(&message).await {
                            tracing::warn!("Bridge write error: {e:#}");
                            break;
                        }
                    }
                    WriterCommand::Shutdown => break,
                }
            }
        });

        let reader_pending = pending.clone();
        let reader_writer_tx = writer_tx.clone();
        let reader_handle = tokio::spawn(async move {
            let mut reader = MessageReader::new(reader);
            loop {
                match reader.read_message().await {
                    Ok(Some(message)) => {
                        Self::dispatch_message(&message, &reader_pending, &reader_writer_tx).await;
                    }
                    Ok(None) => {
                        tracing::info!("Sensor bridge closed stdout");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("Sensor bridge reader error: {e:#}");
                        break;
                    }
                }
            }
            // Fail outstanding requests now instead of at their timeout.
            reader_pending.lock().await.clear();
        });

        Self {
            writer_tx,
            next_id: AtomicU64::new(1),
            pending,
            request_timeout,
            child: Mutex::new(None),
            reader_handle,
            writer_handle,
        }
    }

    async fn dispatch_message(
        message: &serde_json::Value,
        pending: &Mutex<HashMap<u64, oneshot::Sender<Reply>>>,
        writer_tx: &mpsc::Sender<WriterCommand>,
    ) {
        let Some(incoming) = protocol::classify(message) else {
            tracing::trace!("Ignoring malformed bridge message");
            return;
        };

        match incoming {
            Incoming::Response { id, outcome } => {
                let sender = pending.lock().await.remove(&id);
                match sender {
                    Some(tx) => {
                        let _ = tx.send(outcome);
                    }
                    None => tracing::debug!("Bridge response for unknown id {id}"),
                }
            }
            Incoming::HelperRequest { id, method } => {
                tracing::debug!("Sensor bridge sent request {method}; replying method not found");
                let reply = protocol::method_not_found(id, &method);
                let _ = writer_tx.send(WriterCommand::Send(reply)).await;
            }
            Incoming::Notification { method, params } => {
                Self::handle_notification(&method, params);
            }
        }
    }

    fn handle_notification(method: &str, params: Option<serde_json::Value>) {
        if method != "log" {
            tracing::trace!("Ignoring bridge notification: {method}");
            return;
        }
        let Some(params) = params else { return };
        match serde_json::from_value::<LogParams>(params) {
            Ok(LogParams { level, message }) => match level.as_str() {
                "error" => tracing::error!(target: "chesspilot::bridge", "{message}"),
                "warn" | "warning" => tracing::warn!(target: "chesspilot::bridge", "{message}"),
                "debug" => tracing::debug!(target: "chesspilot::bridge", "{message}"),
                "trace" => tracing::trace!(target: "chesspilot::bridge", "{message}"),
                _ => tracing::info!(target: "chesspilot::bridge", "{message}"),
            },
            Err(e) => tracing::debug!("Malformed bridge log notification: {e}"),
        }
    }

    async fn request<P, T>(&self, method: &str, params: Option<P>) -> Result<T>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let message = serde_json::to_value(Request::new(id, method, params))
            .context("serializing bridge request")?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if self
            .writer_tx
            .send(WriterCommand::Send(message))
            .await
            .is_err()
        {
            self.pending.lock().await.remove(&id);
            bail!("bridge writer closed");
        }

        let outcome = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => {
                self.pending.lock().await.remove(&id);
                bail!("sensor bridge exited before answering {method}");
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                bail!("{method} timed out after {:?}", self.request_timeout);
            }
        };

        let value = outcome.map_err(|message| anyhow!("{method} failed: {message}"))?;
        serde_json::from_value(value).with_context(|| format!("decoding {method} result"))
    }

    pub async fn capture(&self) -> Result<Frame> {
        let result: CaptureResult = self.request("capture", None::<()>).await?;
        Ok(Frame::handle(result.frame_id, result.width, result.height))
    }

    /// Locate the board in `frame`. `bottom` orients a bare board rectangle.
    pub async fn detect(&self, frame: &Frame, bottom: Color) -> Result<Option<BoardLayout>> {
        let params = FrameParams {
            frame_id: frame.id(),
        };
        let result: Option<DetectResult> = self.request("detect", Some(params)).await?;
        match result {
            Some(result) => result.into_layout(bottom),
            None => Ok(None),
        }
    }

    pub async fn encode(
        &self,
        frame: &Frame,
        perspective: Color,
        layout: &BoardLayout,
    ) -> Result<Option<EncodeResult>> {
        let params = EncodeParams {
            frame_id: frame.id(),
            perspective,
            boxes: layout.boxes(),
        };
        self.request("encode", Some(params)).await
    }

    pub async fn act(
        &self,
        mv: UciMove,
        from: Coordinate,
        to: Coordinate,
        style: ExecutionStyle,
        jitter: f64,
    ) -> Result<()> {
        let params = ActParams {
            mv: mv.to_string(),
            from,
            to,
            style,
            jitter,
        };
        let _: serde_json::Value = self.request("act", Some(params)).await?;
        Ok(())
    }

    /// Ask the helper to exit, then make sure it does.
    pub async fn shutdown(&self) {
        if let Err(e) = self
            .request::<(), serde_json::Value>("shutdown", None)
            .await
        {
            tracing::debug!("Bridge shutdown request failed: {e:#}");
        }
        let _ = self.writer_tx.send(WriterCommand::Shutdown).await;

        let Some(mut child) = self.child.lock().await.take() else {
            self.reader_handle.abort();
            return;
        };
        let exited = tokio::time::timeout(
            Duration::from_secs(SHUTDOWN_TIMEOUT_SECS),
            child.wait(),
        )
        .await;
        if exited.is_err() {
            tracing::debug!("Sensor bridge didn't exit in time, killing");
            let _ = child.kill().await;
        }
    }
}
