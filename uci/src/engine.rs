//! Engine handle: owns the child process and runs searches.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chesspilot_types::UciMove;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use crate::codec::{LineReader, LineWriter};
use crate::protocol::{self, EngineLine};
use crate::types::{BestMove, UciConfig};

const SHUTDOWN_TIMEOUT_SECS: u64 = 2;

/// A UCI engine started lazily on first use.
///
/// Searches are serialized behind an async mutex. A process that fails a
/// search is killed and replaced on the next call.
pub struct UciEngine {
    config: UciConfig,
    process: Mutex<Option<EngineProcess>>,
}

impl UciEngine {
    #[must_use]
    pub fn new(config: UciConfig) -> Self {
        Self {
            config,
            process: Mutex::new(None),
        }
    }

    /// Start the engine now instead of on the first search.
    pub async fn warm_up(&self) -> Result<()> {
        let mut slot = self.process.lock().await;
        if slot.is_none() {
            *slot = Some(EngineProcess::start(&self.config).await?);
        }
        Ok(())
    }

    /// Search `fen` to `depth` plies.
    ///
    /// Returns `Ok(None)` when the engine reports no legal move.
    pub async fn best_move(&self, fen: &str, depth: u32) -> Result<Option<BestMove>> {
        let mut slot = self.process.lock().await;
        if slot.is_none() {
            *slot = Some(EngineProcess::start(&self.config).await?);
        }
        let Some(process) = slot.as_mut() else {
            bail!("engine process unavailable");
        };

        let timeout = Duration::from_secs(self.config.search_timeout_secs);
        let result = match tokio::time::timeout(timeout, process.session.search(fen, depth)).await
        {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!(
                "search exceeded {}s",
                self.config.search_timeout_secs
            )),
        };

        if let Err(e) = &result {
            tracing::warn!("Engine search failed, restarting on next use: {e:#}");
            if let Some(mut failed) = slot.take() {
                let _ = failed.child.kill().await;
            }
        }
        result
    }

    /// Send `quit`, wait briefly, then kill.
    pub async fn shutdown(&self) {
        let Some(mut process) = self.process.lock().await.take() else {
            return;
        };
        let _ = process.session.writer.write_line("quit").await;

        let exited = tokio::time::timeout(
            Duration::from_secs(SHUTDOWN_TIMEOUT_SECS),
            process.child.wait(),
        )
        .await;

        if exited.is_err() {
            tracing::debug!("Engine didn't exit in time, killing");
            let _ = process.child.kill().await;
        }
    }
}

struct EngineProcess {
    child: Child,
    session: UciSession<ChildStdout, ChildStdin>,
}

impl EngineProcess {
    async fn start(config: &UciConfig) -> Result<Self> {
        let resolved_cmd = which::which(&config.command)
            .with_context(|| format!("{} not found in PATH", config.command))?;
        let mut child = Command::new(&resolved_cmd)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning {}", config.command))?;

        let stdout = child.stdout.take().context("no stdout from engine")?;
        let stdin = child.stdin.take().context("no stdin from engine")?;
        let mut session = UciSession::new(stdout, stdin);

        let mut commands: Vec<String> = config
            .options
            .iter()
            .map(|(name, value)| protocol::setoption_command(name, value))
            .collect();
        if let Some(path) = &config.options_file {
            commands.extend(read_options_file(path).await?);
        }

        let timeout = Duration::from_secs(config.handshake_timeout_secs);
        tokio::time::timeout(timeout, session.handshake(&commands))
            .await
            .context("engine handshake timed out")??;

        tracing::info!("Engine '{}' ready", resolved_cmd.display());
        Ok(Self { child, session })
    }
}

async fn read_options_file(path: &Path) -> Result<Vec<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(protocol::parse_options_file(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("Engine options file {} not found", path.display());
            Ok(Vec::new())
        }
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

/// The UCI conversation over a pair of pipes.
struct UciSession<R, W> {
    reader: LineReader<R>,
    writer: LineWriter<W>,
}

impl<R: AsyncRead + Unpin, W: AsyncWrite + Unpin> UciSession<R, W> {
    fn new(reader: R, writer: W) -> Self {
        Self {
            reader: LineReader::new(reader),
            writer: LineWriter::new(writer),
        }
    }

    async fn next_line(&mut self) -> Result<String> {
        self.reader
            .read_line()
            .await?
            .context("engine closed stdout")
    }

    async fn handshake(&mut self, commands: &[String]) -> Result<()> {
        self.writer.write_line("uci").await?;
        while protocol::parse_line(&self.next_line().await?) != EngineLine::UciOk {}

        for command in commands {
            self.writer.write_line(command).await?;
        }
        self.sync().await
    }

    async fn sync(&mut self) -> Result<()> {
        self.writer.write_line("isready").await?;
        while protocol::parse_line(&self.next_line().await?) != EngineLine::ReadyOk {}
        Ok(())
    }

    async fn search(&mut self, fen: &str, depth: u32) -> Result<Option<BestMove>> {
        self.writer
            .write_line(&protocol::position_command(fen))
            .await?;
        self.sync().await?;
        self.writer
            .write_line(&protocol::go_depth_command(depth))
            .await?;

        let mut mate_in_one = false;
        loop {
            let line = self.next_line().await?;
            match protocol::parse_line(&line) {
                EngineLine::Info { mate: Some(1 | -1) } => mate_in_one = true,
                EngineLine::BestMove(None) => return Ok(None),
                EngineLine::BestMove(Some(token)) => {
                    let mv: UciMove = token
                        .parse()
                        .with_context(|| format!("engine returned malformed move {token:?}"))?;
                    return Ok(Some(BestMove { mv, mate_in_one }));
                }
                _ => {}
            }
        }
    }
}
