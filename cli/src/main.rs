//! ChessPilot CLI - binary entry point.
//!
//! Wires the sensor bridge and the UCI engine into a [`Session`], prints
//! status lines to stdout and reads console commands from stdin.
//!
//! ```text
//! main() -> load config -> start bridge + engine -> Session
//!                                                    |
//!            stdin commands -> play / auto / side / style / castle / quit
//! ```
//!
//! Logs go to `~/.chesspilot/logs/chesspilot.log`; stdout carries status only.

mod console;

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use chesspilot_bridge::BridgeClient;
use chesspilot_engine::adapters::{BridgeDetector, DryRunActuator};
use chesspilot_engine::status::ChannelStatus;
use chesspilot_engine::verify::PlacementVerifier;
use chesspilot_engine::{
    Collaborators, DrivingLoop, InputActuator, PilotConfig, PilotSettings, Session, SessionFlags,
    SidePreference, data_dir, spawn_play_move,
};
use chesspilot_types::{CastlingRights, ExecutionStyle};
use chesspilot_uci::UciEngine;

use console::{Command, HELP};

#[derive(Parser, Debug)]
#[command(name = "chesspilot")]
#[command(about = "Plays the chess board on screen using a UCI engine")]
struct Args {
    /// Config file (default: ~/.chesspilot/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Side to play: white, black or auto
    #[arg(long)]
    side: Option<SidePreference>,
    /// Start in automatic mode
    #[arg(long)]
    auto: bool,
    /// Move entry style: drag or click
    #[arg(long)]
    style: Option<ExecutionStyle>,
    /// Castling rights still available: any of KQkq, or - for none
    #[arg(long)]
    castling: Option<CastlingRights>,
    /// Engine search depth
    #[arg(long)]
    depth: Option<u32>,
    /// Engine binary, overriding the config file
    #[arg(long)]
    engine: Option<String>,
    /// Log moves instead of performing them
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn apply(&self, settings: &mut PilotSettings) {
        if let Some(side) = self.side {
            settings.side = side;
        }
        if self.auto {
            settings.auto_play = true;
        }
        if let Some(style) = self.style {
            settings.style = style;
        }
        if let Some(castling) = self.castling {
            settings.castling = castling;
        }
        if let Some(depth) = self.depth.filter(|d| *d > 0) {
            settings.depth = depth;
        }
    }
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: stay quiet rather than mixing logs into status output.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, std::fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.chesspilot/logs/chesspilot.log
    if let Some(dir) = data_dir() {
        candidates.push(dir.join("logs").join("chesspilot.log"));
    }

    // Fallback: ./.chesspilot/logs/chesspilot.log
    candidates.push(
        PathBuf::from(".chesspilot")
            .join("logs")
            .join("chesspilot.log"),
    );

    candidates
}

fn load_config(path: Option<&Path>) -> Result<PilotConfig> {
    let loaded = match path {
        Some(path) => PilotConfig::load_from(path)?,
        None => PilotConfig::load()?,
    };
    Ok(loaded.unwrap_or_default())
}

/// Front-end state: the session plus the handle of the running loop.
struct Console {
    session: Arc<Session>,
    auto_task: Option<JoinHandle<()>>,
}

impl Console {
    /// Turn auto mode on. A loop left over from an earlier `auto off` may
    /// still be winding down; it is stopped and replaced.
    async fn start_auto(&mut self) {
        let flags = self.session.flags();
        let running = self.auto_task.as_ref().is_some_and(|task| !task.is_finished());
        if running && flags.auto_mode() {
            return;
        }
        if let Some(task) = self.auto_task.take() {
            task.abort();
            let _ = task.await;
        }
        flags.set_auto_mode(true);
        self.auto_task = Some(DrivingLoop::spawn(Arc::clone(&self.session)));
    }

    /// Returns `false` once the user asked to quit.
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Play => {
                spawn_play_move(Arc::clone(&self.session));
            }
            Command::Auto(true) => {
                self.start_auto().await;
                println!("Auto-play on.");
            }
            Command::Auto(false) => {
                self.session.flags().set_auto_mode(false);
                println!("Auto-play off.");
            }
            Command::Side(side) => {
                self.session.set_perspective(side);
                match side {
                    Some(side) => println!("Playing as {side}."),
                    None => println!("Side cleared."),
                }
            }
            Command::Style(style) => {
                self.session.flags().set_style(style);
                println!("Move style: {}.", style.as_str());
            }
            Command::Castle(rights) => {
                self.session.set_castling(rights);
                println!("Castling rights: {rights}.");
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => return false,
        }
        true
    }

    async fn close(self) {
        self.session.flags().close();
        if let Some(task) = self.auto_task {
            let _ = task.await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    let mut settings = config.settings()?;
    args.apply(&mut settings);

    let mut engine_config = config.engine.clone().unwrap_or_default();
    if let Some(command) = &args.engine {
        engine_config.command.clone_from(command);
    }
    let bridge_config = config.bridge.clone().unwrap_or_default();

    let bridge = Arc::new(
        BridgeClient::start(&bridge_config)
            .await
            .context("starting sensor bridge")?,
    );
    let engine = Arc::new(UciEngine::new(engine_config));
    if let Err(e) = engine.warm_up().await {
        tracing::warn!("Engine warm-up failed: {e:#}");
        eprintln!("Engine not ready: {e:#}");
    }

    let initial_side = match settings.side {
        SidePreference::Fixed(side) => Some(side),
        SidePreference::Auto => None,
    };
    let flags = Arc::new(SessionFlags::new(initial_side, settings.style, false));
    let (status, mut status_rx) = ChannelStatus::new();
    let actuator: Arc<dyn InputActuator> = if args.dry_run {
        Arc::new(DryRunActuator)
    } else {
        bridge.clone()
    };
    let collab = Collaborators {
        capture: bridge.clone(),
        detector: Arc::new(BridgeDetector::new(bridge.clone(), Arc::clone(&flags))),
        encoder: bridge.clone(),
        oracle: engine.clone(),
        actuator,
        verifier: Arc::new(PlacementVerifier),
        status: Arc::new(status),
    };
    let auto_play = settings.auto_play;
    let session = Arc::new(Session::new(settings, collab, flags));

    let printer = tokio::spawn(async move {
        while let Some(line) = status_rx.recv().await {
            println!("{line}");
        }
    });

    println!("{HELP}");
    let mut console = Console {
        session,
        auto_task: None,
    };
    if auto_play {
        console.start_auto().await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("Failed to read stdin: {e}");
                        break;
                    }
                };
                match console::parse(&line) {
                    Ok(Some(command)) => {
                        if !console.handle(command).await {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(message) => println!("{message}"),
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    console.close().await;
    engine.shutdown().await;
    bridge.shutdown().await;
    printer.abort();
    Ok(())
}
