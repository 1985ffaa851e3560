//! Presence daemon entrypoint.
//!
//! Polls a game server's player list over RCON and mirrors every join and
//! leave to the display, the indicator pins, the published snapshot and the
//! last-seen ledger.
//!
//! ## Subcommands
//!
//! - `run` (default): the poll loop, until SIGINT/SIGTERM
//! - `status`: prints who is online and who left recently, from local state

use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use tracing::{error, info, warn};

use presence_core::clock::SystemClock;
use presence_core::config::{DisplayKind, MirrorKind, MonitorConfig, PASSWORD_ENV};
use presence_core::display::{ConsoleDisplay, DisplaySurface, FileDisplay};
use presence_core::error::{PresenceError, Result};
use presence_core::indicator::{DeviceIndicator, Indicator, LogIndicator};
use presence_core::ledger::{Ledger, MemoryLedger, SqliteLedger};
use presence_core::mirror::{CopyMirror, NoMirror, RemoteMirror, ScpMirror};
use presence_core::monitor::PresenceMonitor;
use presence_core::source::RconRosterSource;
use presence_core::status::{build_report, render_text};
use presence_core::storage::StorageConfig;
use presence_core::transition::{Collaborators, TransitionHandler};

mod logging;
mod signals;

#[derive(Parser)]
#[command(name = "presence-daemon")]
#[command(about = "Game server presence monitor")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.presence/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Run the poll loop (default)
    Run,

    /// Print online players and recent departures
    Status {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run);

    let storage = match StorageConfig::from_home() {
        Ok(storage) => storage,
        Err(err) => {
            eprintln!("presence-daemon: {err}");
            std::process::exit(1);
        }
    };

    let log_dir = match command {
        Commands::Run => Some(storage.logs_dir()),
        Commands::Status { .. } => None,
    };
    let _logging_guard = logging::init(log_dir.as_deref());

    let config_path = cli.config.unwrap_or_else(|| storage.config_file());
    let config = match MonitorConfig::load(&config_path) {
        Ok(config) => config.with_password_override(env::var(PASSWORD_ENV).ok()),
        Err(err) => {
            error!(error = %err, path = %config_path.display(), "Failed to load config");
            std::process::exit(1);
        }
    };

    let result = match command {
        Commands::Run => run(&config, &storage),
        Commands::Status { json } => status(&config, &storage, json),
    };

    if let Err(err) = result {
        if err.is_consistency() {
            error!(error = %err, "Published snapshot diverged from the roster; stopping");
        } else {
            error!(error = %err, "presence-daemon failed");
        }
        std::process::exit(1);
    }
}

fn run(config: &MonitorConfig, storage: &StorageConfig) -> Result<()> {
    config.validate()?;
    signals::install().map_err(|err| PresenceError::io("Failed to install signal handlers", err))?;

    let settings = config.rcon_settings();
    let source = RconRosterSource::connect(&settings)?;
    let collaborators = build_collaborators(config, storage)?;
    let handler = TransitionHandler::new(
        config.snapshot_path(storage),
        collaborators,
        config.indicator.dwell(),
    );

    info!(host = %settings.host, port = settings.port, "Presence daemon started");
    let mut monitor = PresenceMonitor::new(Box::new(source), handler, config.poll_interval());
    let outcome = monitor.run(signals::stop_flag());
    monitor.shutdown();
    outcome?;

    info!("Program ended");
    Ok(())
}

fn build_collaborators(config: &MonitorConfig, storage: &StorageConfig) -> Result<Collaborators> {
    let mirror: Box<dyn RemoteMirror> = match config.mirror.kind {
        MirrorKind::None => Box::new(NoMirror),
        MirrorKind::Copy => Box::new(CopyMirror::new(PathBuf::from(&config.mirror.target))),
        MirrorKind::Scp => Box::new(ScpMirror::new(
            config.mirror.host.clone(),
            config.mirror.user.clone(),
            config.mirror.identity_file.clone(),
            config.mirror.target.clone(),
        )),
    };

    let indicator: Box<dyn Indicator> = if config.indicator.enabled {
        Box::new(DeviceIndicator::open(
            &config.indicator.device,
            config.indicator.pins(),
        )?)
    } else {
        info!("Indicator disabled; pin changes are logged only");
        Box::new(LogIndicator)
    };

    let display: Box<dyn DisplaySurface> = match config.display.kind {
        DisplayKind::Console => Box::new(ConsoleDisplay),
        DisplayKind::File => Box::new(FileDisplay::new(config.display_path(storage))?),
    };

    Ok(Collaborators {
        mirror,
        ledger: Box::new(SqliteLedger::open(config.ledger_path(storage))?),
        indicator,
        display,
        clock: Box::new(SystemClock),
    })
}

fn status(config: &MonitorConfig, storage: &StorageConfig, json: bool) -> Result<()> {
    let ledger_path = config.ledger_path(storage);
    let ledger: Box<dyn Ledger> = if ledger_path.exists() {
        Box::new(SqliteLedger::open(ledger_path)?)
    } else {
        warn!(path = %ledger_path.display(), "Ledger not found; reporting no departures");
        Box::new(MemoryLedger::new())
    };

    let report = build_report(&config.snapshot_path(storage), ledger.as_ref())?;
    if json {
        let rendered = serde_json::to_string_pretty(&report).map_err(|err| PresenceError::Json {
            context: "Failed to serialize status report".to_string(),
            source: err,
        })?;
        println!("{rendered}");
    } else {
        print!("{}", render_text(&report));
    }
    Ok(())
}
