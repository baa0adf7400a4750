pub mod agent;
pub mod breathing;
pub mod db;
pub mod messaging;
pub mod models;
pub mod popup;
pub mod settings;
pub mod shell;
pub mod timer;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{error, info, warn};
use tokio::{io::BufReader, sync::mpsc, time::Duration};
use tokio_util::sync::CancellationToken;

use agent::InterceptionAgent;
use db::Database;
use messaging::{Envelope, RuntimeClient};
use popup::Popup;
use settings::SettingsStore;
use shell::Shell;
use timer::{Badge, TimerService};

pub const DATA_DIR_ENV: &str = "WAITFUL_DATA_DIR";
pub const DEBUG_ENV: &str = "WAITFUL_DEBUG";

#[derive(Parser, Debug)]
#[command(name = "waitful", version, about = "Breathe before distracting sites; time your focus")]
pub struct Cli {
    /// Where settings and the pause log live
    #[arg(long, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,
    /// Verbose logging
    #[arg(long)]
    pub debug: bool,
}

/// Long-lived pieces shared by every context.
pub struct AppState {
    pub db: Database,
    pub settings: Arc<SettingsStore>,
    pub timer: TimerService,
    pub runtime: RuntimeClient,
}

impl AppState {
    /// Open storage under `data_dir`. The returned inbox belongs to the
    /// background message loop (`timer::serve`).
    pub fn open(data_dir: &Path) -> Result<(Self, mpsc::UnboundedReceiver<Envelope>)> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let db = Database::new(data_dir.join("waitful.sqlite3"))?;
        let settings = Arc::new(SettingsStore::new(data_dir.join("settings.json"))?);
        let (runtime, inbox) = RuntimeClient::channel();

        let state = Self {
            db,
            settings,
            timer: TimerService::new(Badge::new()),
            runtime,
        };
        Ok((state, inbox))
    }

    pub fn agent(&self) -> InterceptionAgent {
        InterceptionAgent::new(self.settings.clone(), self.db.clone(), self.runtime.clone())
    }

    pub fn popup(&self) -> Popup {
        Popup::new(self.runtime.clone())
    }
}

pub fn resolve_data_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|dir| dir.join("waitful"))
        .ok_or_else(|| anyhow!("no data directory; pass --data-dir or set {DATA_DIR_ENV}"))
}

fn init_logging(debug: bool) {
    let debug = debug || std::env::var(DEBUG_ENV).is_ok_and(|value| value == "1");
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // RUST_LOG still wins when set.
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

pub fn run() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(err) = run_with(cli) {
        error!("{err:#}");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run_with(cli: Cli) -> Result<()> {
    let data_dir = resolve_data_dir(cli.data_dir)?;
    info!("Waitful starting with data in {}", data_dir.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build the async runtime")?;

    let result = runtime.block_on(async move {
        let (state, inbox) = AppState::open(&data_dir)?;
        let shutdown = CancellationToken::new();

        let service = tokio::spawn(timer::serve(state.timer.clone(), inbox, shutdown.clone()));
        let badge = tokio::spawn(shell::watch_badge(
            state.timer.badge().clone(),
            shutdown.clone(),
        ));

        {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupted; shutting down");
                    shutdown.cancel();
                }
            });
        }

        let shell = Shell::new(
            state.popup(),
            state.agent(),
            state.settings.clone(),
            state.db.clone(),
        );
        let result = shell
            .run(BufReader::new(tokio::io::stdin()), shutdown.clone())
            .await;

        shutdown.cancel();
        if let Err(err) = service.await {
            warn!("Runtime message loop ended abnormally: {err}");
        }
        if let Err(err) = badge.await {
            warn!("Badge watcher ended abnormally: {err}");
        }
        result
    });

    // stdin reads sit on a blocking thread that never returns on its own.
    runtime.shutdown_timeout(Duration::from_millis(250));
    info!("Waitful stopped");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_data_dir_wins() {
        let dir = resolve_data_dir(Some(PathBuf::from("/tmp/waitful-test"))).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/waitful-test"));
    }

    #[test]
    fn cli_flags_parse() {
        let cli = Cli::try_parse_from(["waitful", "--data-dir", "/tmp/w", "--debug"]).unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/w")));
        assert!(cli.debug);
    }

    #[test]
    fn open_creates_the_data_directory() {
        let root = tempfile::tempdir().unwrap();
        let data_dir = root.path().join("nested").join("waitful");
        let (state, _inbox) = AppState::open(&data_dir).unwrap();

        assert!(data_dir.is_dir());
        assert_eq!(state.db.path(), data_dir.join("waitful.sqlite3").as_path());
        assert_eq!(state.settings.path(), &data_dir.join("settings.json"));
    }
}
