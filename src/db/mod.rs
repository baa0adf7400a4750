use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::oneshot;

mod migrations;
mod repositories;

use migrations::run_migrations;

pub use repositories::pause_logs::{day_key, PauseLogs, PAUSE_LOGS_KEY};
pub use repositories::site_history::SITE_HISTORY_KEY;

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum WorkerMsg {
    Run(Job),
    Stop,
}

struct Worker {
    jobs: mpsc::Sender<WorkerMsg>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        let handle = match self.thread.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(handle) = handle else {
            return;
        };

        if self.jobs.send(WorkerMsg::Stop).is_err() {
            debug!("storage thread already gone");
        }
        if handle.join().is_err() {
            error!("storage thread panicked");
        }
    }
}

/// Open the connection, migrate, then report readiness before serving jobs.
fn serve_jobs(path: &Path, jobs: mpsc::Receiver<WorkerMsg>, ready: mpsc::Sender<Result<()>>) {
    let mut conn = match Connection::open(path) {
        Ok(conn) => conn,
        Err(err) => {
            let _ = ready.send(Err(anyhow::Error::new(err)
                .context(format!("failed to open storage at {}", path.display()))));
            return;
        }
    };

    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        error!("Could not switch storage to WAL: {err}");
    }

    let migrated = run_migrations(&mut conn).context("storage migration failed");
    let usable = migrated.is_ok();
    if ready.send(migrated).is_err() || !usable {
        return;
    }

    for msg in jobs {
        match msg {
            WorkerMsg::Run(job) => job(&mut conn),
            WorkerMsg::Stop => break,
        }
    }
    info!("Storage thread stopped");
}

/// Local storage area backing the pause log and site history.
///
/// All SQLite work runs on one dedicated thread; callers hand it closures
/// through [`Database::execute`]. Every key holds a JSON document, so two
/// operations on the same key are serialized by the worker but a caller's
/// read and a later write are not.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
    path: Arc<PathBuf>,
}

impl Database {
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create storage directory {}", dir.display()))?;
        }

        let (jobs_tx, jobs_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let thread_path = path.clone();
        let thread = thread::Builder::new()
            .name("waitful-db".into())
            .spawn(move || serve_jobs(&thread_path, jobs_rx, ready_tx))
            .context("failed to spawn storage thread")?;

        ready_rx
            .recv()
            .context("storage thread exited during startup")??;
        info!("Storage ready at {}", path.display());

        Ok(Self {
            worker: Arc::new(Worker {
                jobs: jobs_tx,
                thread: Mutex::new(Some(thread)),
            }),
            path: Arc::new(path),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Run `task` on the storage thread and await its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |conn| {
            if reply_tx.send(task(conn)).is_err() {
                debug!("storage caller went away before its result");
            }
        });

        self.worker
            .jobs
            .send(WorkerMsg::Run(job))
            .map_err(|_| anyhow!("storage thread is not running"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("storage thread dropped the job"))?
    }

    /// Fetch and decode the JSON document stored under `key`.
    pub async fn get_value<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let key = key.to_string();
        self.execute(move |conn| read_value(conn, &key)).await
    }

    /// Replace the JSON document stored under `key`.
    pub async fn set_value<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let key = key.to_string();
        let encoded = serde_json::to_string(value)
            .with_context(|| format!("failed to encode storage value for {key}"))?;
        self.execute(move |conn| write_raw(conn, &key, &encoded))
            .await
    }
}

pub(crate) fn read_value<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<Option<T>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM storage WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("failed to read storage key {key}"))?;

    match raw {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .with_context(|| format!("storage key {key} holds malformed JSON")),
        None => Ok(None),
    }
}

pub(crate) fn write_value<T: Serialize + ?Sized>(
    conn: &Connection,
    key: &str,
    value: &T,
) -> Result<()> {
    let encoded = serde_json::to_string(value)
        .with_context(|| format!("failed to encode storage value for {key}"))?;
    write_raw(conn, key, &encoded)
}

fn write_raw(conn: &Connection, key: &str, encoded: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO storage (key, value, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET
             value = excluded.value,
             updated_at = excluded.updated_at",
        params![key, encoded, chrono::Utc::now().to_rfc3339()],
    )
    .with_context(|| format!("failed to write storage key {key}"))?;
    Ok(())
}
