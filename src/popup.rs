//! Popup surface: starts and cancels focus sessions and keeps a countdown
//! in sync by polling the background service once a second.

use anyhow::{anyhow, bail, Result};
use log::{debug, warn};
use serde::Serialize;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Duration, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    messaging::{Request, Response, RuntimeClient},
    timer::MAX_FOCUS_SECS,
};

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// `M:SS`, minutes unbounded.
pub fn format_countdown(remaining_secs: u64) -> String {
    format!("{}:{:02}", remaining_secs / 60, remaining_secs % 60)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupStatus {
    pub remaining_secs: u64,
    pub countdown: String,
}

impl PopupStatus {
    pub fn new(remaining_secs: u64) -> Self {
        Self {
            remaining_secs,
            countdown: format_countdown(remaining_secs),
        }
    }

    pub fn is_focusing(&self) -> bool {
        self.remaining_secs > 0
    }
}

#[derive(Clone)]
pub struct Popup {
    runtime: RuntimeClient,
}

impl Popup {
    pub fn new(runtime: RuntimeClient) -> Self {
        Self { runtime }
    }

    pub async fn start_focus(&self, minutes: u64) -> Result<()> {
        if minutes == 0 {
            bail!("focus length must be at least one minute");
        }
        let duration = minutes
            .checked_mul(60)
            .filter(|secs| *secs <= MAX_FOCUS_SECS)
            .ok_or_else(|| anyhow!("focus length of {minutes} minutes is too long"))?;
        let response = self
            .runtime
            .send_message(Request::StartFocusMode { duration })
            .await?;
        expect_ack(response, "START_FOCUS_MODE")
    }

    pub async fn cancel_focus(&self) -> Result<()> {
        let response = self.runtime.send_message(Request::CancelFocusMode).await?;
        expect_ack(response, "CANCEL_FOCUS_MODE")
    }

    pub async fn remaining(&self) -> Result<u64> {
        match self.runtime.send_message(Request::GetRemainingTime).await? {
            Response::RemainingTime { remaining_time } => Ok(remaining_time),
            other => bail!("unexpected reply to GET_REMAINING_TIME: {other:?}"),
        }
    }

    pub async fn status(&self) -> Result<PopupStatus> {
        Ok(PopupStatus::new(self.remaining().await?))
    }
}

fn expect_ack(response: Response, tag: &str) -> Result<()> {
    match response {
        Response::Ack { success: true } => Ok(()),
        other => bail!("{tag} was not acknowledged: {other:?}"),
    }
}

/// Once-a-second remaining-time poll.
///
/// Publishes every successful read on a `watch` channel and stops after a
/// read of zero. Dropping the poller stops it.
pub struct StatusPoller {
    status: watch::Receiver<PopupStatus>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl StatusPoller {
    pub fn spawn(popup: Popup) -> Self {
        Self::spawn_with_interval(popup, POLL_INTERVAL)
    }

    pub fn spawn_with_interval(popup: Popup, period: Duration) -> Self {
        let (tx, rx) = watch::channel(PopupStatus::new(0));
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let status = match popup.status().await {
                    Ok(status) => status,
                    Err(err) => {
                        warn!("Remaining-time poll failed: {err:#}");
                        continue;
                    }
                };

                let done = !status.is_focusing();
                tx.send_replace(status);
                if done {
                    debug!("Focus countdown reached zero; poller stopping");
                    break;
                }
            }
        });

        Self {
            status: rx,
            cancel,
            handle,
        }
    }

    pub fn status(&self) -> PopupStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PopupStatus> {
        self.status.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}
