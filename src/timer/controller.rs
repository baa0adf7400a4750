use std::sync::Arc;

use anyhow::{bail, Result};
use log::{debug, info};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Duration, Instant, MissedTickBehavior},
};

use super::{format_badge, Badge, FocusSession, MAX_FOCUS_SECS};

/// Sole owner of the focus session.
///
/// `start`, `cancel` and `remaining` are the only ways to touch the session.
/// Clones share the same state; the background message loop holds one and
/// the badge ticker holds the session directly.
#[derive(Clone)]
pub struct TimerService {
    session: Arc<Mutex<FocusSession>>,
    badge: Badge,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
}

impl TimerService {
    pub fn new(badge: Badge) -> Self {
        Self {
            session: Arc::new(Mutex::new(FocusSession::new())),
            badge,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
        }
    }

    pub fn badge(&self) -> &Badge {
        &self.badge
    }

    /// Begin a session of `duration_secs`, overwriting any running one.
    pub async fn start(&self, duration_secs: u64) -> Result<()> {
        if duration_secs == 0 {
            bail!("focus duration must be greater than zero");
        }
        if duration_secs > MAX_FOCUS_SECS {
            bail!("focus duration {duration_secs}s exceeds the {MAX_FOCUS_SECS}s limit");
        }

        {
            let mut session = self.session.lock().await;
            if session.is_active() {
                debug!("replacing running focus session");
            }
            session.begin(duration_secs, Instant::now())?;
            self.badge.set_text(&format_badge(duration_secs));
        }

        self.spawn_ticker().await;
        info!("Focus session started for {duration_secs}s");
        Ok(())
    }

    /// Clear the session. Cancelling with nothing running is fine.
    pub async fn cancel(&self) {
        {
            let mut session = self.session.lock().await;
            if session.is_active() {
                info!("Focus session cancelled");
            }
            session.clear();
            self.badge.clear();
        }
        self.cancel_ticker().await;
    }

    /// Seconds left in the current session. Never mutates; expiry is the
    /// ticker's job.
    pub async fn remaining(&self) -> u64 {
        self.session.lock().await.remaining_secs(Instant::now())
    }

    pub async fn session(&self) -> FocusSession {
        self.session.lock().await.clone()
    }

    pub async fn is_ticking(&self) -> bool {
        self.ticker
            .lock()
            .await
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let session = self.session.clone();
        let badge = self.badge.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + tick_interval, tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;

                // Badge writes happen under the session lock so a concurrent
                // cancel can't be overwritten by a stale countdown.
                let mut guard = session.lock().await;
                if !guard.is_active() {
                    break;
                }

                let remaining = guard.remaining_secs(Instant::now());
                if remaining == 0 {
                    guard.clear();
                    badge.clear();
                    info!("Focus session finished");
                    break;
                }

                badge.set_text(&format_badge(remaining));
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn remaining_right_after_start_is_within_a_second() {
        let service = TimerService::new(Badge::new());
        for duration in [1, 4, 59, 1500, 7200] {
            service.start(duration).await.unwrap();
            let remaining = service.remaining().await;
            assert!(remaining <= duration && remaining + 1 >= duration);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_start_reads_zero() {
        let service = TimerService::new(Badge::new());
        service.start(1500).await.unwrap();
        assert_eq!(service.badge().text(), "25m");

        service.cancel().await;
        assert_eq!(service.remaining().await, 0);
        assert_eq!(service.badge().text(), "");
        assert!(!service.is_ticking().await);
    }

    #[tokio::test]
    async fn cancel_without_session_is_a_no_op() {
        let service = TimerService::new(Badge::new());
        service.cancel().await;
        service.cancel().await;
        assert_eq!(service.remaining().await, 0);
    }

    #[tokio::test]
    async fn zero_duration_is_rejected() {
        let service = TimerService::new(Badge::new());
        assert!(service.start(0).await.is_err());
        assert!(!service.session().await.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_duration_is_rejected_and_keeps_the_running_session() {
        let service = TimerService::new(Badge::new());
        service.start(600).await.unwrap();

        assert!(service.start(MAX_FOCUS_SECS + 1).await.is_err());
        assert!(service.start(u64::MAX).await.is_err());
        assert_eq!(service.session().await.duration_secs, 600);
        assert_eq!(service.badge().text(), "10m");

        service.start(MAX_FOCUS_SECS).await.unwrap();
        assert_eq!(service.remaining().await, MAX_FOCUS_SECS);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_overwrites_the_previous_session() {
        let service = TimerService::new(Badge::new());
        service.start(3600).await.unwrap();
        service.start(30).await.unwrap();

        assert_eq!(service.remaining().await, 30);
        assert_eq!(service.session().await.duration_secs, 30);
        assert_eq!(service.badge().text(), "30s");
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_counts_down_and_clears_on_expiry() {
        let service = TimerService::new(Badge::new());
        service.start(62).await.unwrap();
        assert_eq!(service.badge().text(), "1m");

        time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(service.badge().text(), "59s");
        assert!(service.is_ticking().await);

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(service.remaining().await, 0);
        assert!(!service.session().await.is_active());
        assert_eq!(service.badge().text(), "");
        assert!(!service.is_ticking().await);
    }
}
