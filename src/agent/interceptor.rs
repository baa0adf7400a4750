use std::sync::Arc;

use chrono::{Local, Utc};
use log::{debug, info, warn};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    breathing::{BreathingMachine, BreathingPattern, PauseDecision},
    db::{day_key, Database},
    messaging::{PauseOutcome, Request, RuntimeClient},
    models::PauseLogEntry,
    settings::{PauseSettings, SettingsStore},
};

use super::{
    overlay::{run_overlay, OverlayExit},
    site_match::{should_intercept, PageLocation},
    PageEvent, PageHost, VisitStats,
};

/// Reason recorded when the user continues from the primary button.
pub const PROCEED_REASON: &str = "proceed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutcome {
    /// No pause applied; the page rendered normally.
    Allowed,
    /// The user chose to wait.
    Honored,
    /// The user continued to the site.
    Bypassed { reason: String },
    /// The page went away while the overlay was up.
    Abandoned,
}

#[derive(Clone)]
pub struct InterceptionAgent {
    settings: Arc<SettingsStore>,
    db: Database,
    runtime: RuntimeClient,
    pattern: BreathingPattern,
}

impl InterceptionAgent {
    pub fn new(settings: Arc<SettingsStore>, db: Database, runtime: RuntimeClient) -> Self {
        Self {
            settings,
            db,
            runtime,
            pattern: BreathingPattern::default(),
        }
    }

    pub fn with_pattern(mut self, pattern: BreathingPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Handle one page load from first paint to teardown.
    ///
    /// Nothing here can leave the page covered: every failure path ends in
    /// `show_content`.
    pub async fn on_page_load<P: PageHost>(
        &self,
        raw_url: &str,
        page: &mut P,
        events: &mut mpsc::Receiver<PageEvent>,
    ) -> AgentOutcome {
        let load_id = Uuid::new_v4();
        page.hide_content();

        let location = match PageLocation::parse(raw_url) {
            Ok(location) => location,
            Err(err) => {
                warn!("[{load_id}] {err:#}; page left alone");
                page.show_content();
                return AgentOutcome::Allowed;
            }
        };

        let settings = self.load_settings(load_id);
        if !should_intercept(&settings, &location.domain) {
            debug!("[{load_id}] {} is not a distracting site", location.domain);
            page.show_content();
            return AgentOutcome::Allowed;
        }

        info!(
            "[{load_id}] Pausing {}s before {}",
            settings.pause_duration, location.domain
        );
        page.lock_scroll();

        let now_ms = Utc::now().timestamp_millis();
        let stats = self.record_visit(load_id, &location.domain, now_ms).await;
        self.log_event(
            load_id,
            PauseLogEntry::initiated(now_ms, &location.domain, settings.pause_duration),
        )
        .await;

        page.mount_overlay();
        let mut machine = BreathingMachine::new(settings.pause_duration, self.pattern);
        let exit = run_overlay(&location.domain, &mut machine, &stats, page, events).await;

        page.unmount_overlay();
        page.restore_scroll();
        page.show_content();

        match exit {
            OverlayExit::Unloaded => {
                info!("[{load_id}] Page left during the pause on {}", location.domain);
                AgentOutcome::Abandoned
            }
            OverlayExit::Decided(PauseDecision::Honored) => {
                let at = Utc::now().timestamp_millis();
                self.log_event(load_id, PauseLogEntry::completed(at, &location.domain))
                    .await;
                self.announce(&location, PauseOutcome::Completed, None);
                AgentOutcome::Honored
            }
            OverlayExit::Decided(PauseDecision::Bypassed { reason }) => {
                let at = Utc::now().timestamp_millis();
                self.log_event(load_id, PauseLogEntry::skipped(at, &location.domain, &reason))
                    .await;
                self.announce(&location, PauseOutcome::Skipped, Some(reason.clone()));
                AgentOutcome::Bypassed { reason }
            }
        }
    }

    fn load_settings(&self, load_id: Uuid) -> PauseSettings {
        match self.settings.pause_settings() {
            Ok(settings) => settings,
            Err(err) => {
                warn!("[{load_id}] Settings unavailable, pauses disabled for this page: {err:#}");
                PauseSettings::disabled()
            }
        }
    }

    async fn record_visit(&self, load_id: Uuid, domain: &str, now_ms: i64) -> VisitStats {
        match self.db.record_site_visit(domain, now_ms).await {
            Ok(previous) => VisitStats::from_history(&previous, now_ms),
            Err(err) => {
                warn!("[{load_id}] Could not update site history for {domain}: {err:#}");
                VisitStats::first_visit()
            }
        }
    }

    async fn log_event(&self, load_id: Uuid, entry: PauseLogEntry) {
        let action = entry.action;
        if let Err(err) = self.db.append_pause_event(day_key(Local::now()), entry).await {
            warn!("[{load_id}] Could not log {} pause: {err:#}", action.as_str());
        }
    }

    fn announce(&self, location: &PageLocation, outcome: PauseOutcome, reason: Option<String>) {
        self.runtime.notify(Request::PauseResolved {
            domain: location.domain.clone(),
            url: location.url.clone(),
            outcome,
            reason,
        });
    }
}
