//! Line-oriented host for the binary.
//!
//! Stands in for the browser: shell commands play the popup, `visit` loads a
//! page through the interception agent, and while that page's overlay is up
//! every input line is a page event instead of a command.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, warn};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::mpsc,
    task::{JoinError, JoinHandle},
};
use tokio_util::sync::CancellationToken;

use crate::{
    agent::{
        AgentOutcome, InterceptionAgent, OverlayView, PageEvent, PageHost, UserChoice,
        PROCEED_REASON,
    },
    db::{day_key, Database},
    models::PauseLogEntry,
    popup::{Popup, StatusPoller},
    settings::SettingsStore,
    timer::Badge,
};

#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum ShellCommand {
    /// Start a focus session (defaults to the configured length)
    Focus { minutes: Option<u64> },
    /// Cancel the running focus session
    Cancel,
    /// Show the time left in the focus session
    Status,
    /// Load a page through the pause agent
    Visit { url: String },
    /// Manage the distracting-site list
    Sites {
        #[command(subcommand)]
        action: SitesAction,
    },
    /// Print the pause log
    Logs {
        #[arg(value_enum, default_value_t = LogScope::All)]
        scope: LogScope,
    },
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum SitesAction {
    List,
    Add { site: String },
    Remove { site: String },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogScope {
    All,
    Today,
}

fn parse_command(line: &str) -> Result<ShellCommand> {
    let words = line.split_whitespace();
    ShellLine::try_parse_from(words)
        .map(|parsed| parsed.command)
        .map_err(|err| anyhow!(err.render().to_string()))
}

/// Map one input line to a page event while an overlay is mounted.
pub fn parse_page_event(line: &str) -> Result<PageEvent> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default().to_ascii_lowercase();
    let rest: Vec<&str> = words.collect();

    let event = match verb.as_str() {
        "hide" => PageEvent::VisibilityChanged { hidden: true },
        "show" => PageEvent::VisibilityChanged { hidden: false },
        "blur" => PageEvent::FocusChanged { focused: false },
        "focus" => PageEvent::FocusChanged { focused: true },
        "key" => match rest.as_slice() {
            [combo] => PageEvent::KeyDown(combo.parse()?),
            _ => bail!("usage: key <combo>, e.g. key ctrl+r"),
        },
        "wait" => PageEvent::Choose(UserChoice::Wait),
        "proceed" => PageEvent::Choose(UserChoice::Proceed(PROCEED_REASON.to_string())),
        "leave" => PageEvent::Unload,
        "" => bail!("empty input"),
        other => bail!(
            "unknown page event {other:?} (hide, show, blur, focus, key <combo>, wait, proceed, leave)"
        ),
    };
    Ok(event)
}

/// Text lines for one overlay frame.
pub fn describe_view(view: &OverlayView) -> Vec<String> {
    let state = &view.state;
    let mut lines = vec![format!(
        "[{}] {} {}s",
        view.site,
        state.phase.as_str(),
        state.remaining_seconds
    )];

    if !view.message.is_empty() {
        lines.push(format!("  {}", view.message));
    }
    if let Some(reminder) = &view.reminder {
        lines.push(format!("  {reminder}"));
    }
    if let Some(stats) = &view.stats {
        lines.push(format!(
            "  Visits in the last 24 hours: {}",
            stats.visits_last_24h
        ));
        lines.push(format!("  Last visit: {}", stats.last_visit));
    }
    if !view.decisions.is_empty() {
        lines.push("  Type `wait` to step away or `proceed` to continue.".to_string());
    }
    lines
}

pub fn format_log_entry(entry: &PauseLogEntry) -> String {
    let at = Local
        .timestamp_millis_opt(entry.timestamp)
        .single()
        .map(|at| at.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| entry.timestamp.to_string());

    let mut line = format!("{at} {:<9} {}", entry.action.as_str(), entry.domain);
    if let Some(duration) = entry.duration {
        line.push_str(&format!(" {duration}s"));
    }
    if let Some(reason) = &entry.reason {
        line.push_str(&format!(" ({reason})"));
    }
    line
}

/// Page surface that writes to the terminal.
#[derive(Default)]
pub struct TerminalPage;

impl PageHost for TerminalPage {
    fn hide_content(&mut self) {
        debug!("page content hidden");
    }

    fn show_content(&mut self) {
        println!("(page visible)");
    }

    fn lock_scroll(&mut self) {
        debug!("page scroll locked");
    }

    fn restore_scroll(&mut self) {
        debug!("page scroll restored");
    }

    fn mount_overlay(&mut self) {
        println!("(pause overlay up; page events: hide, show, blur, focus, key <combo>, wait, proceed, leave)");
    }

    fn render(&mut self, view: &OverlayView) {
        for line in describe_view(view) {
            println!("{line}");
        }
    }

    fn unmount_overlay(&mut self) {
        debug!("pause overlay removed");
    }
}

/// Print every badge change until shutdown.
pub async fn watch_badge(badge: Badge, shutdown: CancellationToken) {
    let mut updates = badge.subscribe();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let text = updates.borrow_and_update().clone();
                if text.is_empty() {
                    println!("badge: (clear)");
                } else {
                    println!("badge: {text}");
                }
            }
        }
    }
}

struct Visit {
    events: mpsc::Sender<PageEvent>,
    handle: JoinHandle<AgentOutcome>,
}

enum Input {
    Line(Option<String>),
    VisitDone(Result<AgentOutcome, JoinError>),
    Shutdown,
}

enum Flow {
    Continue,
    Quit,
}

pub struct Shell {
    popup: Popup,
    agent: InterceptionAgent,
    settings: Arc<SettingsStore>,
    db: Database,
    focus_poller: Option<StatusPoller>,
}

impl Shell {
    pub fn new(
        popup: Popup,
        agent: InterceptionAgent,
        settings: Arc<SettingsStore>,
        db: Database,
    ) -> Self {
        Self {
            popup,
            agent,
            settings,
            db,
            focus_poller: None,
        }
    }

    pub async fn run<R>(mut self, input: R, shutdown: CancellationToken) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut visit: Option<Visit> = None;
        println!("waitful ready. Commands: focus [minutes], cancel, status, visit <url>, sites list|add|remove, logs [today], quit");

        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => Input::Shutdown,
                done = async {
                    match visit.as_mut() {
                        Some(active) => (&mut active.handle).await,
                        None => std::future::pending().await,
                    }
                }, if visit.is_some() => Input::VisitDone(done),
                line = lines.next_line() => Input::Line(line.context("Failed to read input")?),
            };

            match next {
                Input::Shutdown => break,
                Input::VisitDone(done) => {
                    visit = None;
                    match done {
                        Ok(outcome) => report_outcome(&outcome),
                        Err(err) => warn!("Page agent task failed: {err}"),
                    }
                }
                Input::Line(None) => break,
                Input::Line(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    if let Some(active) = visit.as_ref() {
                        match parse_page_event(line) {
                            Ok(event) => {
                                if active.events.send(event).await.is_err() {
                                    debug!("page already closed");
                                }
                            }
                            Err(err) => println!("{err:#}"),
                        }
                        continue;
                    }

                    match self.handle_line(line, &mut visit).await {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Quit) => break,
                        Err(err) => println!("error: {err:#}"),
                    }
                }
            }
        }

        if let Some(active) = visit.take() {
            let _ = active.events.send(PageEvent::Unload).await;
            if let Ok(outcome) = active.handle.await {
                report_outcome(&outcome);
            }
        }
        Ok(())
    }

    async fn handle_line(&mut self, line: &str, visit: &mut Option<Visit>) -> Result<Flow> {
        match parse_command(line)? {
            ShellCommand::Focus { minutes } => {
                let minutes = match minutes {
                    Some(minutes) => minutes,
                    None => self.settings.pause_settings()?.default_focus_minutes,
                };
                self.popup.start_focus(minutes).await?;
                self.track_focus();
                println!("Focus session started for {minutes} min.");
            }
            ShellCommand::Cancel => {
                self.popup.cancel_focus().await?;
                self.focus_poller = None;
                println!("Focus session cancelled.");
            }
            ShellCommand::Status => {
                let status = self.popup.status().await?;
                if status.is_focusing() {
                    println!("Focusing: {} left", status.countdown);
                } else {
                    println!("No focus session.");
                }
            }
            ShellCommand::Visit { url } => {
                *visit = Some(self.open_page(url));
            }
            ShellCommand::Sites { action } => self.edit_sites(action)?,
            ShellCommand::Logs { scope } => self.print_logs(scope).await?,
            ShellCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn open_page(&self, url: String) -> Visit {
        let (events, mut receiver) = mpsc::channel(32);
        let agent = self.agent.clone();
        let handle = tokio::spawn(async move {
            let mut page = TerminalPage;
            agent.on_page_load(&url, &mut page, &mut receiver).await
        });
        Visit { events, handle }
    }

    /// Poll the session once a second and say so when it runs out.
    fn track_focus(&mut self) {
        let poller = StatusPoller::spawn(self.popup.clone());
        let mut updates = poller.subscribe();
        tokio::spawn(async move {
            let mut focusing = false;
            while updates.changed().await.is_ok() {
                let status = updates.borrow_and_update().clone();
                if status.is_focusing() {
                    focusing = true;
                } else if focusing {
                    println!("Focus session complete.");
                    break;
                }
            }
        });
        self.focus_poller = Some(poller);
    }

    fn edit_sites(&self, action: SitesAction) -> Result<()> {
        match action {
            SitesAction::List => {
                let settings = self.settings.pause_settings()?;
                if settings.distracting_sites.is_empty() {
                    println!("No distracting sites.");
                }
                for site in settings.distracting_sites {
                    println!("{site}");
                }
            }
            SitesAction::Add { site } => {
                let site = site.trim().to_ascii_lowercase();
                if site.is_empty() {
                    bail!("site must not be empty");
                }
                self.settings.update(|settings| {
                    if !settings.distracting_sites.contains(&site) {
                        settings.distracting_sites.push(site.clone());
                    }
                })?;
                println!("Added {site}.");
            }
            SitesAction::Remove { site } => {
                let site = site.trim().to_ascii_lowercase();
                let mut removed = false;
                self.settings.update(|settings| {
                    let before = settings.distracting_sites.len();
                    settings.distracting_sites.retain(|existing| *existing != site);
                    removed = settings.distracting_sites.len() != before;
                })?;
                if removed {
                    println!("Removed {site}.");
                } else {
                    println!("{site} was not on the list.");
                }
            }
        }
        Ok(())
    }

    async fn print_logs(&self, scope: LogScope) -> Result<()> {
        let days = match scope {
            LogScope::Today => {
                let today = day_key(Local::now());
                let entries = self.db.pause_logs_for_day(&today).await?;
                vec![(today, entries)]
            }
            LogScope::All => self.db.pause_logs().await?.into_iter().collect(),
        };

        if days.iter().all(|(_, entries)| entries.is_empty()) {
            println!("No pauses logged.");
            return Ok(());
        }

        for (day, entries) in days {
            if entries.is_empty() {
                continue;
            }
            println!("{day}");
            for entry in &entries {
                println!("  {}", format_log_entry(entry));
            }
        }
        Ok(())
    }
}

fn report_outcome(outcome: &AgentOutcome) {
    match outcome {
        AgentOutcome::Allowed => {}
        AgentOutcome::Honored => println!("Nice. You stepped away."),
        AgentOutcome::Bypassed { reason } => println!("Continuing to the site ({reason})."),
        AgentOutcome::Abandoned => println!("Page closed during the pause."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::VisitStats,
        breathing::{BreathingMachine, BreathingPattern, KeyCombo},
    };

    #[test]
    fn commands_parse() {
        assert_eq!(
            parse_command("focus 10").unwrap(),
            ShellCommand::Focus { minutes: Some(10) }
        );
        assert_eq!(
            parse_command("focus").unwrap(),
            ShellCommand::Focus { minutes: None }
        );
        assert_eq!(
            parse_command("visit https://example.com/").unwrap(),
            ShellCommand::Visit {
                url: "https://example.com/".into()
            }
        );
        assert_eq!(
            parse_command("sites add example.com").unwrap(),
            ShellCommand::Sites {
                action: SitesAction::Add {
                    site: "example.com".into()
                }
            }
        );
        assert_eq!(
            parse_command("logs").unwrap(),
            ShellCommand::Logs {
                scope: LogScope::All
            }
        );
        assert_eq!(
            parse_command("logs today").unwrap(),
            ShellCommand::Logs {
                scope: LogScope::Today
            }
        );
        assert_eq!(parse_command("exit").unwrap(), ShellCommand::Quit);
        assert!(parse_command("focus soon").is_err());
        assert!(parse_command("launch").is_err());
    }

    #[test]
    fn page_events_parse() {
        assert_eq!(
            parse_page_event("hide").unwrap(),
            PageEvent::VisibilityChanged { hidden: true }
        );
        assert_eq!(
            parse_page_event("blur").unwrap(),
            PageEvent::FocusChanged { focused: false }
        );
        assert_eq!(
            parse_page_event("key ctrl+r").unwrap(),
            PageEvent::KeyDown(KeyCombo::new("r").ctrl())
        );
        assert_eq!(
            parse_page_event("proceed").unwrap(),
            PageEvent::Choose(UserChoice::Proceed(PROCEED_REASON.into()))
        );
        assert_eq!(parse_page_event("leave").unwrap(), PageEvent::Unload);
        assert!(parse_page_event("key").is_err());
        assert!(parse_page_event("dance").is_err());
    }

    #[test]
    fn completed_view_lists_stats_and_choices() {
        let mut machine = BreathingMachine::new(1, BreathingPattern::default());
        machine.tick();
        let stats = VisitStats {
            visits_last_24h: 3,
            last_visit: "5 minutes ago".into(),
        };

        let lines = describe_view(&OverlayView::new("example.com", &machine, &stats));
        assert_eq!(lines[0], "[example.com] complete 0s");
        assert!(lines.iter().any(|l| l.contains("Visits in the last 24 hours: 3")));
        assert!(lines.iter().any(|l| l.contains("5 minutes ago")));
        assert!(lines.last().unwrap().contains("proceed"));
    }

    #[test]
    fn log_lines_carry_reason_and_duration() {
        let initiated = format_log_entry(&PauseLogEntry::initiated(0, "example.com", 7));
        assert!(initiated.ends_with("initiated example.com 7s"));

        let skipped = format_log_entry(&PauseLogEntry::skipped(0, "example.com", "proceed"));
        assert!(skipped.ends_with("skipped   example.com (proceed)"));
    }
}
