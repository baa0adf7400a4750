use log::debug;
use tokio::{
    sync::mpsc,
    time::{self, Duration, Instant, MissedTickBehavior},
};

use crate::breathing::{BreathingMachine, PauseDecision};

use super::{OverlayView, PageEvent, PageHost, UserChoice, VisitStats};

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayExit {
    Decided(PauseDecision),
    /// The page went away before a decision.
    Unloaded,
}

/// Drive a mounted overlay until the user decides or the page unloads.
///
/// The one-second ticker lives in this future, so it is released the moment
/// the overlay stops, whichever way it stops.
pub async fn run_overlay<P: PageHost>(
    site: &str,
    machine: &mut BreathingMachine,
    stats: &VisitStats,
    page: &mut P,
    events: &mut mpsc::Receiver<PageEvent>,
) -> OverlayExit {
    let mut ticker = time::interval_at(Instant::now() + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_view = OverlayView::new(site, machine, stats);
    page.render(&last_view);

    loop {
        tokio::select! {
            _ = ticker.tick() => machine.tick(),
            event = events.recv() => {
                let Some(event) = event else {
                    return OverlayExit::Unloaded;
                };
                match event {
                    PageEvent::Unload => return OverlayExit::Unloaded,
                    PageEvent::VisibilityChanged { hidden } => machine.set_hidden(hidden),
                    PageEvent::FocusChanged { focused } => machine.set_window_focused(focused),
                    PageEvent::KeyDown(combo) => {
                        if let Some(shortcut) = machine.intercept_key(&combo) {
                            debug!("Suppressed {} ({combo}) on {site}", shortcut.as_str());
                        }
                    }
                    PageEvent::Choose(choice) => {
                        let decision = match choice {
                            UserChoice::Wait => machine.honor(),
                            UserChoice::Proceed(reason) => machine.bypass(&reason),
                        };
                        match decision {
                            Some(decision) => return OverlayExit::Decided(decision),
                            None => debug!("Ignoring decision on {site} before the pause completed"),
                        }
                    }
                }
            }
        }

        let view = OverlayView::new(site, machine, stats);
        if view != last_view {
            page.render(&view);
            last_view = view;
        }
    }
}
