use std::sync::{Arc, Mutex};

use tokio::{
    sync::mpsc,
    time::{self, Duration},
};
use tokio_util::sync::CancellationToken;
use waitful_lib::{
    agent::{AgentOutcome, OverlayView, PageEvent, PageHost, UserChoice},
    breathing::BreathingPhase,
    models::PauseAction,
    popup::StatusPoller,
    shell::Shell,
    timer, AppState,
};

#[derive(Clone, Default)]
struct Frames {
    views: Arc<Mutex<Vec<OverlayView>>>,
    visible: Arc<Mutex<bool>>,
}

impl Frames {
    fn last(&self) -> Option<OverlayView> {
        self.views.lock().unwrap().last().cloned()
    }

    fn visible(&self) -> bool {
        *self.visible.lock().unwrap()
    }
}

impl PageHost for Frames {
    fn hide_content(&mut self) {
        *self.visible.lock().unwrap() = false;
    }
    fn show_content(&mut self) {
        *self.visible.lock().unwrap() = true;
    }
    fn lock_scroll(&mut self) {}
    fn restore_scroll(&mut self) {}
    fn mount_overlay(&mut self) {}
    fn render(&mut self, view: &OverlayView) {
        self.views.lock().unwrap().push(view.clone());
    }
    fn unmount_overlay(&mut self) {}
}

#[tokio::test(start_paused = true)]
async fn pause_runs_independently_of_the_focus_session() {
    let dir = tempfile::tempdir().unwrap();
    let (state, inbox) = AppState::open(dir.path()).unwrap();
    let shutdown = CancellationToken::new();
    tokio::spawn(timer::serve(state.timer.clone(), inbox, shutdown.clone()));

    state
        .settings
        .update(|settings| {
            settings.distracting_sites = vec!["example.com".into()];
            settings.pause_duration = 3;
        })
        .unwrap();

    let popup = state.popup();
    popup.start_focus(25).await.unwrap();
    let poller = StatusPoller::spawn(popup.clone());
    assert_eq!(state.timer.badge().text(), "25m");

    let frames = Frames::default();
    let (events, mut receiver) = mpsc::channel(8);
    let agent = state.agent();
    let mut page = frames.clone();
    let visit = tokio::spawn(async move {
        agent
            .on_page_load("https://www.example.com/home", &mut page, &mut receiver)
            .await
    });

    while frames.last().is_none() {
        tokio::task::yield_now().await;
    }
    assert!(!frames.visible());

    events
        .send(PageEvent::FocusChanged { focused: false })
        .await
        .unwrap();
    time::sleep(Duration::from_secs(5)).await;
    assert_eq!(frames.last().unwrap().state.remaining_seconds, 3);
    assert!(frames.last().unwrap().state.is_paused);

    events
        .send(PageEvent::FocusChanged { focused: true })
        .await
        .unwrap();
    time::sleep(Duration::from_secs(4)).await;
    assert_eq!(frames.last().unwrap().state.phase, BreathingPhase::Complete);

    events
        .send(PageEvent::Choose(UserChoice::Proceed("checking a message".into())))
        .await
        .unwrap();
    assert_eq!(
        visit.await.unwrap(),
        AgentOutcome::Bypassed {
            reason: "checking a message".into()
        }
    );
    assert!(frames.visible());

    // The focus session kept running underneath the pause.
    let status = poller.status();
    assert!(status.is_focusing());
    assert!(status.remaining_secs < 25 * 60);
    assert!(popup.remaining().await.unwrap() > 0);

    let logs: Vec<_> = state
        .db
        .pause_logs()
        .await
        .unwrap()
        .into_values()
        .flatten()
        .collect();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].action, PauseAction::Initiated);
    assert_eq!(logs[0].domain, "example.com");
    assert_eq!(logs[1].action, PauseAction::Skipped);
    assert_eq!(logs[1].reason.as_deref(), Some("checking a message"));

    shutdown.cancel();
}

#[tokio::test]
async fn scripted_shell_session() {
    let dir = tempfile::tempdir().unwrap();
    let (state, inbox) = AppState::open(dir.path()).unwrap();
    let shutdown = CancellationToken::new();
    tokio::spawn(timer::serve(state.timer.clone(), inbox, shutdown.clone()));

    let script: &[u8] = b"sites add Example.com\n\
        sites add news.example.org\n\
        sites remove news.example.org\n\
        focus 2\n\
        status\n\
        logs today\n\
        not-a-command\n\
        cancel\n\
        quit\n\
        focus 5\n";

    let shell = Shell::new(
        state.popup(),
        state.agent(),
        state.settings.clone(),
        state.db.clone(),
    );
    shell.run(script, shutdown.clone()).await.unwrap();

    let settings = state.settings.pause_settings().unwrap();
    assert_eq!(settings.distracting_sites, vec!["example.com".to_string()]);

    // `quit` stopped the shell before the last line.
    assert_eq!(state.timer.remaining().await, 0);
    assert!(!state.timer.session().await.is_active());

    shutdown.cancel();
}
