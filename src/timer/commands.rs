use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::messaging::{Envelope, Request, Response};

use super::TimerService;

/// Background message loop. Messages are handled strictly one at a time in
/// arrival order; the loop ends when every client is gone or on shutdown.
pub async fn serve(
    service: TimerService,
    mut inbox: mpsc::UnboundedReceiver<Envelope>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            envelope = inbox.recv() => match envelope {
                Some(envelope) => handle_envelope(&service, envelope).await,
                None => break,
            },
            _ = shutdown.cancelled() => break,
        }
    }

    service.cancel().await;
    info!("Runtime message loop stopped");
}

pub async fn handle_envelope(service: &TimerService, envelope: Envelope) {
    let Envelope { payload, reply } = envelope;

    // Malformed messages get no reply; the sender's timeout is its only signal.
    let request = match payload.into_request() {
        Ok(request) => request,
        Err(err) => {
            debug!("Dropping malformed message: {err:#}");
            return;
        }
    };

    let reply = reply.filter(|_| request.expects_reply());
    let response = match request {
        Request::StartFocusMode { duration } => match service.start(duration).await {
            Ok(()) => Some(Response::ack()),
            Err(err) => {
                warn!("Failed to start focus session: {err:#}");
                None
            }
        },
        Request::CancelFocusMode => {
            service.cancel().await;
            Some(Response::ack())
        }
        Request::GetRemainingTime => Some(Response::RemainingTime {
            remaining_time: service.remaining().await,
        }),
        Request::PauseResolved {
            domain,
            outcome,
            reason,
            ..
        } => {
            info!(
                "Pause on {domain} {}{}",
                outcome.as_str(),
                reason.map(|r| format!(" ({r})")).unwrap_or_default()
            );
            None
        }
    };

    if let (Some(response), Some(reply)) = (response, reply) {
        if reply.send(response).is_err() {
            debug!("Caller went away before its reply was sent");
        }
    }
}
