use std::time::Duration;

use anyhow::{anyhow, Result};
use log::debug;
use serde_json::Value;
use tokio::{
    sync::{mpsc, oneshot},
    time,
};

use super::{Envelope, Payload, Request, Response};

pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// A context's handle onto the background runtime.
///
/// Cloning is cheap; every context gets its own clone. Nothing here blocks:
/// a request parks only the calling task until its reply or timeout.
#[derive(Clone)]
pub struct RuntimeClient {
    sender: mpsc::UnboundedSender<Envelope>,
    reply_timeout: Duration,
}

impl RuntimeClient {
    /// Create a client and the inbox the background service will drain.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (sender, inbox) = mpsc::unbounded_channel();
        (
            Self {
                sender,
                reply_timeout: DEFAULT_REPLY_TIMEOUT,
            },
            inbox,
        )
    }

    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    pub async fn send_message(&self, request: Request) -> Result<Response> {
        self.request(Payload::Typed(request)).await
    }

    /// Send an untyped payload. The service decides whether it is a request.
    pub async fn send_raw(&self, value: Value) -> Result<Response> {
        self.request(Payload::Raw(value)).await
    }

    /// Fire-and-forget. Delivery failures are logged and otherwise ignored.
    pub fn notify(&self, request: Request) {
        if self
            .sender
            .send(Envelope::new(Payload::Typed(request), None))
            .is_err()
        {
            debug!("runtime inbox closed; notification dropped");
        }
    }

    async fn request(&self, payload: Payload) -> Result<Response> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(Envelope::new(payload, Some(reply_tx)))
            .map_err(|_| anyhow!("background runtime is not running"))?;

        match time::timeout(self.reply_timeout, reply_rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(anyhow!("message was dropped without a reply")),
            Err(_) => Err(anyhow!(
                "no reply within {}ms",
                self.reply_timeout.as_millis()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reply_is_delivered_to_the_caller() {
        let (client, mut inbox) = RuntimeClient::channel();
        tokio::spawn(async move {
            while let Some(envelope) = inbox.recv().await {
                if let Some(reply) = envelope.reply {
                    let _ = reply.send(Response::RemainingTime { remaining_time: 9 });
                }
            }
        });

        let response = client.send_message(Request::GetRemainingTime).await.unwrap();
        assert_eq!(response.remaining_secs(), Some(9));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_receiver_times_out() {
        let (client, _inbox) = RuntimeClient::channel();
        let client = client.with_reply_timeout(Duration::from_millis(250));

        let err = client.send_message(Request::GetRemainingTime).await.unwrap_err();
        assert!(err.to_string().contains("no reply"));
    }

    #[tokio::test]
    async fn closed_runtime_is_an_error() {
        let (client, inbox) = RuntimeClient::channel();
        drop(inbox);

        assert!(client.send_message(Request::CancelFocusMode).await.is_err());
        client.notify(Request::CancelFocusMode);
    }
}
