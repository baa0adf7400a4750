use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::timer::MAX_FOCUS_SECS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PauseOutcome {
    Completed,
    Skipped,
}

impl PauseOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PauseOutcome::Completed => "completed",
            PauseOutcome::Skipped => "skipped",
        }
    }
}

/// Every message the background service understands, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    /// Begin a focus session lasting `duration` seconds, replacing any
    /// session already running.
    StartFocusMode { duration: u64 },
    CancelFocusMode,
    GetRemainingTime,
    /// One-way notice that a pause overlay was resolved. Never answered.
    PauseResolved {
        domain: String,
        url: String,
        outcome: PauseOutcome,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl Request {
    pub fn expects_reply(&self) -> bool {
        !matches!(self, Request::PauseResolved { .. })
    }

    fn validate(self) -> Result<Self> {
        if let Request::StartFocusMode { duration } = self {
            if duration == 0 {
                bail!("focus duration must be positive");
            }
            if duration > MAX_FOCUS_SECS {
                bail!("focus duration {duration}s exceeds the {MAX_FOCUS_SECS}s limit");
            }
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    RemainingTime {
        #[serde(rename = "remainingTime")]
        remaining_time: u64,
    },
    Ack {
        success: bool,
    },
}

impl Response {
    pub fn ack() -> Self {
        Response::Ack { success: true }
    }

    pub fn remaining_secs(&self) -> Option<u64> {
        match self {
            Response::RemainingTime { remaining_time } => Some(*remaining_time),
            Response::Ack { .. } => None,
        }
    }
}

#[derive(Debug)]
pub enum Payload {
    Typed(Request),
    Raw(Value),
}

impl Payload {
    /// Decode into a known request. Unknown tags, missing fields and
    /// out-of-range values are all errors; the service drops such messages.
    pub fn into_request(self) -> Result<Request> {
        let request = match self {
            Payload::Typed(request) => request,
            Payload::Raw(value) => {
                serde_json::from_value(value).context("unrecognized message payload")?
            }
        };
        request.validate()
    }
}

#[derive(Debug)]
pub struct Envelope {
    pub payload: Payload,
    pub reply: Option<oneshot::Sender<Response>>,
}

impl Envelope {
    pub fn new(payload: Payload, reply: Option<oneshot::Sender<Response>>) -> Self {
        Self { payload, reply }
    }
}
