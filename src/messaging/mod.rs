//! Message passing between the background service and the per-page and
//! popup contexts.
//!
//! Contexts never share memory. Each one holds a [`RuntimeClient`] and talks
//! to the background [`crate::timer::TimerService`] through [`Envelope`]s;
//! replies come back on a per-request `oneshot`, so a request gets at most
//! one reply. Requests from different contexts are not ordered with respect
//! to each other, and every reply is an independent snapshot.

mod client;
mod protocol;

pub use client::{RuntimeClient, DEFAULT_REPLY_TIMEOUT};
pub use protocol::{Envelope, Payload, PauseOutcome, Request, Response};
