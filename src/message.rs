//! Inbound messages: what the worker thread produces for the caller, either
//! pushed onto the inbound queue (manual-events mode) or invoked directly as
//! a callback (auto-events mode). One sum type, per §9's "flatten to sum
//! types" design note, rather than a class hierarchy.

use crate::activity::Activity;
use crate::ipc::protocol::ServerEvent;
use crate::model::{Application, Configuration, User};
use std::time::Instant;

/// A message produced by the engine, with the instant it was created so
/// callers (and tests) can reason about delivery ordering and latency.
#[derive(Debug, Clone)]
pub struct Message {
    pub created_at: Instant,
    pub kind: MessageKind,
}

impl Message {
    pub fn new(kind: MessageKind) -> Self {
        Self {
            created_at: Instant::now(),
            kind,
        }
    }
}

#[derive(Debug, Clone)]
pub enum MessageKind {
    ConnectionEstablished { pipe: u8 },
    ConnectionFailed { pipe: Option<u8> },
    Ready { user: Option<User>, configuration: Configuration },
    Close { code: i32, reason: String },
    Error { code: i32, message: String },
    Presence { presence: Option<Activity> },
    /// A `Configuration` is attached by the façade, not the engine, per
    /// §4.6.1 (the engine has no access to the cached configuration).
    JoinRequest { user: User, configuration: Option<Configuration> },
    Join { secret: String },
    Spectate { secret: String },
    Subscribe { event: ServerEvent },
    Unsubscribe { event: ServerEvent },
    Authorize { code: String },
    Authenticate {
        user: User,
        scopes: Vec<String>,
        expires: String,
        application: Application,
    },
    VoiceSettings { settings: crate::voice::VoiceSettings },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_stamps_creation_time() {
        let before = Instant::now();
        let message = Message::new(MessageKind::Join {
            secret: "s".into(),
        });
        assert!(message.created_at >= before);
    }
}
