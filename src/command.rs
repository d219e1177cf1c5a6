//! Outbound commands: what the façade pushes onto the engine's outbound
//! queue. Each variant knows its own wire shape; the engine only needs
//! `prepare_payload` to turn one into a frame body, matching the sum-type
//! modeling called for over a command class hierarchy.

use crate::activity::Activity;
use crate::ipc::protocol::{Command, ServerEvent};
use crate::voice::VoiceSettings;
use serde_json::{json, Value};

/// A command queued for transmission by the façade. `Close` is an
/// engine-internal sentinel and is never serialized as a normal frame: the
/// write-drain loop recognizes it and writes the handshake-shaped "handwave"
/// body under `Opcode::Close` instead.
#[derive(Debug, Clone)]
pub enum OutboundCommand {
    Presence {
        pid: u32,
        activity: Option<Activity>,
    },
    Respond {
        user_id: String,
        accept: bool,
    },
    Subscribe {
        event: ServerEvent,
        unsubscribe: bool,
    },
    Authorize {
        client_id: String,
        scopes: Vec<String>,
    },
    Authenticate {
        access_token: String,
    },
    GetVoiceSettings,
    SetVoiceSettings {
        settings: VoiceSettings,
    },
    Close,
}

impl OutboundCommand {
    pub fn is_close_sentinel(&self) -> bool {
        matches!(self, Self::Close)
    }

    /// The wire `cmd` tag for this command. Meaningless for `Close`, which
    /// never reaches the normal frame path.
    pub fn wire_command(&self) -> Command {
        match self {
            Self::Presence { .. } => Command::SetActivity,
            Self::Respond { accept, .. } => {
                if *accept {
                    Command::SendActivityJoinInvite
                } else {
                    Command::CloseActivityJoinRequest
                }
            }
            Self::Subscribe { unsubscribe, .. } => {
                if *unsubscribe {
                    Command::Unsubscribe
                } else {
                    Command::Subscribe
                }
            }
            Self::Authorize { .. } => Command::Authorize,
            Self::Authenticate { .. } => Command::Authenticate,
            Self::GetVoiceSettings => Command::GetVoiceSettings,
            Self::SetVoiceSettings { .. } => Command::SetVoiceSettings,
            Self::Close => Command::SetActivity, // unreachable; see is_close_sentinel
        }
    }

    /// The event name carried in the envelope's optional `evt` field, for
    /// the commands that need one.
    pub fn wire_event(&self) -> Option<ServerEvent> {
        match self {
            Self::Subscribe { event, .. } => Some(*event),
            _ => None,
        }
    }

    /// Builds the `args` body for this command. `None` means "omit `args`
    /// entirely", for commands that take none.
    pub fn args(&self) -> Option<Value> {
        match self {
            Self::Presence { pid, activity } => Some(json!({
                "pid": pid,
                "activity": activity,
            })),
            Self::Respond { user_id, .. } => Some(json!({ "user_id": user_id })),
            Self::Subscribe { .. } => None,
            Self::Authorize { client_id, scopes } => Some(json!({
                "client_id": client_id,
                "scopes": scopes,
            })),
            Self::Authenticate { access_token } => Some(json!({
                "access_token": access_token,
            })),
            Self::GetVoiceSettings => None,
            Self::SetVoiceSettings { settings } => Some(settings.as_value().clone()),
            Self::Close => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respond_accept_maps_to_send_invite() {
        let command = OutboundCommand::Respond {
            user_id: "u1".into(),
            accept: true,
        };
        assert_eq!(command.wire_command(), Command::SendActivityJoinInvite);
    }

    #[test]
    fn respond_decline_maps_to_close_join_request() {
        let command = OutboundCommand::Respond {
            user_id: "u1".into(),
            accept: false,
        };
        assert_eq!(command.wire_command(), Command::CloseActivityJoinRequest);
    }

    #[test]
    fn subscribe_toggles_command_by_unsubscribe_flag() {
        let subscribe = OutboundCommand::Subscribe {
            event: ServerEvent::ActivityJoin,
            unsubscribe: false,
        };
        let unsubscribe = OutboundCommand::Subscribe {
            event: ServerEvent::ActivityJoin,
            unsubscribe: true,
        };
        assert_eq!(subscribe.wire_command(), Command::Subscribe);
        assert_eq!(unsubscribe.wire_command(), Command::Unsubscribe);
        assert_eq!(subscribe.wire_event(), Some(ServerEvent::ActivityJoin));
    }

    #[test]
    fn presence_args_carries_pid_and_activity() {
        let command = OutboundCommand::Presence {
            pid: 42,
            activity: None,
        };
        let args = command.args().unwrap();
        assert_eq!(args["pid"], 42);
        assert!(args["activity"].is_null());
    }

    #[test]
    fn close_is_recognized_as_sentinel() {
        assert!(OutboundCommand::Close.is_close_sentinel());
        assert!(!OutboundCommand::GetVoiceSettings.is_close_sentinel());
    }
}
