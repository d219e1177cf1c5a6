use crate::error::{DiscordIpcError, ProtocolContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discord IPC Opcodes
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Opcode {
    Handshake = 0,
    Frame = 1,
    Close = 2,
    Ping = 3,
    Pong = 4,
}

impl Opcode {
    /// Check if this opcode is a response to a handshake
    /// In Discord IPC protocol, handshake responses actually use the Frame opcode (1)
    pub fn is_handshake_response(&self) -> bool {
        *self == Opcode::Frame
    }

    /// Check if this opcode is a response to a frame
    pub fn is_frame_response(&self) -> bool {
        *self == Opcode::Frame
    }
}

impl TryFrom<u32> for Opcode {
    type Error = DiscordIpcError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Opcode::Handshake),
            1 => Ok(Opcode::Frame),
            2 => Ok(Opcode::Close),
            3 => Ok(Opcode::Ping),
            4 => Ok(Opcode::Pong),
            _ => {
                let context = ProtocolContext {
                    expected_opcode: None,
                    received_opcode: Some(value),
                    payload_size: None,
                };
                Err(DiscordIpcError::protocol_violation(
                    format!("Invalid opcode value: {}", value),
                    context,
                ))
            }
        }
    }
}

impl From<Opcode> for u32 {
    fn from(opcode: Opcode) -> Self {
        opcode as u32
    }
}

/// Discord IPC Commands (the `cmd` field of an outbound frame)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    Dispatch,
    Authorize,
    Authenticate,
    GetVoiceSettings,
    SetVoiceSettings,
    SetActivity,
    SendActivityJoinInvite,
    CloseActivityJoinRequest,
    Subscribe,
    Unsubscribe,
}

/// Server-pushed event names (the `evt` field of a Dispatch frame, and of
/// subscribe/unsubscribe acknowledgements).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerEvent {
    Ready,
    Error,
    ActivityJoin,
    ActivitySpectate,
    ActivityJoinRequest,
    VoiceSettingsUpdate,
}

/// Discord IPC Message structure (an outbound frame envelope)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcMessage {
    pub cmd: Command,
    /// Omitted entirely (not sent as `null`) for no-argument commands, per
    /// the wire envelope rule that unset/optional fields are left out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    pub nonce: String,
    /// Present only on SUBSCRIBE/UNSUBSCRIBE, naming the event being (un)subscribed to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evt: Option<ServerEvent>,
}

impl IpcMessage {
    pub fn new(cmd: Command, args: Option<Value>, nonce: String) -> Self {
        Self {
            cmd,
            args,
            nonce,
            evt: None,
        }
    }

    pub fn with_event(cmd: Command, evt: ServerEvent, args: Option<Value>, nonce: String) -> Self {
        Self {
            cmd,
            args,
            nonce,
            evt: Some(evt),
        }
    }
}

/// Handshake payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakePayload {
    pub v: u32,
    pub client_id: String,
}

/// Constants and configuration for Discord IPC protocol
pub mod constants {
    /// Discord IPC protocol version
    ///
    /// This is the version number sent during the handshake process.
    /// Discord currently uses version 1 for its IPC protocol.
    /// This should match the version Discord expects.
    pub const IPC_VERSION: u32 = 1;

    /// Maximum number of IPC socket/pipe instances to scan
    ///
    /// Discord creates numbered IPC sockets from 0 to 9 (discord-ipc-0 through discord-ipc-9).
    /// Each socket represents a potential Discord client instance.
    /// Value of 10 allows checking all possible Discord instances.
    ///
    /// # Background
    /// - Discord can run multiple instances (PTB, Canary, Stable)
    /// - Each instance may use a different socket number
    /// - The official Discord RPC client scans up to 10 sockets
    ///
    /// # Platform Notes
    /// - Unix: Named sockets in XDG_RUNTIME_DIR or /tmp
    /// - Windows: Named pipes (\\\\.\\pipe\\discord-ipc-N)
    pub const MAX_IPC_SOCKETS: u8 = 10;

    /// IPC socket name prefix used for socket discovery
    ///
    /// Discord IPC sockets follow the naming pattern: `discord-ipc-{N}`
    /// where N is a number from 0 to MAX_IPC_SOCKETS-1.
    pub const IPC_SOCKET_PREFIX: &str = "discord-ipc-";

    /// Default connection retry interval in milliseconds
    ///
    /// When auto-discovery fails to find an available socket,
    /// the connection attempt waits this amount of time before retrying.
    /// 100ms provides a good balance between responsiveness and CPU usage.
    pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 100;

    /// Maximum size for IPC payload data (16 KiB)
    ///
    /// This matches the frame size Discord's own client actually enforces;
    /// a larger declared limit here would just mean we find out about an
    /// oversized payload from a `SocketClosed` error instead of rejecting it
    /// up front.
    pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024;

    /// Size of the IPC message header in bytes
    ///
    /// Discord IPC protocol uses an 8-byte header:
    /// - 4 bytes: Opcode (u32, little-endian)
    /// - 4 bytes: Payload length (u32, little-endian)
    pub const IPC_HEADER_SIZE: usize = 8;
}


