use std::fmt::{self, Display};
use std::io;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Errors related to connecting to or maintaining the local IPC transport
    Connection,
    /// Errors related to the framed IPC wire protocol
    Protocol,
    /// Errors related to serialization/deserialization
    Serialization,
    /// Errors related to the Discord application itself
    Application,
    /// Caller misuse of the client API (wrong dispatch mode, disposed client, ...)
    Usage,
    /// A presence or command argument failed local validation
    Validation,
    /// Other unspecified errors
    Other,
}

impl Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => write!(f, "connection"),
            Self::Protocol => write!(f, "protocol"),
            Self::Serialization => write!(f, "serialization"),
            Self::Application => write!(f, "application"),
            Self::Usage => write!(f, "usage"),
            Self::Validation => write!(f, "validation"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Context attached to protocol desync errors (unexpected opcodes, oversized frames).
#[derive(Debug, Clone, Default)]
pub struct ProtocolContext {
    pub expected_opcode: Option<u32>,
    pub received_opcode: Option<u32>,
    pub payload_size: Option<u32>,
}

impl ProtocolContext {
    /// Context for a plain opcode mismatch, with no payload size to report.
    pub fn with_opcodes(expected: u32, received: u32) -> Self {
        Self {
            expected_opcode: Some(expected),
            received_opcode: Some(received),
            payload_size: None,
        }
    }
}

/// Errors that can occur during Discord IPC operations
#[derive(Error, Debug)]
pub enum DiscordIpcError {
    /// Failed to connect to any candidate Discord IPC socket or pipe
    #[error("Failed to connect to Discord IPC endpoint: {0}")]
    ConnectionFailed(#[source] io::Error),

    /// Connection attempt timed out
    #[error("Connection to Discord timed out after {0} ms")]
    ConnectionTimeout(u64),

    /// Failed to find a valid Discord IPC socket or pipe among the candidates
    #[error("No Discord IPC socket found. Is Discord running?")]
    NoValidSocket,

    /// The `target` pipe index supplied by the caller was out of range
    #[error("Invalid pipe number {0}, must be in 0..max_sockets")]
    InvalidPipeNumber(u8),

    /// Failed to serialize JSON payload
    #[error("Failed to serialize JSON payload: {0}")]
    SerializationFailed(#[source] serde_json::Error),

    /// Failed to deserialize JSON payload from Discord
    #[error("Failed to deserialize response from Discord: {0}")]
    DeserializationFailed(#[source] serde_json::Error),

    /// Received an invalid or unexpected response from Discord
    #[error("Invalid response from Discord: {0}")]
    InvalidResponse(String),

    /// Handshake with Discord failed
    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    /// Socket connection was closed unexpectedly
    #[error("Socket connection was closed unexpectedly")]
    SocketClosed,

    /// An opcode desync: an unknown opcode, or a Handshake opcode received
    /// outside the initial handshake sequence
    #[error("{message}")]
    ProtocolViolation {
        message: String,
        context: ProtocolContext,
    },

    #[error("Discord error: {code} - {message}")]
    DiscordError {
        /// The error code returned by Discord
        code: i32,
        /// The error message returned by Discord
        message: String,
    },

    #[error("Invalid activity: {0}")]
    InvalidActivity(String),

    /// Attempted an operation the client's current state doesn't permit:
    /// not initialized, already disposed, subscribing without a registered
    /// URI scheme, calling `invoke()` in auto-events mode, ...
    #[error("Invalid client usage: {0}")]
    UsageError(String),

    /// The host system clock is before the UNIX epoch
    #[error("System time error: {0}")]
    SystemTimeError(String),
}

impl DiscordIpcError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConnectionFailed(_)
            | Self::ConnectionTimeout(_)
            | Self::NoValidSocket
            | Self::InvalidPipeNumber(_)
            | Self::SocketClosed => ErrorCategory::Connection,

            Self::SerializationFailed(_) | Self::DeserializationFailed(_) => {
                ErrorCategory::Serialization
            }

            Self::InvalidResponse(_) | Self::HandshakeFailed(_) | Self::ProtocolViolation { .. } => {
                ErrorCategory::Protocol
            }

            Self::DiscordError { .. } => ErrorCategory::Application,

            Self::InvalidActivity(_) => ErrorCategory::Validation,

            Self::UsageError(_) => ErrorCategory::Usage,

            Self::SystemTimeError(_) => ErrorCategory::Other,
        }
    }

    pub fn is_connection_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::Connection)
    }

    /// Whether retrying the operation that produced this error is worthwhile
    /// without any change in caller behavior. Used by the connection engine's
    /// own outer reconnect loop.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout(_) | Self::SocketClosed | Self::InvalidResponse(_) | Self::NoValidSocket
        )
    }

    pub fn discord_error(code: i32, message: impl Into<String>) -> Self {
        Self::DiscordError {
            code,
            message: message.into(),
        }
    }

    pub fn protocol_violation(message: impl Into<String>, context: ProtocolContext) -> Self {
        Self::ProtocolViolation {
            message: message.into(),
            context,
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::UsageError(message.into())
    }
}

impl From<io::Error> for DiscordIpcError {
    fn from(error: io::Error) -> Self {
        Self::ConnectionFailed(error)
    }
}

impl From<serde_json::Error> for DiscordIpcError {
    fn from(error: serde_json::Error) -> Self {
        Self::SerializationFailed(error)
    }
}

/// Result type for Discord IPC operations
pub type Result<T = ()> = std::result::Result<T, DiscordIpcError>;
