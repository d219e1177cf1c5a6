//! The Discord IPC wire protocol: opcodes, frame envelopes, the binary codec,
//! and the local-socket transport that moves bytes for the engine.

pub mod codec;
pub mod protocol;
pub mod transport;

pub use protocol::{constants, Command, HandshakePayload, IpcMessage, Opcode, ServerEvent};
pub use transport::{Frame, LocalSocketTransport, PipeTransport};
