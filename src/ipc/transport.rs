//! The `PipeTransport` abstraction the engine runs its state machine over,
//! and the concrete local-socket implementation of it.
//!
//! Grounded on the teacher's `ipc::connection::IpcConnection` for platform
//! discovery and the read/write framing, generalized per the transport
//! contract in §4.2: `connect(target)` against a specific or auto-probed
//! endpoint, and a `read_frame()` that polls instead of blocking forever so
//! the worker thread stays responsive to shutdown and abort.

use crate::error::{DiscordIpcError, Result};
use crate::ipc::codec::{self, FrameHeader};
use crate::ipc::protocol::{constants, Opcode};
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use std::time::Duration;

/// One complete frame off the wire. Payload bytes are kept raw rather than
/// eagerly JSON-decoded: Ping/Pong bodies are opaque and must be echoed
/// byte-for-byte, so only the engine, which knows which opcodes carry JSON,
/// decides when to call [`Frame::json`].
#[derive(Debug, Clone)]
pub struct Frame {
    pub opcode: Opcode,
    pub raw: Vec<u8>,
}

impl Frame {
    pub fn json(&self) -> Result<Value> {
        codec::decode_payload(&self.raw)
    }
}

/// The engine's view of a local IPC endpoint. Implementations must not retry
/// internally on failure; they report it and let the engine's outer loop
/// decide whether and how long to back off.
pub trait PipeTransport {
    /// Attempts to connect. `target >= 0` tries exactly that endpoint index;
    /// `target < 0` probes `0..max_sockets` in order and uses the first that
    /// accepts a connection. Returns the index actually connected to.
    fn connect(&mut self, target: i32) -> Result<u8>;

    /// Writes one complete frame, JSON-serializing `payload`. Does not retry
    /// partial writes beyond what the underlying stream does internally.
    fn write_frame<T: Serialize>(&mut self, opcode: Opcode, payload: &T) -> Result<()>;

    /// Writes one complete frame carrying `bytes` verbatim as the payload,
    /// with no JSON encoding. Used to echo Ping payloads back as Pong.
    fn write_raw_frame(&mut self, opcode: Opcode, bytes: &[u8]) -> Result<()>;

    /// Blocks for up to the transport's configured poll granularity waiting
    /// for one complete frame. Returns `Ok(None)` on a timeout with no data
    /// available, and `Err` if the connection is confirmed broken.
    fn read_frame(&mut self) -> Result<Option<Frame>>;

    fn is_connected(&self) -> bool;

    fn connected_endpoint(&self) -> Option<u8>;

    fn close(&mut self);
}

#[cfg(unix)]
mod unix_impl {
    use super::*;
    use std::io::Read;
    use std::os::unix::net::UnixStream;

    pub struct LocalSocketTransport {
        stream: Option<UnixStream>,
        connected_endpoint: Option<u8>,
        poll_timeout: Duration,
        partial_header: Vec<u8>,
        custom_path: Option<String>,
    }

    impl LocalSocketTransport {
        pub fn new(poll_timeout: Duration) -> Self {
            Self {
                stream: None,
                connected_endpoint: None,
                poll_timeout,
                partial_header: Vec::new(),
                custom_path: None,
            }
        }

        /// A transport that always connects to `path` verbatim, ignoring the
        /// usual index-based discovery. `connect()`'s `target` argument is
        /// then ignored and the connected endpoint is reported as `0`.
        pub fn with_custom_path(poll_timeout: Duration, path: impl Into<String>) -> Self {
            Self {
                stream: None,
                connected_endpoint: None,
                poll_timeout,
                partial_header: Vec::new(),
                custom_path: Some(path.into()),
            }
        }

        fn candidate_directories() -> Vec<String> {
            let mut directories = Vec::new();
            for key in ["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"] {
                if let Ok(dir) = std::env::var(key) {
                    directories.push(dir);
                }
            }
            if directories.is_empty() {
                directories.push(format!("/run/user/{}", unsafe { libc::getuid() }));
            }
            directories.push("/tmp".to_string());

            // Sandboxed runtimes relocate XDG_RUNTIME_DIR under an app-specific
            // subtree; Discord (and the official client libraries) still probe
            // these so a sandboxed Discord install remains reachable.
            if let Ok(base) = std::env::var("XDG_RUNTIME_DIR") {
                directories.push(format!("{}/app/com.discordapp.Discord", base));
                directories.push(format!("{}/snap.discord", base));
            }

            directories
        }

        fn try_connect_one(path: &str) -> std::io::Result<UnixStream> {
            let stream = UnixStream::connect(path)?;
            stream.set_nonblocking(false)?;
            Ok(stream)
        }

        fn connect_index(index: u8) -> Option<UnixStream> {
            for dir in Self::candidate_directories() {
                let path = format!("{}/{}{}", dir, constants::IPC_SOCKET_PREFIX, index);
                if let Ok(stream) = Self::try_connect_one(&path) {
                    return Some(stream);
                }
            }
            None
        }

        /// Accumulates the 8-byte frame header into `partial_header` across
        /// however many calls it takes, so a poll timeout that lands after a
        /// short read doesn't drop already-consumed stream bytes on the
        /// floor. A short, non-blocking `read()` call (rather than
        /// `read_exact`) is what lets a timeout land mid-header without
        /// losing what was already read: `read_exact` would discard its
        /// local buffer and leave the stream's position already past those
        /// bytes, permanently desyncing every frame boundary after it.
        /// Returns `Ok(None)` if the header isn't complete yet.
        fn fill_header(&mut self) -> Result<Option<[u8; constants::IPC_HEADER_SIZE]>> {
            let stream = self.stream.as_mut().ok_or(DiscordIpcError::SocketClosed)?;

            while self.partial_header.len() < constants::IPC_HEADER_SIZE {
                let mut chunk = [0u8; constants::IPC_HEADER_SIZE];
                let remaining = constants::IPC_HEADER_SIZE - self.partial_header.len();
                match stream.read(&mut chunk[..remaining]) {
                    Ok(0) => {
                        self.connected_endpoint = None;
                        return Err(DiscordIpcError::SocketClosed);
                    }
                    Ok(n) => self.partial_header.extend_from_slice(&chunk[..n]),
                    Err(err)
                        if err.kind() == std::io::ErrorKind::WouldBlock
                            || err.kind() == std::io::ErrorKind::TimedOut =>
                    {
                        return Ok(None);
                    }
                    Err(_) => {
                        self.connected_endpoint = None;
                        return Err(DiscordIpcError::SocketClosed);
                    }
                }
            }

            let mut header_bytes = [0u8; constants::IPC_HEADER_SIZE];
            header_bytes.copy_from_slice(&self.partial_header);
            self.partial_header.clear();
            Ok(Some(header_bytes))
        }
    }

    impl PipeTransport for LocalSocketTransport {
        fn connect(&mut self, target: i32) -> Result<u8> {
            self.partial_header.clear();

            if let Some(path) = self.custom_path.clone() {
                let stream = Self::try_connect_one(&path).map_err(|_| DiscordIpcError::NoValidSocket)?;
                stream.set_read_timeout(Some(self.poll_timeout))?;
                self.stream = Some(stream);
                self.connected_endpoint = Some(0);
                return Ok(0);
            }

            if target >= 0 {
                let index = u8::try_from(target).map_err(|_| DiscordIpcError::InvalidPipeNumber(0))?;
                if index >= constants::MAX_IPC_SOCKETS {
                    return Err(DiscordIpcError::InvalidPipeNumber(index));
                }
                let stream = Self::connect_index(index).ok_or(DiscordIpcError::NoValidSocket)?;
                stream.set_read_timeout(Some(self.poll_timeout))?;
                self.stream = Some(stream);
                self.connected_endpoint = Some(index);
                return Ok(index);
            }

            for index in 0..constants::MAX_IPC_SOCKETS {
                if let Some(stream) = Self::connect_index(index) {
                    stream.set_read_timeout(Some(self.poll_timeout))?;
                    self.stream = Some(stream);
                    self.connected_endpoint = Some(index);
                    return Ok(index);
                }
            }
            Err(DiscordIpcError::NoValidSocket)
        }

        fn write_frame<T: Serialize>(&mut self, opcode: Opcode, payload: &T) -> Result<()> {
            let stream = self.stream.as_mut().ok_or(DiscordIpcError::SocketClosed)?;
            let frame = codec::encode_frame(opcode, payload)?;
            stream.write_all(&frame)?;
            Ok(())
        }

        fn write_raw_frame(&mut self, opcode: Opcode, bytes: &[u8]) -> Result<()> {
            let stream = self.stream.as_mut().ok_or(DiscordIpcError::SocketClosed)?;
            let opcode_value: u32 = opcode.into();
            let mut frame = Vec::with_capacity(constants::IPC_HEADER_SIZE + bytes.len());
            frame.extend_from_slice(&opcode_value.to_le_bytes());
            frame.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            frame.extend_from_slice(bytes);
            stream.write_all(&frame)?;
            Ok(())
        }

        fn read_frame(&mut self) -> Result<Option<Frame>> {
            let header_bytes = match self.fill_header()? {
                Some(header_bytes) => header_bytes,
                None => return Ok(None),
            };

            let FrameHeader { opcode, length } = codec::decode_header(&header_bytes)?;

            let mut raw = vec![0u8; length as usize];
            if length > 0 {
                let stream = self.stream.as_mut().ok_or(DiscordIpcError::SocketClosed)?;
                // A timeout mid-payload after the header has already been
                // consumed means a malformed or stalled peer, not "no data
                // yet"; we cannot un-read the header, so treat it as closed.
                stream.read_exact(&mut raw).map_err(|_| {
                    self.connected_endpoint = None;
                    DiscordIpcError::SocketClosed
                })?;
            }

            Ok(Some(Frame { opcode, raw }))
        }

        fn is_connected(&self) -> bool {
            self.stream.is_some() && self.connected_endpoint.is_some()
        }

        fn connected_endpoint(&self) -> Option<u8> {
            self.connected_endpoint
        }

        fn close(&mut self) {
            if let Some(stream) = self.stream.take() {
                let _ = stream.shutdown(std::net::Shutdown::Both);
            }
            self.connected_endpoint = None;
        }
    }
}

#[cfg(windows)]
mod windows_impl {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::{BufReader, BufWriter, Read};

    /// Named pipes on this platform have no portable read-timeout API short of
    /// raw `WaitNamedPipe`/overlapped IO, so `read_frame` blocks on the
    /// underlying `ReadFile` for as long as the peer takes to write. This
    /// mirrors every pure-std discord-rpc implementation for Windows; the
    /// poll-timeout contract in §4.2 is honored on Unix and best-effort here.
    pub struct LocalSocketTransport {
        reader: Option<BufReader<std::fs::File>>,
        writer: Option<BufWriter<std::fs::File>>,
        connected_endpoint: Option<u8>,
        poll_timeout: Duration,
        custom_path: Option<String>,
    }

    impl LocalSocketTransport {
        pub fn new(poll_timeout: Duration) -> Self {
            Self {
                reader: None,
                writer: None,
                connected_endpoint: None,
                poll_timeout,
                custom_path: None,
            }
        }

        /// A transport that always connects to `path` verbatim, ignoring the
        /// usual index-based discovery. `connect()`'s `target` argument is
        /// then ignored and the connected endpoint is reported as `0`.
        pub fn with_custom_path(poll_timeout: Duration, path: impl Into<String>) -> Self {
            Self {
                reader: None,
                writer: None,
                connected_endpoint: None,
                poll_timeout,
                custom_path: Some(path.into()),
            }
        }

        fn connect_index(index: u8) -> Option<std::fs::File> {
            let path = format!(r"\\.\pipe\{}{}", constants::IPC_SOCKET_PREFIX, index);
            OpenOptions::new().read(true).write(true).open(path).ok()
        }

        fn connect_path(path: &str) -> Option<std::fs::File> {
            OpenOptions::new().read(true).write(true).open(path).ok()
        }
    }

    impl PipeTransport for LocalSocketTransport {
        fn connect(&mut self, target: i32) -> Result<u8> {
            let _ = self.poll_timeout;
            if let Some(path) = self.custom_path.clone() {
                let file = Self::connect_path(&path).ok_or(DiscordIpcError::NoValidSocket)?;
                self.setup_streams(file, 0)?;
                return Ok(0);
            }

            if target >= 0 {
                let index = u8::try_from(target).map_err(|_| DiscordIpcError::InvalidPipeNumber(0))?;
                if index >= constants::MAX_IPC_SOCKETS {
                    return Err(DiscordIpcError::InvalidPipeNumber(index));
                }
                let file = Self::connect_index(index).ok_or(DiscordIpcError::NoValidSocket)?;
                self.setup_streams(file, index)?;
                return Ok(index);
            }

            for index in 0..constants::MAX_IPC_SOCKETS {
                if let Some(file) = Self::connect_index(index) {
                    self.setup_streams(file, index)?;
                    return Ok(index);
                }
            }
            Err(DiscordIpcError::NoValidSocket)
        }

        fn write_frame<T: Serialize>(&mut self, opcode: Opcode, payload: &T) -> Result<()> {
            let writer = self.writer.as_mut().ok_or(DiscordIpcError::SocketClosed)?;
            let frame = codec::encode_frame(opcode, payload)?;
            writer.write_all(&frame)?;
            writer.flush()?;
            Ok(())
        }

        fn write_raw_frame(&mut self, opcode: Opcode, bytes: &[u8]) -> Result<()> {
            let writer = self.writer.as_mut().ok_or(DiscordIpcError::SocketClosed)?;
            let opcode_value: u32 = opcode.into();
            let mut frame = Vec::with_capacity(constants::IPC_HEADER_SIZE + bytes.len());
            frame.extend_from_slice(&opcode_value.to_le_bytes());
            frame.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            frame.extend_from_slice(bytes);
            writer.write_all(&frame)?;
            writer.flush()?;
            Ok(())
        }

        fn read_frame(&mut self) -> Result<Option<Frame>> {
            let reader = self.reader.as_mut().ok_or(DiscordIpcError::SocketClosed)?;

            let mut header_bytes = [0u8; constants::IPC_HEADER_SIZE];
            reader.read_exact(&mut header_bytes).map_err(|_| {
                self.connected_endpoint = None;
                DiscordIpcError::SocketClosed
            })?;

            let FrameHeader { opcode, length } = codec::decode_header(&header_bytes)?;

            let mut raw = vec![0u8; length as usize];
            if length > 0 {
                reader.read_exact(&mut raw).map_err(|_| {
                    self.connected_endpoint = None;
                    DiscordIpcError::SocketClosed
                })?;
            }

            Ok(Some(Frame { opcode, raw }))
        }

        fn is_connected(&self) -> bool {
            self.reader.is_some() && self.connected_endpoint.is_some()
        }

        fn connected_endpoint(&self) -> Option<u8> {
            self.connected_endpoint
        }

        fn close(&mut self) {
            self.reader = None;
            self.writer = None;
            self.connected_endpoint = None;
        }
    }

    impl LocalSocketTransport {
        fn setup_streams(&mut self, file: std::fs::File, index: u8) -> Result<()> {
            let writer_file = file.try_clone()?;
            self.reader = Some(BufReader::new(file));
            self.writer = Some(BufWriter::new(writer_file));
            self.connected_endpoint = Some(index);
            Ok(())
        }
    }
}

#[cfg(unix)]
pub use unix_impl::LocalSocketTransport;
#[cfg(windows)]
pub use windows_impl::LocalSocketTransport;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_json_decodes_raw_bytes() {
        let frame = Frame {
            opcode: Opcode::Frame,
            raw: br#"{"evt":"READY"}"#.to_vec(),
        };
        assert_eq!(frame.opcode, Opcode::Frame);
        assert_eq!(frame.json().unwrap()["evt"], "READY");
    }

    #[cfg(unix)]
    #[test]
    fn connect_with_no_discord_running_returns_no_valid_socket() {
        std::env::set_var("XDG_RUNTIME_DIR", "/tmp/presenceforge-test-nonexistent-dir");
        let mut transport = LocalSocketTransport::new(Duration::from_millis(50));
        let result = transport.connect(-1);
        assert!(matches!(result, Err(DiscordIpcError::NoValidSocket)));
    }

    #[cfg(unix)]
    #[test]
    fn connect_rejects_out_of_range_target() {
        let mut transport = LocalSocketTransport::new(Duration::from_millis(50));
        let result = transport.connect(200);
        assert!(matches!(result, Err(DiscordIpcError::InvalidPipeNumber(_))));
    }
}
