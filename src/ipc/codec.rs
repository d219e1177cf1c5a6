//! Binary framing for the Discord IPC wire protocol.
//!
//! Every frame is an 8-byte little-endian header (`opcode:u32`, `length:u32`)
//! followed by `length` bytes of JSON. This module turns that into
//! `encode_frame`/`decode_header` so [`crate::ipc::transport`] only has to
//! move bytes, and the engine only has to think in `(Opcode, Value)` pairs.

use crate::error::{DiscordIpcError, ProtocolContext, Result};
use crate::ipc::protocol::{constants, Opcode};
use byteorder::{LittleEndian, WriteBytesExt};
use serde::Serialize;
use serde_json::Value;
use std::io::Write;

/// A decoded frame header: opcode plus the byte length of the payload that follows.
#[derive(Debug, Clone, Copy)]
pub struct FrameHeader {
    pub opcode: Opcode,
    pub length: u32,
}

/// Serializes `payload` and wraps it in an opcode/length header, ready to be
/// written to the transport in one call.
pub fn encode_frame<T: Serialize>(opcode: Opcode, payload: &T) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(payload)?;
    if body.len() > constants::MAX_PAYLOAD_SIZE as usize {
        return Err(DiscordIpcError::protocol_violation(
            format!(
                "outbound payload of {} bytes exceeds max {} bytes",
                body.len(),
                constants::MAX_PAYLOAD_SIZE
            ),
            ProtocolContext {
                expected_opcode: None,
                received_opcode: Some(opcode.into()),
                payload_size: Some(body.len() as u32),
            },
        ));
    }

    let mut frame = Vec::with_capacity(constants::IPC_HEADER_SIZE + body.len());
    frame.write_u32::<LittleEndian>(opcode.into())?;
    frame.write_u32::<LittleEndian>(body.len() as u32)?;
    frame.write_all(&body)?;
    Ok(frame)
}

/// Decodes an 8-byte header previously read off the wire. Rejects a declared
/// payload length over [`constants::MAX_PAYLOAD_SIZE`] before the caller
/// allocates a buffer for it.
pub fn decode_header(raw: &[u8; constants::IPC_HEADER_SIZE]) -> Result<FrameHeader> {
    use byteorder::ReadBytesExt;
    let mut cursor = &raw[..];
    let opcode_raw = cursor.read_u32::<LittleEndian>()?;
    let length = cursor.read_u32::<LittleEndian>()?;

    let opcode = Opcode::try_from(opcode_raw).map_err(|_| {
        DiscordIpcError::protocol_violation(
            format!("received unknown opcode {}", opcode_raw),
            ProtocolContext {
                expected_opcode: None,
                received_opcode: Some(opcode_raw),
                payload_size: Some(length),
            },
        )
    })?;

    if length > constants::MAX_PAYLOAD_SIZE {
        return Err(DiscordIpcError::protocol_violation(
            format!(
                "declared payload length {} exceeds max {}",
                length,
                constants::MAX_PAYLOAD_SIZE
            ),
            ProtocolContext {
                expected_opcode: None,
                received_opcode: Some(opcode_raw),
                payload_size: Some(length),
            },
        ));
    }

    Ok(FrameHeader { opcode, length })
}

/// Parses a frame's JSON payload.
pub fn decode_payload(bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice(bytes).map_err(DiscordIpcError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::protocol::Command;
    use serde_json::json;

    #[test]
    fn encode_then_decode_header_roundtrips_opcode_and_length() {
        let payload = json!({"cmd": Command::SetActivity, "args": {}, "nonce": "1"});
        let frame = encode_frame(Opcode::Frame, &payload).unwrap();

        let mut header_bytes = [0u8; constants::IPC_HEADER_SIZE];
        header_bytes.copy_from_slice(&frame[..constants::IPC_HEADER_SIZE]);
        let header = decode_header(&header_bytes).unwrap();

        assert_eq!(header.opcode, Opcode::Frame);
        assert_eq!(header.length as usize, frame.len() - constants::IPC_HEADER_SIZE);
    }

    #[test]
    fn decode_header_rejects_unknown_opcode() {
        let mut raw = [0u8; constants::IPC_HEADER_SIZE];
        raw[0] = 99;
        assert!(decode_header(&raw).is_err());
    }

    #[test]
    fn decode_header_rejects_oversized_length() {
        let mut raw = [0u8; constants::IPC_HEADER_SIZE];
        raw[..4].copy_from_slice(&(Opcode::Frame as u32).to_le_bytes());
        raw[4..8].copy_from_slice(&(constants::MAX_PAYLOAD_SIZE + 1).to_le_bytes());
        assert!(decode_header(&raw).is_err());
    }

    #[test]
    fn decode_payload_parses_json_body() {
        let value = decode_payload(br#"{"evt":"READY"}"#).unwrap();
        assert_eq!(value["evt"], "READY");
    }
}
