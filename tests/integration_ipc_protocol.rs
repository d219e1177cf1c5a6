use presenceforge::{Command, DiscordIpcError, Opcode};
use serde_json::json;
use std::convert::TryFrom;

#[test]
fn opcode_try_from_handles_valid_and_invalid_cases() {
    assert!(matches!(Opcode::try_from(0).unwrap(), Opcode::Handshake));
    assert!(matches!(Opcode::try_from(4).unwrap(), Opcode::Pong));

    let err = Opcode::try_from(99).unwrap_err();
    match err {
        DiscordIpcError::ProtocolViolation { context, .. } => {
            assert_eq!(context.received_opcode, Some(99));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn command_serializes_to_expected_strings() {
    let json = serde_json::to_string(&Command::SetActivity).expect("serialize command");
    assert_eq!(json, "\"SET_ACTIVITY\"");

    let message = json!({
        "cmd": Command::Subscribe,
        "args": json!({"event": "ACTIVITY_JOIN"}),
        "nonce": "abc123"
    });

    let serialized = serde_json::to_string(&message).expect("serialize embed message");
    assert!(serialized.contains("\"SUBSCRIBE\""));
}
