//! Wire protocol: identifiers, message envelopes, error codes, room codes, validation.

pub mod error_codes;
pub mod messages;
pub mod room_codes;
pub mod types;
pub mod validation;

pub use error_codes::{close_codes, ErrorCode, ErrorPayload};
pub use messages::{ClientMessage, ServerMessage};
pub use room_codes::{generate_room_code, normalize_and_validate, ROOM_CODE_ALPHABET};
pub use types::{ChatMessageId, ConnectionRole, InviteId, PlayerId, RequestId, RoomCode, RoomDirectoryStatus};
pub use validation::{validate_chat_message, validate_player_name};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProtocolConfig;

    #[test]
    fn client_message_round_trips_through_json() {
        let msg = ClientMessage::DiceKeep {
            indices: vec![0, 2, 4],
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"dice.keep\""));
        let decoded: ClientMessage = serde_json::from_str(&json).unwrap();
        match decoded {
            ClientMessage::DiceKeep { indices } => assert_eq!(indices, vec![0, 2, 4]),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_fails_to_deserialize() {
        let raw = r#"{"type":"not.a.real.command","payload":{}}"#;
        assert!(serde_json::from_str::<ClientMessage>(raw).is_err());
    }

    #[test]
    fn error_payload_serializes_screaming_snake_case() {
        let payload = ErrorPayload::new(ErrorCode::RoomNotFound);
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"ROOM_NOT_FOUND\""));
    }

    #[test]
    fn room_code_generation_and_validation_agree() {
        let config = ProtocolConfig::default();
        let code = generate_room_code(&config);
        assert!(normalize_and_validate(code.as_str(), &config).is_some());
    }
}
