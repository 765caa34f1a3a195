//! JSON codec for WebSocket text frames

use serde_json::Value;

use crate::error::ProtocolError;
use crate::message::{Envelope, Inbound};

/// Default upper bound on the size of an inbound message (64 KiB)
pub const DEFAULT_MAX_INBOUND_BYTES: usize = 64 * 1024;

/// Codec for encoding outbound envelopes and decoding inbound messages
#[derive(Debug, Clone)]
pub struct JsonCodec {
    /// Messages larger than this are rejected before parsing
    max_inbound_bytes: usize,
}

impl JsonCodec {
    /// Create a new codec with the default size limit
    pub fn new() -> Self {
        Self {
            max_inbound_bytes: DEFAULT_MAX_INBOUND_BYTES,
        }
    }

    /// Create a codec with a custom inbound size limit
    pub fn with_max_inbound_bytes(max_inbound_bytes: usize) -> Self {
        Self { max_inbound_bytes }
    }

    /// Serialize an envelope into a text frame payload.
    ///
    /// Well-formed envelopes always serialize; an error here indicates a
    /// programming bug rather than a recoverable condition.
    pub fn encode(&self, envelope: &Envelope) -> Result<String, ProtocolError> {
        serde_json::to_string(envelope).map_err(ProtocolError::Encode)
    }

    /// Parse an inbound text frame.
    ///
    /// A recognized `type` with missing or mistyped fields is an error;
    /// an unrecognized `type` decodes to [`Inbound::Unknown`] so the caller
    /// can log it.
    pub fn decode(&self, text: &str) -> Result<Inbound, ProtocolError> {
        if text.len() > self.max_inbound_bytes {
            return Err(ProtocolError::PayloadTooLarge {
                size: text.len(),
                max: self.max_inbound_bytes,
            });
        }

        let value: Value = serde_json::from_str(text).map_err(ProtocolError::Decode)?;

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingField("type"))?
            .to_string();

        if !Inbound::KNOWN_TYPES.contains(&kind.as_str()) {
            return Ok(Inbound::Unknown { kind });
        }

        serde_json::from_value(value).map_err(|source| ProtocolError::InvalidField { kind, source })
    }
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Outbound;
    use crate::pin::PinId;

    #[test]
    fn test_decode_identified() {
        let codec = JsonCodec::new();
        let msg = codec.decode(r#"{"type":"identified"}"#).unwrap();
        assert_eq!(msg, Inbound::Identified);
    }

    #[test]
    fn test_decode_unknown_type() {
        let codec = JsonCodec::new();
        let msg = codec.decode(r#"{"type":"firmware_blob","data":"..."}"#).unwrap();
        assert_eq!(
            msg,
            Inbound::Unknown {
                kind: "firmware_blob".to_string()
            }
        );
        assert_eq!(msg.kind(), "firmware_blob");
    }

    #[test]
    fn test_decode_malformed() {
        let codec = JsonCodec::new();
        assert!(matches!(
            codec.decode("{not json"),
            Err(ProtocolError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_missing_type() {
        let codec = JsonCodec::new();
        assert!(matches!(
            codec.decode(r#"{"command":"get_status"}"#),
            Err(ProtocolError::MissingField("type"))
        ));
        assert!(matches!(
            codec.decode("[1, 2, 3]"),
            Err(ProtocolError::MissingField("type"))
        ));
    }

    #[test]
    fn test_decode_gpio_command_missing_state() {
        let codec = JsonCodec::new();
        match codec.decode(r#"{"type":"gpio_command","pin":17}"#) {
            Err(ProtocolError::InvalidField { kind, .. }) => assert_eq!(kind, "gpio_command"),
            other => panic!("expected InvalidField, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_command_with_null_params() {
        let codec = JsonCodec::new();
        let msg = codec
            .decode(r#"{"type":"command","command":"get_status","params":null}"#)
            .unwrap();
        assert!(matches!(msg, Inbound::Command { ref command, ref params }
            if command == "get_status" && params.is_empty()));
    }

    #[test]
    fn test_decode_too_large() {
        let codec = JsonCodec::with_max_inbound_bytes(16);
        let result = codec.decode(r#"{"type":"error","reason":"a very long reason"}"#);
        assert!(matches!(
            result,
            Err(ProtocolError::PayloadTooLarge { max: 16, .. })
        ));
    }

    #[test]
    fn test_encode_gpio_state() {
        let codec = JsonCodec::new();
        let envelope = Envelope::new(
            "raspberry_001",
            Outbound::GpioState {
                pin: PinId::new(17),
                state: true,
                name: "relay_1".to_string(),
            },
        );
        let text = codec.encode(&envelope).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "gpio_state");
        assert_eq!(value["name"], "relay_1");
        assert_eq!(value["state"], true);
    }
}
