//! JSON codec for console envelopes
//!
//! Framing is provided by the underlying text-message transport, so a
//! frame here is exactly one JSON document.

use serde_json::Value;

use crate::error::ProtocolError;
use crate::message::{InboundEnvelope, OutboundEnvelope};

/// Default upper bound on a single frame (1 MiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1 << 20;

/// Codec for encoding/decoding envelopes
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeCodec {
    max_frame_size: usize,
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvelopeCodec {
    /// Create a codec with the default frame size limit
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a codec with a custom frame size limit
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Maximum accepted frame size in bytes
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Encode an outbound envelope into a text frame
    pub fn encode(&self, envelope: &OutboundEnvelope) -> Result<String, ProtocolError> {
        let frame = serde_json::to_string(envelope)?;
        self.check_size(frame.len())?;
        Ok(frame)
    }

    /// Decode a text frame into an inbound envelope.
    ///
    /// The frame must be a JSON object with a string `packet_type` and a
    /// `payload` of any type. Extra keys are ignored.
    pub fn decode(&self, frame: &str) -> Result<InboundEnvelope, ProtocolError> {
        self.check_size(frame.len())?;

        let mut object = match serde_json::from_str::<Value>(frame)? {
            Value::Object(object) => object,
            other => return Err(ProtocolError::NotAnObject(json_type_name(&other))),
        };

        let packet_type = match object.remove("packet_type") {
            Some(Value::String(kind)) => kind,
            Some(_) => return Err(ProtocolError::InvalidPacketType),
            None => return Err(ProtocolError::MissingField("packet_type")),
        };
        let payload = object
            .remove("payload")
            .ok_or(ProtocolError::MissingField("payload"))?;

        Ok(InboundEnvelope {
            packet_type,
            payload,
        })
    }

    /// Encode an inbound envelope (server side of the protocol)
    pub fn encode_inbound(&self, envelope: &InboundEnvelope) -> Result<String, ProtocolError> {
        let frame = serde_json::to_string(envelope)?;
        self.check_size(frame.len())?;
        Ok(frame)
    }

    /// Decode an outbound envelope (server side of the protocol)
    pub fn decode_outbound(&self, frame: &str) -> Result<OutboundEnvelope, ProtocolError> {
        self.check_size(frame.len())?;
        Ok(serde_json::from_str(frame)?)
    }

    fn check_size(&self, size: usize) -> Result<(), ProtocolError> {
        if size > self.max_frame_size {
            return Err(ProtocolError::FrameTooLarge {
                size,
                max: self.max_frame_size,
            });
        }
        Ok(())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Command, ReplRequest};
    use serde_json::json;

    #[test]
    fn test_encode_has_exactly_two_keys() {
        let codec = EnvelopeCodec::new();
        let frame = codec
            .encode(&OutboundEnvelope::new("rcon", "status"))
            .unwrap();

        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value, json!({"channel": "rcon", "message": "status"}));
        assert_eq!(value.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_codec_roundtrip_preserves_message() {
        let codec = EnvelopeCodec::new();
        for message in [
            Command::from("kick all"),
            Command::from(ReplRequest::exec("for i in range(3):\n    print(i)")),
            Command::Raw(json!({"nested": [1, 2, {"deep": null}]})),
            Command::Raw(json!(3.5)),
            Command::Raw(json!("looks like rcon")),
            Command::Raw(json!({"repl": true, "code": "1 + 1"})),
        ] {
            let envelope = OutboundEnvelope::new("repl", message);
            let frame = codec.encode(&envelope).unwrap();
            let decoded = codec.decode_outbound(&frame).unwrap();
            assert_eq!(decoded.channel, envelope.channel);
            assert_eq!(
                serde_json::to_value(&decoded.message).unwrap(),
                serde_json::to_value(&envelope.message).unwrap()
            );
        }
    }

    #[test]
    fn test_raw_command_decodes_as_typed_variant() {
        let codec = EnvelopeCodec::new();

        let frame = codec
            .encode(&OutboundEnvelope::new("rcon", Command::Raw(json!("status"))))
            .unwrap();
        assert_eq!(
            codec.decode_outbound(&frame).unwrap().message,
            Command::from("status")
        );

        let frame = codec
            .encode(&OutboundEnvelope::new(
                "repl",
                Command::Raw(json!({"repl": false, "code": "x = 1"})),
            ))
            .unwrap();
        assert_eq!(
            codec.decode_outbound(&frame).unwrap().message,
            Command::from(ReplRequest::exec("x = 1"))
        );
    }

    #[test]
    fn test_inbound_roundtrip_preserves_payload() {
        let codec = EnvelopeCodec::new();
        let envelope = InboundEnvelope::new("log", json!(["a", {"b": 1}, 2]));
        let frame = codec.encode_inbound(&envelope).unwrap();
        assert_eq!(codec.decode(&frame).unwrap(), envelope);
    }

    #[test]
    fn test_decode_ignores_key_order_and_extra_keys() {
        let codec = EnvelopeCodec::new();
        let decoded = codec
            .decode(r#"{"payload": "OK", "seq": 7, "packet_type": "rcon"}"#)
            .unwrap();
        assert_eq!(decoded, InboundEnvelope::new("rcon", json!("OK")));
    }

    #[test]
    fn test_decode_null_payload_is_valid() {
        let codec = EnvelopeCodec::new();
        let decoded = codec
            .decode(r#"{"packet_type": "repl", "payload": null}"#)
            .unwrap();
        assert_eq!(decoded.payload, Value::Null);
    }

    #[test]
    fn test_decode_malformed_json() {
        let codec = EnvelopeCodec::new();
        assert!(matches!(
            codec.decode("{not json"),
            Err(ProtocolError::Json(_))
        ));
    }

    #[test]
    fn test_decode_wrong_shape() {
        let codec = EnvelopeCodec::new();
        assert!(matches!(
            codec.decode("[1, 2]"),
            Err(ProtocolError::NotAnObject("array"))
        ));
        assert!(matches!(
            codec.decode(r#"{"payload": 1}"#),
            Err(ProtocolError::MissingField("packet_type"))
        ));
        assert!(matches!(
            codec.decode(r#"{"packet_type": "log"}"#),
            Err(ProtocolError::MissingField("payload"))
        ));
        assert!(matches!(
            codec.decode(r#"{"packet_type": 3, "payload": 1}"#),
            Err(ProtocolError::InvalidPacketType)
        ));
    }

    #[test]
    fn test_frame_too_large() {
        let codec = EnvelopeCodec::with_max_frame_size(16);
        let result = codec.encode(&OutboundEnvelope::new("rcon", "a much longer command"));
        assert!(matches!(
            result,
            Err(ProtocolError::FrameTooLarge { max: 16, .. })
        ));
        assert!(matches!(
            codec.decode(r#"{"packet_type": "rcon", "payload": "x"}"#),
            Err(ProtocolError::FrameTooLarge { .. })
        ));
    }
}
