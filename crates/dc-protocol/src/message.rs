//! Envelope and payload types for the debug console protocol
//!
//! Every frame on the wire is a single JSON object carried in one text
//! message. The console sends [`OutboundEnvelope`]s and receives
//! [`InboundEnvelope`]s:
//!
//! ```text
//! console -> server   {"channel": "rcon", "message": "status"}
//! server  -> console  {"packet_type": "rcon", "payload": "OK"}
//! ```
//!
//! The `message` and `payload` fields are opaque to the transport. This
//! module gives them typed shapes ([`Command`] and [`Packet`]) with an
//! explicit raw/unknown variant so that servers can introduce new packet
//! kinds without breaking older consoles.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::channel::ChannelName;

/// Script execution request sent on the `repl` channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplRequest {
    /// `true` evaluates `code` as an expression and echoes its value,
    /// `false` runs it as a statement block.
    pub repl: bool,
    /// Source text to run on the remote side
    pub code: String,
}

impl ReplRequest {
    /// Run `code` as a script
    pub fn exec(code: impl Into<String>) -> Self {
        Self {
            repl: false,
            code: code.into(),
        }
    }

    /// Evaluate `code` as an expression
    pub fn eval(code: impl Into<String>) -> Self {
        Self {
            repl: true,
            code: code.into(),
        }
    }
}

/// Outbound message payload.
///
/// The wire form carries no tag. Decoding tries `Rcon`, then `Repl`, then
/// `Raw`, so a `Raw` string or `{repl, code}` object reads back as the typed
/// variant. The JSON itself is unchanged either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// Raw administrative command line
    Rcon(String),
    /// Script execution request
    Repl(ReplRequest),
    /// Any other JSON value, passed through untouched
    Raw(Value),
}

impl From<&str> for Command {
    fn from(line: &str) -> Self {
        Command::Rcon(line.to_string())
    }
}

impl From<String> for Command {
    fn from(line: String) -> Self {
        Command::Rcon(line)
    }
}

impl From<ReplRequest> for Command {
    fn from(request: ReplRequest) -> Self {
        Command::Repl(request)
    }
}

impl From<Value> for Command {
    fn from(value: Value) -> Self {
        Command::Raw(value)
    }
}

/// Frame sent from the console to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutboundEnvelope {
    /// Channel the message is routed on
    pub channel: ChannelName,
    /// Caller-defined payload
    pub message: Command,
}

impl OutboundEnvelope {
    /// Create a new outbound envelope
    pub fn new(channel: impl Into<ChannelName>, message: impl Into<Command>) -> Self {
        Self {
            channel: channel.into(),
            message: message.into(),
        }
    }
}

/// Frame received from the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEnvelope {
    /// Routing discriminant, open-ended
    pub packet_type: String,
    /// Kind-specific payload
    pub payload: Value,
}

impl InboundEnvelope {
    /// Create a new inbound envelope
    pub fn new(packet_type: impl Into<String>, payload: Value) -> Self {
        Self {
            packet_type: packet_type.into(),
            payload,
        }
    }

    /// The packet kind of this envelope
    pub fn kind(&self) -> PacketKind {
        PacketKind::from(self.packet_type.as_str())
    }
}

/// Packet kind identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// Batch of log lines
    Log,
    /// Reply to an administrative command
    Rcon,
    /// Output of a script execution
    Repl,
    /// Any kind this console does not know about
    Other(String),
}

impl PacketKind {
    /// Wire name of this kind
    pub fn as_str(&self) -> &str {
        match self {
            PacketKind::Log => "log",
            PacketKind::Rcon => "rcon",
            PacketKind::Repl => "repl",
            PacketKind::Other(kind) => kind,
        }
    }

    /// Whether this is one of the kinds the console understands
    pub fn is_known(&self) -> bool {
        !matches!(self, PacketKind::Other(_))
    }
}

impl From<&str> for PacketKind {
    fn from(kind: &str) -> Self {
        match kind {
            "log" => PacketKind::Log,
            "rcon" => PacketKind::Rcon,
            "repl" => PacketKind::Repl,
            other => PacketKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed view of an inbound envelope
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Ordered log lines
    Log(Vec<String>),
    /// Administrative command output
    Rcon(String),
    /// Script execution output
    Repl(String),
    /// Unrecognized kind with its raw payload
    Unknown { kind: String, payload: Value },
}

impl Packet {
    /// Interpret an envelope according to its `packet_type`.
    ///
    /// Non-string text payloads are rendered as compact JSON. A `log`
    /// payload that is not an array is treated as a single line.
    pub fn from_envelope(envelope: InboundEnvelope) -> Self {
        match envelope.kind() {
            PacketKind::Log => match envelope.payload {
                Value::Array(items) => Packet::Log(items.into_iter().map(render).collect()),
                other => Packet::Log(vec![render(other)]),
            },
            PacketKind::Rcon => Packet::Rcon(render(envelope.payload)),
            PacketKind::Repl => Packet::Repl(render(envelope.payload)),
            PacketKind::Other(kind) => Packet::Unknown {
                kind,
                payload: envelope.payload,
            },
        }
    }

    /// Kind of this packet
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Log(_) => PacketKind::Log,
            Packet::Rcon(_) => PacketKind::Rcon,
            Packet::Repl(_) => PacketKind::Repl,
            Packet::Unknown { kind, .. } => PacketKind::Other(kind.clone()),
        }
    }

    /// Text lines to display, in order
    pub fn into_lines(self) -> Vec<String> {
        match self {
            Packet::Log(lines) => lines,
            Packet::Rcon(text) | Packet::Repl(text) => vec![text],
            Packet::Unknown { payload, .. } => vec![render(payload)],
        }
    }
}

impl From<InboundEnvelope> for Packet {
    fn from(envelope: InboundEnvelope) -> Self {
        Packet::from_envelope(envelope)
    }
}

fn render(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_packet_kind_from_str() {
        assert_eq!(PacketKind::from("log"), PacketKind::Log);
        assert_eq!(PacketKind::from("rcon"), PacketKind::Rcon);
        assert_eq!(PacketKind::from("repl"), PacketKind::Repl);
        assert_eq!(
            PacketKind::from("mystery"),
            PacketKind::Other("mystery".to_string())
        );
        assert!(!PacketKind::from("mystery").is_known());
        assert_eq!(PacketKind::from("mystery").as_str(), "mystery");
    }

    #[test]
    fn test_repl_request_constructors() {
        assert!(!ReplRequest::exec("print(1)").repl);
        assert!(ReplRequest::eval("1 + 1").repl);
    }

    #[test]
    fn test_command_serializes_untagged() {
        assert_eq!(
            serde_json::to_value(Command::from("status")).unwrap(),
            json!("status")
        );
        assert_eq!(
            serde_json::to_value(Command::from(ReplRequest::exec("x = 1"))).unwrap(),
            json!({"repl": false, "code": "x = 1"})
        );
    }

    #[test]
    fn test_command_with_extra_keys_stays_raw() {
        let value = json!({"repl": true, "code": "1", "extra": 3});
        let command: Command = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(command, Command::Raw(value));
    }

    #[test]
    fn test_log_packet_keeps_order() {
        let packet = Packet::from_envelope(InboundEnvelope::new("log", json!(["a", "b", "c"])));
        assert_eq!(
            packet,
            Packet::Log(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn test_log_packet_scalar_payload() {
        let packet = Packet::from_envelope(InboundEnvelope::new("log", json!("single")));
        assert_eq!(packet, Packet::Log(vec!["single".into()]));
    }

    #[test]
    fn test_non_string_payload_rendered_as_json() {
        let packet = Packet::from_envelope(InboundEnvelope::new("rcon", json!({"ok": true})));
        assert_eq!(packet, Packet::Rcon(r#"{"ok":true}"#.to_string()));
    }

    #[test]
    fn test_into_lines() {
        assert_eq!(
            Packet::Log(vec!["a".into(), "b".into()]).into_lines(),
            ["a", "b"]
        );
        assert_eq!(Packet::Repl("out".into()).into_lines(), ["out"]);
        let unknown = Packet::Unknown {
            kind: "stats".into(),
            payload: json!({"fps": 60}),
        };
        assert_eq!(unknown.into_lines(), [r#"{"fps":60}"#]);
    }

    #[test]
    fn test_unknown_packet_keeps_raw_payload() {
        let packet = Packet::from_envelope(InboundEnvelope::new("mystery", json!(42)));
        assert_eq!(packet.kind(), PacketKind::Other("mystery".into()));
        assert_eq!(
            packet,
            Packet::Unknown {
                kind: "mystery".into(),
                payload: json!(42)
            }
        );
    }
}
