//! Sink registration and packet dispatch

use std::collections::HashMap;
use std::sync::Arc;

use dc_core::traits::Sink;
use dc_protocol::{Packet, PacketKind};

use crate::markup;

/// Result of dispatching one packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A kind-specific sink ran `invocations` times
    Handled {
        kind: PacketKind,
        invocations: usize,
    },
    /// No specific sink; the fallback sink was told about the kind
    Fallback { kind: PacketKind },
    /// No specific sink and no fallback
    Unhandled { kind: PacketKind },
}

/// Packet kind to sink mapping, owned by one client
#[derive(Default)]
pub struct SinkTable {
    handlers: HashMap<PacketKind, Arc<dyn Sink>>,
    fallback: Option<Arc<dyn Sink>>,
    status: Option<Arc<dyn Sink>>,
}

impl SinkTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the sink for `kind`, returning the one it replaces
    pub fn register(&mut self, kind: PacketKind, sink: Arc<dyn Sink>) -> Option<Arc<dyn Sink>> {
        self.handlers.insert(kind, sink)
    }

    /// Register the sink for kinds with no specific sink
    pub fn register_fallback(&mut self, sink: Arc<dyn Sink>) -> Option<Arc<dyn Sink>> {
        self.fallback.replace(sink)
    }

    /// Register the sink for connection status notices
    pub fn register_status(&mut self, sink: Arc<dyn Sink>) -> Option<Arc<dyn Sink>> {
        self.status.replace(sink)
    }

    /// Whether a kind-specific sink exists for `kind`
    pub fn handles(&self, kind: &PacketKind) -> bool {
        self.handlers.contains_key(kind)
    }

    /// Sink for status notices: the explicit status sink, else the log sink
    pub fn status(&self) -> Option<&Arc<dyn Sink>> {
        self.status
            .as_ref()
            .or_else(|| self.handlers.get(&PacketKind::Log))
    }

    /// Echo a status notice, if anyone is listening
    pub fn notify(&self, text: &str) {
        if let Some(sink) = self.status() {
            sink.echo(text);
        }
    }

    /// Route a packet to exactly one sink.
    ///
    /// A kind-specific sink gets every line of the packet in order. Without
    /// one, the fallback sink receives a single notice naming the kind.
    pub fn dispatch(&self, packet: Packet) -> DispatchOutcome {
        let kind = packet.kind();

        if let Some(sink) = self.handlers.get(&kind) {
            let lines = packet.into_lines();
            for line in &lines {
                sink.echo(line);
            }
            return DispatchOutcome::Handled {
                kind,
                invocations: lines.len(),
            };
        }

        match &self.fallback {
            Some(fallback) => {
                fallback.echo(&markup::unhandled(kind.as_str()));
                DispatchOutcome::Fallback { kind }
            }
            None => DispatchOutcome::Unhandled { kind },
        }
    }
}

/// Sink printing to stdout, one prefixed line per output line
#[derive(Debug, Clone)]
pub struct ConsoleSink {
    prefix: String,
    raw: bool,
}

impl ConsoleSink {
    /// Create a sink labelled `prefix`; `raw` keeps markup intact
    pub fn new(prefix: impl Into<String>, raw: bool) -> Self {
        Self {
            prefix: prefix.into(),
            raw,
        }
    }

    /// Format `text` the way it is printed
    pub fn format(&self, text: &str) -> String {
        let text = if self.raw {
            text.to_string()
        } else {
            markup::strip(text)
        };

        if text.is_empty() {
            return format!("[{}]", self.prefix);
        }

        text.lines()
            .map(|line| format!("[{}] {}", self.prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Sink for ConsoleSink {
    fn echo(&self, text: &str) {
        println!("{}", self.format(text));
    }
}
