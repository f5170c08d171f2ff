//! Sink trait

/// Consumer of decoded console output.
///
/// Sinks are invoked from the client's event loop and must not block.
/// Any `Fn(&str)` closure is a sink.
pub trait Sink: Send + Sync {
    /// Display one line of text
    fn echo(&self, text: &str);
}

impl<F> Sink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn echo(&self, text: &str) {
        self(text)
    }
}
