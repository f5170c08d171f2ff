//! Console markup
//!
//! The debug server and the console's status notices use inline
//! formatting of the form `[[style;color;]text]`, e.g.
//! `[[b;#00BF00;]RCON Online]`. Builders here produce the notices the
//! client emits; [`strip`] reduces marked-up text to plain text for
//! sinks that cannot render it.

use std::time::Duration;

const GREEN: &str = "#00BF00";
const RED: &str = "#BE0000";
const YELLOW: &str = "#BFBF00";

/// Wrap `text` in a markup span
pub fn styled(style: &str, color: &str, text: &str) -> String {
    format!("[[{};{};]{}]", style, color, text)
}

/// Notice emitted once when the client starts connecting
pub fn connecting() -> String {
    styled("b", GREEN, "Connecting to server ...")
}

/// Notice for an endpoint that finished connecting
pub fn connected(url: &str) -> String {
    styled("b", GREEN, &format!("Connected to {}", url))
}

/// Notice for an endpoint that closed
pub fn closed(url: &str) -> String {
    styled("b", RED, &format!("Connection to {} Closed", url))
}

/// Notice for a transport failure
pub fn socket_error() -> String {
    styled("b", RED, "Socket Error")
}

/// Notice for a packet kind nobody handles
pub fn unhandled(kind: &str) -> String {
    styled("b", "red", &format!("Unhandled packet type {}", kind))
}

/// Notice for a frame that failed to decode
pub fn malformed(reason: &str) -> String {
    styled("b", "red", &format!("Malformed packet: {}", reason))
}

/// Notice for a scheduled reconnect
pub fn reconnecting(url: &str, delay: Duration) -> String {
    styled(
        "b",
        YELLOW,
        &format!("Reconnecting to {} in {:.1}s", url, delay.as_secs_f64()),
    )
}

/// Notice for an endpoint whose reconnect budget is spent
pub fn gave_up(url: &str, attempts: u32) -> String {
    styled(
        "b",
        RED,
        &format!("Giving up on {} after {} attempts", url, attempts),
    )
}

/// Remove markup spans, keeping their text.
///
/// Unterminated spans are kept verbatim.
pub fn strip(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("[[") {
        out.push_str(&rest[..start]);
        let span = &rest[start + 2..];

        let Some(spec_end) = span.find(']') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let body = &span[spec_end + 1..];
        let Some(body_end) = body.find(']') else {
            out.push_str(&rest[start..]);
            return out;
        };

        out.push_str(&body[..body_end]);
        rest = &body[body_end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_styled() {
        assert_eq!(styled("b", "red", "oops"), "[[b;red;]oops]");
    }

    #[test]
    fn test_strip_single_span() {
        assert_eq!(strip("[[b;#00BF00;]RCON Online]"), "RCON Online");
    }

    #[test]
    fn test_strip_multiple_spans() {
        assert_eq!(
            strip("[[b;red;]NameError] [[;#FFF;]name 'x' is not defined]"),
            "NameError name 'x' is not defined"
        );
        assert_eq!(strip("a [[i;;]b] c"), "a b c");
    }

    #[test]
    fn test_strip_plain_and_unterminated() {
        assert_eq!(strip("plain text"), "plain text");
        assert_eq!(strip("list[0]"), "list[0]");
        assert_eq!(strip("[[b;red;unterminated"), "[[b;red;unterminated");
        assert_eq!(strip("x [[b;red;]open"), "x [[b;red;]open");
    }

    #[test]
    fn test_notices_strip_to_plain_text() {
        assert_eq!(strip(&connecting()), "Connecting to server ...");
        assert_eq!(
            strip(&closed("ws://localhost:32081/log")),
            "Connection to ws://localhost:32081/log Closed"
        );
        assert_eq!(strip(&unhandled("mystery")), "Unhandled packet type mystery");
        assert_eq!(
            strip(&reconnecting("ws://h/rcon", Duration::from_millis(1500))),
            "Reconnecting to ws://h/rcon in 1.5s"
        );
    }
}
