//! What the session logger needs to know about a packet.

use std::fmt;

/// Which way a packet was travelling through the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client to server.
    ServerBound,
    /// Server to client.
    ClientBound,
}

impl Direction {
    /// Fixed line prefix written before every logged packet.
    pub fn prefix(self) -> &'static str {
        match self {
            Direction::ServerBound => "[SERVER BOUND]  -  ",
            Direction::ClientBound => "[CLIENT BOUND]  -  ",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ServerBound => write!(f, "SERVER BOUND"),
            Direction::ClientBound => write!(f, "CLIENT BOUND"),
        }
    }
}

/// A packet that can be written to a session log.
///
/// `Display` renders the payload; `kind` is matched against the configured
/// ignore list.
pub trait LoggablePacket: fmt::Display {
    fn kind(&self) -> &str;
}

/// Pre-rendered packet text, for producers that already hold a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPacket {
    pub kind: String,
    pub body: String,
}

impl TextPacket {
    pub fn new(kind: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            body: body.into(),
        }
    }
}

impl fmt::Display for TextPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}({})", self.kind, self.body)
        }
    }
}

impl LoggablePacket for TextPacket {
    fn kind(&self) -> &str {
        &self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_line() {
        let packet = TextPacket::new("Text", "hello");
        let line = format!("{}{}", Direction::ServerBound.prefix(), packet);
        assert_eq!(line, "[SERVER BOUND]  -  Text(hello)");
        assert_eq!(
            format!("{}{}", Direction::ClientBound.prefix(), TextPacket::new("Ping", "")),
            "[CLIENT BOUND]  -  Ping"
        );
    }
}
