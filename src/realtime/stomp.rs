//! STOMP 1.2 frame codec.
//!
//! A frame is a command line, header lines, a blank line, and a body
//! terminated by NUL:
//!
//! ```text
//! SUBSCRIBE
//! id:sub-0
//! destination:/topic/inventory
//!
//! ^@
//! ```
//!
//! A frame consisting only of end-of-line characters is a heart-beat.

use std::fmt;

/// Frame commands understood by this server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    // client
    Connect,
    Stomp,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    Disconnect,
    // server
    Connected,
    Message,
    Receipt,
    Error,
}

impl Command {
    fn parse(raw: &str) -> Option<Self> {
        let command = match raw {
            "CONNECT" => Command::Connect,
            "STOMP" => Command::Stomp,
            "SEND" => Command::Send,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "ACK" => Command::Ack,
            "NACK" => Command::Nack,
            "BEGIN" => Command::Begin,
            "COMMIT" => Command::Commit,
            "ABORT" => Command::Abort,
            "DISCONNECT" => Command::Disconnect,
            "CONNECTED" => Command::Connected,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            _ => return None,
        };
        Some(command)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Stomp => "STOMP",
            Command::Send => "SEND",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Ack => "ACK",
            Command::Nack => "NACK",
            Command::Begin => "BEGIN",
            Command::Commit => "COMMIT",
            Command::Abort => "ABORT",
            Command::Disconnect => "DISCONNECT",
            Command::Connected => "CONNECTED",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
        }
    }

    /// CONNECT and CONNECTED frames carry headers verbatim, without escaping.
    fn escapes_headers(self) -> bool {
        !matches!(self, Command::Connect | Command::Stomp | Command::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while decoding a frame.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StompError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("malformed header line '{0}'")]
    MalformedHeader(String),

    #[error("invalid escape sequence in header")]
    InvalidEscape,

    #[error("frame is not terminated by NUL")]
    MissingTerminator,

    #[error("invalid content-length")]
    InvalidContentLength,
}

/// A decoded STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header; repeated headers after the first are ignored.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Encode for the wire, including the trailing NUL.
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }
}

/// Decode one frame from a WebSocket message.
///
/// Returns `Ok(None)` for a heart-beat (only EOLs).
pub fn decode(input: &str) -> Result<Option<Frame>, StompError> {
    let input = input.trim_start_matches(['\r', '\n']);
    if input.is_empty() {
        return Ok(None);
    }

    let (head, rest) = match input.find("\n\n").map(|i| (i, 2)).or_else(|| {
        input.find("\r\n\r\n").map(|i| (i, 4))
    }) {
        Some((index, sep)) => (&input[..index], &input[index + sep..]),
        None => return Err(StompError::MissingTerminator),
    };

    let mut lines = head.lines();
    let command_line = lines.next().unwrap_or_default().trim_end_matches('\r');
    let command = Command::parse(command_line)
        .ok_or_else(|| StompError::UnknownCommand(command_line.to_string()))?;

    let mut headers = Vec::new();
    for line in lines {
        let line = line.trim_end_matches('\r');
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| StompError::MalformedHeader(line.to_string()))?;
        if command.escapes_headers() {
            headers.push((unescape_header(name)?, unescape_header(value)?));
        } else {
            headers.push((name.to_string(), value.to_string()));
        }
    }

    let frame_len = headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .map(|(_, value)| value.parse::<usize>())
        .transpose()
        .map_err(|_| StompError::InvalidContentLength)?;

    let body = match frame_len {
        Some(len) => {
            let bytes = rest.as_bytes();
            if bytes.len() <= len || bytes[len] != 0 {
                return Err(StompError::MissingTerminator);
            }
            rest.get(..len).ok_or(StompError::InvalidContentLength)?
        }
        None => {
            let end = rest.find('\0').ok_or(StompError::MissingTerminator)?;
            &rest[..end]
        }
    };

    Ok(Some(Frame {
        command,
        headers,
        body: body.to_string(),
    }))
}

fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(raw: &str) -> Result<String, StompError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(StompError::InvalidEscape),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_subscribe_frame() {
        let frame = decode("SUBSCRIBE\nid:sub-0\ndestination:/topic/inventory\n\n\0")
            .unwrap()
            .unwrap();

        assert_eq!(frame.command, Command::Subscribe);
        assert_eq!(frame.get("id"), Some("sub-0"));
        assert_eq!(frame.get("destination"), Some("/topic/inventory"));
        assert!(frame.body.is_empty());
    }

    #[test]
    fn eol_only_is_heartbeat() {
        assert_eq!(decode("\n").unwrap(), None);
        assert_eq!(decode("\r\n\r\n").unwrap(), None);
    }

    #[test]
    fn first_repeated_header_wins() {
        let frame = decode("SEND\ndestination:/app/a\ndestination:/app/b\n\n\0")
            .unwrap()
            .unwrap();
        assert_eq!(frame.get("destination"), Some("/app/a"));
    }

    #[test]
    fn body_respects_content_length() {
        let frame = decode("SEND\ndestination:/app/x\ncontent-length:5\n\nab\0cd\0")
            .unwrap()
            .unwrap();
        assert_eq!(frame.body, "ab\0cd");
    }

    #[test]
    fn rejects_unknown_command_and_missing_nul() {
        assert_eq!(
            decode("PUBLISH\n\n\0"),
            Err(StompError::UnknownCommand("PUBLISH".to_string()))
        );
        assert_eq!(
            decode("SEND\ndestination:/app/x\n\nbody"),
            Err(StompError::MissingTerminator)
        );
    }

    #[test]
    fn header_escapes_are_decoded() {
        let frame = decode("SEND\nnote:a\\cb\\nc\\\\d\n\n\0").unwrap().unwrap();
        assert_eq!(frame.get("note"), Some("a:b\nc\\d"));

        assert_eq!(decode("SEND\nnote:bad\\t\n\n\0"), Err(StompError::InvalidEscape));
    }

    #[test]
    fn connect_headers_are_not_unescaped() {
        let frame = decode("CONNECT\npasscode:a\\cb\n\n\0").unwrap().unwrap();
        assert_eq!(frame.get("passcode"), Some("a\\cb"));
    }

    #[test]
    fn encodes_message_frame() {
        let wire = Frame::new(Command::Message)
            .header("destination", "/topic/active-users")
            .header("note", "x:y")
            .body("3")
            .encode();

        assert_eq!(
            wire,
            "MESSAGE\ndestination:/topic/active-users\nnote:x\\cy\n\n3\0"
        );
    }
}
