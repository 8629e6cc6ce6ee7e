//! Command parsing and dispatch for the line protocol.
//!
//! Messages are normalized (trimmed, case-folded) before parsing, so the
//! dispatch table itself stays case-sensitive and exhaustively enumerable:
//! - `connect` -> `OK`
//! - `whoami`  -> the peer's `ip:port`, or an apology when the peer is unknown
//! - `close`   -> `OK`, and the session terminates after responding
//! - anything else -> the help response

use std::net::SocketAddr;

/// Acknowledgement for `connect` and `close`.
pub const RESPONSE_OK: &str = "OK";

/// Fallback for `whoami` when the peer address lookup fails.
pub const RESPONSE_WHOAMI_FALLBACK: &str = "Sorry, I don't know. Who are you?";

/// Help response for anything unrecognized.
pub const RESPONSE_HELP: &str = "What you mean? Use: connect|whoami|close";

/// Parsed client command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Whoami,
    /// Terminates the session after the response is sent.
    Close,
    Unknown,
}

impl Command {
    /// Parse a normalized message. Expects the output of [`normalize`].
    pub fn parse(normalized: &str) -> Self {
        match normalized {
            "connect" => Command::Connect,
            "whoami" => Command::Whoami,
            "close" => Command::Close,
            _ => Command::Unknown,
        }
    }
}

/// Normalize a raw inbound line: trim surrounding whitespace and
/// case-fold to lowercase.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Map a command to its client response line.
///
/// Pure: the peer address for `whoami` is resolved by the caller and
/// passed in, `None` meaning the lookup failed.
pub fn dispatch(command: Command, peer: Option<SocketAddr>) -> String {
    match command {
        Command::Connect | Command::Close => RESPONSE_OK.to_string(),
        Command::Whoami => match peer {
            Some(addr) => addr.to_string(),
            None => RESPONSE_WHOAMI_FALLBACK.to_string(),
        },
        Command::Unknown => RESPONSE_HELP.to_string(),
    }
}
