//! Operator console output and message framing.
//!
//! The console carries the operator-visible protocol: the startup banner,
//! inbound messages echoed as `<<< `, outbound responses echoed as `>>> `,
//! and stage-labelled socket error lines. Diagnostic logging goes through
//! `tracing` instead and never through this sink.

use bytes::BytesMut;
use std::io::{self, Stdout, Write};

/// Socket operation that produced an error, used to label diagnostic lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Create,
    SetOption,
    Bind,
    Listen,
    Accept,
    Read,
    Write,
    PeerName,
}

impl Stage {
    /// Operator-facing label for this stage.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Create => "Create",
            Stage::SetOption => "Set option",
            Stage::Bind => "Bind",
            Stage::Listen => "Listen",
            Stage::Accept => "Accept",
            Stage::Read => "Read",
            Stage::Write => "Write",
            Stage::PeerName => "Get peer name",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Format the diagnostic line for a failed socket operation:
/// the stage label, then the OS error description on its own line.
pub fn error_line(stage: Stage, err: &io::Error) -> String {
    format!("{} error: \n{}", stage.label(), err)
}

/// Frame an outbound message: the payload plus exactly one trailing newline.
pub fn frame(message: &str) -> BytesMut {
    let mut framed = BytesMut::with_capacity(message.len() + 1);
    framed.extend_from_slice(message.as_bytes());
    framed.extend_from_slice(b"\n");
    framed
}

/// Line-oriented sink for operator output, flushed after every line.
///
/// Generic over the writer so tests can capture output in a `Vec<u8>`.
pub struct Console<W: Write = Stdout> {
    out: W,
}

impl Console<Stdout> {
    /// Console attached to the process's standard output.
    pub fn stdout() -> Self {
        Console { out: io::stdout() }
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Console { out }
    }

    /// Write one newline-terminated line and flush it immediately.
    /// Console failures are not recoverable and are ignored.
    pub fn line(&mut self, message: &str) {
        let _ = writeln!(self.out, "{message}");
        let _ = self.out.flush();
    }

    /// Echo an inbound client message.
    pub fn inbound(&mut self, message: &str) {
        self.line(&format!("<<< {message}"));
    }

    /// Echo an outbound client response.
    pub fn outbound(&mut self, message: &str) {
        self.line(&format!(">>> {message}"));
    }

    /// Report a failed socket operation.
    pub fn report(&mut self, stage: Stage, err: &io::Error) {
        self.line(&error_line(stage, err));
    }

    /// Consume the console, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}
