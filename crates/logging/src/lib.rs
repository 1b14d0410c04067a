#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` provides the diagnostic primitives shared across the rdsync
//! workspace. Diagnostics travel through the transfer engine as [`Message`]
//! values: a severity, an optional numeric code, and the rendered text. The
//! transport layer decodes out-of-band multiplexed frames into messages and
//! hands them to a [`MessageSink`], which streams them to an arbitrary
//! [`io::Write`] target.
//!
//! # Design
//!
//! Messages are plain owned values so they can cross module boundaries without
//! borrowing from transport buffers. The sink owns its writer and renders each
//! message on its own line by default, mirroring rsync's line-oriented
//! diagnostics. Nothing in this crate performs I/O besides the sink itself.

use std::fmt;
use std::io::{self, Write};

/// Severity classes for diagnostics, mirroring the multiplexed log channels.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Severity {
    /// Informational progress output.
    Info,
    /// A condition worth reporting that does not affect the transfer outcome.
    Warning,
    /// An error; the transfer (or a single file) failed.
    Error,
    /// Daemon-style log output not intended for the interactive user.
    Log,
}

impl Severity {
    /// Returns the label used when rendering the message.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Log => "log",
        }
    }
}

/// A single diagnostic produced by the engine or received from the peer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    severity: Severity,
    code: Option<i32>,
    text: String,
}

impl Message {
    /// Creates an informational message.
    #[must_use]
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            code: None,
            text: text.into(),
        }
    }

    /// Creates a warning message.
    #[must_use]
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code: None,
            text: text.into(),
        }
    }

    /// Creates an error message carrying an exit code.
    #[must_use]
    pub fn error(code: i32, text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: Some(code),
            text: text.into(),
        }
    }

    /// Creates a daemon-log message.
    #[must_use]
    pub fn log(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Log,
            code: None,
            text: text.into(),
        }
    }

    /// Attaches a numeric code to the message.
    #[must_use]
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    /// Returns the message severity.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns the numeric code, if any.
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        self.code
    }

    /// Returns the message text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "rdsync {}: {} (code {})", self.severity.label(), self.text, code),
            None => write!(f, "rdsync {}: {}", self.severity.label(), self.text),
        }
    }
}

/// Controls whether a [`MessageSink`] appends a trailing newline per message.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LineMode {
    /// Terminate each rendered message with `\n`.
    #[default]
    WithNewline,
    /// Emit the rendered message bytes verbatim.
    WithoutNewline,
}

/// Streaming sink that renders [`Message`] values into an [`io::Write`] target.
#[derive(Debug)]
pub struct MessageSink<W> {
    writer: W,
    line_mode: LineMode,
}

impl<W: Write> MessageSink<W> {
    /// Creates a sink that appends a newline after each message.
    pub fn new(writer: W) -> Self {
        Self::with_line_mode(writer, LineMode::WithNewline)
    }

    /// Creates a sink with an explicit [`LineMode`].
    pub fn with_line_mode(writer: W, line_mode: LineMode) -> Self {
        Self { writer, line_mode }
    }

    /// Renders `message` into the underlying writer.
    pub fn write(&mut self, message: &Message) -> io::Result<()> {
        match self.line_mode {
            LineMode::WithNewline => writeln!(self.writer, "{message}"),
            LineMode::WithoutNewline => write!(self.writer, "{message}"),
        }
    }

    /// Writes raw peer-supplied text that is already formatted.
    ///
    /// Out-of-band frames carry text rendered by the remote side; it is passed
    /// through untouched so remote diagnostics read exactly as sent.
    pub fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)?;
        if self.line_mode == LineMode::WithNewline && !bytes.ends_with(b"\n") {
            self.writer.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Consumes the sink and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Returns a shared reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }
}

/// A sink writing to standard error, the default destination for diagnostics.
#[must_use]
pub fn stderr_sink() -> MessageSink<io::Stderr> {
    MessageSink::new(io::stderr())
}
