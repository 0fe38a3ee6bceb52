//! Line framing and classification for the telemetry stream

use std::io::{self, BufRead, BufReader, Read};

/// Marker line that opens a new timestamped session
pub const START_MARKER: &str = "#START";
/// Marker line that closes the current session
pub const STOP_MARKER: &str = "#STOP";

/// One classified input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Nothing left after stripping trailing whitespace
    Empty,
    Start,
    Stop,
    /// Tab-separated record, one entry per field
    Data(Vec<String>),
}

impl Line {
    /// Decode raw bytes (lossily), strip trailing whitespace and classify
    pub fn parse(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        let text = text.trim_end();

        match text {
            "" => Line::Empty,
            START_MARKER => Line::Start,
            STOP_MARKER => Line::Stop,
            _ => Line::Data(text.split('\t').map(str::to_string).collect()),
        }
    }
}

/// Result of polling the stream for the next line
#[derive(Debug, PartialEq, Eq)]
pub enum ReadEvent {
    /// A complete line, terminator included when one was received
    Line(Vec<u8>),
    /// The read timed out; any partial line is kept for the next poll
    Idle,
    /// The stream reported end of file
    Closed,
}

/// Splits a byte stream into lines without losing data across read timeouts
pub struct LineReader<R: Read> {
    inner: BufReader<R>,
    pending: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            pending: Vec::new(),
        }
    }

    /// Read until `\n`, a timeout, or end of stream
    pub fn next_line(&mut self) -> io::Result<ReadEvent> {
        match self.inner.read_until(b'\n', &mut self.pending) {
            Ok(0) if self.pending.is_empty() => Ok(ReadEvent::Closed),
            // Either a full line, or a trailing fragment right before EOF
            Ok(_) => Ok(ReadEvent::Line(std::mem::take(&mut self.pending))),
            Err(ref e)
                if e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::WouldBlock =>
            {
                Ok(ReadEvent::Idle)
            }
            Err(e) => Err(e),
        }
    }
}
