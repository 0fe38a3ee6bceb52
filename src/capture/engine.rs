//! Capture loop: turns the telemetry stream into session CSV files

use crate::capture::line::{Line, LineReader, ReadEvent};
use crate::capture::session::{session_path, SessionWriter};
use crate::error::{CaptureError, CaptureResult};
use chrono::{DateTime, Duration as ChronoDuration, Local, SubsecRound};
use log::{debug, info, warn};
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// Timestamp format used in session file names
pub const SESSION_STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S%.3f";

/// How the engine maps the stream onto files
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Base output path; session files are derived from it
    pub base_path: PathBuf,
    /// Honor `#START`/`#STOP`; data outside a session is dropped
    pub ext_trigger: bool,
    /// Echo each data line to stdout
    pub echo: bool,
}

impl CaptureOptions {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            ext_trigger: false,
            echo: false,
        }
    }

    pub fn with_ext_trigger(mut self, ext_trigger: bool) -> Self {
        self.ext_trigger = ext_trigger;
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }
}

/// Why a capture run ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Operator interrupt (Ctrl+C / SIGTERM)
    Interrupted,
    /// The stream reported end of file
    StreamClosed,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::Interrupted => write!(f, "stopped by user"),
            Termination::StreamClosed => write!(f, "stream closed"),
        }
    }
}

/// Counters collected over a capture run
#[derive(Debug, Default, Clone)]
pub struct CaptureSummary {
    /// Non-empty lines received, markers included
    pub lines_read: usize,
    pub rows_written: usize,
    pub sessions_opened: usize,
    /// Data lines that arrived with no session open (triggered mode)
    pub lines_dropped: usize,
    /// Every file a session wrote to, in order
    pub files: Vec<PathBuf>,
    pub termination: Option<Termination>,
}

/// Session-segmenting CSV logger
pub struct CaptureEngine {
    options: CaptureOptions,
    session: Option<SessionWriter>,
    last_stamp: Option<DateTime<Local>>,
    summary: CaptureSummary,
}

impl CaptureEngine {
    pub fn new(options: CaptureOptions) -> Self {
        Self {
            options,
            session: None,
            last_stamp: None,
            summary: CaptureSummary::default(),
        }
    }

    pub fn summary(&self) -> &CaptureSummary {
        &self.summary
    }

    /// True while a session file is open
    #[cfg(test)]
    pub fn session_open(&self) -> bool {
        self.session.is_some()
    }

    /// Consume `stream` until interrupted, closed, or a fatal error
    ///
    /// `interrupted` is polled once per read; the stream should use a read
    /// timeout so a quiet link still notices it. Any open session is closed
    /// on every exit path.
    pub fn capture<R: Read>(
        &mut self,
        stream: R,
        interrupted: &AtomicBool,
    ) -> CaptureResult<Termination> {
        let result = self.prepare_output_dir().and_then(|_| {
            let mut reader = LineReader::new(stream);
            self.read_loop(&mut reader, interrupted)
        });

        let closed = self.close_session();
        let termination = match (result, closed) {
            (Ok(termination), Ok(())) => termination,
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    warn!("Failed to close session after error: {}", close_err);
                }
                return Err(e);
            }
            (Ok(_), Err(e)) => return Err(e),
        };

        self.summary.termination = Some(termination);
        Ok(termination)
    }

    fn read_loop<R: Read>(
        &mut self,
        reader: &mut LineReader<R>,
        interrupted: &AtomicBool,
    ) -> CaptureResult<Termination> {
        loop {
            if interrupted.load(Ordering::SeqCst) {
                info!("Power logger stopped by user");
                return Ok(Termination::Interrupted);
            }

            match reader.next_line().map_err(CaptureError::StreamFatal)? {
                ReadEvent::Line(raw) => self.handle_line(&raw)?,
                ReadEvent::Idle => continue,
                ReadEvent::Closed => {
                    info!("Serial stream closed");
                    return Ok(Termination::StreamClosed);
                }
            }
        }
    }

    fn prepare_output_dir(&self) -> CaptureResult<()> {
        match self.options.base_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                fs::create_dir_all(dir).map_err(CaptureError::fs(dir))
            }
            _ => Ok(()),
        }
    }

    /// Process one raw line from the stream
    pub fn handle_line(&mut self, raw: &[u8]) -> CaptureResult<()> {
        match Line::parse(raw) {
            Line::Empty => Ok(()),
            Line::Start => {
                self.summary.lines_read += 1;
                self.start_session()
            }
            Line::Stop => {
                self.summary.lines_read += 1;
                self.stop_session()
            }
            Line::Data(fields) => {
                self.summary.lines_read += 1;
                self.write_data(fields, raw)
            }
        }
    }

    fn start_session(&mut self) -> CaptureResult<()> {
        if self.session.is_some() {
            warn!("#START received while a session is open; closing it first");
            self.close_session()?;
        }

        let stamp = self.next_stamp().format(SESSION_STAMP_FORMAT).to_string();
        let path = session_path(&self.options.base_path, &stamp);
        let writer = SessionWriter::open_fresh(&path)?;

        info!("START logging -> {}", path.display());
        self.track_session(writer);
        Ok(())
    }

    fn stop_session(&mut self) -> CaptureResult<()> {
        match self.session.as_ref() {
            Some(session) => {
                info!(
                    "STOP logging ({} rows, {} columns in {})",
                    session.rows(),
                    session.width(),
                    session.path().display()
                );
                self.close_session()
            }
            None => {
                debug!("#STOP with no open session");
                Ok(())
            }
        }
    }

    fn write_data(&mut self, fields: Vec<String>, raw: &[u8]) -> CaptureResult<()> {
        if self.session.is_none() {
            if self.options.ext_trigger {
                self.summary.lines_dropped += 1;
                return Ok(());
            }

            let writer = SessionWriter::open_append(&self.options.base_path)?;
            info!("Logging -> {}", self.options.base_path.display());
            debug!("Existing header assumed: {}", writer.header_written());
            self.track_session(writer);
        }

        if let Some(session) = self.session.as_mut() {
            session.append(fields)?;
            self.summary.rows_written += 1;
        }

        if self.options.echo {
            println!("{}", String::from_utf8_lossy(raw).trim_end());
        }

        Ok(())
    }

    fn track_session(&mut self, writer: SessionWriter) {
        self.summary.sessions_opened += 1;
        self.summary.files.push(writer.path().to_path_buf());
        self.session = Some(writer);
    }

    /// Close the current session, if any
    pub fn close_session(&mut self) -> CaptureResult<()> {
        match self.session.take() {
            Some(session) => session.close(),
            None => Ok(()),
        }
    }

    /// Millisecond timestamp strictly later than the previous session's
    fn next_stamp(&mut self) -> DateTime<Local> {
        let mut stamp = Local::now().trunc_subsecs(3);
        if let Some(last) = self.last_stamp {
            if stamp <= last {
                stamp = last + ChronoDuration::milliseconds(1);
            }
        }
        self.last_stamp = Some(stamp);
        stamp
    }
}
