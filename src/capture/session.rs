//! One open CSV output file and its header state
//!
//! A session either starts a brand-new file (triggered by `#START`) or
//! appends to the base file (free-running mode). Rows are padded to the
//! widest record seen so far, and a fresh header row is appended whenever
//! that width grows. The file is never rewritten in place.

use crate::capture::csv::{encode_row, header_labels};
use crate::error::{CaptureError, CaptureResult};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Path of a timestamped session file: `<stem>_<stamp><.ext>` next to `base`
pub fn session_path(base: &Path, stamp: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name = match base.extension() {
        Some(ext) => format!("{}_{}.{}", stem, stamp, ext.to_string_lossy()),
        None => format!("{}_{}", stem, stamp),
    };

    base.with_file_name(name)
}

fn ensure_parent(path: &Path) -> CaptureResult<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(CaptureError::fs(dir))
        }
        _ => Ok(()),
    }
}

/// Writer for a single capture session
#[derive(Debug)]
pub struct SessionWriter {
    path: PathBuf,
    file: File,
    width: usize,
    header_written: bool,
    rows: usize,
}

impl SessionWriter {
    /// Create (or truncate) `path` for a new session
    pub fn open_fresh(path: &Path) -> CaptureResult<Self> {
        ensure_parent(path)?;
        let file = File::create(path).map_err(CaptureError::fs(path))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            width: 0,
            header_written: false,
            rows: 0,
        })
    }

    /// Append to `path`, creating it if absent
    ///
    /// A non-empty file is assumed to already carry a header. Width still
    /// restarts at zero, so the first row appends a header sized to it.
    pub fn open_append(path: &Path) -> CaptureResult<Self> {
        ensure_parent(path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(CaptureError::fs(path))?;
        let existing = file.metadata().map_err(CaptureError::fs(path))?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            width: 0,
            header_written: existing > 0,
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Widest row seen in this session
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    /// Data rows written by this writer
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Append a `value1..value<width>` header row and adopt `width`
    pub fn write_header(&mut self, width: usize) -> CaptureResult<()> {
        self.width = width;
        self.write_line(&encode_row(&header_labels(width)))?;
        self.header_written = true;
        Ok(())
    }

    /// Pad `fields` with empty strings up to the current width and append it
    ///
    /// Rows wider than the current width are written as-is.
    pub fn write_row(&mut self, mut fields: Vec<String>) -> CaptureResult<()> {
        if fields.len() < self.width {
            fields.resize(self.width, String::new());
        }
        self.write_line(&encode_row(&fields))?;
        self.rows += 1;
        Ok(())
    }

    /// Write a record, emitting a header first when none exists yet or the
    /// record is wider than anything seen in this session
    pub fn append(&mut self, fields: Vec<String>) -> CaptureResult<()> {
        let field_count = fields.len();
        if !self.header_written || field_count > self.width {
            self.write_header(self.width.max(field_count))?;
        }
        self.write_row(fields)
    }

    /// Flush and sync the file, then release the handle
    pub fn close(mut self) -> CaptureResult<()> {
        self.file.flush().map_err(CaptureError::fs(&self.path))?;
        self.file.sync_all().map_err(CaptureError::fs(&self.path))
    }

    fn write_line(&mut self, line: &str) -> CaptureResult<()> {
        self.file
            .write_all(line.as_bytes())
            .and_then(|_| self.file.flush())
            .map_err(CaptureError::fs(&self.path))
    }
}
