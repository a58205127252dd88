//! Reserved file entries and their handle state machine.

use crate::encoding::encode_text;
use crate::error::{StorageError, StorageResult};
use crate::reader::LineReader;
use encoding_rs::{Encoding, UTF_8};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// The kind of access an entry is serving.
///
/// Sequential reads, indexed reads and writes are mutually exclusive on
/// one entry until it is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Cursor-based reads through the shared handle.
    Sequential,
    /// Cold reads of a given line number.
    Indexed,
    /// Writes through the shared handle.
    Write,
}

impl Access {
    /// Returns a short name for messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Indexed => "indexed",
            Self::Write => "write",
        }
    }
}

/// Observable state of an entry's handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// No handle.
    Closed,
    /// A reader is open.
    Open,
    /// End of file was reached without recycling; a recycling read reopens.
    Exhausted,
    /// A writer is open.
    Writing,
}

#[derive(Debug)]
enum Handle {
    Closed,
    Reading(LineReader),
    Exhausted,
    Writing(BufWriter<File>),
}

/// One reserved file.
#[derive(Debug)]
pub(crate) struct FileEntry {
    path: PathBuf,
    encoding: Option<&'static Encoding>,
    header_line: Option<String>,
    last_error: Option<String>,
    handle: Handle,
    access: Option<Access>,
}

impl FileEntry {
    pub(crate) fn new(path: PathBuf, encoding: Option<&'static Encoding>) -> Self {
        Self {
            path,
            encoding,
            header_line: None,
            last_error: None,
            handle: Handle::Closed,
            access: None,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn header_line(&self) -> Option<&str> {
        self.header_line.as_deref()
    }

    pub(crate) fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn state(&self) -> HandleState {
        match self.handle {
            Handle::Closed => HandleState::Closed,
            Handle::Reading(_) => HandleState::Open,
            Handle::Exhausted => HandleState::Exhausted,
            Handle::Writing(_) => HandleState::Writing,
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        !matches!(self.handle, Handle::Closed)
    }

    fn open_reader(&self) -> StorageResult<LineReader> {
        LineReader::open(&self.path, self.encoding)
    }

    fn reopen(&mut self, skip_header: bool) -> StorageResult<()> {
        let mut reader = self.open_reader()?;
        if skip_header {
            reader.skip_lines(1)?;
        }
        self.handle = Handle::Reading(reader);
        Ok(())
    }

    /// Claims `access` for this entry, failing if another kind is held.
    pub(crate) fn claim(&mut self, alias: &str, access: Access) -> StorageResult<()> {
        match self.access {
            Some(held) if held != access => Err(StorageError::AlreadyInUse {
                alias: alias.to_string(),
                held: held.name(),
            }),
            _ => {
                self.access = Some(access);
                Ok(())
            }
        }
    }

    /// Reads the first line through the shared handle and caches it.
    ///
    /// Failures are remembered in `last_error` rather than returned.
    pub(crate) fn load_header(&mut self) {
        let result = match self.handle {
            Handle::Closed => self.reopen(false).and_then(|()| self.read_open_line()),
            _ => self.read_open_line(),
        };
        match result {
            Ok(Some(line)) => self.header_line = Some(line),
            Ok(None) => {
                self.last_error = Some(format!("file is empty: {}", self.path.display()));
            }
            Err(e) => self.last_error = Some(e.to_string()),
        }
    }

    fn read_open_line(&mut self) -> StorageResult<Option<String>> {
        match &mut self.handle {
            Handle::Reading(reader) => Ok(reader.read_line()?),
            Handle::Exhausted | Handle::Closed => Ok(None),
            Handle::Writing(_) => Err(StorageError::AlreadyInUse {
                alias: self.path.display().to_string(),
                held: Access::Write.name(),
            }),
        }
    }

    fn ensure_readable(&self, alias: &str) -> StorageResult<()> {
        if let Handle::Writing(_) = self.handle {
            return Err(StorageError::AlreadyInUse {
                alias: alias.to_string(),
                held: Access::Write.name(),
            });
        }
        Ok(())
    }

    /// Next line through the shared handle, recycling at end of file.
    pub(crate) fn next_line(
        &mut self,
        alias: &str,
        recycle: bool,
        skip_header_on_recycle: bool,
    ) -> StorageResult<Option<String>> {
        self.ensure_readable(alias)?;
        if let Handle::Closed = self.handle {
            self.reopen(false)?;
        }

        if let Some(line) = self.read_open_line()? {
            return Ok(Some(line));
        }

        if recycle {
            tracing::debug!(alias, "recycling at end of file");
            self.reopen(skip_header_on_recycle)?;
            let line = self.read_open_line()?;
            if line.is_none() {
                self.handle = Handle::Exhausted;
            }
            return Ok(line);
        }

        self.handle = Handle::Exhausted;
        Ok(None)
    }

    /// Next line for quoted parsing.
    ///
    /// The header is skipped on first open; when recycling, end of file is
    /// detected before reading so the reopened pass starts after the header.
    pub(crate) fn next_line_guarded(
        &mut self,
        alias: &str,
        recycle: bool,
        skip_header: bool,
    ) -> StorageResult<Option<String>> {
        self.ensure_readable(alias)?;
        match &mut self.handle {
            Handle::Closed => self.reopen(skip_header)?,
            Handle::Exhausted => {
                if !recycle {
                    return Ok(None);
                }
                tracing::debug!(alias, "recycling exhausted file");
                self.reopen(skip_header)?;
            }
            Handle::Reading(reader) => {
                if recycle && reader.is_at_eof()? {
                    tracing::debug!(alias, "recycling at end of file");
                    self.reopen(skip_header)?;
                }
            }
            Handle::Writing(_) => {}
        }

        let line = self.read_open_line()?;
        if line.is_none() {
            self.handle = Handle::Exhausted;
        }
        Ok(line)
    }

    /// Cold read of line `index`, independent of the shared handle.
    pub(crate) fn read_at_index(&self, index: usize) -> StorageResult<Option<String>> {
        let mut reader = self.open_reader()?;
        if reader.skip_lines(index)? < index {
            return Ok(None);
        }
        Ok(reader.read_line()?)
    }

    /// Counts every line of the file with a cold scan.
    pub(crate) fn count_lines(&self) -> StorageResult<usize> {
        Ok(self.open_reader()?.count_remaining()?)
    }

    /// Writes text through the shared writer, creating it on first use.
    pub(crate) fn write(&mut self, alias: &str, text: &str) -> StorageResult<()> {
        if let Handle::Closed = self.handle {
            let file = File::create(&self.path)?;
            self.handle = Handle::Writing(BufWriter::new(file));
        }
        let bytes = encode_text(self.encoding.unwrap_or(UTF_8), text);
        match &mut self.handle {
            Handle::Writing(writer) => {
                tracing::debug!(alias, len = bytes.len(), "write");
                writer.write_all(&bytes)?;
                Ok(())
            }
            _ => Err(StorageError::AlreadyInUse {
                alias: alias.to_string(),
                held: "read",
            }),
        }
    }

    /// Releases the handle and any claimed access. Returns whether a
    /// handle was open.
    pub(crate) fn close(&mut self) -> StorageResult<bool> {
        let was_open = self.is_open();
        if let Handle::Writing(writer) = &mut self.handle {
            writer.flush()?;
        }
        self.handle = Handle::Closed;
        self.access = None;
        Ok(was_open)
    }
}
