//! The shared alias → file registry.

use crate::encoding::encoding_for_label;
use crate::entry::{Access, FileEntry, HandleState};
use crate::error::{StorageError, StorageResult};
use crate::path::PathResolver;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Registry of reserved files, shared by all workers.
///
/// Every file is known under an *alias*. Workers that use the same alias
/// share one read cursor; workers that need independent cursors reserve
/// the same file under different aliases.
///
/// # Thread Safety
///
/// A single registry-wide mutex serialises every operation. Reservation
/// happens once per alias and reads are I/O bound, so the coarse lock is
/// not a bottleneck in practice.
///
/// # Example
///
/// ```no_run
/// use rowfeed_storage::FileRegistry;
///
/// let registry = FileRegistry::new();
/// let header = registry.reserve("users", "users.csv", None, true).unwrap();
/// let first = registry.next_line("users", true, true).unwrap();
/// registry.close_all().unwrap();
/// ```
#[derive(Debug)]
pub struct FileRegistry {
    inner: Mutex<RegistryState>,
}

#[derive(Debug)]
struct RegistryState {
    resolver: PathResolver,
    files: HashMap<String, FileEntry>,
}

impl RegistryState {
    fn entry_mut(&mut self, alias: &str) -> StorageResult<&mut FileEntry> {
        self.files
            .get_mut(alias)
            .ok_or_else(|| StorageError::not_reserved(alias))
    }

    fn entry(&self, alias: &str) -> StorageResult<&FileEntry> {
        self.files
            .get(alias)
            .ok_or_else(|| StorageError::not_reserved(alias))
    }

    fn files_open(&self) -> bool {
        self.files.values().any(FileEntry::is_open)
    }

    /// Fails if any handle is live; otherwise drops the idle entries.
    fn check_for_open_files(&mut self) -> StorageResult<()> {
        if self.files_open() {
            return Err(StorageError::FilesStillOpen);
        }
        self.files.clear();
        Ok(())
    }
}

impl Default for FileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FileRegistry {
    /// Creates a registry whose base is the process working directory.
    #[must_use]
    pub fn new() -> Self {
        Self::with_resolver(PathResolver::new())
    }

    /// Creates a registry with a custom resolver.
    #[must_use]
    pub fn with_resolver(resolver: PathResolver) -> Self {
        info!(base = %resolver.base().display(), "default base");
        Self {
            inner: Mutex::new(RegistryState {
                resolver,
                files: HashMap::new(),
            }),
        }
    }

    /// Reserves `filename` under `alias`.
    ///
    /// Reserving an alias twice is a no-op that returns the cached header.
    /// With `has_header`, the first line is read eagerly and consumed from
    /// the shared handle, so it is never delivered as data.
    ///
    /// # Errors
    ///
    /// - [`StorageError::EmptyFilename`] for an empty file name
    /// - [`StorageError::UnsupportedEncoding`] for an unknown encoding label
    /// - [`StorageError::HeaderUnavailable`] if a header is required but
    ///   cannot be read (also on later reservations of the same alias)
    pub fn reserve(
        &self,
        alias: &str,
        filename: &str,
        encoding: Option<&str>,
        has_header: bool,
    ) -> StorageResult<Option<String>> {
        if filename.is_empty() {
            return Err(StorageError::EmptyFilename);
        }

        let mut state = self.inner.lock();
        if !state.files.contains_key(alias) {
            let encoding = match encoding {
                Some(label) => encoding_for_label(label)?,
                None => None,
            };
            let path = state.resolver.resolve(filename);
            let mut entry = FileEntry::new(path, encoding);
            if filename == alias {
                info!(filename, "stored");
            } else {
                info!(filename, alias, "stored");
            }
            if has_header {
                entry.load_header();
            }
            state.files.insert(alias.to_string(), entry);
        }

        let entry = state.entry(alias)?;
        if has_header && entry.header_line().is_none() {
            return Err(StorageError::header_unavailable(
                entry.path(),
                entry.last_error().unwrap_or("header was not read"),
            ));
        }
        Ok(entry.header_line().map(str::to_string))
    }

    /// Reserves a file under its own name, with no header.
    ///
    /// # Errors
    ///
    /// See [`reserve`](Self::reserve).
    pub fn reserve_file(&self, filename: &str) -> StorageResult<()> {
        self.reserve(filename, filename, None, false).map(|_| ())
    }

    /// Reads the next line of `alias`.
    ///
    /// At end of file: with `recycle` the file is reopened (skipping one
    /// line if `skip_header_on_recycle`) and the first line of the new pass
    /// is returned; without it `None` is returned.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotReserved`], [`StorageError::AlreadyInUse`], or an
    /// I/O failure.
    pub fn next_line(
        &self,
        alias: &str,
        recycle: bool,
        skip_header_on_recycle: bool,
    ) -> StorageResult<Option<String>> {
        let mut state = self.inner.lock();
        let entry = state.entry_mut(alias)?;
        entry.claim(alias, Access::Sequential)?;
        entry.next_line(alias, recycle, skip_header_on_recycle)
    }

    /// Reads the next line of `alias` for quoted parsing.
    ///
    /// On the first open the header is skipped if `skip_header`. When
    /// recycling, an already exhausted handle is reopened before reading,
    /// so the header never comes back as data and no row is skipped.
    ///
    /// # Errors
    ///
    /// Same as [`next_line`](Self::next_line).
    pub fn next_line_guarded(
        &self,
        alias: &str,
        recycle: bool,
        skip_header: bool,
    ) -> StorageResult<Option<String>> {
        let mut state = self.inner.lock();
        let entry = state.entry_mut(alias)?;
        entry.claim(alias, Access::Sequential)?;
        entry.next_line_guarded(alias, recycle, skip_header)
    }

    /// Reads line number `index` (zero based, header included) with a
    /// fresh scan from the start of the file.
    ///
    /// This costs O(index) per call; nothing is cached. Returns `None`
    /// past the end of the file.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotReserved`], [`StorageError::AlreadyInUse`] if the
    /// entry serves sequential reads or writes, or an I/O failure.
    pub fn read_at_index(&self, alias: &str, index: usize) -> StorageResult<Option<String>> {
        let mut state = self.inner.lock();
        let entry = state.entry_mut(alias)?;
        entry.claim(alias, Access::Indexed)?;
        entry.read_at_index(index)
    }

    /// Counts all lines of the file behind `alias`, header included.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotReserved`] or an I/O failure.
    pub fn count_lines(&self, alias: &str) -> StorageResult<usize> {
        let state = self.inner.lock();
        state.entry(alias)?.count_lines()
    }

    /// Writes `text` to the file behind `alias`, truncating it on the
    /// first write.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotReserved`], [`StorageError::AlreadyInUse`] if the
    /// entry is being read, or an I/O failure.
    pub fn write(&self, alias: &str, text: &str) -> StorageResult<()> {
        let mut state = self.inner.lock();
        let entry = state.entry_mut(alias)?;
        entry.claim(alias, Access::Write)?;
        entry.write(alias, text)
    }

    /// Closes the handle of one alias. The reservation is kept.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if flushing a writer fails.
    pub fn close_file(&self, alias: &str) -> StorageResult<()> {
        let mut state = self.inner.lock();
        if let Some(entry) = state.files.get_mut(alias) {
            if entry.close()? {
                info!(alias, "close");
            }
        }
        Ok(())
    }

    /// Closes every handle and forgets every reservation.
    ///
    /// Entries that were never opened are simply dropped. Every entry is
    /// closed even if one fails; the first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error raised while flushing a writer.
    pub fn close_all(&self) -> StorageResult<()> {
        let mut state = self.inner.lock();
        let mut first_error = None;
        for (alias, entry) in &mut state.files {
            match entry.close() {
                Ok(true) => info!(alias = alias.as_str(), "close"),
                Ok(false) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        state.files.clear();
        first_error.map_or(Ok(()), Err)
    }

    /// Returns whether any handle is open.
    #[must_use]
    pub fn files_open(&self) -> bool {
        self.inner.lock().files_open()
    }

    /// Returns whether `alias` is reserved.
    #[must_use]
    pub fn is_reserved(&self, alias: &str) -> bool {
        self.inner.lock().files.contains_key(alias)
    }

    /// Number of reserved aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().files.len()
    }

    /// Returns whether nothing is reserved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the resolved path behind `alias`.
    #[must_use]
    pub fn resolved_file(&self, alias: &str) -> Option<PathBuf> {
        self.inner
            .lock()
            .files
            .get(alias)
            .map(|entry| entry.path().to_path_buf())
    }

    /// Reserves `name` under its own name and returns its resolved path.
    ///
    /// # Errors
    ///
    /// See [`reserve`](Self::reserve).
    pub fn resolve_file(&self, name: &str) -> StorageResult<PathBuf> {
        self.reserve_file(name)?;
        self.resolved_file(name)
            .ok_or_else(|| StorageError::not_reserved(name))
    }

    /// Returns the cached header line of `alias`.
    #[must_use]
    pub fn header_line(&self, alias: &str) -> Option<String> {
        self.inner
            .lock()
            .files
            .get(alias)
            .and_then(|entry| entry.header_line().map(str::to_string))
    }

    /// Returns the handle state of `alias`.
    #[must_use]
    pub fn handle_state(&self, alias: &str) -> Option<HandleState> {
        self.inner.lock().files.get(alias).map(FileEntry::state)
    }

    /// Returns the current base directory.
    #[must_use]
    pub fn base(&self) -> PathBuf {
        self.inner.lock().resolver.base().to_path_buf()
    }

    /// Returns the current base relative to the default base.
    #[must_use]
    pub fn base_relative(&self) -> PathBuf {
        self.inner.lock().resolver.base_relative()
    }

    /// Returns the script name recorded by
    /// [`set_base_for_script`](Self::set_base_for_script).
    #[must_use]
    pub fn script_name(&self) -> Option<String> {
        self.inner.lock().resolver.script_name().map(str::to_string)
    }

    /// Expands a `~/`-prefixed name under the base directory.
    #[must_use]
    pub fn resolve_base_relative_name(&self, name: &str) -> String {
        self.inner.lock().resolver.resolve_base_relative_name(name)
    }

    /// Sets the base directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FilesStillOpen`] while any handle is open.
    pub fn set_base(&self, base: &Path) -> StorageResult<()> {
        let mut state = self.inner.lock();
        state.check_for_open_files()?;
        state.resolver.set_base(base);
        info!(base = %base.display(), "set new base");
        Ok(())
    }

    /// Sets the base from a path; a non-directory uses its parent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FilesStillOpen`] while any handle is open.
    pub fn set_base_dir(&self, path: &Path) -> StorageResult<()> {
        let mut state = self.inner.lock();
        state.check_for_open_files()?;
        state.resolver.set_base_dir(path);
        info!(base = %state.resolver.base().display(), "set new base");
        Ok(())
    }

    /// Sets the base to the directory containing `script`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FilesStillOpen`] while any handle is open.
    pub fn set_base_for_script(&self, script: &Path) -> StorageResult<()> {
        let mut state = self.inner.lock();
        state.check_for_open_files()?;
        state.resolver.set_base_for_script(script);
        info!(base = %state.resolver.base().display(), "set new base");
        Ok(())
    }

    /// Restores the default base.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FilesStillOpen`] while any handle is open.
    pub fn reset_base(&self) -> StorageResult<()> {
        let mut state = self.inner.lock();
        state.check_for_open_files()?;
        state.resolver.reset_base();
        info!(base = %state.resolver.base().display(), "reset base");
        Ok(())
    }
}
