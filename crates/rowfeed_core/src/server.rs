//! The file server shared by all data sets of a run.

use crate::error::{CoreError, CoreResult};
use crate::stats::ServerStats;
use crate::worker::{WorkerContext, WorkerIdentity};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rowfeed_storage::{FileRegistry, PathResolver};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Owns the file registry, the row-count cache and the statistics.
///
/// One server lives for the whole run and is shared, usually behind an
/// [`Arc`](std::sync::Arc), by every [`DataSet`](crate::DataSet) and
/// worker.
///
/// # Example
///
/// ```no_run
/// use rowfeed_core::FileServer;
/// use std::path::Path;
///
/// let server = FileServer::new();
/// server.set_base(Path::new("/data")).unwrap();
/// let rows = server.row_count_of("users.csv", true).unwrap();
/// println!("{rows} data rows");
/// ```
#[derive(Debug)]
pub struct FileServer {
    registry: FileRegistry,
    row_counts: Mutex<HashMap<PathBuf, usize>>,
    stats: ServerStats,
    next_worker_id: AtomicU64,
    next_data_set_id: AtomicU64,
}

impl Default for FileServer {
    fn default() -> Self {
        Self::new()
    }
}

impl FileServer {
    /// Creates a server based in the process working directory.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(FileRegistry::new())
    }

    /// Creates a server whose default base is `base`.
    #[must_use]
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self::with_registry(FileRegistry::with_resolver(PathResolver::with_default_base(base)))
    }

    fn with_registry(registry: FileRegistry) -> Self {
        Self {
            registry,
            row_counts: Mutex::new(HashMap::new()),
            stats: ServerStats::new(),
            next_worker_id: AtomicU64::new(1),
            next_data_set_id: AtomicU64::new(1),
        }
    }

    /// Returns the underlying registry.
    #[must_use]
    pub fn registry(&self) -> &FileRegistry {
        &self.registry
    }

    /// Returns the server statistics.
    #[must_use]
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Creates the context of a new worker.
    ///
    /// `name` should end in `-<n>` (see [`WorkerContext::ordinal`]) for
    /// unique selection to find the worker's block. The returned context
    /// carries an id no other worker of this server gets.
    #[must_use]
    pub fn worker(
        &self,
        name: impl Into<String>,
        group: impl Into<String>,
        worker_count: usize,
    ) -> WorkerContext {
        let id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
        WorkerContext::new(
            WorkerIdentity {
                id,
                name: name.into(),
                group: group.into(),
            },
            worker_count,
        )
    }

    pub(crate) fn next_data_set_id(&self) -> u64 {
        self.next_data_set_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Sets the base directory for relative file names.
    ///
    /// # Errors
    ///
    /// Fails while any file is open.
    pub fn set_base(&self, base: &Path) -> CoreResult<()> {
        Ok(self.registry.set_base(base)?)
    }

    /// Sets the base to the directory of `script` and remembers its name.
    ///
    /// # Errors
    ///
    /// Fails while any file is open.
    pub fn set_base_for_script(&self, script: &Path) -> CoreResult<()> {
        Ok(self.registry.set_base_for_script(script)?)
    }

    /// Restores the default base.
    ///
    /// # Errors
    ///
    /// Fails while any file is open.
    pub fn reset_base(&self) -> CoreResult<()> {
        Ok(self.registry.reset_base()?)
    }

    /// Returns the current base directory.
    #[must_use]
    pub fn base(&self) -> PathBuf {
        self.registry.base()
    }

    /// Returns the base relative to the default base.
    #[must_use]
    pub fn base_relative(&self) -> PathBuf {
        self.registry.base_relative()
    }

    /// Returns the script name recorded by [`set_base_for_script`](Self::set_base_for_script).
    #[must_use]
    pub fn script_name(&self) -> Option<String> {
        self.registry.script_name()
    }

    /// Expands a `~/`-prefixed name under the base directory.
    #[must_use]
    pub fn resolve_base_relative_name(&self, name: &str) -> String {
        self.registry.resolve_base_relative_name(name)
    }

    /// Reserves `filename` under its own name.
    ///
    /// # Errors
    ///
    /// Fails for an empty file name.
    pub fn reserve_file(&self, filename: &str) -> CoreResult<()> {
        Ok(self.registry.reserve_file(filename)?)
    }

    /// Reserves `filename` under `alias`, returning the header if requested.
    ///
    /// # Errors
    ///
    /// Fails for an empty file name, an unknown encoding, or an unreadable
    /// header when `has_header` is set.
    pub fn reserve(
        &self,
        alias: &str,
        filename: &str,
        encoding: Option<&str>,
        has_header: bool,
    ) -> CoreResult<Option<String>> {
        Ok(self.registry.reserve(alias, filename, encoding, has_header)?)
    }

    /// Returns the number of data rows behind `alias`.
    ///
    /// The count is computed once per resolved path with a full scan and
    /// cached until [`close_all`](Self::close_all). With `has_header` the
    /// first line is not counted.
    ///
    /// # Errors
    ///
    /// Fails if the alias is not reserved or the file cannot be read.
    pub fn row_count(&self, alias: &str, has_header: bool) -> CoreResult<usize> {
        let path = self
            .registry
            .resolved_file(alias)
            .ok_or_else(|| CoreError::NotReserved {
                alias: alias.to_string(),
            })?;

        let mut counts = self.row_counts.lock();
        let lines = match counts.get(&path) {
            Some(lines) => *lines,
            None => {
                let lines = self.registry.count_lines(alias)?;
                debug!(path = %path.display(), lines, "counted lines");
                counts.insert(path, lines);
                lines
            }
        };
        Ok(if has_header { lines.saturating_sub(1) } else { lines })
    }

    /// Reserves `filename` and returns its data row count.
    ///
    /// # Errors
    ///
    /// See [`row_count`](Self::row_count).
    pub fn row_count_of(&self, filename: &str, has_header: bool) -> CoreResult<usize> {
        self.reserve_file(filename)?;
        self.row_count(filename, has_header)
    }

    /// Writes `text` to `filename`, truncating the file on the first write.
    ///
    /// # Errors
    ///
    /// Fails if the file is being read or cannot be written.
    pub fn write(&self, filename: &str, text: &str) -> CoreResult<()> {
        self.reserve_file(filename)?;
        Ok(self.registry.write(filename, text)?)
    }

    /// Closes the handle of one alias.
    ///
    /// # Errors
    ///
    /// Fails if flushing a writer fails.
    pub fn close_file(&self, alias: &str) -> CoreResult<()> {
        Ok(self.registry.close_file(alias)?)
    }

    /// Closes every file, forgets every reservation and clears the row counts.
    ///
    /// # Errors
    ///
    /// Returns the first failure raised while closing.
    pub fn close_all(&self) -> CoreResult<()> {
        self.row_counts.lock().clear();
        Ok(self.registry.close_all()?)
    }

    /// Returns whether any file is open.
    #[must_use]
    pub fn files_open(&self) -> bool {
        self.registry.files_open()
    }

    /// Picks a random file of `dir` whose extension is one of `extensions`.
    ///
    /// Extensions are compared without the dot and ignoring case; an empty
    /// list accepts every file. Relative directories are resolved against
    /// the base. Returns `None` if nothing matches.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be listed.
    pub fn random_file(&self, dir: &Path, extensions: &[&str]) -> CoreResult<Option<PathBuf>> {
        let dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.base().join(dir)
        };

        let mut candidates = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && has_extension(&path, extensions) {
                candidates.push(path);
            }
        }
        candidates.sort();

        let picked = candidates.choose(&mut rand::thread_rng()).cloned();
        if let Some(path) = &picked {
            info!(dir = %dir.display(), file = %path.display(), "picked random file");
        }
        Ok(picked)
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
}
