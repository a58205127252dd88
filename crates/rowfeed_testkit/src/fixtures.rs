//! Temporary data files and server helpers.

use rowfeed_core::{DataSet, DataSetConfig, FileServer, WorkerContext};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A temporary directory holding data files, with a server based in it.
pub struct TempCsv {
    /// The server, based in the temporary directory.
    pub server: Arc<FileServer>,
    /// The temporary directory (kept alive to prevent cleanup).
    dir: TempDir,
}

impl TempCsv {
    /// Creates a directory with one file `name` holding `content`.
    pub fn new(name: &str, content: &str) -> Self {
        let csv = Self::empty();
        csv.add_file(name, content);
        csv
    }

    /// Creates a directory with one file holding `lines`, one per line.
    pub fn with_lines(name: &str, lines: &[String]) -> Self {
        Self::new(name, &join_lines(lines))
    }

    /// Creates an empty directory.
    pub fn empty() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let server = Arc::new(FileServer::with_base(dir.path()));
        Self { server, dir }
    }

    /// Adds or replaces a file and returns its path.
    pub fn add_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).expect("Failed to write data file");
        path
    }

    /// Adds a file with raw bytes, e.g. a BOM or UTF-16 text.
    pub fn add_bytes(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, bytes).expect("Failed to write data file");
        path
    }

    /// Returns the directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Creates a data set on this server.
    pub fn data_set(&self, config: DataSetConfig) -> DataSet {
        DataSet::new(Arc::clone(&self.server), config).expect("Invalid data set configuration")
    }

    /// Creates worker `ordinal` of `count` in group `"test"`.
    pub fn worker(&self, ordinal: usize, count: usize) -> WorkerContext {
        self.server.worker(format!("test 1-{ordinal}"), "test", count)
    }

    /// Reads a file of the directory back.
    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }
}

/// Joins lines with `\n`, ending with a newline.
pub fn join_lines(lines: &[String]) -> String {
    let mut content = String::new();
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }
    content
}

/// Builds `count` single-column rows `prefix0`, `prefix1`, ...
pub fn numbered_rows(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}{i}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_csv_files_are_visible_to_server() {
        let csv = TempCsv::new("d.csv", "a\nb\n");
        assert_eq!(csv.server.row_count_of("d.csv", false).unwrap(), 2);
        assert_eq!(csv.read("d.csv"), "a\nb\n");
    }

    #[test]
    fn numbered_rows_join() {
        assert_eq!(join_lines(&numbered_rows("r", 2)), "r0\nr1\n");
    }
}
