//! File name resolution against a base directory.

use std::path::{Path, PathBuf};

/// Prefix marking a name as relative to the current base directory.
pub const BASE_PREFIX: &str = "~/";

/// Resolves user-supplied file names.
///
/// A name that is absolute, or that exists relative to the process
/// working directory, is used as is. Any other name is joined onto the
/// current base directory, which is usually the directory of the test
/// plan being run.
#[derive(Debug, Clone)]
pub struct PathResolver {
    base: PathBuf,
    default_base: PathBuf,
    script_name: Option<String>,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PathResolver {
    /// Creates a resolver whose base is the process working directory.
    #[must_use]
    pub fn new() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_default_base(cwd)
    }

    /// Creates a resolver with an explicit default base.
    #[must_use]
    pub fn with_default_base(default_base: impl Into<PathBuf>) -> Self {
        let default_base = default_base.into();
        Self {
            base: default_base.clone(),
            default_base,
            script_name: None,
        }
    }

    /// Returns the current base directory.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Returns the base that [`reset_base`](Self::reset_base) restores.
    #[must_use]
    pub fn default_base(&self) -> &Path {
        &self.default_base
    }

    /// Returns the name of the script set with
    /// [`set_base_for_script`](Self::set_base_for_script).
    #[must_use]
    pub fn script_name(&self) -> Option<&str> {
        self.script_name.as_deref()
    }

    /// Resolves `name` to a path.
    ///
    /// Never touches the file beyond an existence check; a missing file
    /// surfaces later as an I/O error.
    #[must_use]
    pub fn resolve(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() || path.exists() {
            path.to_path_buf()
        } else {
            self.base.join(name)
        }
    }

    /// Sets the base directory.
    pub fn set_base(&mut self, base: impl Into<PathBuf>) {
        self.base = base.into();
    }

    /// Sets the base from a path that may name a file, in which case its
    /// parent directory is used.
    pub fn set_base_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let base = if path.is_dir() {
            path.to_path_buf()
        } else {
            path.parent().map_or_else(|| path.to_path_buf(), Path::to_path_buf)
        };
        self.base = base;
    }

    /// Sets the base to the directory holding `script` and remembers the
    /// script's file name.
    pub fn set_base_for_script(&mut self, script: impl AsRef<Path>) {
        let script = script.as_ref();
        self.script_name = script
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        let absolute = self.absolute(script);
        if let Some(parent) = absolute.parent() {
            self.base = parent.to_path_buf();
        }
    }

    /// Restores the default base.
    pub fn reset_base(&mut self) {
        self.base = self.default_base.clone();
    }

    /// Returns the current base relative to the default base, or `.`
    /// when the base is not below the default base.
    #[must_use]
    pub fn base_relative(&self) -> PathBuf {
        let default_base = self.absolute(&self.default_base);
        let base = self.absolute(&self.base);
        match base.strip_prefix(&default_base) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Expands a name starting with [`BASE_PREFIX`] to an absolute path
    /// under the base directory. Other names are returned unchanged.
    #[must_use]
    pub fn resolve_base_relative_name(&self, name: &str) -> String {
        match name.strip_prefix(BASE_PREFIX) {
            Some(rest) => self
                .absolute(&self.base.join(rest))
                .to_string_lossy()
                .into_owned(),
            None => name.to_string(),
        }
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.default_base.join(path)
        }
    }
}
