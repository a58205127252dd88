//! Data set configuration.
//!
//! Every mode switch is a closed enum parsed once, when the configuration
//! is loaded. The accepted spellings are the configuration tags
//! (`selectRow.unique`, `recycle.abortThread`, ...) and short kebab-case
//! names (`unique`, `abort-thread`, ...), both case-insensitive. A blank
//! value selects the default.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

fn parse_tag<T: Copy + Default>(
    value: &str,
    table: &[(&str, &str, T)],
    what: &str,
) -> CoreResult<T> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(T::default());
    }
    table
        .iter()
        .find(|(tag, short, _)| value.eq_ignore_ascii_case(tag) || value.eq_ignore_ascii_case(short))
        .map(|(_, _, variant)| *variant)
        .ok_or_else(|| CoreError::configuration(format!("invalid {what}: {value}")))
}

macro_rules! config_enum_impls {
    ($ty:ident, $table:ident, $what:literal) => {
        impl $ty {
            /// Returns the configuration tag.
            #[must_use]
            pub fn tag(self) -> &'static str {
                $table
                    .iter()
                    .find(|(_, _, variant)| *variant == self)
                    .map_or("", |(tag, _, _)| *tag)
            }
        }

        impl FromStr for $ty {
            type Err = CoreError;

            fn from_str(s: &str) -> CoreResult<Self> {
                parse_tag(s, $table, $what)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = CoreError;

            fn try_from(value: String) -> CoreResult<Self> {
                value.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.tag().to_string()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.tag())
            }
        }
    };
}

/// How a worker picks the next row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SelectionMode {
    /// Next line through the alias' shared cursor.
    #[default]
    Sequential,
    /// Walk the worker's own block of rows.
    Unique,
    /// A uniformly random data row on every call.
    Random,
}

const SELECTION_TAGS: &[(&str, &str, SelectionMode)] = &[
    ("selectRow.sequential", "sequential", SelectionMode::Sequential),
    ("selectRow.unique", "unique", SelectionMode::Unique),
    ("selectRow.random", "random", SelectionMode::Random),
];
config_enum_impls!(SelectionMode, SELECTION_TAGS, "select row mode");

/// When selected rows are bound to variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum UpdateMode {
    /// Bind on every iteration.
    #[default]
    EachIteration,
    /// Bind only on the worker's first iteration.
    Once,
}

const UPDATE_TAGS: &[(&str, &str, UpdateMode)] = &[
    ("updateValue.eachIteration", "each-iteration", UpdateMode::EachIteration),
    ("updateValue.once", "once", UpdateMode::Once),
];
config_enum_impls!(UpdateMode, UPDATE_TAGS, "update value mode");

/// What happens when a worker runs out of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OutOfValuesPolicy {
    /// Start over from the beginning of the file or block.
    #[default]
    ContinueCyclic,
    /// Stop the worker.
    AbortThread,
    /// Keep returning the last row without rebinding it.
    ContinueWithLastValue,
}

const POLICY_TAGS: &[(&str, &str, OutOfValuesPolicy)] = &[
    ("recycle.continueCyclic", "continue-cyclic", OutOfValuesPolicy::ContinueCyclic),
    ("recycle.abortThread", "abort-thread", OutOfValuesPolicy::AbortThread),
    (
        "recycle.continueLastValue",
        "continue-last-value",
        OutOfValuesPolicy::ContinueWithLastValue,
    ),
];
config_enum_impls!(OutOfValuesPolicy, POLICY_TAGS, "out of values policy");

/// Which workers share one read cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ShareMode {
    /// All workers share the cursor.
    #[default]
    AllThreads,
    /// Workers of one group share a cursor.
    Group,
    /// Every worker has its own cursor.
    Thread,
}

const SHARE_TAGS: &[(&str, &str, ShareMode)] = &[
    ("shareMode.all", "all", ShareMode::AllThreads),
    ("shareMode.group", "group", ShareMode::Group),
    ("shareMode.thread", "thread", ShareMode::Thread),
];
config_enum_impls!(ShareMode, SHARE_TAGS, "share mode");

/// How many rows each worker owns in unique mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockAllocation {
    /// `rows / workers`, remainder rows unassigned.
    Auto,
    /// A fixed block size; must be at least 1.
    Explicit(i64),
}

impl Default for BlockAllocation {
    fn default() -> Self {
        Self::Explicit(1)
    }
}

impl BlockAllocation {
    /// Builds an allocation from the auto-allocate flag and the block size text.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the block size is not an integer.
    /// Sizes below 1 are rejected later, when the block is computed.
    pub fn from_settings(auto_allocate: bool, block_size: &str) -> CoreResult<Self> {
        if auto_allocate {
            return Ok(Self::Auto);
        }
        block_size.trim().parse().map(Self::Explicit).map_err(|_| {
            CoreError::configuration(format!("block size is not a number: {block_size}"))
        })
    }

    /// Returns whether the block size is derived automatically.
    #[must_use]
    pub const fn is_auto(self) -> bool {
        matches!(self, Self::Auto)
    }
}

/// Configuration of one data set.
///
/// # Example
///
/// ```
/// use rowfeed_core::{DataSetConfig, SelectionMode, OutOfValuesPolicy};
///
/// let config = DataSetConfig::new("users.csv")
///     .selection(SelectionMode::Unique)
///     .out_of_values(OutOfValuesPolicy::AbortThread)
///     .variable_names("id,name");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DataSetConfig {
    /// File name, relative to the base directory or absolute.
    pub filename: String,
    /// Encoding label; blank means BOM detection or UTF-8.
    pub file_encoding: Option<String>,
    /// Comma separated variable names; blank means "take them from the header line".
    pub variable_names: Option<String>,
    /// Whether the first line is a header to skip.
    pub ignore_first_line: bool,
    /// Field delimiter; `\t` means tab, blank means comma.
    pub delimiter: String,
    /// Whether fields may be quoted.
    pub quoted_data: bool,
    /// Row selection mode.
    pub select_row: SelectionMode,
    /// Variable update timing.
    pub update_value: UpdateMode,
    /// Out-of-values policy.
    pub oo_value: OutOfValuesPolicy,
    /// Cursor sharing mode.
    pub share_mode: ShareMode,
    /// Block allocation for unique mode.
    pub block_allocation: BlockAllocation,
}

impl Default for DataSetConfig {
    fn default() -> Self {
        Self {
            filename: String::new(),
            file_encoding: None,
            variable_names: None,
            ignore_first_line: false,
            delimiter: ",".to_string(),
            quoted_data: false,
            select_row: SelectionMode::default(),
            update_value: UpdateMode::default(),
            oo_value: OutOfValuesPolicy::default(),
            share_mode: ShareMode::default(),
            block_allocation: BlockAllocation::default(),
        }
    }
}

impl DataSetConfig {
    /// Creates a configuration for `filename` with default values.
    #[must_use]
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }

    /// Sets the file encoding label.
    #[must_use]
    pub fn file_encoding(mut self, label: impl Into<String>) -> Self {
        self.file_encoding = Some(label.into());
        self
    }

    /// Sets the variable names.
    #[must_use]
    pub fn variable_names(mut self, names: impl Into<String>) -> Self {
        self.variable_names = Some(names.into());
        self
    }

    /// Sets whether the first line is skipped.
    #[must_use]
    pub const fn ignore_first_line(mut self, value: bool) -> Self {
        self.ignore_first_line = value;
        self
    }

    /// Sets the delimiter.
    #[must_use]
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Sets whether fields may be quoted.
    #[must_use]
    pub const fn quoted_data(mut self, value: bool) -> Self {
        self.quoted_data = value;
        self
    }

    /// Sets the selection mode.
    #[must_use]
    pub const fn selection(mut self, mode: SelectionMode) -> Self {
        self.select_row = mode;
        self
    }

    /// Sets the update timing.
    #[must_use]
    pub const fn update(mut self, mode: UpdateMode) -> Self {
        self.update_value = mode;
        self
    }

    /// Sets the out-of-values policy.
    #[must_use]
    pub const fn out_of_values(mut self, policy: OutOfValuesPolicy) -> Self {
        self.oo_value = policy;
        self
    }

    /// Sets the sharing mode.
    #[must_use]
    pub const fn share_mode(mut self, mode: ShareMode) -> Self {
        self.share_mode = mode;
        self
    }

    /// Sets the block allocation.
    #[must_use]
    pub const fn block_allocation(mut self, allocation: BlockAllocation) -> Self {
        self.block_allocation = allocation;
        self
    }

    /// Returns the trimmed variable-name list, if one was given.
    #[must_use]
    pub fn explicit_names(&self) -> Option<&str> {
        self.variable_names
            .as_deref()
            .map(str::trim)
            .filter(|names| !names.is_empty())
    }

    /// Returns the encoding label, if not blank.
    #[must_use]
    pub fn encoding_label(&self) -> Option<&str> {
        self.file_encoding
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
    }

    /// Checks the settings that can be checked without touching the file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a blank file name or an explicit
    /// block size below 1 in unique mode.
    pub fn validate(&self) -> CoreResult<()> {
        if self.filename.trim().is_empty() {
            return Err(CoreError::configuration("filename must not be empty"));
        }
        if self.select_row == SelectionMode::Unique {
            if let BlockAllocation::Explicit(size) = self.block_allocation {
                if size < 1 {
                    return Err(CoreError::configuration(format!(
                        "allocate block size {size}: block size must be greater than 0, \
                         or enable auto allocate"
                    )));
                }
            }
        }
        Ok(())
    }
}
