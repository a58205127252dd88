//! Row selection for one configured data set.
//!
//! A [`DataSet`] is shared by all workers reading the same configuration.
//! Everything a worker learns about it (alias, variable names, block
//! cursor, update latch) lives in that worker's [`WorkerContext`], so the
//! data set itself is immutable after construction.
//!
//! ## Selection modes
//!
//! | Mode       | Row source                                   |
//! |------------|----------------------------------------------|
//! | Sequential | the alias' shared cursor, recycled at EOF    |
//! | Unique     | the worker's own block, by indexed reads     |
//! | Random     | a uniform data row, by indexed reads         |
//!
//! Failures while reading a row are logged and produce an empty row.
//! Setup failures and the abort policy end the worker with an error.

use crate::binder::{bind, VariableSink};
use crate::config::{DataSetConfig, OutOfValuesPolicy, SelectionMode, ShareMode, UpdateMode};
use crate::error::{CoreError, CoreResult};
use crate::partition::{advance, compute_block, PartitionState, Step};
use crate::server::FileServer;
use crate::worker::WorkerContext;
use rowfeed_codec::{delimiter_char, parse_line, split_names, RowSplitter};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One row handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    /// The row's fields.
    pub fields: Vec<String>,
    /// Whether the fields should be bound to the variables.
    pub bind: bool,
    /// File-line index of the row, for indexed reads.
    pub line: Option<usize>,
}

impl Row {
    fn empty() -> Self {
        Self::default()
    }
}

/// Per-worker state of one data set.
#[derive(Debug, Clone)]
pub(crate) struct DataSetState {
    alias: String,
    names: Vec<String>,
    skip_header: bool,
    head: usize,
    row_count: usize,
    partition: Option<PartitionState>,
    update_latched: bool,
    last_fields: Option<Vec<String>>,
}

impl DataSetState {
    pub(crate) fn alias(&self) -> &str {
        &self.alias
    }

    pub(crate) fn names(&self) -> &[String] {
        &self.names
    }

    pub(crate) fn partition(&self) -> Option<&PartitionState> {
        self.partition.as_ref()
    }
}

/// A configured data set.
///
/// # Example
///
/// ```no_run
/// use rowfeed_core::{DataSet, DataSetConfig, FileServer, SelectionMode, Variables};
/// use std::sync::Arc;
///
/// let server = Arc::new(FileServer::new());
/// let users = DataSet::new(
///     Arc::clone(&server),
///     DataSetConfig::new("users.csv").selection(SelectionMode::Unique),
/// )?;
///
/// let mut worker = server.worker("Users 1-1", "Users", 4);
/// let mut vars = Variables::new();
/// users.iteration_start(&mut worker, &mut vars)?;
/// println!("{:?}", vars.get("id"));
/// # Ok::<(), rowfeed_core::CoreError>(())
/// ```
#[derive(Debug)]
pub struct DataSet {
    id: u64,
    server: Arc<FileServer>,
    config: DataSetConfig,
    splitter: RowSplitter,
}

impl DataSet {
    /// Creates a data set.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` does not validate.
    pub fn new(server: Arc<FileServer>, config: DataSetConfig) -> CoreResult<Self> {
        config.validate()?;
        let splitter = RowSplitter::new(&config.delimiter, config.quoted_data)
            .map_err(|e| CoreError::configuration(e.to_string()))?;
        Ok(Self {
            id: server.next_data_set_id(),
            server,
            config,
            splitter,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &DataSetConfig {
        &self.config
    }

    /// Returns the server this data set reads through.
    #[must_use]
    pub fn server(&self) -> &Arc<FileServer> {
        &self.server
    }

    /// Returns the alias `worker` reads through, once initialised.
    #[must_use]
    pub fn alias<'a>(&self, worker: &'a WorkerContext) -> Option<&'a str> {
        worker.state(self.id).map(DataSetState::alias)
    }

    /// Returns the variable names `worker` binds, once initialised.
    #[must_use]
    pub fn variable_names<'a>(&self, worker: &'a WorkerContext) -> Option<&'a [String]> {
        worker.state(self.id).map(DataSetState::names)
    }

    /// Returns the block cursor of `worker` in unique mode.
    #[must_use]
    pub fn partition(&self, worker: &WorkerContext) -> Option<PartitionState> {
        worker.state(self.id).and_then(DataSetState::partition).copied()
    }

    /// Selects the next row for `worker` and binds it into `sink`.
    ///
    /// Returns the number of variables assigned.
    ///
    /// # Errors
    ///
    /// See [`next_row`](Self::next_row).
    pub fn iteration_start<S: VariableSink + ?Sized>(
        &self,
        worker: &mut WorkerContext,
        sink: &mut S,
    ) -> CoreResult<usize> {
        let row = self.next_row(worker)?;
        if !row.bind {
            return Ok(0);
        }
        let names = self.variable_names(worker).unwrap_or_default();
        Ok(bind(names, &row.fields, sink))
    }

    /// Selects the next row for `worker`.
    ///
    /// The first call initialises the worker's view of the data set.
    ///
    /// # Errors
    ///
    /// Only errors that stop the worker are returned: configuration and
    /// setup failures, and [`CoreError::EndOfBlock`] /
    /// [`CoreError::EndOfFile`] under the abort policy. Row-level failures
    /// are logged and yield an empty, unbound row.
    pub fn next_row(&self, worker: &mut WorkerContext) -> CoreResult<Row> {
        let mut state = match worker.take_state(self.id) {
            Some(state) => state,
            None => self.initialize(worker)?,
        };

        let result = match self.config.select_row {
            SelectionMode::Sequential => self.read_sequential(&mut state),
            SelectionMode::Unique => self.read_unique(&mut state),
            SelectionMode::Random => self.read_random(&state, worker),
        };

        let row = match result {
            Ok(mut row) => {
                row.bind &= !row.fields.is_empty();
                if self.config.update_value == UpdateMode::Once {
                    if state.update_latched {
                        row.bind = false;
                    }
                    state.update_latched = true;
                }
                Ok(row)
            }
            Err(e) if e.is_fatal() => {
                if e.is_end_of_data() {
                    self.server.stats().record_abort();
                    info!(worker = worker.name(), error = %e, "stopping worker");
                }
                Err(e)
            }
            Err(e) => {
                error!(alias = state.alias.as_str(), error = %e, "failed to read row");
                self.server.stats().record_degraded();
                Ok(Row::empty())
            }
        };

        worker.insert_state(self.id, state);
        row
    }

    fn alias_for(&self, worker: &WorkerContext) -> String {
        let filename = self.config.filename.trim();
        match self.config.share_mode {
            ShareMode::AllThreads => filename.to_string(),
            ShareMode::Group => format!("{filename}@group:{}", worker.group()),
            ShareMode::Thread => format!("{filename}@thread:{}", worker.id()),
        }
    }

    fn initialize(&self, worker: &WorkerContext) -> CoreResult<DataSetState> {
        let filename = self.config.filename.trim();
        let encoding = self.config.encoding_label();
        let alias = self.alias_for(worker);
        let server = &self.server;

        let (names, skip_header) = match self.config.explicit_names() {
            Some(names) => {
                let skip_header = self.config.ignore_first_line;
                server.reserve(&alias, filename, encoding, skip_header)?;
                (split_names(names, ","), skip_header)
            }
            None => {
                let header = server
                    .reserve(&alias, filename, encoding, true)?
                    .unwrap_or_default();
                let delimiter = delimiter_char(self.splitter.delimiter())?;
                let names = parse_line(&header, delimiter).map_err(|e| {
                    CoreError::configuration(format!(
                        "could not split header line of {filename}: {e}"
                    ))
                })?;
                (names.into_iter().map(|n| n.trim().to_string()).collect(), true)
            }
        };
        let head = usize::from(skip_header);

        let row_count = match self.config.select_row {
            SelectionMode::Sequential => 0,
            SelectionMode::Unique | SelectionMode::Random => {
                server.row_count(&alias, skip_header)?
            }
        };

        let partition = if self.config.select_row == SelectionMode::Unique {
            let block = compute_block(
                row_count,
                worker.ordinal()?,
                worker.worker_count(),
                self.config.block_allocation,
                head,
            )?;
            debug!(alias = alias.as_str(), start = block.start, end = block.end, "allocated block");
            Some(PartitionState::new(block))
        } else {
            None
        };

        server.stats().record_initialisation();
        info!(
            worker = worker.name(),
            alias = alias.as_str(),
            mode = %self.config.select_row,
            "data set ready"
        );
        Ok(DataSetState {
            alias,
            names,
            skip_header,
            head,
            row_count,
            partition,
            update_latched: false,
            last_fields: None,
        })
    }

    fn read_sequential(&self, state: &mut DataSetState) -> CoreResult<Row> {
        let registry = self.server.registry();
        let policy = self.config.oo_value;
        let recycle = policy == OutOfValuesPolicy::ContinueCyclic;

        let line = if self.splitter.is_quoted() {
            registry.next_line_guarded(&state.alias, recycle, state.skip_header)?
        } else {
            registry.next_line(&state.alias, recycle, state.skip_header)?
        };

        match line {
            Some(line) => {
                let fields = self.splitter.split(&line)?;
                debug!(alias = state.alias.as_str(), "sequential row");
                self.server.stats().record_row(SelectionMode::Sequential);
                state.last_fields = Some(fields.clone());
                Ok(Row {
                    fields,
                    bind: true,
                    line: None,
                })
            }
            None => match policy {
                OutOfValuesPolicy::AbortThread => Err(CoreError::EndOfFile {
                    filename: self.config.filename.clone(),
                    alias: state.alias.clone(),
                    policy,
                }),
                OutOfValuesPolicy::ContinueWithLastValue => {
                    warn!(alias = state.alias.as_str(), "end of file, keeping last value");
                    self.server.stats().record_frozen_read();
                    Ok(Row {
                        fields: state.last_fields.clone().unwrap_or_default(),
                        bind: false,
                        line: None,
                    })
                }
                OutOfValuesPolicy::ContinueCyclic => {
                    warn!(alias = state.alias.as_str(), "no data rows to recycle");
                    Ok(Row::empty())
                }
            },
        }
    }

    fn read_unique(&self, state: &mut DataSetState) -> CoreResult<Row> {
        let policy = self.config.oo_value;
        let Some(partition) = state.partition.as_mut() else {
            return Err(CoreError::configuration("unique selection without a block"));
        };

        match advance(partition, policy) {
            Step::EndOfBlock => Err(CoreError::EndOfBlock {
                filename: self.config.filename.clone(),
                alias: state.alias.clone(),
                policy,
            }),
            Step::Read { row, bind, wrapped } => {
                if wrapped {
                    self.server.stats().record_recycle();
                }
                if !bind {
                    self.server.stats().record_frozen_read();
                }
                debug!(alias = state.alias.as_str(), row, "unique row");
                let mut selected = self.read_line(state, row, SelectionMode::Unique)?;
                selected.bind &= bind;
                Ok(selected)
            }
        }
    }

    /// Picks a file line in `[head, row_count - 1]`.
    ///
    /// The upper bound is the data row count, not the last line, so with a
    /// header the final data row is never drawn.
    fn read_random(&self, state: &DataSetState, worker: &mut WorkerContext) -> CoreResult<Row> {
        if state.row_count <= state.head {
            warn!(alias = state.alias.as_str(), "no data rows to pick from");
            return Ok(Row::empty());
        }
        let row = worker.random_index(state.head..=state.row_count - 1);
        debug!(alias = state.alias.as_str(), row, "random row");
        self.read_line(state, row, SelectionMode::Random)
    }

    /// Reads and splits file line `row`, if it holds data.
    fn read_line(&self, state: &DataSetState, row: usize, mode: SelectionMode) -> CoreResult<Row> {
        if row < state.head || row >= state.head + state.row_count {
            warn!(alias = state.alias.as_str(), row, "row is outside the file");
            return Ok(Row::empty());
        }
        let Some(line) = self.server.registry().read_at_index(&state.alias, row)? else {
            warn!(alias = state.alias.as_str(), row, "row is outside the file");
            return Ok(Row::empty());
        };
        let fields = self.splitter.split(&line)?;
        self.server.stats().record_row(mode);
        Ok(Row {
            fields,
            bind: true,
            line: Some(row),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::Variables;
    use crate::config::BlockAllocation;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn setup(content: &str) -> (TempDir, Arc<FileServer>) {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("data.csv"), content).unwrap();
        let server = Arc::new(FileServer::with_base(dir.path()));
        (dir, server)
    }

    fn data_set(server: &Arc<FileServer>, config: DataSetConfig) -> DataSet {
        DataSet::new(Arc::clone(server), config).unwrap()
    }

    fn first_field(row: &Row) -> &str {
        row.fields.first().map_or("", String::as_str)
    }

    #[test]
    fn sequential_cycles_through_file() {
        let (_dir, server) = setup("x\ny\nz\n");
        let ds = data_set(&server, DataSetConfig::new("data.csv").variable_names("v"));
        let mut w = server.worker("g 1-1", "g", 1);

        let values: Vec<_> = (0..4)
            .map(|_| first_field(&ds.next_row(&mut w).unwrap()).to_string())
            .collect();
        assert_eq!(values, ["x", "y", "z", "x"]);
    }

    #[test]
    fn header_supplies_variable_names() {
        let (_dir, server) = setup("id, name\n1,ann\n2,bob\n");
        let ds = data_set(&server, DataSetConfig::new("data.csv"));
        let mut w = server.worker("g 1-1", "g", 1);
        let mut vars = Variables::new();

        assert_eq!(ds.iteration_start(&mut w, &mut vars).unwrap(), 2);
        assert_eq!(vars.get("id"), Some("1"));
        assert_eq!(vars.get("name"), Some("ann"));
        assert_eq!(ds.variable_names(&w).unwrap(), ["id", "name"]);

        ds.iteration_start(&mut w, &mut vars).unwrap();
        ds.iteration_start(&mut w, &mut vars).unwrap();
        // Recycled past the header.
        assert_eq!(vars.get("id"), Some("1"));
    }

    #[test]
    fn sequential_abort_raises_end_of_file() {
        let (_dir, server) = setup("a\nb\n");
        let ds = data_set(
            &server,
            DataSetConfig::new("data.csv")
                .variable_names("v")
                .out_of_values(OutOfValuesPolicy::AbortThread),
        );
        let mut w = server.worker("g 1-1", "g", 1);
        ds.next_row(&mut w).unwrap();
        ds.next_row(&mut w).unwrap();
        let err = ds.next_row(&mut w).unwrap_err();
        assert!(matches!(err, CoreError::EndOfFile { .. }));
        assert_eq!(server.stats().aborted_workers(), 1);
    }

    #[test]
    fn sequential_last_value_is_not_rebound() {
        let (_dir, server) = setup("a\nb\n");
        let ds = data_set(
            &server,
            DataSetConfig::new("data.csv")
                .variable_names("v")
                .out_of_values(OutOfValuesPolicy::ContinueWithLastValue),
        );
        let mut w = server.worker("g 1-1", "g", 1);
        ds.next_row(&mut w).unwrap();
        ds.next_row(&mut w).unwrap();
        let row = ds.next_row(&mut w).unwrap();
        assert_eq!(row.fields, ["b"]);
        assert!(!row.bind);
    }

    #[test]
    fn unique_abort_stops_after_block() {
        let (_dir, server) = setup("r0\nr1\nr2\nr3\n");
        let ds = data_set(
            &server,
            DataSetConfig::new("data.csv")
                .variable_names("v")
                .selection(SelectionMode::Unique)
                .out_of_values(OutOfValuesPolicy::AbortThread)
                .block_allocation(BlockAllocation::Auto),
        );
        let mut w = server.worker("g 1-2", "g", 2);

        assert_eq!(ds.next_row(&mut w).unwrap().fields, ["r2"]);
        assert_eq!(ds.next_row(&mut w).unwrap().fields, ["r3"]);
        let err = ds.next_row(&mut w).unwrap_err();
        assert!(matches!(err, CoreError::EndOfBlock { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn unique_last_value_freezes() {
        let (_dir, server) = setup("h\nr1\nr2\n");
        let ds = data_set(
            &server,
            DataSetConfig::new("data.csv")
                .variable_names("v")
                .ignore_first_line(true)
                .selection(SelectionMode::Unique)
                .out_of_values(OutOfValuesPolicy::ContinueWithLastValue)
                .block_allocation(BlockAllocation::Explicit(2)),
        );
        let mut w = server.worker("g 1-1", "g", 1);
        let mut vars = Variables::new();

        assert_eq!(ds.iteration_start(&mut w, &mut vars).unwrap(), 1);
        assert_eq!(vars.get("v"), Some("r1"));
        assert_eq!(ds.iteration_start(&mut w, &mut vars).unwrap(), 1);
        assert_eq!(vars.get("v"), Some("r2"));
        assert_eq!(ds.iteration_start(&mut w, &mut vars).unwrap(), 0);
        assert!(ds.partition(&w).unwrap().frozen);
        assert_eq!(server.stats().frozen_reads(), 1);
    }

    #[test]
    fn unique_block_beyond_file_yields_empty_rows() {
        let (_dir, server) = setup("a\nb\n");
        let ds = data_set(
            &server,
            DataSetConfig::new("data.csv")
                .variable_names("v")
                .selection(SelectionMode::Unique)
                .block_allocation(BlockAllocation::Explicit(5)),
        );
        let mut w = server.worker("g 1-2", "g", 2);
        let row = ds.next_row(&mut w).unwrap();
        assert!(row.fields.is_empty());
        assert!(!row.bind);
    }

    #[test]
    fn unique_needs_a_worker_number() {
        let (_dir, server) = setup("a\nb\n");
        let ds = data_set(
            &server,
            DataSetConfig::new("data.csv")
                .variable_names("v")
                .selection(SelectionMode::Unique),
        );
        let mut w = server.worker("anonymous", "g", 1);
        assert!(matches!(
            ds.next_row(&mut w),
            Err(CoreError::Configuration { .. })
        ));
    }

    #[test]
    fn random_range_with_header_stops_before_row_count() {
        let (_dir, server) = setup("name\nr1\nr2\nr3\n");
        let ds = data_set(&server, DataSetConfig::new("data.csv").selection(SelectionMode::Random));
        let mut w = server.worker("g 1-1", "g", 1).with_seed(7);

        let mut lines = std::collections::BTreeSet::new();
        for _ in 0..200 {
            let row = ds.next_row(&mut w).unwrap();
            assert!(row.bind);
            lines.insert(row.line.unwrap());
        }
        // Three data rows: lines 1 and 2 are drawn, never the header or line 3.
        assert_eq!(lines.into_iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn random_range_without_header_covers_every_line() {
        let (_dir, server) = setup("r0\nr1\nr2\n");
        let ds = data_set(
            &server,
            DataSetConfig::new("data.csv")
                .variable_names("v")
                .selection(SelectionMode::Random),
        );
        let mut w = server.worker("g 1-1", "g", 1).with_seed(11);

        let mut lines = std::collections::BTreeSet::new();
        for _ in 0..200 {
            lines.insert(ds.next_row(&mut w).unwrap().line.unwrap());
        }
        assert_eq!(lines.into_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn random_with_header_and_single_row_yields_empty_rows() {
        let (_dir, server) = setup("name\nonly\n");
        let ds = data_set(&server, DataSetConfig::new("data.csv").selection(SelectionMode::Random));
        let mut w = server.worker("g 1-1", "g", 1);

        let row = ds.next_row(&mut w).unwrap();
        assert!(row.fields.is_empty());
        assert!(!row.bind);
    }

    #[test]
    fn quoted_fields_are_parsed() {
        let (_dir, server) = setup("a,b\n\"x,1\",y\n");
        let ds = data_set(&server, DataSetConfig::new("data.csv").quoted_data(true));
        let mut w = server.worker("g 1-1", "g", 1);
        let mut vars = Variables::new();
        ds.iteration_start(&mut w, &mut vars).unwrap();
        assert_eq!(vars.get("a"), Some("x,1"));
        assert_eq!(vars.get("b"), Some("y"));
    }

    #[test]
    fn malformed_row_degrades_to_empty() {
        let (_dir, server) = setup("a\"b,c\nok,1\n");
        let ds = data_set(
            &server,
            DataSetConfig::new("data.csv").variable_names("v,w").quoted_data(true),
        );
        let mut w = server.worker("g 1-1", "g", 1);
        let row = ds.next_row(&mut w).unwrap();
        assert!(row.fields.is_empty());
        assert_eq!(server.stats().degraded_rows(), 1);
        assert_eq!(ds.next_row(&mut w).unwrap().fields, ["ok", "1"]);
    }

    #[test]
    fn update_once_binds_first_row_only() {
        let (_dir, server) = setup("1\n2\n3\n");
        let ds = data_set(
            &server,
            DataSetConfig::new("data.csv")
                .variable_names("v")
                .update(UpdateMode::Once),
        );
        let mut w = server.worker("g 1-1", "g", 1);
        let mut vars = Variables::new();
        for _ in 0..3 {
            ds.iteration_start(&mut w, &mut vars).unwrap();
        }
        assert_eq!(vars.get("v"), Some("1"));
    }

    #[test]
    fn per_thread_sharing_gives_each_worker_a_cursor() {
        let (_dir, server) = setup("a\nb\n");
        let ds = data_set(
            &server,
            DataSetConfig::new("data.csv")
                .variable_names("v")
                .share_mode(ShareMode::Thread),
        );
        let mut w1 = server.worker("g 1-1", "g", 2);
        let mut w2 = server.worker("g 1-2", "g", 2);

        assert_eq!(ds.next_row(&mut w1).unwrap().fields, ["a"]);
        assert_eq!(ds.next_row(&mut w2).unwrap().fields, ["a"]);
        assert_ne!(ds.alias(&w1), ds.alias(&w2));
    }

    #[test]
    fn shared_cursor_across_workers() {
        let (_dir, server) = setup("a\nb\n");
        let ds = data_set(&server, DataSetConfig::new("data.csv").variable_names("v"));
        let mut w1 = server.worker("g 1-1", "g", 2);
        let mut w2 = server.worker("g 1-2", "g", 2);

        assert_eq!(ds.next_row(&mut w1).unwrap().fields, ["a"]);
        assert_eq!(ds.next_row(&mut w2).unwrap().fields, ["b"]);
        assert_eq!(ds.alias(&w1), Some("data.csv"));
    }

    #[test]
    fn group_alias_is_salted() {
        let (_dir, server) = setup("a\n");
        let ds = data_set(
            &server,
            DataSetConfig::new("data.csv")
                .variable_names("v")
                .share_mode(ShareMode::Group),
        );
        let mut w = server.worker("Users 1-1", "Users", 1);
        ds.next_row(&mut w).unwrap();
        assert_eq!(ds.alias(&w), Some("data.csv@group:Users"));
    }

    #[test]
    fn empty_file_with_header_names_fails_setup() {
        let (_dir, server) = setup("");
        let ds = data_set(&server, DataSetConfig::new("data.csv"));
        let mut w = server.worker("g 1-1", "g", 1);
        let err = ds.next_row(&mut w).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Storage(rowfeed_storage::StorageError::HeaderUnavailable { .. })
        ));
        // Still refused on the next attempt.
        assert!(ds.next_row(&mut w).is_err());
    }

    #[test]
    fn tab_delimiter() {
        let (_dir, server) = setup("a\tb\n1\t2\n");
        let ds = data_set(&server, DataSetConfig::new("data.csv").delimiter("\\t"));
        let mut w = server.worker("g 1-1", "g", 1);
        let mut vars = Variables::new();
        ds.iteration_start(&mut w, &mut vars).unwrap();
        assert_eq!(vars.get("b"), Some("2"));
    }
}
