//! rowfeed CLI
//!
//! Command-line tools for rowfeed data sets.
//!
//! # Commands
//!
//! - `run` - Drive worker threads over a data set and print their rows
//! - `blocks` - Print the unique-mode block plan for a file
//! - `parse` - Tokenise a file and report malformed rows
//! - `count` - Count the data rows of a file

mod commands;

use clap::{Args, Parser, Subcommand};
use rowfeed_core::{
    BlockAllocation, DataSetConfig, OutOfValuesPolicy, SelectionMode, ShareMode, UpdateMode,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Concurrent row feeding over delimited files.
#[derive(Parser)]
#[command(name = "rowfeed")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base directory for relative file names
    #[arg(global = true, short, long)]
    base: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run worker threads over a data set
    Run {
        #[command(flatten)]
        data_set: DataSetArgs,

        /// Load the data set configuration from a JSON file instead of flags
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of worker threads
        #[arg(short, long, default_value = "1")]
        workers: usize,

        /// Iterations per worker
        #[arg(short, long, default_value = "1")]
        iterations: usize,

        /// Seed random selection for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the block plan of unique selection
    Blocks {
        /// Data file
        file: String,

        /// Number of workers
        #[arg(short, long, default_value = "1")]
        workers: usize,

        /// The first line is a header
        #[arg(long)]
        header: bool,

        /// Fixed block size; derived from the row count if omitted
        #[arg(long)]
        block_size: Option<i64>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Tokenise every line and report malformed rows
    Parse {
        /// Data file
        file: String,

        /// Field delimiter (`\t` for tab)
        #[arg(short, long, default_value = ",")]
        delimiter: String,

        /// Honour quoted fields
        #[arg(short, long)]
        quoted: bool,

        /// File encoding
        #[arg(short, long)]
        encoding: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Count the data rows of a file
    Count {
        /// Data file
        file: String,

        /// The first line is a header
        #[arg(long)]
        header: bool,
    },

    /// Show version information
    Version,
}

/// Data set settings given as flags.
#[derive(Args)]
struct DataSetArgs {
    /// Data file
    #[arg(long)]
    file: Option<String>,

    /// File encoding
    #[arg(long)]
    encoding: Option<String>,

    /// Comma separated variable names; read from the header if omitted
    #[arg(long)]
    names: Option<String>,

    /// Skip the first line
    #[arg(long)]
    ignore_first_line: bool,

    /// Field delimiter (`\t` for tab)
    #[arg(short, long, default_value = ",")]
    delimiter: String,

    /// Honour quoted fields
    #[arg(short, long)]
    quoted: bool,

    /// Row selection (sequential, unique, random)
    #[arg(long, default_value = "sequential")]
    select: SelectionMode,

    /// Update timing (each-iteration, once)
    #[arg(long, default_value = "each-iteration")]
    update: UpdateMode,

    /// Out-of-values policy (continue-cyclic, abort-thread, continue-last-value)
    #[arg(long, default_value = "continue-cyclic")]
    recycle: OutOfValuesPolicy,

    /// Cursor sharing (all, group, thread)
    #[arg(long, default_value = "all")]
    share: ShareMode,

    /// Derive the unique block size from the row count
    #[arg(long)]
    auto_allocate: bool,

    /// Unique block size
    #[arg(long, default_value = "1")]
    block_size: String,
}

impl DataSetArgs {
    fn into_config(self) -> Result<DataSetConfig, Box<dyn std::error::Error>> {
        let file = self.file.ok_or("--file or --config is required")?;
        let mut config = DataSetConfig::new(file)
            .ignore_first_line(self.ignore_first_line)
            .delimiter(self.delimiter)
            .quoted_data(self.quoted)
            .selection(self.select)
            .update(self.update)
            .out_of_values(self.recycle)
            .share_mode(self.share)
            .block_allocation(BlockAllocation::from_settings(
                self.auto_allocate,
                &self.block_size,
            )?);
        if let Some(names) = self.names {
            config = config.variable_names(names);
        }
        if let Some(encoding) = self.encoding {
            config = config.file_encoding(encoding);
        }
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let server = commands::server(cli.base.as_deref())?;

    match cli.command {
        Commands::Run {
            data_set,
            config,
            workers,
            iterations,
            seed,
            format,
        } => {
            let config = match config {
                Some(path) => commands::run::load_config(&path)?,
                None => data_set.into_config()?,
            };
            let options = commands::run::RunOptions {
                workers,
                iterations,
                seed,
            };
            commands::run::run(server, config, &options, &format)?;
        }
        Commands::Blocks {
            file,
            workers,
            header,
            block_size,
            format,
        } => {
            let allocation = block_size.map_or(BlockAllocation::Auto, BlockAllocation::Explicit);
            commands::blocks::run(&server, &file, workers, header, allocation, &format)?;
        }
        Commands::Parse {
            file,
            delimiter,
            quoted,
            encoding,
            format,
        } => {
            commands::parse::run(&server, &file, &delimiter, quoted, encoding.as_deref(), &format)?;
        }
        Commands::Count { file, header } => {
            commands::count::run(&server, &file, header)?;
        }
        Commands::Version => {
            println!("rowfeed CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("rowfeed Core v{}", rowfeed_core::VERSION);
        }
    }

    Ok(())
}
