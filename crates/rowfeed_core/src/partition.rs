//! Block partitioning for unique row selection.
//!
//! Each worker of a unique-mode data set owns an inclusive range of file
//! lines. Worker ordinals are 1-based; worker `n` with block size `b` owns
//! data rows `(n-1)*b ..= n*b - 1`, shifted past the header when there is
//! one. With automatic allocation the blocks tile the file from the top
//! and the remainder rows at the bottom are never served.

use crate::config::{BlockAllocation, OutOfValuesPolicy};
use crate::error::{CoreError, CoreResult};
use serde::Serialize;

/// An inclusive range of file-line indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Block {
    /// First line of the block.
    pub start: usize,
    /// Last line of the block.
    pub end: usize,
}

impl Block {
    /// Returns the number of lines in the block.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always false; a block holds at least one line.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Returns whether `line` falls inside the block.
    #[must_use]
    pub const fn contains(&self, line: usize) -> bool {
        self.start <= line && line <= self.end
    }
}

/// Computes the block of worker `ordinal` out of `worker_count`.
///
/// `header_offset` is 1 when a header line precedes the data.
///
/// # Errors
///
/// Returns a configuration error if the ordinal is 0, the worker count
/// is 0, or the block size comes out below 1 (an explicit size < 1, or
/// fewer rows than workers with automatic allocation).
pub fn compute_block(
    total_rows: usize,
    ordinal: usize,
    worker_count: usize,
    allocation: BlockAllocation,
    header_offset: usize,
) -> CoreResult<Block> {
    if ordinal == 0 {
        return Err(CoreError::configuration("worker ordinals start at 1"));
    }
    let block_size = match allocation {
        BlockAllocation::Auto => {
            if worker_count == 0 {
                return Err(CoreError::configuration("worker count must be greater than 0"));
            }
            let size = total_rows / worker_count;
            if size < 1 {
                return Err(CoreError::configuration(format!(
                    "auto allocate: {total_rows} rows cannot be shared by {worker_count} workers, \
                     the block size would be 0"
                )));
            }
            size
        }
        BlockAllocation::Explicit(size) => usize::try_from(size)
            .ok()
            .filter(|size| *size >= 1)
            .ok_or_else(|| {
                CoreError::configuration(format!(
                    "allocate block size {size}: block size must be greater than 0, \
                     or enable auto allocate"
                ))
            })?,
    };

    let end = ordinal
        .checked_mul(block_size)
        .and_then(|last| last.checked_add(header_offset))
        .map(|last| last - 1)
        .ok_or_else(|| CoreError::configuration("block range overflows"))?;
    Ok(Block {
        start: end + 1 - block_size,
        end,
    })
}

/// Rows no worker receives under automatic allocation.
#[must_use]
pub fn leftover_rows(total_rows: usize, worker_count: usize) -> usize {
    if worker_count == 0 {
        return total_rows;
    }
    total_rows - worker_count * (total_rows / worker_count)
}

/// A worker's position inside its block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionState {
    /// First line of the block.
    pub start: usize,
    /// Last line of the block.
    pub end: usize,
    /// Next line to read.
    pub current: usize,
    /// Set once the last line was reached under the last-value policy.
    pub frozen: bool,
}

impl PartitionState {
    /// Starts at the first line of `block`.
    #[must_use]
    pub const fn new(block: Block) -> Self {
        Self {
            start: block.start,
            end: block.end,
            current: block.start,
            frozen: false,
        }
    }

    /// Returns the block this state walks.
    #[must_use]
    pub const fn block(&self) -> Block {
        Block {
            start: self.start,
            end: self.end,
        }
    }
}

/// The outcome of one [`advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Read line `row`.
    Read {
        /// Line to read.
        row: usize,
        /// Whether the row is bound to variables.
        bind: bool,
        /// Whether the cursor wrapped back to the start of the block.
        wrapped: bool,
    },
    /// The block is used up; the worker stops.
    EndOfBlock,
}

/// Decides the next line to read and moves the cursor.
pub fn advance(state: &mut PartitionState, policy: OutOfValuesPolicy) -> Step {
    match policy {
        OutOfValuesPolicy::ContinueCyclic => {
            let row = state.current;
            let wrapped = row >= state.end;
            state.current = if wrapped { state.start } else { row + 1 };
            Step::Read {
                row,
                bind: true,
                wrapped,
            }
        }
        OutOfValuesPolicy::AbortThread => {
            if state.current > state.end {
                return Step::EndOfBlock;
            }
            let row = state.current;
            state.current += 1;
            Step::Read {
                row,
                bind: true,
                wrapped: false,
            }
        }
        OutOfValuesPolicy::ContinueWithLastValue => {
            let row = state.current;
            let bind = !state.frozen;
            if row >= state.end {
                state.frozen = true;
            } else {
                state.current += 1;
            }
            Step::Read {
                row,
                bind,
                wrapped: false,
            }
        }
    }
}
