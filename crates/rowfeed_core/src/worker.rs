//! Per-worker context.
//!
//! A [`WorkerContext`] holds everything a single worker owns: its
//! identity, the partition cursor and update latch of every data set it
//! reads, and an optional seeded random generator. It is passed `&mut`
//! into every call and is never shared, so none of it is locked.

use crate::data_set::DataSetState;
use crate::error::{CoreError, CoreResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::ops::RangeInclusive;

/// Who a worker is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerIdentity {
    /// Server-unique id, never reused.
    pub id: u64,
    /// Worker name, conventionally `"<group> <g>-<n>"`.
    pub name: String,
    /// Name of the group the worker belongs to.
    pub group: String,
}

/// State owned by one worker.
#[derive(Debug)]
pub struct WorkerContext {
    identity: WorkerIdentity,
    worker_count: usize,
    ordinal: Option<usize>,
    rng: Option<StdRng>,
    states: HashMap<u64, DataSetState>,
}

impl WorkerContext {
    pub(crate) fn new(identity: WorkerIdentity, worker_count: usize) -> Self {
        Self {
            identity,
            worker_count,
            ordinal: None,
            rng: None,
            states: HashMap::new(),
        }
    }

    /// Uses `ordinal` instead of the one parsed from the worker name.
    #[must_use]
    pub fn with_ordinal(mut self, ordinal: usize) -> Self {
        self.ordinal = Some(ordinal);
        self
    }

    /// Draws random rows from a generator seeded with `seed`.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Some(StdRng::seed_from_u64(seed));
        self
    }

    /// Returns the worker identity.
    #[must_use]
    pub fn identity(&self) -> &WorkerIdentity {
        &self.identity
    }

    /// Returns the server-unique worker id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.identity.id
    }

    /// Returns the worker name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Returns the group name.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.identity.group
    }

    /// Returns the number of workers in the group.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Returns the 1-based position of the worker in its group.
    ///
    /// Unless set explicitly, this is the number after the last `-` of
    /// the worker name, so `"Users 1-3"` is worker 3.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the name carries no positive number.
    pub fn ordinal(&self) -> CoreResult<usize> {
        if let Some(ordinal) = self.ordinal {
            return Ok(ordinal);
        }
        parse_ordinal(&self.identity.name)
    }

    pub(crate) fn random_index(&mut self, range: RangeInclusive<usize>) -> usize {
        match &mut self.rng {
            Some(rng) => rng.gen_range(range),
            None => rand::thread_rng().gen_range(range),
        }
    }

    pub(crate) fn state(&self, data_set: u64) -> Option<&DataSetState> {
        self.states.get(&data_set)
    }

    pub(crate) fn take_state(&mut self, data_set: u64) -> Option<DataSetState> {
        self.states.remove(&data_set)
    }

    pub(crate) fn insert_state(&mut self, data_set: u64, state: DataSetState) {
        self.states.insert(data_set, state);
    }

    /// Forgets everything learned about data sets, as at the start of a new run.
    pub fn reset(&mut self) {
        self.states.clear();
    }
}

/// Parses the worker ordinal from a name like `"Thread Group 1-4"`.
///
/// # Errors
///
/// Returns a configuration error if the suffix is missing, not a number, or 0.
pub fn parse_ordinal(name: &str) -> CoreResult<usize> {
    let suffix = name.rsplit('-').next().unwrap_or(name).trim();
    suffix
        .parse::<usize>()
        .ok()
        .filter(|ordinal| *ordinal > 0)
        .ok_or_else(|| {
            CoreError::configuration(format!("cannot derive worker number from name: {name}"))
        })
}
