//! Binding selected rows to named variables.

use std::collections::HashMap;

/// Receives `name = value` assignments.
pub trait VariableSink {
    /// Assigns `value` to `name`.
    fn put(&mut self, name: &str, value: &str);
}

impl VariableSink for HashMap<String, String> {
    fn put(&mut self, name: &str, value: &str) {
        self.insert(name.to_string(), value.to_string());
    }
}

impl<T: VariableSink + ?Sized> VariableSink for &mut T {
    fn put(&mut self, name: &str, value: &str) {
        (**self).put(name, value);
    }
}

/// A plain variable store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    values: HashMap<String, String>,
}

impl Variables {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Returns the number of variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether no variable is set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over `(name, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl VariableSink for Variables {
    fn put(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.to_string());
    }
}

/// Assigns fields to names pairwise and returns the number of pairs.
///
/// Extra names keep their previous values; extra fields are dropped.
pub fn bind<S: VariableSink + ?Sized>(names: &[String], fields: &[String], sink: &mut S) -> usize {
    let pairs = names.len().min(fields.len());
    for (name, value) in names.iter().zip(fields) {
        sink.put(name, value);
    }
    pairs
}
