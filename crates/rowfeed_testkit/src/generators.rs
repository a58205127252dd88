//! Property-based test generators using proptest.
//!
//! Provides strategies for rows, fields and worker layouts.

use proptest::prelude::*;
use rowfeed_core::{OutOfValuesPolicy, SelectionMode, ShareMode};

/// Strategy for fields that never need quoting.
pub fn plain_field_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 _.-]{0,12}").expect("Invalid regex")
}

/// Strategy for fields that may hold delimiters and quotes.
pub fn quotable_field_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 ,\"]{0,12}").expect("Invalid regex")
}

/// Strategy for a row of plain fields.
pub fn plain_row_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(plain_field_strategy(), 1..8)
}

/// Strategy for a row of quotable fields.
pub fn quotable_row_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(quotable_field_strategy(), 1..8)
}

/// Quotes a field, doubling embedded quotes.
pub fn quote_field(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Encodes a row with every field quoted.
pub fn quoted_line(fields: &[String], delimiter: char) -> String {
    fields
        .iter()
        .map(|f| quote_field(f))
        .collect::<Vec<_>>()
        .join(&delimiter.to_string())
}

/// Strategy for `(total_rows, workers)` with at least one row per worker.
pub fn partition_layout_strategy() -> impl Strategy<Value = (usize, usize)> {
    (1usize..16).prop_flat_map(|workers| (workers..workers * 20, Just(workers)))
}

/// Strategy over selection modes.
pub fn selection_mode_strategy() -> impl Strategy<Value = SelectionMode> {
    prop_oneof![
        Just(SelectionMode::Sequential),
        Just(SelectionMode::Unique),
        Just(SelectionMode::Random),
    ]
}

/// Strategy over out-of-values policies.
pub fn policy_strategy() -> impl Strategy<Value = OutOfValuesPolicy> {
    prop_oneof![
        Just(OutOfValuesPolicy::ContinueCyclic),
        Just(OutOfValuesPolicy::AbortThread),
        Just(OutOfValuesPolicy::ContinueWithLastValue),
    ]
}

/// Strategy over sharing modes.
pub fn share_mode_strategy() -> impl Strategy<Value = ShareMode> {
    prop_oneof![
        Just(ShareMode::AllThreads),
        Just(ShareMode::Group),
        Just(ShareMode::Thread),
    ]
}
