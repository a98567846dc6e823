use serde::Serialize;

use crate::runtime::value::Value;

/// Snapshot of a validation run, suitable for nesting inside another run's
/// store via `put`.
///
/// A report is immutable once taken. `ok` is `None` when the run faulted
/// (rejected), `Some(false)` when any badge failed or the run was otherwise
/// invalidated, `Some(true)` when the run is valid so far.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub ok: Option<bool>,
    pub badges: Vec<String>,
    pub errors: Vec<(String, String)>,
    pub store: Value,
}

impl Report {
    /// True when the run this report snapshots is known invalid.
    ///
    /// A faulted run (`ok == None`) is not "failed" in the validity sense;
    /// it is not evaluable at all.
    pub fn is_failed(&self) -> bool {
        self.ok == Some(false)
    }

    /// First non-empty failure message, searching this report's errors and
    /// then any nested report reachable through its store.
    pub fn first_error_message(&self) -> Option<String> {
        for (_, message) in &self.errors {
            if !message.is_empty() {
                return Some(message.clone());
            }
        }
        find_nested_message(&self.store)
    }
}

/// Depth-first scan for the first non-empty message of any report nested in
/// a value tree.
pub(crate) fn find_nested_message(value: &Value) -> Option<String> {
    match value {
        Value::Report(report) => report.first_error_message(),
        Value::Array(elements) => elements.iter().find_map(find_nested_message),
        Value::Map(pairs) => pairs.values().find_map(find_nested_message),
        _ => None,
    }
}
