//! Path-addressed side-output tree (`$`).
//!
//! A validation run writes intermediate and final results here. Writes
//! create any missing intermediate container along the path (an array when
//! the next step is an index, a map otherwise); reads of missing locations
//! yield [`Value::None`]. Both operations are total: there are no error
//! conditions over well-formed paths.

use std::{collections::BTreeMap, rc::Rc};

use crate::runtime::value::Value;

pub mod path;

use path::{Path, PathStep};

/// The nested store. Containers are `Rc`-backed; writes use clone-on-write
/// so snapshots taken by reports stay cheap and immutable.
#[derive(Debug, Clone, Default)]
pub struct NestedStore {
    root: Value,
}

impl NestedStore {
    pub fn new() -> NestedStore {
        NestedStore {
            root: Value::Map(Rc::new(BTreeMap::new())),
        }
    }

    /// The whole tree, as a cheap snapshot.
    pub fn root(&self) -> Value {
        self.root.clone()
    }

    /// Reads the value at `path`, or `Value::None` if any intermediate is
    /// missing or of the wrong shape.
    pub fn read(&self, path: &Path) -> Value {
        let mut current = &self.root;
        for step in path.steps() {
            current = match (step, current) {
                (PathStep::Key(k), Value::Map(pairs)) => match pairs.get(k.as_ref()) {
                    Some(v) => v,
                    None => return Value::None,
                },
                (PathStep::Index(i), Value::Array(elements)) => match elements.get(*i) {
                    Some(v) => v,
                    None => return Value::None,
                },
                _ => return Value::None,
            };
        }
        current.clone()
    }

    /// Writes `value` at `path`, creating missing intermediates. A non-
    /// container value in the way is replaced by the container the next
    /// step requires. The empty path replaces the root.
    pub fn write(&mut self, path: &Path, value: Value) {
        if path.is_empty() {
            self.root = value;
            return;
        }
        write_into(&mut self.root, path.steps(), value);
    }
}

fn write_into(slot: &mut Value, steps: &[PathStep], value: Value) {
    let Some((step, rest)) = steps.split_first() else {
        *slot = value;
        return;
    };
    match step {
        PathStep::Key(key) => {
            if !matches!(slot, Value::Map(_)) {
                *slot = Value::Map(Rc::new(BTreeMap::new()));
            }
            let Value::Map(pairs) = slot else { unreachable!() };
            let pairs = Rc::make_mut(pairs);
            let entry = pairs.entry(key.to_string()).or_insert(Value::None);
            if rest.is_empty() {
                *entry = value;
            } else {
                write_into(entry, rest, value);
            }
        }
        PathStep::Index(index) => {
            if !matches!(slot, Value::Array(_)) {
                *slot = Value::Array(Rc::new(Vec::new()));
            }
            let Value::Array(elements) = slot else { unreachable!() };
            let elements = Rc::make_mut(elements);
            if elements.len() <= *index {
                elements.resize(index + 1, Value::None);
            }
            if rest.is_empty() {
                elements[*index] = value;
            } else {
                write_into(&mut elements[*index], rest, value);
            }
        }
    }
}
