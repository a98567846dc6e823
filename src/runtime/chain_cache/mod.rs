//! Named-chain memoization.
//!
//! Each `start(name, watches)` chain owns a [`ChainRecord`]: the watch
//! values it was keyed on, the data it produced, and the ordered log of
//! every observable side effect it performed. When a later run starts the
//! same name with positionally-equal watches, the record's effect log is
//! replayed verbatim instead of re-executing any chain body.
//!
//! The policy is: memoize by equality of declared watch inputs, evict on
//! any watch change, replay-or-recompute deterministically.

use std::{collections::HashMap, rc::Rc};

use crate::{runtime::value::Value, store::path::Path};

mod fingerprint;

use fingerprint::watch_digest;

/// One observable side effect of a named chain, in execution order.
///
/// `Fail` carries the already-resolved message so replay reproduces the
/// original run even if message books change between runs. `Fail` implies
/// invalidation; `Invalidate` covers the badge-less forms (`must`, shape
/// failures, failed nested reports).
#[derive(Debug, Clone)]
pub(crate) enum Effect {
    Earn(Rc<str>),
    Fail(Rc<str>, String),
    Invalidate,
    Write(Path, Value),
}

#[derive(Debug)]
pub(crate) struct ChainRecord {
    pub watches: Vec<Value>,
    pub digest: [u8; 32],
    pub result: Value,
    pub result_is_async: bool,
    pub effects: Vec<Effect>,
    pub closed: bool,
}

/// Everything needed to replay a cached chain without touching the record.
pub(crate) struct Replay {
    pub effects: Vec<Effect>,
    pub result: Value,
    pub result_is_async: bool,
}

/// The cross-run cache, keyed by chain name. The only state a validation
/// shares with its successor.
#[derive(Debug, Default)]
pub(crate) struct ChainCache {
    records: HashMap<Rc<str>, ChainRecord>,
}

impl ChainCache {
    pub(crate) fn new() -> ChainCache {
        ChainCache::default()
    }

    /// Returns the replayable snapshot for `name` when a closed record
    /// exists whose watches equal `watches` positionally. The digest is
    /// checked first; positional equality decides.
    pub(crate) fn try_replay(&self, name: &str, watches: &[Value]) -> Option<Replay> {
        let record = self.records.get(name)?;
        if !record.closed {
            return None;
        }
        if record.digest != watch_digest(watches) {
            return None;
        }
        if record.watches.len() != watches.len() || record.watches != watches {
            return None;
        }
        Some(Replay {
            effects: record.effects.clone(),
            result: record.result.clone(),
            result_is_async: record.result_is_async,
        })
    }

    /// Opens a fresh record for `name`, overwriting any stale one.
    pub(crate) fn open(&mut self, name: &Rc<str>, watches: Vec<Value>) {
        let digest = watch_digest(&watches);
        self.records.insert(
            name.clone(),
            ChainRecord {
                watches,
                digest,
                result: Value::None,
                result_is_async: false,
                effects: Vec::new(),
                closed: false,
            },
        );
    }

    /// Appends an effect to an open record; closed records are immutable.
    pub(crate) fn append_effect(&mut self, name: &str, effect: Effect) {
        if let Some(record) = self.records.get_mut(name)
            && !record.closed
        {
            record.effects.push(effect);
        }
    }

    /// Marks that the chain suspended at least once, so a replayed result
    /// must present as asynchronous too.
    pub(crate) fn mark_async(&mut self, name: &str) {
        if let Some(record) = self.records.get_mut(name)
            && !record.closed
        {
            record.result_is_async = true;
        }
    }

    pub(crate) fn close(&mut self, name: &str, result: Value) {
        if let Some(record) = self.records.get_mut(name) {
            record.result = result;
            record.closed = true;
        }
    }

    /// The transplant filter for continuous validation. A record survives
    /// into the next run only when it is closed and its name was either not
    /// opened during the finished run, or was opened and properly ended
    /// there. A name opened but never ended (freshly recorded or replayed)
    /// is dropped.
    pub(crate) fn into_transplant(self, opened: &[Rc<str>], closed: &[Rc<str>]) -> ChainCache {
        ChainCache {
            records: self
                .records
                .into_iter()
                .filter(|(name, record)| {
                    record.closed && (!opened.contains(name) || closed.contains(name))
                })
                .collect(),
        }
    }

    #[cfg(test)]
    pub(crate) fn record(&self, name: &str) -> Option<&ChainRecord> {
        self.records.get(name)
    }
}
