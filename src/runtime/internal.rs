//! Shared run state: one instance per validation run, reachable from every
//! ring through an explicit [`Shared`] handle.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use log::debug;

use crate::{
    badge::{
        Ledger,
        messages::{MessageBook, default_message},
    },
    runtime::{
        chain_cache::{ChainCache, Effect},
        report::Report,
        scheduler::{Pending, Resolver, Scheduler},
        value::Value,
    },
    store::{NestedStore, path::Path},
};

/// The run's mutable core. Owned by a `Validation`, mutated only through
/// ring operations and the settle/fail transitions.
pub(crate) struct Internal {
    ring_counter: u64,
    pub ledger: Ledger,
    pub store: NestedStore,
    pub chains: ChainCache,
    pub opened: Vec<Rc<str>>,
    pub closed: Vec<Rc<str>>,
    /// Ring index → pending cell id, for every suspended or queued ring.
    pub in_flight: HashMap<u64, u64>,
    /// `None` while running; `Ok(valid)` once settled, `Err(reason)` once
    /// faulted. Set exactly once.
    pub outcome: Option<Result<bool, String>>,
    waiters: Vec<Box<dyn FnOnce(&Result<bool, String>)>>,
    pub messages: MessageBook,
}

/// Cloneable handle over the run state and its scheduler. Every ring holds
/// one; all mutation funnels through its methods, which never hold a borrow
/// across a user callback.
#[derive(Clone)]
pub(crate) struct Shared {
    pub internal: Rc<RefCell<Internal>>,
    pub sched: Rc<Scheduler>,
}

impl Shared {
    pub(crate) fn new(messages: MessageBook, chains: ChainCache) -> Shared {
        Shared {
            internal: Rc::new(RefCell::new(Internal {
                ring_counter: 0,
                ledger: Ledger::new(),
                store: NestedStore::new(),
                chains,
                opened: Vec::new(),
                closed: Vec::new(),
                in_flight: HashMap::new(),
                outcome: None,
                waiters: Vec::new(),
                messages,
            })),
            sched: Rc::new(Scheduler::new()),
        }
    }

    pub(crate) fn next_ring_index(&self) -> u64 {
        let mut internal = self.internal.borrow_mut();
        let index = internal.ring_counter;
        internal.ring_counter += 1;
        index
    }

    pub(crate) fn done(&self) -> bool {
        self.internal.borrow().outcome.is_some()
    }

    /// Optimistic validity: `Some(valid-so-far)` while running or settled,
    /// `None` once faulted.
    pub(crate) fn ok(&self) -> Option<bool> {
        let internal = self.internal.borrow();
        match &internal.outcome {
            Some(Err(_)) => None,
            Some(Ok(valid)) => Some(*valid),
            None => Some(!internal.ledger.invalidated()),
        }
    }

    /// Drains the continuation queue, then settles the run if it reached a
    /// fixed point: nothing queued and nothing in flight.
    pub(crate) fn pump(&self) {
        self.sched.drain();
        self.maybe_settle();
    }

    fn maybe_settle(&self) {
        {
            let internal = self.internal.borrow();
            if internal.outcome.is_some()
                || !internal.in_flight.is_empty()
                || !self.sched.is_idle()
            {
                return;
            }
        }
        self.settle_run();
    }

    pub(crate) fn settle_run(&self) {
        let result = {
            let mut internal = self.internal.borrow_mut();
            if internal.outcome.is_some() {
                return;
            }
            let valid = !internal.ledger.invalidated();
            internal.outcome = Some(Ok(valid));
            debug!("validation run settled, valid={}", valid);
            Ok(valid)
        };
        self.finish(result);
    }

    pub(crate) fn fail_run(&self, reason: &str) {
        let result = {
            let mut internal = self.internal.borrow_mut();
            if internal.outcome.is_some() {
                return;
            }
            internal.outcome = Some(Err(reason.to_string()));
            internal.in_flight.clear();
            debug!("validation run faulted: {}", reason);
            Err(reason.to_string())
        };
        self.finish(result);
    }

    fn finish(&self, result: Result<bool, String>) {
        self.sched.teardown();
        let waiters = std::mem::take(&mut self.internal.borrow_mut().waiters);
        for waiter in waiters {
            waiter(&result);
        }
    }

    pub(crate) fn on_settle(&self, waiter: Box<dyn FnOnce(&Result<bool, String>)>) {
        let settled = self.internal.borrow().outcome.clone();
        match settled {
            Some(result) => waiter(&result),
            None => self.internal.borrow_mut().waiters.push(waiter),
        }
    }

    /// Allocates a `Pending`/`Resolver` pair for feeding a value in later.
    pub(crate) fn deferred(&self) -> (Pending, Resolver) {
        let id = self.sched.open_cell();
        (
            Pending {
                id,
                shared: self.clone(),
            },
            Resolver {
                id,
                shared: self.clone(),
            },
        )
    }

    // ---- effect application -------------------------------------------------
    //
    // Each helper applies the effect to the live ledger/store and, when the
    // acting ring belongs to an open named chain, appends it to that chain's
    // record so a future replay reproduces it.

    pub(crate) fn earn_badge(&self, record: Option<&Rc<str>>, badge: &str) {
        let mut internal = self.internal.borrow_mut();
        if internal.outcome.is_some() {
            return;
        }
        internal.ledger.earn(badge);
        if let Some(name) = record {
            let name = name.clone();
            internal.chains.append_effect(&name, Effect::Earn(badge.into()));
        }
    }

    /// Fails `badge`, resolving the message through the book hierarchy, and
    /// invalidates the run.
    pub(crate) fn fail_badge(&self, record: Option<&Rc<str>>, badge: &str, explicit: Option<&str>) {
        let mut internal = self.internal.borrow_mut();
        if internal.outcome.is_some() {
            return;
        }
        let message = explicit
            .map(str::to_string)
            .or_else(|| internal.messages.resolve(badge).map(str::to_string))
            .or_else(|| default_message(badge).map(str::to_string))
            .unwrap_or_default();
        internal.ledger.fail(badge, &message);
        internal.ledger.invalidate();
        if let Some(name) = record {
            let name = name.clone();
            internal
                .chains
                .append_effect(&name, Effect::Fail(badge.into(), message));
        }
    }

    pub(crate) fn invalidate(&self, record: Option<&Rc<str>>) {
        let mut internal = self.internal.borrow_mut();
        if internal.outcome.is_some() {
            return;
        }
        internal.ledger.invalidate();
        if let Some(name) = record {
            let name = name.clone();
            internal.chains.append_effect(&name, Effect::Invalidate);
        }
    }

    pub(crate) fn store_write(&self, record: Option<&Rc<str>>, path: &Path, value: &Value) {
        let mut internal = self.internal.borrow_mut();
        if internal.outcome.is_some() {
            return;
        }
        internal.store.write(path, value.clone());
        if let Some(name) = record {
            let name = name.clone();
            internal
                .chains
                .append_effect(&name, Effect::Write(path.clone(), value.clone()));
        }
    }

    /// Applies a cached chain's effect log verbatim. Nothing is re-recorded;
    /// the record that produced the log is left untouched.
    pub(crate) fn apply_replay(&self, effects: &[Effect]) {
        let mut internal = self.internal.borrow_mut();
        if internal.outcome.is_some() {
            return;
        }
        for effect in effects {
            match effect {
                Effect::Earn(badge) => internal.ledger.earn(badge),
                Effect::Fail(badge, message) => {
                    internal.ledger.fail(badge, message);
                    internal.ledger.invalidate();
                }
                Effect::Invalidate => internal.ledger.invalidate(),
                Effect::Write(path, value) => internal.store.write(path, value.clone()),
            }
        }
    }

    pub(crate) fn report(&self) -> Report {
        let internal = self.internal.borrow();
        Report {
            ok: match &internal.outcome {
                Some(Err(_)) => None,
                Some(Ok(valid)) => Some(*valid),
                None => Some(!internal.ledger.invalidated()),
            },
            badges: internal.ledger.badges(),
            errors: internal
                .ledger
                .errors()
                .iter()
                .map(|(badge, message)| (badge.to_string(), message.clone()))
                .collect(),
            store: internal.store.root(),
        }
    }
}
