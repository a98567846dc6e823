//! Single-threaded cooperative scheduler.
//!
//! "Suspension" in this engine never involves threads: a pending value is a
//! cell that some continuation is subscribed to, and resolving the cell
//! enqueues those continuations on a FIFO queue. The drain loop pops and
//! runs them one at a time, so all ledger and store mutation is serialized
//! by construction.
//!
//! # No-Cycle Invariant
//! Cells hold continuations, continuations hold ring handles, and ring
//! handles reach back to the run state that owns this scheduler. Those `Rc`
//! cycles are expected and are broken deterministically: when the run
//! settles, [`Scheduler::teardown`] drops every cell and queued task, so no
//! cycle outlives the run.

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
};

use log::trace;

use crate::runtime::{internal::Shared, value::Value};

pub(crate) type Task = Box<dyn FnOnce()>;
pub(crate) type Waiter = Box<dyn FnOnce(Result<Value, String>)>;

enum Cell {
    Open(Vec<Waiter>),
    Done(Result<Value, String>),
}

#[derive(Default)]
struct SchedInner {
    next_id: u64,
    cells: HashMap<u64, Cell>,
    queue: VecDeque<Task>,
    draining: bool,
    torn_down: bool,
}

/// The continuation queue and promise-cell table for one validation run.
#[derive(Default)]
pub(crate) struct Scheduler {
    inner: RefCell<SchedInner>,
}

impl Scheduler {
    pub(crate) fn new() -> Scheduler {
        Scheduler::default()
    }

    /// Allocates a fresh unresolved cell and returns its id.
    pub(crate) fn open_cell(&self) -> u64 {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.cells.insert(id, Cell::Open(Vec::new()));
        id
    }

    /// Queues `waiter` to run once cell `id` settles. On an already-settled
    /// cell the waiter is enqueued immediately; after teardown it is dropped.
    pub(crate) fn subscribe(&self, id: u64, waiter: Waiter) {
        let mut inner = self.inner.borrow_mut();
        if inner.torn_down {
            return;
        }
        match inner.cells.get_mut(&id) {
            Some(Cell::Open(waiters)) => waiters.push(waiter),
            Some(Cell::Done(result)) => {
                let result = result.clone();
                inner.queue.push_back(Box::new(move || waiter(result)));
            }
            None => {}
        }
    }

    /// Settles cell `id`, enqueueing its waiters in subscription order.
    /// Settling an already-settled or torn-down cell is a no-op.
    pub(crate) fn settle_cell(&self, id: u64, result: Result<Value, String>) {
        let mut inner = self.inner.borrow_mut();
        if inner.torn_down {
            return;
        }
        let waiters = match inner.cells.get_mut(&id) {
            Some(cell) => {
                if matches!(cell, Cell::Done(_)) {
                    return;
                }
                let previous = std::mem::replace(cell, Cell::Done(result.clone()));
                let Cell::Open(waiters) = previous else { unreachable!() };
                waiters
            }
            None => return,
        };
        for waiter in waiters {
            let result = result.clone();
            inner.queue.push_back(Box::new(move || waiter(result)));
        }
    }

    pub(crate) fn cell_result(&self, id: u64) -> Option<Result<Value, String>> {
        match self.inner.borrow().cells.get(&id) {
            Some(Cell::Done(result)) => Some(result.clone()),
            _ => None,
        }
    }

    /// Runs queued continuations until the queue is empty. Re-entrant calls
    /// (from a continuation that resolves another cell) are no-ops; the
    /// outer loop picks up whatever they enqueue.
    pub(crate) fn drain(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.draining {
                return;
            }
            inner.draining = true;
        }
        let mut ran = 0usize;
        loop {
            let task = self.inner.borrow_mut().queue.pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        self.inner.borrow_mut().draining = false;
        if ran > 0 {
            trace!("scheduler drained {} continuation(s)", ran);
        }
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.inner.borrow().queue.is_empty()
    }

    /// Drops every cell and queued task. Called exactly when the run
    /// settles; afterwards all scheduling operations are no-ops.
    pub(crate) fn teardown(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.torn_down = true;
        inner.cells.clear();
        inner.queue.clear();
    }
}

/// A claim on a value that has not been produced yet.
///
/// Feed it into a chain with `with`, `then`, or any other data operation;
/// the chain suspends until the matching [`Resolver`] fires.
#[derive(Clone)]
pub struct Pending {
    pub(crate) id: u64,
    pub(crate) shared: Shared,
}

impl Pending {
    /// Whether the value has already been produced (or rejected).
    pub fn is_settled(&self) -> bool {
        self.shared.sched.cell_result(self.id).is_some()
    }
}

/// The write end of a [`Pending`] value. Consumed on use; resolving or
/// rejecting re-enters the cooperative drain loop, so every continuation
/// that can make progress does so before the call returns.
pub struct Resolver {
    pub(crate) id: u64,
    pub(crate) shared: Shared,
}

impl Resolver {
    pub fn resolve(self, value: impl Into<Value>) {
        self.shared.sched.settle_cell(self.id, Ok(value.into()));
        self.shared.pump();
    }

    /// Rejects the pending value, failing the whole run.
    pub fn reject(self, reason: impl Into<String>) {
        let reason = reason.into();
        self.shared.fail_run(&reason);
        self.shared.sched.settle_cell(self.id, Err(reason));
        self.shared.pump();
    }
}
