//! The chain-step ("ring") state machine.
//!
//! A ring is one link in a fluent validation chain. Every operation on a
//! ring produces a new ring whose body either runs synchronously right away
//! (when the previous ring is settled) or is queued to run once the
//! previous ring's pending cell settles. That single rule gives strict
//! in-order execution within a chain while leaving distinct chains free to
//! interleave.
//!
//! Operation implementations are split across sibling files the way the VM
//! splits its opcode families: data ops, predicates, badge ops, store ops,
//! and named-chain ops.

use std::{cell::RefCell, rc::Rc};

use crate::runtime::{
    internal::Shared,
    scheduler::{Pending, Resolver},
    step::Step,
    value::Value,
};

mod badge_ops;
mod chain_ops;
mod data_ops;
pub(crate) mod errors;
mod guard_ops;
mod store_ops;

/// Whether a ring's data slot can be trusted to have been set.
///
/// `Unknown` until the chain's first operation: a data-providing first op
/// makes the chain `Safe`, a predicate first op makes it permanently
/// `Unsafe` (its data may be short-circuited away without ever being set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Safety {
    Unknown,
    Safe,
    Unsafe,
}

/// How an operation participates in the safety transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpClass {
    Data,
    Predicate,
    Neutral,
}

/// Shape requirement of `object` / `array`.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Shape {
    Map,
    Array,
}

impl Shape {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Shape::Map => matches!(value, Value::Map(_)),
            Shape::Array => matches!(value, Value::Array(_)),
        }
    }
}

/// What an operation body decided.
pub(crate) enum OpOut {
    /// New data plus whether the ring bypasses from here on.
    Flow { step: Step, bypass: bool },
    /// New data that must match a shape once settled; a mismatch
    /// invalidates the run and bypasses the ring, keeping the data.
    Shaped { step: Step, shape: Shape },
}

pub(crate) type OpBody = Box<dyn FnOnce(&Shared, &Value, Option<&Rc<str>>) -> Result<OpOut, String>>;

pub(crate) struct Node {
    pub index: u64,
    pub data: Value,
    pub safety: Safety,
    pub bypassed: bool,
    /// Replay stand-in: every operation is a no-op returning the ring.
    pub mock: bool,
    /// Name of the open named chain this ring belongs to, if any.
    pub record: Option<Rc<str>>,
    /// Pending cell for this ring's position, `None` once settled.
    pub cell: Option<u64>,
}

/// Handle to one chain step. Cheap to clone; operations are invoked on a
/// shared handle so several chains can branch from one ring.
pub struct Ring {
    pub(crate) shared: Shared,
    pub(crate) node: Rc<RefCell<Node>>,
}

impl Clone for Ring {
    fn clone(&self) -> Ring {
        Ring {
            shared: self.shared.clone(),
            node: self.node.clone(),
        }
    }
}

impl Ring {
    /// The root ring handed to the build function. Carries no data and no
    /// safety verdict yet.
    pub(crate) fn seed(shared: &Shared) -> Ring {
        let index = shared.next_ring_index();
        Ring {
            shared: shared.clone(),
            node: Rc::new(RefCell::new(Node {
                index,
                data: Value::None,
                safety: Safety::Unknown,
                bypassed: false,
                mock: false,
                record: None,
                cell: None,
            })),
        }
    }

    /// A dead ring returned from operations that could not legally produce
    /// one (duplicate `start`, ops after the run settled). Everything on it
    /// is a no-op.
    pub(crate) fn inert(shared: &Shared) -> Ring {
        Ring {
            shared: shared.clone(),
            node: Rc::new(RefCell::new(Node {
                index: u64::MAX,
                data: Value::None,
                safety: Safety::Safe,
                bypassed: false,
                mock: true,
                record: None,
                cell: None,
            })),
        }
    }

    /// The ring's settled data.
    ///
    /// Errors on an unsafe chain (a predicate preceded every data op, so
    /// the data may never have been set) and on a chain that has not
    /// settled yet.
    pub fn value(&self) -> Result<Value, String> {
        let node = self.node.borrow();
        if node.safety == Safety::Unsafe {
            return Err(errors::unsafe_chain_err());
        }
        if node.cell.is_some() {
            return Err(errors::pending_value_err());
        }
        Ok(node.data.clone())
    }

    /// A `Pending`/`Resolver` pair bound to this ring's run, for feeding a
    /// value that will only exist later.
    pub fn deferred(&self) -> (Pending, Resolver) {
        self.shared.deferred()
    }

    pub(crate) fn settlement(&self) -> (Option<u64>, Safety, Value) {
        let node = self.node.borrow();
        (node.cell, node.safety, node.data.clone())
    }

    // ---- the scheduling protocol -------------------------------------------

    /// Schedules one operation: runs `body` now if this ring is settled,
    /// otherwise queues it behind this ring's pending cell. Returns the new
    /// ring for the next link of the chain.
    pub(crate) fn op(
        &self,
        class: OpClass,
        runs_when_bypassed: bool,
        body: OpBody,
    ) -> Ring {
        let shared = self.shared.clone();
        if shared.done() {
            return self.clone();
        }
        if self.node.borrow().mock {
            return self.clone();
        }

        let index = shared.next_ring_index();
        let record = self.node.borrow().record.clone();
        let child_node = Rc::new(RefCell::new(Node {
            index,
            data: Value::None,
            safety: Safety::Unknown,
            bypassed: false,
            mock: false,
            record,
            cell: None,
        }));
        let child = Ring {
            shared: shared.clone(),
            node: child_node.clone(),
        };

        let parent_cell = self.node.borrow().cell;
        match parent_cell {
            None => {
                let parent = self.node.clone();
                Ring::execute(&shared, &parent, &child_node, class, runs_when_bypassed, body);
            }
            Some(parent_cell) => {
                // give the child its own cell eagerly so a further op on it
                // queues instead of running out of order
                let cell = shared.sched.open_cell();
                child_node.borrow_mut().cell = Some(cell);
                Ring::register_in_flight(&shared, &child_node);
                let parent = self.node.clone();
                let waiter_shared = shared.clone();
                let waiter_child = child_node.clone();
                shared.sched.subscribe(
                    parent_cell,
                    Box::new(move |result| match result {
                        Ok(_) => Ring::execute(
                            &waiter_shared,
                            &parent,
                            &waiter_child,
                            class,
                            runs_when_bypassed,
                            body,
                        ),
                        Err(reason) => Ring::settle_failed(&waiter_shared, &waiter_child, reason),
                    }),
                );
            }
        }
        child
    }

    fn execute(
        shared: &Shared,
        parent: &Rc<RefCell<Node>>,
        child: &Rc<RefCell<Node>>,
        class: OpClass,
        runs_when_bypassed: bool,
        body: OpBody,
    ) {
        if shared.done() {
            return;
        }
        let (parent_data, parent_bypassed, parent_safety) = {
            let p = parent.borrow();
            (p.data.clone(), p.bypassed, p.safety)
        };
        {
            let mut c = child.borrow_mut();
            c.safety = match (parent_safety, class) {
                (Safety::Unknown, OpClass::Data) => Safety::Safe,
                (Safety::Unknown, OpClass::Predicate) => Safety::Unsafe,
                (inherited, _) => inherited,
            };
            c.bypassed = parent_bypassed;
        }

        if parent_bypassed && !runs_when_bypassed {
            Ring::settle_node(shared, child, parent_data);
            return;
        }

        let record = child.borrow().record.clone();
        match body(shared, &parent_data, record.as_ref()) {
            Err(reason) => {
                shared.fail_run(&reason);
                Ring::settle_failed(shared, child, reason);
            }
            Ok(OpOut::Flow { step, bypass }) => {
                if bypass {
                    child.borrow_mut().bypassed = true;
                }
                Ring::settle_step(shared, child, step, None);
            }
            Ok(OpOut::Shaped { step, shape }) => {
                Ring::settle_step(shared, child, step, Some(shape));
            }
        }
    }

    fn settle_step(
        shared: &Shared,
        child: &Rc<RefCell<Node>>,
        step: Step,
        shape: Option<Shape>,
    ) {
        match step {
            Step::Now(value) => {
                Ring::check_shape(shared, child, shape.as_ref(), &value);
                Ring::settle_node(shared, child, value);
            }
            Step::Wait(pending) => {
                Ring::park(shared, child, pending.id, None, shape);
            }
            Step::Chain(ring) => {
                let (cell, safety, data) = ring.settlement();
                match cell {
                    None => {
                        if safety == Safety::Unsafe {
                            let reason = errors::unsafe_chain_err();
                            shared.fail_run(&reason);
                            Ring::settle_failed(shared, child, reason);
                            return;
                        }
                        Ring::check_shape(shared, child, shape.as_ref(), &data);
                        Ring::settle_node(shared, child, data);
                    }
                    Some(cell) => {
                        Ring::park(shared, child, cell, Some(ring), shape);
                    }
                }
            }
        }
    }

    fn check_shape(
        shared: &Shared,
        child: &Rc<RefCell<Node>>,
        shape: Option<&Shape>,
        value: &Value,
    ) {
        if let Some(shape) = shape
            && !shape.matches(value)
        {
            let record = child.borrow().record.clone();
            shared.invalidate(record.as_ref());
            child.borrow_mut().bypassed = true;
        }
    }

    /// Suspends `child` on `cell`. `origin` is set when the cell belongs to
    /// another ring, whose safety is re-checked once it settles.
    fn park(
        shared: &Shared,
        child: &Rc<RefCell<Node>>,
        cell: u64,
        origin: Option<Ring>,
        shape: Option<Shape>,
    ) {
        {
            let mut c = child.borrow_mut();
            if c.cell.is_none() {
                c.cell = Some(shared.sched.open_cell());
            }
        }
        Ring::register_in_flight(shared, child);
        if let Some(name) = child.borrow().record.clone() {
            shared.internal.borrow_mut().chains.mark_async(&name);
        }

        let waiter_shared = shared.clone();
        let waiter_child = child.clone();
        shared.sched.subscribe(
            cell,
            Box::new(move |result| match result {
                Err(reason) => Ring::settle_failed(&waiter_shared, &waiter_child, reason),
                Ok(value) => {
                    if let Some(origin) = &origin
                        && origin.settlement().1 == Safety::Unsafe
                    {
                        let reason = errors::unsafe_chain_err();
                        waiter_shared.fail_run(&reason);
                        Ring::settle_failed(&waiter_shared, &waiter_child, reason);
                        return;
                    }
                    Ring::check_shape(&waiter_shared, &waiter_child, shape.as_ref(), &value);
                    Ring::settle_node(&waiter_shared, &waiter_child, value);
                }
            }),
        );
    }

    fn register_in_flight(shared: &Shared, node: &Rc<RefCell<Node>>) {
        let (index, cell) = {
            let n = node.borrow();
            (n.index, n.cell)
        };
        if let Some(cell) = cell {
            shared.internal.borrow_mut().in_flight.insert(index, cell);
        }
    }

    fn settle_node(shared: &Shared, node: &Rc<RefCell<Node>>, value: Value) {
        let (index, cell) = {
            let mut n = node.borrow_mut();
            n.data = value.clone();
            (n.index, n.cell.take())
        };
        shared.internal.borrow_mut().in_flight.remove(&index);
        if let Some(cell) = cell {
            shared.sched.settle_cell(cell, Ok(value));
        }
    }

    fn settle_failed(shared: &Shared, node: &Rc<RefCell<Node>>, reason: String) {
        let (index, cell) = {
            let mut n = node.borrow_mut();
            (n.index, n.cell.take())
        };
        shared.internal.borrow_mut().in_flight.remove(&index);
        if let Some(cell) = cell {
            shared.sched.settle_cell(cell, Err(reason));
        }
    }
}
