//! The result of a chain-operation body, as a closed sum instead of
//! duck-typed runtime checks: a settled literal, a pending cell, or another
//! ring whose eventual value is flattened in.

use std::{cell::RefCell, rc::Rc};

use crate::runtime::{
    internal::Shared,
    ring::{Ring, Safety, errors::unsafe_chain_err},
    scheduler::Pending,
    value::Value,
};

/// What a data operation produced.
pub enum Step {
    /// A value available right now.
    Now(Value),
    /// A value that will arrive when a cell settles.
    Wait(Pending),
    /// Another chain's ring; the consuming ring defers to its settlement.
    Chain(Ring),
}

impl From<Value> for Step {
    fn from(v: Value) -> Step {
        Step::Now(v)
    }
}

impl From<Pending> for Step {
    fn from(p: Pending) -> Step {
        Step::Wait(p)
    }
}

impl From<Ring> for Step {
    fn from(r: Ring) -> Step {
        Step::Chain(r)
    }
}

impl From<&Ring> for Step {
    fn from(r: &Ring) -> Step {
        Step::Chain(r.clone())
    }
}

impl From<bool> for Step {
    fn from(v: bool) -> Step {
        Step::Now(Value::Boolean(v))
    }
}

impl From<i64> for Step {
    fn from(v: i64) -> Step {
        Step::Now(Value::Integer(v))
    }
}

impl From<f64> for Step {
    fn from(v: f64) -> Step {
        Step::Now(Value::Float(v))
    }
}

impl From<&str> for Step {
    fn from(v: &str) -> Step {
        Step::Now(Value::from(v))
    }
}

impl From<String> for Step {
    fn from(v: String) -> Step {
        Step::Now(Value::from(v))
    }
}

impl From<Vec<Value>> for Step {
    fn from(v: Vec<Value>) -> Step {
        Step::Now(Value::from(v))
    }
}

/// One positional target of `after`: a step, or a function of the current
/// data that produces one.
pub enum Source {
    Ready(Step),
    Derive(Box<dyn FnOnce(&Value) -> Step>),
}

impl Source {
    pub fn now(v: impl Into<Value>) -> Source {
        Source::Ready(Step::Now(v.into()))
    }

    pub fn wait(p: Pending) -> Source {
        Source::Ready(Step::Wait(p))
    }

    pub fn chain(r: &Ring) -> Source {
        Source::Ready(Step::Chain(r.clone()))
    }

    pub fn derive<S: Into<Step>>(f: impl FnOnce(&Value) -> S + 'static) -> Source {
        Source::Derive(Box::new(move |data| f(data).into()))
    }

    pub(crate) fn into_step(self, data: &Value) -> Step {
        match self {
            Source::Ready(step) => step,
            Source::Derive(f) => f(data),
        }
    }
}

struct JoinState {
    slots: Vec<Option<Value>>,
    remaining: usize,
}

/// Resolves a list of steps positionally into one step producing the array
/// of their values. All-settled input resolves synchronously; otherwise the
/// pending members are awaited together and the combined step settles once
/// the last of them does. An unsafe ring in any slot is an error.
pub(crate) fn join_steps(shared: &Shared, steps: Vec<Step>) -> Result<Step, String> {
    enum Parked {
        Cell(u64),
        RingCell(u64, Ring),
    }

    let mut slots: Vec<Option<Value>> = Vec::with_capacity(steps.len());
    let mut parked: Vec<(usize, Parked)> = Vec::new();

    for (i, step) in steps.into_iter().enumerate() {
        match step {
            Step::Now(v) => slots.push(Some(v)),
            Step::Wait(p) => {
                slots.push(None);
                parked.push((i, Parked::Cell(p.id)));
            }
            Step::Chain(ring) => {
                let (cell, safety, data) = ring.settlement();
                match cell {
                    None => {
                        if safety == Safety::Unsafe {
                            return Err(unsafe_chain_err());
                        }
                        slots.push(Some(data));
                    }
                    Some(cell_id) => {
                        slots.push(None);
                        parked.push((i, Parked::RingCell(cell_id, ring)));
                    }
                }
            }
        }
    }

    if parked.is_empty() {
        let values: Vec<Value> = slots.into_iter().map(|slot| slot.unwrap_or_default()).collect();
        return Ok(Step::Now(Value::from(values)));
    }

    let combined = shared.sched.open_cell();
    let remaining = parked.len();
    let state = Rc::new(RefCell::new(JoinState { slots, remaining }));

    for (i, park) in parked {
        let state = state.clone();
        let shared_cb = shared.clone();
        let (cell_id, ring) = match park {
            Parked::Cell(id) => (id, None),
            Parked::RingCell(id, ring) => (id, Some(ring)),
        };
        shared.sched.subscribe(
            cell_id,
            Box::new(move |result| match result {
                Err(reason) => {
                    // origin already faulted the run; propagate to the join
                    shared_cb.sched.settle_cell(combined, Err(reason));
                }
                Ok(value) => {
                    if let Some(ring) = &ring
                        && ring.settlement().1 == Safety::Unsafe
                    {
                        let reason = unsafe_chain_err();
                        shared_cb.fail_run(&reason);
                        shared_cb.sched.settle_cell(combined, Err(reason));
                        return;
                    }
                    let finished = {
                        let mut state = state.borrow_mut();
                        state.slots[i] = Some(value);
                        state.remaining -= 1;
                        if state.remaining == 0 {
                            Some(
                                state
                                    .slots
                                    .iter_mut()
                                    .map(|slot| slot.take().unwrap_or_default())
                                    .collect::<Vec<Value>>(),
                            )
                        } else {
                            None
                        }
                    };
                    if let Some(values) = finished {
                        shared_cb
                            .sched
                            .settle_cell(combined, Ok(Value::from(values)));
                    }
                }
            }),
        );
    }

    Ok(Step::Wait(Pending {
        id: combined,
        shared: shared.clone(),
    }))
}
