//! Named-chain entry and exit: `start` and `end`.

use std::{cell::RefCell, rc::Rc};

use log::debug;

use crate::runtime::{
    ring::{Node, OpClass, OpOut, Ring, Safety, errors},
    step::Step,
    value::Value,
};

impl Ring {
    /// Opens (or replays) the named chain `name`, keyed on `watches`.
    ///
    /// When a closed record from a previous run carries positionally-equal
    /// watches, its effect log is applied verbatim and the returned ring is
    /// a mock: every operation is a no-op and `value()`/`end()` yield the
    /// cached result without executing any chain body. Otherwise a fresh
    /// record starts recording and the returned ring opens a real chain
    /// whose data is the sole watch (one watch), the array of watches
    /// (several), or `None`.
    ///
    /// Starting a name twice in one run, or starting from inside another
    /// named chain, fails the run.
    pub fn start<I, V>(&self, name: &str, watches: I) -> Ring
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let shared = self.shared.clone();
        if shared.done() {
            return Ring::inert(&shared);
        }
        if let Some(outer) = self.node.borrow().record.clone() {
            let reason = errors::nested_start_err(&outer);
            shared.fail_run(&reason);
            return Ring::inert(&shared);
        }

        let watches: Vec<Value> = watches.into_iter().map(Into::into).collect();
        let name_rc: Rc<str> = Rc::from(name);
        {
            let mut internal = shared.internal.borrow_mut();
            if internal.opened.iter().any(|n| n.as_ref() == name) {
                drop(internal);
                let reason = errors::duplicate_start_err(name);
                shared.fail_run(&reason);
                return Ring::inert(&shared);
            }
            internal.opened.push(name_rc.clone());
        }

        let replay = shared.internal.borrow().chains.try_replay(name, &watches);
        match replay {
            Some(replay) => {
                debug!(
                    "named chain '{}': watches unchanged, replaying {} effect(s) (async result: {})",
                    name,
                    replay.effects.len(),
                    replay.result_is_async
                );
                shared.apply_replay(&replay.effects);
                let index = shared.next_ring_index();
                Ring {
                    shared: shared.clone(),
                    node: Rc::new(RefCell::new(Node {
                        index,
                        data: replay.result,
                        safety: Safety::Safe,
                        bypassed: false,
                        mock: true,
                        record: Some(name_rc),
                        cell: None,
                    })),
                }
            }
            None => {
                debug!("named chain '{}': recording fresh execution", name);
                shared
                    .internal
                    .borrow_mut()
                    .chains
                    .open(&name_rc, watches.clone());
                let mut watches = watches;
                let data = match watches.len() {
                    0 => Value::None,
                    1 => watches.swap_remove(0),
                    _ => Value::from(watches),
                };
                let index = shared.next_ring_index();
                Ring {
                    shared: shared.clone(),
                    node: Rc::new(RefCell::new(Node {
                        index,
                        data,
                        safety: Safety::Safe,
                        bypassed: false,
                        mock: false,
                        record: Some(name_rc),
                        cell: None,
                    })),
                }
            }
        }
    }

    /// Closes the named chain this ring belongs to, finalizing its record
    /// with the ring's settled data. Runs after any pending operation, and
    /// even on a bypassed chain (a failed chain is still cacheable).
    ///
    /// Calling `end` outside a named chain, or twice for one name, fails
    /// the run.
    pub fn end(&self) -> Ring {
        let shared = self.shared.clone();
        if shared.done() {
            return self.clone();
        }
        let (mock, record) = {
            let n = self.node.borrow();
            (n.mock, n.record.clone())
        };
        if mock {
            if let Some(name) = record {
                let already = {
                    let internal = shared.internal.borrow();
                    internal.closed.iter().any(|n| *n == name)
                };
                if already {
                    shared.fail_run(&errors::double_end_err(&name));
                } else {
                    shared.internal.borrow_mut().closed.push(name);
                }
            }
            return self.clone();
        }
        self.op(
            OpClass::Neutral,
            true,
            Box::new(move |shared, data, record| {
                let Some(name) = record else {
                    return Err(errors::end_outside_chain_err());
                };
                let mut internal = shared.internal.borrow_mut();
                if internal.closed.iter().any(|n| n == name) {
                    return Err(errors::double_end_err(name));
                }
                internal.closed.push(name.clone());
                internal.chains.close(name, data.clone());
                Ok(OpOut::Flow {
                    step: Step::Now(data.clone()),
                    bypass: false,
                })
            }),
        )
    }
}
