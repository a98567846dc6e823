//! Predicate operations: they gate the rest of the chain and drive the
//! badge ledger.

use std::rc::Rc;

use crate::runtime::{
    internal::Shared,
    ring::{OpClass, OpOut, Ring},
    step::Step,
    value::Value,
};

fn check_outcome(
    shared: &Shared,
    record: Option<&Rc<str>>,
    data: &Value,
    badge: &str,
    valid: bool,
    message: Option<&str>,
) -> OpOut {
    if valid {
        shared.earn_badge(record, badge);
        OpOut::Flow {
            step: Step::Now(data.clone()),
            bypass: false,
        }
    } else {
        shared.fail_badge(record, badge, message);
        OpOut::Flow {
            step: Step::Now(data.clone()),
            bypass: true,
        }
    }
}

impl Ring {
    /// Earns `badge` when `valid`, otherwise fails it (message resolved
    /// through the books), invalidates the run, and bypasses the rest of
    /// the chain.
    pub fn check(&self, badge: &str, valid: bool) -> Ring {
        let badge = badge.to_string();
        self.op(
            OpClass::Predicate,
            false,
            Box::new(move |shared, data, record| {
                Ok(check_outcome(shared, record, data, &badge, valid, None))
            }),
        )
    }

    /// `check` with the validity computed from the current data.
    pub fn check_with(&self, badge: &str, f: impl FnOnce(&Value) -> bool + 'static) -> Ring {
        let badge = badge.to_string();
        self.op(
            OpClass::Predicate,
            false,
            Box::new(move |shared, data, record| {
                let valid = f(data);
                Ok(check_outcome(shared, record, data, &badge, valid, None))
            }),
        )
    }

    /// `check` with an explicit failure message, taking precedence over
    /// every message book.
    pub fn check_msg(&self, badge: &str, valid: bool, message: &str) -> Ring {
        let badge = badge.to_string();
        let message = message.to_string();
        self.op(
            OpClass::Predicate,
            false,
            Box::new(move |shared, data, record| {
                Ok(check_outcome(shared, record, data, &badge, valid, Some(&message)))
            }),
        )
    }

    /// `check_with` with an explicit failure message.
    pub fn check_with_msg(
        &self,
        badge: &str,
        f: impl FnOnce(&Value) -> bool + 'static,
        message: &str,
    ) -> Ring {
        let badge = badge.to_string();
        let message = message.to_string();
        self.op(
            OpClass::Predicate,
            false,
            Box::new(move |shared, data, record| {
                let valid = f(data);
                Ok(check_outcome(shared, record, data, &badge, valid, Some(&message)))
            }),
        )
    }

    /// Bypasses the rest of the chain unless every listed badge has been
    /// earned. Never invalidates.
    pub fn when(&self, badges: &[&str]) -> Ring {
        let badges: Vec<String> = badges.iter().map(|b| b.to_string()).collect();
        self.op(
            OpClass::Predicate,
            false,
            Box::new(move |shared, data, _| {
                let earned = shared.internal.borrow().ledger.has_all(&badges);
                Ok(OpOut::Flow {
                    step: Step::Now(data.clone()),
                    bypass: !earned,
                })
            }),
        )
    }

    /// Bypasses and invalidates unless `valid`. Records no badge.
    pub fn must(&self, valid: bool) -> Ring {
        self.op(
            OpClass::Predicate,
            false,
            Box::new(move |shared, data, record| {
                if !valid {
                    shared.invalidate(record);
                }
                Ok(OpOut::Flow {
                    step: Step::Now(data.clone()),
                    bypass: !valid,
                })
            }),
        )
    }

    /// `must` with the condition computed from the current data.
    pub fn must_with(&self, f: impl FnOnce(&Value) -> bool + 'static) -> Ring {
        self.op(
            OpClass::Predicate,
            false,
            Box::new(move |shared, data, record| {
                let valid = f(data);
                if !valid {
                    shared.invalidate(record);
                }
                Ok(OpOut::Flow {
                    step: Step::Now(data.clone()),
                    bypass: !valid,
                })
            }),
        )
    }

    /// Bypasses unless `valid`; identical to `must` but never invalidates.
    pub fn guard(&self, valid: bool) -> Ring {
        self.op(
            OpClass::Predicate,
            false,
            Box::new(move |_, data, _| {
                Ok(OpOut::Flow {
                    step: Step::Now(data.clone()),
                    bypass: !valid,
                })
            }),
        )
    }

    /// `guard` with the condition computed from the current data.
    pub fn guard_with(&self, f: impl FnOnce(&Value) -> bool + 'static) -> Ring {
        self.op(
            OpClass::Predicate,
            false,
            Box::new(move |_, data, _| {
                let valid = f(data);
                Ok(OpOut::Flow {
                    step: Step::Now(data.clone()),
                    bypass: !valid,
                })
            }),
        )
    }
}
