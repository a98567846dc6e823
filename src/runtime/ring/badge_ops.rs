//! Unconditional badge operations. Not gated on any condition, but a
//! bypassed chain skips them like every other operation.

use crate::runtime::{
    ring::{OpClass, OpOut, Ring},
    step::Step,
};

impl Ring {
    /// Unconditionally earns `badge`. Idempotent across the run.
    pub fn earn(&self, badge: &str) -> Ring {
        let badge = badge.to_string();
        self.op(
            OpClass::Neutral,
            false,
            Box::new(move |shared, data, record| {
                shared.earn_badge(record, &badge);
                Ok(OpOut::Flow {
                    step: Step::Now(data.clone()),
                    bypass: false,
                })
            }),
        )
    }

    /// Unconditionally fails `badge` (message resolved through the books)
    /// and invalidates the run. Does not itself bypass the chain.
    pub fn fail(&self, badge: &str) -> Ring {
        let badge = badge.to_string();
        self.op(
            OpClass::Neutral,
            false,
            Box::new(move |shared, data, record| {
                shared.fail_badge(record, &badge, None);
                Ok(OpOut::Flow {
                    step: Step::Now(data.clone()),
                    bypass: false,
                })
            }),
        )
    }

    /// `fail` with an explicit message.
    pub fn fail_msg(&self, badge: &str, message: &str) -> Ring {
        let badge = badge.to_string();
        let message = message.to_string();
        self.op(
            OpClass::Neutral,
            false,
            Box::new(move |shared, data, record| {
                shared.fail_badge(record, &badge, Some(&message));
                Ok(OpOut::Flow {
                    step: Step::Now(data.clone()),
                    bypass: false,
                })
            }),
        )
    }
}
