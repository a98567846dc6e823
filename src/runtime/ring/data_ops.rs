//! Data-providing operations: they set or transform the ring's data thread.

use crate::runtime::{
    ring::{OpClass, OpOut, Ring, Shape, errors::sequence_type_err},
    step::{Source, Step, join_steps},
    value::Value,
};

impl Ring {
    /// Sets the ring's data. Accepts anything steppable: a literal, a
    /// pending value, or another ring (whose eventual value is flattened
    /// in).
    pub fn with(&self, target: impl Into<Step>) -> Ring {
        let step = target.into();
        self.op(
            OpClass::Data,
            false,
            Box::new(move |_, _, _| Ok(OpOut::Flow { step, bypass: false })),
        )
    }

    /// Replaces the data with `f`'s result. A returned ring or pending
    /// value suspends this chain until it settles.
    pub fn then<S: Into<Step>>(&self, f: impl FnOnce(Value) -> S + 'static) -> Ring {
        self.op(
            OpClass::Data,
            false,
            Box::new(move |_, data, _| {
                Ok(OpOut::Flow {
                    step: f(data.clone()).into(),
                    bypass: false,
                })
            }),
        )
    }

    /// Like `then`, but requires the data to be an array and hands its
    /// elements to `f` positionally. Non-array data fails the run.
    pub fn apply<S: Into<Step>>(&self, f: impl FnOnce(&[Value]) -> S + 'static) -> Ring {
        self.op(
            OpClass::Data,
            false,
            Box::new(move |_, data, _| match data.as_array() {
                Some(elements) => Ok(OpOut::Flow {
                    step: f(elements).into(),
                    bypass: false,
                }),
                None => Err(sequence_type_err("apply", data.type_name())),
            }),
        )
    }

    /// Maps every element of array data through `f` (element, index, whole
    /// array), producing a same-length array. Synchronous results are taken
    /// immediately; pending ones are awaited together, and the whole `each`
    /// suspends iff any element does.
    pub fn each<S: Into<Step>>(
        &self,
        f: impl Fn(&Value, usize, &Value) -> S + 'static,
    ) -> Ring {
        self.op(
            OpClass::Data,
            false,
            Box::new(move |shared, data, _| {
                let Some(elements) = data.as_array() else {
                    return Err(sequence_type_err("each", data.type_name()));
                };
                let steps: Vec<Step> = elements
                    .iter()
                    .enumerate()
                    .map(|(i, element)| f(element, i, data).into())
                    .collect();
                Ok(OpOut::Flow {
                    step: join_steps(shared, steps)?,
                    bypass: false,
                })
            }),
        )
    }

    /// Evaluates every target positionally (literals, pending values, rings,
    /// or functions of the current data) and sets the data to the array of
    /// resolved values. Synchronous when every target already settled.
    pub fn after(&self, targets: Vec<Source>) -> Ring {
        self.op(
            OpClass::Data,
            false,
            Box::new(move |shared, data, _| {
                let steps: Vec<Step> =
                    targets.into_iter().map(|t| t.into_step(data)).collect();
                Ok(OpOut::Flow {
                    step: join_steps(shared, steps)?,
                    bypass: false,
                })
            }),
        )
    }

    /// Like `with`, but additionally requires the settled value to be a
    /// map. On mismatch the data is still set, the run is invalidated, and
    /// the ring bypasses.
    pub fn object(&self, target: impl Into<Step>) -> Ring {
        let step = target.into();
        self.op(
            OpClass::Data,
            false,
            Box::new(move |_, _, _| {
                Ok(OpOut::Shaped {
                    step,
                    shape: Shape::Map,
                })
            }),
        )
    }

    /// Like `object`, for arrays.
    pub fn array(&self, target: impl Into<Step>) -> Ring {
        let step = target.into();
        self.op(
            OpClass::Data,
            false,
            Box::new(move |_, _, _| {
                Ok(OpOut::Shaped {
                    step,
                    shape: Shape::Array,
                })
            }),
        )
    }
}
