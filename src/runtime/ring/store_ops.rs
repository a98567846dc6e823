//! Operations against the nested store (`$`).

use crate::{
    runtime::{
        ring::{OpClass, OpOut, Ring},
        step::Step,
        value::Value,
    },
    store::path::Path,
};

impl Ring {
    /// Writes the ring's current data into the store at `path`. The data
    /// thread is unchanged.
    pub fn set(&self, path: impl Into<Path>) -> Ring {
        let path = path.into();
        self.op(
            OpClass::Neutral,
            false,
            Box::new(move |shared, data, record| {
                shared.store_write(record, &path, data);
                Ok(OpOut::Flow {
                    step: Step::Now(data.clone()),
                    bypass: false,
                })
            }),
        )
    }

    /// Writes `value` into the store at `path`. A failed nested report
    /// re-invalidates this run.
    pub fn put(&self, path: impl Into<Path>, value: impl Into<Value>) -> Ring {
        let path = path.into();
        let value = value.into();
        self.op(
            OpClass::Data,
            false,
            Box::new(move |shared, data, record| {
                if value.as_report().is_some_and(|r| r.is_failed()) {
                    shared.invalidate(record);
                }
                shared.store_write(record, &path, &value);
                Ok(OpOut::Flow {
                    step: Step::Now(data.clone()),
                    bypass: false,
                })
            }),
        )
    }

    /// `put` with the value derived from the current data.
    pub fn put_with(
        &self,
        path: impl Into<Path>,
        f: impl FnOnce(&Value) -> Value + 'static,
    ) -> Ring {
        let path = path.into();
        self.op(
            OpClass::Data,
            false,
            Box::new(move |shared, data, record| {
                let value = f(data);
                if value.as_report().is_some_and(|r| r.is_failed()) {
                    shared.invalidate(record);
                }
                shared.store_write(record, &path, &value);
                Ok(OpOut::Flow {
                    step: Step::Now(data.clone()),
                    bypass: false,
                })
            }),
        )
    }

    /// Reads the store at `path` into the ring's data.
    pub fn get(&self, path: impl Into<Path>) -> Ring {
        let path = path.into();
        self.op(
            OpClass::Data,
            false,
            Box::new(move |shared, _, _| {
                let stored = shared.internal.borrow().store.read(&path);
                Ok(OpOut::Flow {
                    step: Step::Now(stored),
                    bypass: false,
                })
            }),
        )
    }

    /// Reads the store at `path` and combines it with the current data.
    pub fn using<S: Into<Step>>(
        &self,
        path: impl Into<Path>,
        f: impl FnOnce(Value, Value) -> S + 'static,
    ) -> Ring {
        let path = path.into();
        self.op(
            OpClass::Data,
            false,
            Box::new(move |shared, data, _| {
                let stored = shared.internal.borrow().store.read(&path);
                Ok(OpOut::Flow {
                    step: f(stored, data.clone()).into(),
                    bypass: false,
                })
            }),
        )
    }
}
