use std::{fmt, rc::Rc};

/// One step of a store path: a map key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    Key(Rc<str>),
    Index(usize),
}

/// A recorded sequence of steps addressing a location in the nested store.
///
/// Built fluently: `Path::root().key("records").index(2).key("name")`
/// addresses the third element of `records`, then its `name` field. The
/// builder records steps into a list; there is no implicit property capture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    steps: Vec<PathStep>,
}

impl Path {
    /// The empty path, addressing the store root.
    pub fn root() -> Path {
        Path { steps: Vec::new() }
    }

    pub fn key(mut self, key: impl Into<Rc<str>>) -> Path {
        self.steps.push(PathStep::Key(key.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Path {
        self.steps.push(PathStep::Index(index));
        self
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Single-key convenience: `"name"` is the path `$.name`.
impl From<&str> for Path {
    fn from(key: &str) -> Path {
        Path::root().key(key)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for step in &self.steps {
            match step {
                PathStep::Key(k) => write!(f, ".{}", k)?,
                PathStep::Index(i) => write!(f, "[{}]", i)?,
            }
        }
        Ok(())
    }
}
