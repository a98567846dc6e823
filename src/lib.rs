//! vouch: a fluent validation engine.
//!
//! A validation run threads data through chains of checks ("rings"). Checks
//! earn or fail named badges, may suspend on pending values, and may write
//! into a path-addressed side store (`$`). Named chains opened with
//! `start(name, watches)` are memoized across runs: unchanged watches replay
//! the recorded effects instead of re-executing the chain.
//!
//! ```
//! use vouch::{Validation, Value};
//!
//! let validation = Validation::new(|v| {
//!     v.with(Value::from(21))
//!         .then(|n| Value::Integer(n.as_int().unwrap() * 2))
//!         .check_with("doubled", |n| n.as_int() == Some(42));
//! });
//! assert_eq!(validation.ok(), Some(true));
//! assert_eq!(validation.badges(), ["doubled"]);
//! ```

pub mod badge;
pub mod runtime;
pub mod store;

pub use badge::messages::{Glob, MessageBook, set_default_messages};
pub use runtime::report::Report;
pub use runtime::ring::Ring;
pub use runtime::scheduler::{Pending, Resolver};
pub use runtime::step::{Source, Step};
pub use runtime::validation::{RunOutcome, Validation};
pub use runtime::value::Value;
pub use store::NestedStore;
pub use store::path::{Path, PathStep};
