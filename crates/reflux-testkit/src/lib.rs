//! Reflux testing infrastructure
//!
//! Recorders for stream emissions, async wait helpers, shared fixtures and
//! proptest strategies. The cross-module integration suites live in this
//! crate's `tests/` directory.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```rust
//! use reflux_testkit::{Person, Recorder};
//!
//! let person = Person::john_smith();
//! let recorder = Recorder::attach(&person.full_name.on_successful_value_changed());
//! person.last_name.set_value("Davis".to_string());
//! assert_eq!(recorder.values(), vec!["John Smith", "John Davis"]);
//! ```

pub mod fixtures;
pub mod recorder;
pub mod strategies;
pub mod wait;

pub use fixtures::{failure, init_tracing, virtual_factory, InvalidOperation, Person};
pub use recorder::Recorder;
pub use wait::{eventually, eventually_some, WaitTimeout};
