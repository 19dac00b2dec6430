//! Application-level orchestration.
//!
//! Owns the request lifecycle (submit, clear input, clear store) and the
//! dashboard refresh flow. Presentation layers talk to it over channels and
//! only mirror what it emits.

mod controller;

pub(crate) use controller::{run_controller, UiCommand, EMPTY_INPUT_MESSAGE};
