#![forbid(unsafe_code)]

//! Scenario replay harness for keytouch gesture engines.
//!
//! A scenario describes one button, its environment (configuration, scroll
//! container, popup alternates) and a timeline of pointer input. Replaying it
//! on a virtual clock produces a JSONL event trace and a BLAKE3 digest, so a
//! behaviour change shows up as a golden mismatch.

pub mod cli;
pub mod error;
pub mod logging;
pub mod replay;
pub mod scenario;

pub use cli::run_from_env;
pub use error::{HarnessError, Result};
pub use replay::{Replay, Summary, replay};
pub use scenario::{Action, FrameSpec, Scenario, Step};
