//! Application core.
//!
//! [`engine::KnxEngine`] owns all telegram and registry state; [`admin`]
//! maps admin-page submissions onto it. All interaction with sockets,
//! flash and timers happens through the **port traits** in [`ports`], so
//! this layer runs unchanged against the in-memory mocks used in tests.

pub mod admin;
pub mod engine;
pub mod ports;

pub use admin::{AdminError, AdminOutcome, AdminRequest, ConfigInput};
pub use engine::{KnxEngine, PollOutcome};
