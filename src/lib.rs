//! KNX/IP routing telegram engine.
//!
//! Receives routing indications from the 224.0.23.12:3671 multicast group,
//! dispatches group telegrams to registered callbacks, and keeps typed
//! config and feedback registries that persist to NVS.
//!
//! Everything except the ESP-IDF branches of [`adapters`] builds and tests
//! on the host. Those branches are guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod persistence;
pub mod protocol;
pub mod registry;

pub use app::{AdminRequest, KnxEngine, PollOutcome};
pub use config::{DispatchPolicy, EngineConfig};
pub use error::{Error, Result};
pub use protocol::{Address, CommandType, Datapoint, Message};
