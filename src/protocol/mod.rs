//! KNX wire protocol: addresses, datapoints and routing frames.
//!
//! Everything here is pure: no I/O, no allocation, no logging beyond
//! `trace!` on dropped frames.

pub mod address;
pub mod dpt;
pub mod frame;
pub mod message;

pub use address::{Address, GroupFields, PhysicalFields};
pub use dpt::Datapoint;
pub use frame::{Frame, build_frame, parse_frame};
pub use message::{CommandType, MAX_PAYLOAD, Message, Payload};
