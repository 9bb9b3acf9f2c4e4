//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter | Implements          | Connects to                 |
//! |---------|---------------------|-----------------------------|
//! | `nvs`   | StoragePort         | NVS / in-memory store       |
//! | `time`  | Clock               | ESP32 system timer / Instant|
//! | `udp`   | DatagramTransport   | UDP multicast 224.0.23.12   |

pub mod nvs;
pub mod time;
pub mod udp;

pub use nvs::NvsAdapter;
pub use time::MonotonicClock;
pub use udp::UdpMulticastTransport;
