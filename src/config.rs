//! Engine configuration.
//!
//! Table capacities are compile-time constants: the target has a small,
//! fixed memory budget and every table is a `heapless` collection sized by
//! these values. Changing any of them changes [`STORAGE_MAGIC`], which
//! invalidates previously persisted state.
//!
//! Runtime policy lives in [`EngineConfig`].

use serde::{Deserialize, Serialize};

/// Maximum number of registered callbacks.
pub const MAX_CALLBACKS: usize = 10;
/// Maximum number of (group address → callback) assignments.
pub const MAX_CALLBACK_ASSIGNMENTS: usize = 10;
/// Maximum number of config slots.
pub const MAX_CONFIGS: usize = 20;
/// Size of the config blob shared by all slots (flags + values).
pub const MAX_CONFIG_SPACE: usize = 0x0200;
/// Maximum number of feedback bindings.
pub const MAX_FEEDBACKS: usize = 20;

/// Receive buffer size. Longer datagrams are truncated by the transport.
pub const RX_BUFFER_SIZE: usize = 64;

/// KNX/IP routing multicast group.
pub const MULTICAST_GROUP: [u8; 4] = [224, 0, 23, 12];
/// KNX/IP port.
pub const MULTICAST_PORT: u16 = 3671;

/// Magic number guarding persisted state.
pub const STORAGE_MAGIC: u64 = 0xDEAD_BEEF_0000_0000
    + MAX_CONFIG_SPACE as u64
    + ((MAX_CALLBACK_ASSIGNMENTS as u64) << 16)
    + ((MAX_CALLBACKS as u64) << 8);

/// How the dispatch table treats several assignments on one group address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchPolicy {
    /// Invoke every enabled callback assigned to the address, in
    /// assignment order.
    FanOut,
    /// Stop at the first assignment matching the address, even when its
    /// callback is currently disabled.
    FirstMatch,
    /// Skip disabled matches; stop after the first callback invoked.
    FirstEnabledMatch,
}

/// Runtime engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Dispatch behaviour for shared group addresses.
    pub dispatch_policy: DispatchPolicy,
    /// Physical address used until one is restored or set (area, line, member).
    pub default_physical_address: (u8, u8, u8),
    /// Multicast group to join.
    pub multicast_group: [u8; 4],
    /// UDP port to bind.
    pub multicast_port: u16,
    /// NVS namespace holding persisted state.
    pub storage_namespace: heapless::String<15>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut storage_namespace = heapless::String::new();
        let _ = storage_namespace.push_str("knx");
        Self {
            dispatch_policy: DispatchPolicy::FirstMatch,
            default_physical_address: (1, 1, 0),
            multicast_group: MULTICAST_GROUP,
            multicast_port: MULTICAST_PORT,
            storage_namespace,
        }
    }
}
