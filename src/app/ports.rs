//! Port traits: the boundary between the telegram engine and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ KnxEngine (domain)
//! ```
//!
//! Driven adapters (storage, datagram transport, clock) implement these
//! traits. The [`KnxEngine`](super::engine::KnxEngine) takes them as
//! generic parameters at call sites, so the engine never touches sockets
//! or flash directly and can be exercised against in-memory mocks.

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: engine ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage (NVS on the ESP32).
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - A single `write` MUST be atomic. The ESP-IDF NVS API guarantees this
///   per commit; the in-memory simulation achieves it trivially. Nothing
///   above this trait attempts partial-write recovery.
pub trait StoragePort {
    /// Read a value. Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Datagram transport port (driven adapter: engine ↔ UDP multicast)
// ───────────────────────────────────────────────────────────────

/// Non-blocking datagram channel (the KNX/IP multicast group).
pub trait DatagramTransport {
    /// Receive at most one pending datagram into `buf`.
    ///
    /// Returns `Ok(None)` immediately when nothing is pending. Datagrams
    /// longer than `buf` are truncated to `buf.len()`.
    fn recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>, TransportError>;

    /// Send one datagram to the group.
    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError>;
}

/// A transport that never receives and discards all sends.
/// Useful before the network is up.
pub struct NullTransport;

impl DatagramTransport for NullTransport {
    fn recv(&mut self, _buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
        Ok(None)
    }

    fn send(&mut self, _datagram: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source used to stamp received messages.
pub trait Clock {
    /// Microseconds since boot.
    fn now_us(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

/// Errors from [`DatagramTransport`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The socket is not bound / the network is down.
    NotConnected,
    /// Generic I/O error from the socket layer.
    IoError,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for StorageError {}

impl std::error::Error for TransportError {}
