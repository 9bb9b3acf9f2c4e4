//! Unified error types for the KNX/IP engine.
//!
//! A single `Error` enum that every subsystem converts into, so the host's
//! admin handlers and boot sequence see one uniform type. All variants are
//! `Copy`: they cross the registry and persistence boundaries without
//! allocation.
//!
//! Malformed or foreign frames are deliberately *not* represented here.
//! They are the common case on a shared multicast segment and are dropped
//! by the frame parser without surfacing anything.

use core::fmt;

use crate::app::ports::{StorageError, TransportError};

// ---------------------------------------------------------------------------
// Top-level engine error
// ---------------------------------------------------------------------------

/// Every fallible operation in the engine funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An address field was outside its interpretation's range.
    Address(AddressError),
    /// A registry rejected a registration or a slot access.
    Registry(RegistryError),
    /// A datapoint payload could not be decoded.
    Codec(CodecError),
    /// The key-value store failed.
    Storage(StorageError),
    /// The datagram transport failed.
    Transport(TransportError),
    /// Persisted state passed the magic check but could not be decoded.
    Persistence(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(e) => write!(f, "address: {e}"),
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Codec(e) => write!(f, "codec: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Persistence(msg) => write!(f, "persistence: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Address errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressError {
    /// Area exceeds 15 (physical) or 31 (group).
    AreaOutOfRange(u8),
    /// Line exceeds 15 (physical) or 7 (group).
    LineOutOfRange(u8),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AreaOutOfRange(v) => write!(f, "area {v} out of range"),
            Self::LineOutOfRange(v) => write!(f, "line {v} out of range"),
        }
    }
}

impl std::error::Error for AddressError {}

impl From<AddressError> for Error {
    fn from(e: AddressError) -> Self {
        Self::Address(e)
    }
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

/// Which bounded table a capacity error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Callbacks,
    Assignments,
    ConfigSlots,
    ConfigSpace,
    Feedbacks,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callbacks => write!(f, "callbacks"),
            Self::Assignments => write!(f, "callback assignments"),
            Self::ConfigSlots => write!(f, "config slots"),
            Self::ConfigSpace => write!(f, "config space"),
            Self::Feedbacks => write!(f, "feedbacks"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// The bounded table is full.
    CapacityExceeded(Table),
    /// No callback / assignment / slot / feedback has this id.
    UnknownId,
    /// The slot exists but holds a different type.
    TypeMismatch,
    /// String value longer than the slot's maximum length.
    ValueTooLong,
    /// String value contains a NUL, which the stored form cannot hold.
    InvalidValue,
    /// Value is not one of the slot's enumerated options.
    UnknownOption,
    /// The feedback binding is a value, not an action.
    NotAnAction,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded(t) => write!(f, "{t} capacity exceeded"),
            Self::UnknownId => write!(f, "unknown id"),
            Self::TypeMismatch => write!(f, "type mismatch"),
            Self::ValueTooLong => write!(f, "value too long"),
            Self::InvalidValue => write!(f, "value contains NUL"),
            Self::UnknownOption => write!(f, "unknown option"),
            Self::NotAnAction => write!(f, "feedback is not an action"),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ---------------------------------------------------------------------------
// Codec errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// The payload is shorter than the datapoint needs.
    PayloadTooShort { needed: usize, got: usize },
    /// The payload does not fit a standard frame.
    PayloadTooLong,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayloadTooShort { needed, got } => {
                write!(f, "payload too short ({got} of {needed} bytes)")
            }
            Self::PayloadTooLong => write!(f, "payload too long"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

// ---------------------------------------------------------------------------
// Port errors
// ---------------------------------------------------------------------------

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Engine-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
