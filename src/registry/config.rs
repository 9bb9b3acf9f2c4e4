//! Typed configuration slots over one fixed-size blob.
//!
//! Each slot owns a contiguous region of the blob, allocated in
//! registration order:
//!
//! ```text
//! offset ─▶ ┌───────┬─────────────────────────────┐
//!           │ flags │ value                       │
//!           └───────┴─────────────────────────────┘
//!             1 B     int 4 (i32 LE) · bool 1 · option 1
//!                     group address 2 (BE) · string max_len + 1 (NUL)
//! ```
//!
//! Flag bit 0 records whether the value was ever set explicitly. Writing
//! the registration default leaves it clear.
//!
//! The whole blob is what gets persisted; a copy taken at startup
//! ([`ConfigRegistry::capture_defaults`]) is the factory-reset image.

use log::debug;

use crate::config::{MAX_CONFIG_SPACE, MAX_CONFIGS};
use crate::error::{RegistryError, Table};
use crate::protocol::Address;

use super::{EnableCondition, is_enabled};

const FLAG_VALUE_SET: u8 = 0x01;

/// Index of a config slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfigId(pub u8);

/// One choice of an enumerated-options slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionEntry {
    pub name: &'static str,
    pub value: u8,
}

/// Slot type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    String { max_len: u8 },
    Int,
    Bool,
    Options(&'static [OptionEntry]),
    GroupAddress,
}

impl ConfigKind {
    fn value_len(self) -> usize {
        match self {
            Self::String { max_len } => usize::from(max_len) + 1,
            Self::Int => 4,
            Self::Bool | Self::Options(_) => 1,
            Self::GroupAddress => 2,
        }
    }
}

/// Current value of a slot, borrowed from the blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigValue<'a> {
    String(&'a str),
    Int(i32),
    Bool(bool),
    Option(u8),
    GroupAddress(Address),
}

/// Read-only view of a slot for the admin page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotView<'a> {
    pub id: ConfigId,
    pub name: &'static str,
    pub kind: ConfigKind,
    pub value: ConfigValue<'a>,
    pub value_set: bool,
    pub enabled: bool,
}

struct Slot {
    name: &'static str,
    kind: ConfigKind,
    /// Offset of the flag byte; the value follows it.
    offset: usize,
    condition: Option<EnableCondition>,
}

impl Slot {
    fn value_range(&self) -> core::ops::Range<usize> {
        let start = self.offset + 1;
        start..start + self.kind.value_len()
    }
}

pub struct ConfigRegistry {
    slots: heapless::Vec<Slot, MAX_CONFIGS>,
    used: usize,
    data: [u8; MAX_CONFIG_SPACE],
    defaults: [u8; MAX_CONFIG_SPACE],
}

impl Default for ConfigRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigRegistry {
    pub const fn new() -> Self {
        Self {
            slots: heapless::Vec::new(),
            used: 0,
            data: [0; MAX_CONFIG_SPACE],
            defaults: [0; MAX_CONFIG_SPACE],
        }
    }

    // ── Registration ─────────────────────────────────────────────

    pub fn register_string(
        &mut self,
        name: &'static str,
        max_len: u8,
        default: &str,
        condition: Option<EnableCondition>,
    ) -> Result<ConfigId, RegistryError> {
        check_string(max_len, default)?;
        let id = self.allocate(name, ConfigKind::String { max_len }, condition)?;
        self.write_string(id, default);
        Ok(id)
    }

    pub fn register_int(
        &mut self,
        name: &'static str,
        default: i32,
        condition: Option<EnableCondition>,
    ) -> Result<ConfigId, RegistryError> {
        let id = self.allocate(name, ConfigKind::Int, condition)?;
        self.value_mut(id).copy_from_slice(&default.to_le_bytes());
        Ok(id)
    }

    pub fn register_bool(
        &mut self,
        name: &'static str,
        default: bool,
        condition: Option<EnableCondition>,
    ) -> Result<ConfigId, RegistryError> {
        let id = self.allocate(name, ConfigKind::Bool, condition)?;
        self.value_mut(id)[0] = u8::from(default);
        Ok(id)
    }

    pub fn register_options(
        &mut self,
        name: &'static str,
        options: &'static [OptionEntry],
        default: u8,
        condition: Option<EnableCondition>,
    ) -> Result<ConfigId, RegistryError> {
        if !options.iter().any(|o| o.value == default) {
            return Err(RegistryError::UnknownOption);
        }
        let id = self.allocate(name, ConfigKind::Options(options), condition)?;
        self.value_mut(id)[0] = default;
        Ok(id)
    }

    /// Group-address slots default to address 0 ("unassigned").
    pub fn register_group_address(
        &mut self,
        name: &'static str,
        condition: Option<EnableCondition>,
    ) -> Result<ConfigId, RegistryError> {
        self.allocate(name, ConfigKind::GroupAddress, condition)
    }

    fn allocate(
        &mut self,
        name: &'static str,
        kind: ConfigKind,
        condition: Option<EnableCondition>,
    ) -> Result<ConfigId, RegistryError> {
        if self.slots.is_full() {
            return Err(RegistryError::CapacityExceeded(Table::ConfigSlots));
        }
        let size = 1 + kind.value_len();
        if self.used + size > MAX_CONFIG_SPACE {
            return Err(RegistryError::CapacityExceeded(Table::ConfigSpace));
        }
        let id = ConfigId(self.slots.len() as u8);
        let offset = self.used;
        self.slots
            .push(Slot {
                name,
                kind,
                offset,
                condition,
            })
            .map_err(|_| RegistryError::CapacityExceeded(Table::ConfigSlots))?;
        self.used += size;
        self.data[offset..offset + size].fill(0);
        debug!("config: '{name}' at {offset} ({size} bytes)");
        Ok(id)
    }

    // ── Getters ──────────────────────────────────────────────────

    pub fn get_string(&self, id: ConfigId) -> Result<&str, RegistryError> {
        let slot = self.checked(id, |k| matches!(k, ConfigKind::String { .. }))?;
        Ok(nul_terminated(&self.data[slot.value_range()]))
    }

    pub fn get_int(&self, id: ConfigId) -> Result<i32, RegistryError> {
        let slot = self.checked(id, |k| matches!(k, ConfigKind::Int))?;
        let v = &self.data[slot.value_range()];
        Ok(i32::from_le_bytes([v[0], v[1], v[2], v[3]]))
    }

    pub fn get_bool(&self, id: ConfigId) -> Result<bool, RegistryError> {
        let slot = self.checked(id, |k| matches!(k, ConfigKind::Bool))?;
        Ok(self.data[slot.offset + 1] != 0)
    }

    pub fn get_option(&self, id: ConfigId) -> Result<u8, RegistryError> {
        let slot = self.checked(id, |k| matches!(k, ConfigKind::Options(_)))?;
        Ok(self.data[slot.offset + 1])
    }

    pub fn get_group_address(&self, id: ConfigId) -> Result<Address, RegistryError> {
        let slot = self.checked(id, |k| matches!(k, ConfigKind::GroupAddress))?;
        let v = &self.data[slot.value_range()];
        Ok(Address::from_bytes([v[0], v[1]]))
    }

    // ── Setters ──────────────────────────────────────────────────

    /// Longer strings are rejected, never truncated.
    pub fn set_string(&mut self, id: ConfigId, value: &str) -> Result<(), RegistryError> {
        let slot = self.checked(id, |k| matches!(k, ConfigKind::String { .. }))?;
        if let ConfigKind::String { max_len } = slot.kind {
            check_string(max_len, value)?;
        }
        self.write_string(id, value);
        self.mark_set(id);
        Ok(())
    }

    pub fn set_int(&mut self, id: ConfigId, value: i32) -> Result<(), RegistryError> {
        self.checked(id, |k| matches!(k, ConfigKind::Int))?;
        self.value_mut(id).copy_from_slice(&value.to_le_bytes());
        self.mark_set(id);
        Ok(())
    }

    pub fn set_bool(&mut self, id: ConfigId, value: bool) -> Result<(), RegistryError> {
        self.checked(id, |k| matches!(k, ConfigKind::Bool))?;
        self.value_mut(id)[0] = u8::from(value);
        self.mark_set(id);
        Ok(())
    }

    /// `value` must be one of the slot's option values.
    pub fn set_option(&mut self, id: ConfigId, value: u8) -> Result<(), RegistryError> {
        let slot = self.checked(id, |k| matches!(k, ConfigKind::Options(_)))?;
        if let ConfigKind::Options(options) = slot.kind
            && !options.iter().any(|o| o.value == value)
        {
            return Err(RegistryError::UnknownOption);
        }
        self.value_mut(id)[0] = value;
        self.mark_set(id);
        Ok(())
    }

    pub fn set_group_address(&mut self, id: ConfigId, value: Address) -> Result<(), RegistryError> {
        self.checked(id, |k| matches!(k, ConfigKind::GroupAddress))?;
        self.value_mut(id).copy_from_slice(&value.to_bytes());
        self.mark_set(id);
        Ok(())
    }

    // ── Introspection ────────────────────────────────────────────

    pub fn is_value_set(&self, id: ConfigId) -> Result<bool, RegistryError> {
        let slot = self.slot(id)?;
        Ok(self.data[slot.offset] & FLAG_VALUE_SET != 0)
    }

    pub fn kind(&self, id: ConfigId) -> Result<ConfigKind, RegistryError> {
        Ok(self.slot(id)?.kind)
    }

    pub fn find(&self, name: &str) -> Option<ConfigId> {
        self.slots
            .iter()
            .position(|s| s.name == name)
            .map(|i| ConfigId(i as u8))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All slots in registration order, disabled ones included.
    pub fn slots(&self) -> impl Iterator<Item = SlotView<'_>> + '_ {
        self.slots.iter().enumerate().map(|(i, slot)| {
            let v = &self.data[slot.value_range()];
            let value = match slot.kind {
                ConfigKind::String { .. } => ConfigValue::String(nul_terminated(v)),
                ConfigKind::Int => ConfigValue::Int(i32::from_le_bytes([v[0], v[1], v[2], v[3]])),
                ConfigKind::Bool => ConfigValue::Bool(v[0] != 0),
                ConfigKind::Options(_) => ConfigValue::Option(v[0]),
                ConfigKind::GroupAddress => ConfigValue::GroupAddress(Address::from_bytes([v[0], v[1]])),
            };
            SlotView {
                id: ConfigId(i as u8),
                name: slot.name,
                kind: slot.kind,
                value,
                value_set: self.data[slot.offset] & FLAG_VALUE_SET != 0,
                enabled: is_enabled(slot.condition.as_ref()),
            }
        })
    }

    // ── Blob ─────────────────────────────────────────────────────

    /// Snapshot the current blob as the factory-reset image.
    pub fn capture_defaults(&mut self) {
        self.defaults = self.data;
    }

    /// Copy the factory-reset image back over the live blob.
    pub fn restore_defaults(&mut self) {
        self.data = self.defaults;
    }

    pub fn blob(&self) -> &[u8; MAX_CONFIG_SPACE] {
        &self.data
    }

    pub fn load_blob(&mut self, blob: &[u8; MAX_CONFIG_SPACE]) {
        self.data = *blob;
    }

    // ── Internals ────────────────────────────────────────────────

    fn slot(&self, id: ConfigId) -> Result<&Slot, RegistryError> {
        self.slots.get(usize::from(id.0)).ok_or(RegistryError::UnknownId)
    }

    fn checked(
        &self,
        id: ConfigId,
        kind_ok: impl Fn(&ConfigKind) -> bool,
    ) -> Result<&Slot, RegistryError> {
        let slot = self.slot(id)?;
        if kind_ok(&slot.kind) {
            Ok(slot)
        } else {
            Err(RegistryError::TypeMismatch)
        }
    }

    /// Caller has already validated `id`.
    fn value_mut(&mut self, id: ConfigId) -> &mut [u8] {
        let range = self.slots[usize::from(id.0)].value_range();
        &mut self.data[range]
    }

    fn mark_set(&mut self, id: ConfigId) {
        let offset = self.slots[usize::from(id.0)].offset;
        self.data[offset] |= FLAG_VALUE_SET;
    }

    /// Zero-fills the slot so the string stays NUL-terminated.
    fn write_string(&mut self, id: ConfigId, value: &str) {
        let dst = self.value_mut(id);
        dst.fill(0);
        dst[..value.len()].copy_from_slice(value.as_bytes());
    }
}

/// Stored strings are NUL-terminated, so neither overlong values nor
/// embedded NULs can be kept intact.
fn check_string(max_len: u8, value: &str) -> Result<(), RegistryError> {
    if value.len() > usize::from(max_len) {
        Err(RegistryError::ValueTooLong)
    } else if value.contains('\0') {
        Err(RegistryError::InvalidValue)
    } else {
        Ok(())
    }
}

/// Text up to the first NUL. A blob restored from flash may hold invalid
/// UTF-8; only the valid prefix is returned.
fn nul_terminated(bytes: &[u8]) -> &str {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let bytes = &bytes[..end];
    match core::str::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default(),
    }
}
