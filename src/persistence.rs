//! Durable engine state over a [`StoragePort`].
//!
//! Keys in the engine's namespace:
//!
//! | key             | contents                                   |
//! |-----------------|--------------------------------------------|
//! | `magic`         | [`STORAGE_MAGIC`], u64 little-endian       |
//! | `reg_cb_assign` | assignment count, 1 byte                   |
//! | `cb_assign`     | assignment list, postcard                  |
//! | `physaddr`      | physical address, 2 bytes big-endian       |
//! | `config`        | config blob, `MAX_CONFIG_SPACE` bytes      |
//!
//! Save removes the magic first and writes it back last, so a save that
//! fails partway leaves a store without magic. Restore checks the magic
//! first: missing or different means "nothing stored" and nothing else is
//! read. Past that point every key is decoded into a [`PersistedState`]
//! before anything is returned, so a corrupt store never yields a
//! half-applied state.

use log::{info, warn};

use crate::app::ports::{StorageError, StoragePort};
use crate::config::{MAX_CALLBACK_ASSIGNMENTS, MAX_CONFIG_SPACE, STORAGE_MAGIC};
use crate::dispatch::AssignmentList;
use crate::error::{Error, Result};
use crate::protocol::Address;

pub const KEY_MAGIC: &str = "magic";
pub const KEY_ASSIGNMENT_COUNT: &str = "reg_cb_assign";
pub const KEY_ASSIGNMENTS: &str = "cb_assign";
pub const KEY_PHYSICAL_ADDRESS: &str = "physaddr";
pub const KEY_CONFIG: &str = "config";

/// Worst-case postcard size of a full assignment list: a length varint
/// plus, per entry, a 3-byte address varint and a 1-byte callback id.
const ASSIGNMENTS_BUF: usize = 1 + MAX_CALLBACK_ASSIGNMENTS * 4;

/// Everything that survives a reboot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedState {
    pub assignments: AssignmentList,
    pub physical_address: Address,
    pub config: [u8; MAX_CONFIG_SPACE],
}

/// Write `state` under `namespace`.
pub fn save<S: StoragePort>(store: &mut S, namespace: &str, state: &PersistedState) -> Result<()> {
    let mut buf = [0u8; ASSIGNMENTS_BUF];
    let encoded = postcard::to_slice(&state.assignments, &mut buf)
        .map_err(|_| Error::Persistence("assignment list encoding"))?;

    store.delete(namespace, KEY_MAGIC)?;
    store.write(namespace, KEY_ASSIGNMENT_COUNT, &[state.assignments.len() as u8])?;
    store.write(namespace, KEY_ASSIGNMENTS, encoded)?;
    store.write(namespace, KEY_PHYSICAL_ADDRESS, &state.physical_address.to_bytes())?;
    store.write(namespace, KEY_CONFIG, &state.config)?;
    store.write(namespace, KEY_MAGIC, &STORAGE_MAGIC.to_le_bytes())?;

    info!(
        "persistence: saved {} assignments, physical address {}",
        state.assignments.len(),
        state.physical_address.physical_fields()
    );
    Ok(())
}

/// Read back what [`save`] wrote.
///
/// `Ok(None)` when no state with the current magic is stored.
pub fn restore<S: StoragePort>(store: &S, namespace: &str) -> Result<Option<PersistedState>> {
    let mut magic = [0u8; 8];
    match store.read(namespace, KEY_MAGIC, &mut magic) {
        Ok(8) => {}
        Ok(n) => {
            warn!("persistence: magic has {n} bytes, ignoring store");
            return Ok(None);
        }
        Err(StorageError::NotFound) => {
            info!("persistence: nothing stored");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }
    let magic = u64::from_le_bytes(magic);
    if magic != STORAGE_MAGIC {
        warn!("persistence: magic {magic:#018x} != {STORAGE_MAGIC:#018x}, ignoring store");
        return Ok(None);
    }

    let mut count = [0u8; 1];
    read_exact(store, namespace, KEY_ASSIGNMENT_COUNT, &mut count)?;
    let count = usize::from(count[0]);
    if count > MAX_CALLBACK_ASSIGNMENTS {
        return Err(Error::Persistence("assignment count exceeds capacity"));
    }

    let mut buf = [0u8; ASSIGNMENTS_BUF];
    let n = read_or_missing(store, namespace, KEY_ASSIGNMENTS, &mut buf)?;
    let assignments: AssignmentList = postcard::from_bytes(&buf[..n])
        .map_err(|_| Error::Persistence("assignment list corrupt"))?;
    if assignments.len() != count {
        return Err(Error::Persistence("assignment count mismatch"));
    }

    let mut phys = [0u8; 2];
    read_exact(store, namespace, KEY_PHYSICAL_ADDRESS, &mut phys)?;

    let mut config = [0u8; MAX_CONFIG_SPACE];
    read_exact(store, namespace, KEY_CONFIG, &mut config)?;

    let state = PersistedState {
        assignments,
        physical_address: Address::from_bytes(phys),
        config,
    };
    info!(
        "persistence: restored {} assignments, physical address {}",
        state.assignments.len(),
        state.physical_address.physical_fields()
    );
    Ok(Some(state))
}

/// Remove every key, magic first.
pub fn erase<S: StoragePort>(store: &mut S, namespace: &str) -> Result<()> {
    for key in [
        KEY_MAGIC,
        KEY_ASSIGNMENT_COUNT,
        KEY_ASSIGNMENTS,
        KEY_PHYSICAL_ADDRESS,
        KEY_CONFIG,
    ] {
        store.delete(namespace, key)?;
    }
    Ok(())
}

fn read_or_missing<S: StoragePort>(store: &S, namespace: &str, key: &'static str, buf: &mut [u8]) -> Result<usize> {
    store.read(namespace, key, buf).map_err(|e| match e {
        StorageError::NotFound => Error::Persistence("key missing"),
        other => other.into(),
    })
}

fn read_exact<S: StoragePort>(store: &S, namespace: &str, key: &'static str, buf: &mut [u8]) -> Result<()> {
    let n = read_or_missing(store, namespace, key, buf)?;
    if n == buf.len() {
        Ok(())
    } else {
        warn!("persistence: '{key}' has {n} bytes, expected {}", buf.len());
        Err(Error::Persistence("field length mismatch"))
    }
}
