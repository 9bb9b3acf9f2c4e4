//! Fuzz target: `persistence::restore`
//!
//! Stores a valid magic and fills every other key with fuzzer bytes.
//! Restore must either succeed with in-capacity state or fail cleanly.
//!
//! cargo fuzz run fuzz_persisted_state

#![no_main]

use std::collections::HashMap;

use knxip::app::ports::{StorageError, StoragePort};
use knxip::config::{MAX_CALLBACK_ASSIGNMENTS, STORAGE_MAGIC};
use knxip::persistence::{self, KEY_ASSIGNMENT_COUNT, KEY_ASSIGNMENTS, KEY_CONFIG, KEY_MAGIC, KEY_PHYSICAL_ADDRESS};
use libfuzzer_sys::fuzz_target;

#[derive(Default)]
struct Store(HashMap<&'static str, Vec<u8>>);

impl StoragePort for Store {
    fn read(&self, _ns: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = self.0.get(key).ok_or(StorageError::NotFound)?;
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok(n)
    }
    fn write(&mut self, _ns: &str, _key: &str, _data: &[u8]) -> Result<(), StorageError> {
        Err(StorageError::IoError)
    }
    fn delete(&mut self, _ns: &str, key: &str) -> Result<(), StorageError> {
        self.0.remove(key);
        Ok(())
    }
    fn exists(&self, _ns: &str, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

fuzz_target!(|data: &[u8]| {
    // Split the input on the first three bytes as lengths.
    let [a, b, c, rest @ ..] = data else {
        return;
    };
    let (count, rest) = rest.split_at((*a as usize).min(rest.len()));
    let (assignments, rest) = rest.split_at((*b as usize).min(rest.len()));
    let (phys, config) = rest.split_at((*c as usize).min(rest.len()));

    let mut store = Store::default();
    store.0.insert(KEY_MAGIC, STORAGE_MAGIC.to_le_bytes().to_vec());
    store.0.insert(KEY_ASSIGNMENT_COUNT, count.to_vec());
    store.0.insert(KEY_ASSIGNMENTS, assignments.to_vec());
    store.0.insert(KEY_PHYSICAL_ADDRESS, phys.to_vec());
    store.0.insert(KEY_CONFIG, config.to_vec());

    if let Ok(Some(state)) = persistence::restore(&store, "knx") {
        assert!(state.assignments.len() <= MAX_CALLBACK_ASSIGNMENTS);
    }
});
