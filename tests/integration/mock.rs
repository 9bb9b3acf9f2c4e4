//! Mock adapters for integration tests.
//!
//! `MockTransport` queues inbound datagrams and records every send;
//! `MemStore` is a HashMap-backed `StoragePort` that can be told to fail.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use knxip::app::ports::{Clock, DatagramTransport, StorageError, StoragePort, TransportError};
use knxip::protocol::{Address, CommandType, build_frame};

// ── Transport ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockTransport {
    pub inbox: VecDeque<Vec<u8>>,
    pub sent: Vec<Vec<u8>>,
    pub fail_recv: bool,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, datagram: &[u8]) {
        self.inbox.push_back(datagram.to_vec());
    }
}

impl DatagramTransport for MockTransport {
    fn recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
        if self.fail_recv {
            return Err(TransportError::IoError);
        }
        Ok(self.inbox.pop_front().map(|d| {
            let n = d.len().min(buf.len());
            buf[..n].copy_from_slice(&d[..n]);
            n
        }))
    }

    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        self.sent.push(datagram.to_vec());
        Ok(())
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MemStore {
    map: RefCell<HashMap<String, Vec<u8>>>,
    pub fail_writes: bool,
    pub writes: Cell<usize>,
}

#[allow(dead_code)]
impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every write fails with `Full`.
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn raw(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        self.map.borrow().get(&format!("{namespace}::{key}")).cloned()
    }

    pub fn put_raw(&self, namespace: &str, key: &str, data: &[u8]) {
        self.map
            .borrow_mut()
            .insert(format!("{namespace}::{key}"), data.to_vec());
    }

    pub fn remove_raw(&self, namespace: &str, key: &str) {
        self.map.borrow_mut().remove(&format!("{namespace}::{key}"));
    }
}

impl StoragePort for MemStore {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let map = self.map.borrow();
        let data = map
            .get(&format!("{namespace}::{key}"))
            .ok_or(StorageError::NotFound)?;
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok(n)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Full);
        }
        self.writes.set(self.writes.get() + 1);
        self.put_raw(namespace, key, data);
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.remove_raw(namespace, key);
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.map.borrow().contains_key(&format!("{namespace}::{key}"))
    }
}

// ── Clock ─────────────────────────────────────────────────────

pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_us(&self) -> u64 {
        self.0
    }
}

// ── Frames ────────────────────────────────────────────────────

/// A routing indication from 1.1.200 carrying `payload`.
#[allow(dead_code)]
pub fn telegram(command: CommandType, destination: Address, payload: &[u8]) -> Vec<u8> {
    let source = Address::physical(1, 1, 200).unwrap();
    build_frame(source, destination, command, payload)
        .unwrap()
        .to_vec()
}
