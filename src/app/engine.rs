//! The telegram engine: the explicitly owned core of the crate.
//!
//! [`KnxEngine`] owns the dispatch table, both registries and the device's
//! physical address. Transport, storage and clock are injected at each
//! call, so several independent engines can coexist (e.g. in tests).
//!
//! ```text
//!  DatagramTransport ──▶ ┌──────────────────────────┐ ──▶ callbacks
//!                        │        KnxEngine         │
//!  Clock ───────────────▶│ dispatch · config · fb   │◀──▶ StoragePort
//!                        └──────────────────────────┘
//! ```

use log::{debug, info, warn};

use crate::config::{DispatchPolicy, EngineConfig, RX_BUFFER_SIZE};
use crate::dispatch::{AssignmentList, DispatchTable};
use crate::error::Result;
use crate::persistence::{self, PersistedState};
use crate::protocol::{Address, CommandType, Datapoint, build_frame, parse_frame};
use crate::registry::{ConfigRegistry, FeedbackRegistry};

use super::ports::{Clock, DatagramTransport, StoragePort};

/// Result of one [`KnxEngine::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing was pending, or the transport failed.
    Idle,
    /// A datagram arrived but was not a group data indication.
    Dropped,
    /// A telegram was parsed; this many handlers ran.
    Dispatched(usize),
}

// ───────────────────────────────────────────────────────────────
// KnxEngine
// ───────────────────────────────────────────────────────────────

pub struct KnxEngine {
    config: EngineConfig,
    physical_address: Address,
    dispatch: DispatchTable,
    configs: ConfigRegistry,
    feedbacks: FeedbackRegistry,
    rx_buf: [u8; RX_BUFFER_SIZE],
}

impl KnxEngine {
    /// Fails if the configured default physical address is out of range.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let (area, line, member) = config.default_physical_address;
        let physical_address = Address::physical(area, line, member)?;
        info!(
            "KnxEngine: {} policy {:?}",
            physical_address.physical_fields(),
            config.dispatch_policy
        );
        Ok(Self {
            config,
            physical_address,
            dispatch: DispatchTable::new(),
            configs: ConfigRegistry::new(),
            feedbacks: FeedbackRegistry::new(),
            rx_buf: [0; RX_BUFFER_SIZE],
        })
    }

    // ── Receive path ──────────────────────────────────────────

    /// Handle at most one pending datagram. Never blocks.
    pub fn poll(&mut self, transport: &mut impl DatagramTransport, clock: &impl Clock) -> PollOutcome {
        let len = match transport.recv(&mut self.rx_buf) {
            Ok(Some(len)) => len.min(RX_BUFFER_SIZE),
            Ok(None) => return PollOutcome::Idle,
            Err(e) => {
                warn!("KnxEngine: receive failed: {e}");
                return PollOutcome::Idle;
            }
        };

        let Some(msg) = parse_frame(&self.rx_buf[..len], clock.now_us()) else {
            return PollOutcome::Dropped;
        };
        debug!(
            "KnxEngine: {:?} {} -> {} ({} bytes)",
            msg.command,
            msg.source.physical_fields(),
            msg.destination.group_fields(),
            msg.payload.len()
        );
        PollOutcome::Dispatched(self.dispatch.dispatch(&msg, self.config.dispatch_policy))
    }

    // ── Send path ─────────────────────────────────────────────

    /// Send a group telegram from this device's physical address.
    ///
    /// Address 0 means "unassigned" (e.g. an unset group-address config
    /// slot); sending to it does nothing.
    pub fn send(
        &self,
        transport: &mut impl DatagramTransport,
        destination: Address,
        command: CommandType,
        payload: &[u8],
    ) -> Result<()> {
        if destination.raw() == 0 {
            debug!("KnxEngine: send to unassigned address skipped");
            return Ok(());
        }
        let frame = build_frame(self.physical_address, destination, command, payload)?;
        transport.send(&frame)?;
        debug!(
            "KnxEngine: sent {:?} to {} ({} bytes)",
            command,
            destination.group_fields(),
            frame.len()
        );
        Ok(())
    }

    /// Send a group write carrying `value`.
    pub fn write(
        &self,
        transport: &mut impl DatagramTransport,
        destination: Address,
        value: &Datapoint<'_>,
    ) -> Result<()> {
        self.send(transport, destination, CommandType::Write, &value.encode())
    }

    /// Answer a group read with `value`.
    pub fn answer(
        &self,
        transport: &mut impl DatagramTransport,
        destination: Address,
        value: &Datapoint<'_>,
    ) -> Result<()> {
        self.send(transport, destination, CommandType::Answer, &value.encode())
    }

    /// Ask the owner of `destination` for its current value.
    pub fn read(&self, transport: &mut impl DatagramTransport, destination: Address) -> Result<()> {
        self.send(transport, destination, CommandType::Read, &[])
    }

    // ── Persistence ───────────────────────────────────────────

    pub fn save(&self, store: &mut impl StoragePort) -> Result<()> {
        let mut assignments = AssignmentList::new();
        for a in self.dispatch.assignments() {
            // Same capacity as the live table.
            let _ = assignments.push(*a);
        }
        let state = PersistedState {
            assignments,
            physical_address: self.physical_address,
            config: *self.configs.blob(),
        };
        persistence::save(store, &self.config.storage_namespace, &state)
    }

    /// Apply stored state. `Ok(false)` when nothing valid was stored, in
    /// which case the engine is untouched.
    pub fn restore(&mut self, store: &impl StoragePort) -> Result<bool> {
        let Some(state) = persistence::restore(store, &self.config.storage_namespace)? else {
            return Ok(false);
        };
        self.dispatch.replace_assignments(state.assignments);
        self.physical_address = state.physical_address;
        self.configs.load_blob(&state.config);
        Ok(true)
    }

    /// Boot sequence: snapshot the registered config defaults as the
    /// factory image, then restore stored state over them.
    ///
    /// Call once after every config slot is registered.
    pub fn load(&mut self, store: &impl StoragePort) -> Result<bool> {
        self.configs.capture_defaults();
        self.restore(store)
    }

    /// Factory-reset the config registry. Assignments and the physical
    /// address are kept.
    pub fn restore_defaults(&mut self) {
        info!("KnxEngine: config restored to defaults");
        self.configs.restore_defaults();
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn physical_address(&self) -> Address {
        self.physical_address
    }

    pub fn set_physical_address(&mut self, address: Address) {
        info!("KnxEngine: physical address {}", address.physical_fields());
        self.physical_address = address;
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dispatch_policy(&self) -> DispatchPolicy {
        self.config.dispatch_policy
    }

    pub fn dispatch(&self) -> &DispatchTable {
        &self.dispatch
    }

    pub fn dispatch_mut(&mut self) -> &mut DispatchTable {
        &mut self.dispatch
    }

    pub fn configs(&self) -> &ConfigRegistry {
        &self.configs
    }

    pub fn configs_mut(&mut self) -> &mut ConfigRegistry {
        &mut self.configs
    }

    pub fn feedbacks(&self) -> &FeedbackRegistry {
        &self.feedbacks
    }

    pub fn feedbacks_mut(&mut self) -> &mut FeedbackRegistry {
        &mut self.feedbacks
    }
}
