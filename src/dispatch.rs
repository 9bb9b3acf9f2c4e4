//! Address-based telegram dispatch.
//!
//! ```text
//!   Message ──▶ assignments (linear scan, assignment order)
//!                  │ address == destination?
//!                  ▼
//!               callbacks[id] ── enabled? ──▶ handler(&Message)
//! ```
//!
//! Callbacks are registered once and never removed; their ids are stable.
//! Assignments live in a dense array: removing one shifts every later
//! entry down, so an [`AssignmentId`] is only valid until the next
//! mutating call.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{DispatchPolicy, MAX_CALLBACK_ASSIGNMENTS, MAX_CALLBACKS};
use crate::error::{RegistryError, Table};
use crate::protocol::{Address, Message};
use crate::registry::{EnableCondition, is_enabled};

/// Telegram handler. Whatever it needs from the firmware it captures.
pub type Handler = Box<dyn FnMut(&Message)>;

/// Index of a registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackId(pub u8);

/// Position of an assignment in the dense assignment array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentId(pub u8);

/// One (group address → callback) binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub address: Address,
    pub callback: CallbackId,
}

/// Assignment list as persisted and restored.
pub type AssignmentList = heapless::Vec<Assignment, MAX_CALLBACK_ASSIGNMENTS>;

struct Callback {
    name: &'static str,
    handler: Handler,
    condition: Option<EnableCondition>,
}

/// Read-only view of a callback for the admin page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackView {
    pub id: CallbackId,
    pub name: &'static str,
    pub enabled: bool,
}

/// Bounded callback and assignment tables.
pub struct DispatchTable {
    callbacks: heapless::Vec<Callback, MAX_CALLBACKS>,
    assignments: AssignmentList,
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchTable {
    pub const fn new() -> Self {
        Self {
            callbacks: heapless::Vec::new(),
            assignments: heapless::Vec::new(),
        }
    }

    /// Register a named handler.
    pub fn register_callback(
        &mut self,
        name: &'static str,
        handler: impl FnMut(&Message) + 'static,
        condition: Option<EnableCondition>,
    ) -> Result<CallbackId, RegistryError> {
        let id = CallbackId(self.callbacks.len() as u8);
        self.callbacks
            .push(Callback {
                name,
                handler: Box::new(handler),
                condition,
            })
            .map_err(|_| RegistryError::CapacityExceeded(Table::Callbacks))?;
        debug!("dispatch: callback '{name}' registered as {}", id.0);
        Ok(id)
    }

    /// Bind `address` to a registered callback. Duplicate addresses are
    /// accepted; the dispatch policy decides how they fire.
    pub fn assign(
        &mut self,
        address: Address,
        callback: CallbackId,
    ) -> Result<AssignmentId, RegistryError> {
        if usize::from(callback.0) >= self.callbacks.len() {
            return Err(RegistryError::UnknownId);
        }
        let id = AssignmentId(self.assignments.len() as u8);
        self.assignments
            .push(Assignment { address, callback })
            .map_err(|_| RegistryError::CapacityExceeded(Table::Assignments))?;
        Ok(id)
    }

    /// Remove an assignment, shifting later entries down by one.
    pub fn unassign(&mut self, id: AssignmentId) -> Result<Assignment, RegistryError> {
        let index = usize::from(id.0);
        if index >= self.assignments.len() {
            return Err(RegistryError::UnknownId);
        }
        Ok(self.assignments.remove(index))
    }

    /// Replace the whole assignment list (persistence restore).
    ///
    /// Entries naming callbacks that are not registered are kept; dispatch
    /// skips them.
    pub fn replace_assignments(&mut self, assignments: AssignmentList) {
        self.assignments = assignments;
    }

    /// Invoke the handlers assigned to `msg.destination`. Returns how many
    /// ran.
    pub fn dispatch(&mut self, msg: &Message, policy: DispatchPolicy) -> usize {
        let mut invoked = 0;
        for assignment in &self.assignments {
            if assignment.address != msg.destination {
                continue;
            }
            let Some(cb) = self.callbacks.get_mut(usize::from(assignment.callback.0)) else {
                debug!("dispatch: assignment to unregistered callback {}", assignment.callback.0);
                continue;
            };

            if is_enabled(cb.condition.as_ref()) {
                debug!(
                    "dispatch: {} -> '{}'",
                    msg.destination.group_fields(),
                    cb.name
                );
                (cb.handler)(msg);
                invoked += 1;
                if policy != DispatchPolicy::FanOut {
                    break;
                }
            } else {
                debug!("dispatch: '{}' disabled", cb.name);
                if policy == DispatchPolicy::FirstMatch {
                    break;
                }
            }
        }
        invoked
    }

    pub fn callbacks(&self) -> impl Iterator<Item = CallbackView> + '_ {
        self.callbacks.iter().enumerate().map(|(i, cb)| CallbackView {
            id: CallbackId(i as u8),
            name: cb.name,
            enabled: is_enabled(cb.condition.as_ref()),
        })
    }

    pub fn callback_name(&self, id: CallbackId) -> Option<&'static str> {
        self.callbacks.get(usize::from(id.0)).map(|cb| cb.name)
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }
}
