//! Feedback bindings: live values and actions shown on the admin page.
//!
//! The registry never owns a value. Each binding holds a closure that reads
//! (or, for actions, acts on) state owned elsewhere in the firmware.

use core::fmt::Write as _;

use serde::Serialize;

use crate::config::MAX_FEEDBACKS;
use crate::error::{RegistryError, Table};

use super::{EnableCondition, is_enabled};

/// Float precision is clamped so any `f32` fits the display buffer.
const MAX_FLOAT_PRECISION: u8 = 6;
const DISPLAY_LEN: usize = 48;

/// Index of a feedback binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FeedbackId(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Int,
    Float,
    Bool,
    Action,
}

enum Source {
    Int(Box<dyn Fn() -> i32>),
    Float { read: Box<dyn Fn() -> f32>, precision: u8 },
    Bool(Box<dyn Fn() -> bool>),
    Action(Box<dyn FnMut()>),
}

struct Binding {
    name: &'static str,
    source: Source,
    condition: Option<EnableCondition>,
}

/// One rendered binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackView {
    pub id: FeedbackId,
    pub name: &'static str,
    pub kind: FeedbackKind,
    /// Formatted current value; empty for actions.
    pub display: heapless::String<DISPLAY_LEN>,
}

pub struct FeedbackRegistry {
    bindings: heapless::Vec<Binding, MAX_FEEDBACKS>,
}

impl Default for FeedbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedbackRegistry {
    pub const fn new() -> Self {
        Self {
            bindings: heapless::Vec::new(),
        }
    }

    pub fn register_int(
        &mut self,
        name: &'static str,
        read: impl Fn() -> i32 + 'static,
        condition: Option<EnableCondition>,
    ) -> Result<FeedbackId, RegistryError> {
        self.push(name, Source::Int(Box::new(read)), condition)
    }

    /// `precision` is the number of decimals shown, at most 6.
    pub fn register_float(
        &mut self,
        name: &'static str,
        read: impl Fn() -> f32 + 'static,
        precision: u8,
        condition: Option<EnableCondition>,
    ) -> Result<FeedbackId, RegistryError> {
        let source = Source::Float {
            read: Box::new(read),
            precision: precision.min(MAX_FLOAT_PRECISION),
        };
        self.push(name, source, condition)
    }

    pub fn register_bool(
        &mut self,
        name: &'static str,
        read: impl Fn() -> bool + 'static,
        condition: Option<EnableCondition>,
    ) -> Result<FeedbackId, RegistryError> {
        self.push(name, Source::Bool(Box::new(read)), condition)
    }

    pub fn register_action(
        &mut self,
        name: &'static str,
        action: impl FnMut() + 'static,
        condition: Option<EnableCondition>,
    ) -> Result<FeedbackId, RegistryError> {
        self.push(name, Source::Action(Box::new(action)), condition)
    }

    fn push(
        &mut self,
        name: &'static str,
        source: Source,
        condition: Option<EnableCondition>,
    ) -> Result<FeedbackId, RegistryError> {
        let id = FeedbackId(self.bindings.len() as u8);
        self.bindings
            .push(Binding {
                name,
                source,
                condition,
            })
            .map_err(|_| RegistryError::CapacityExceeded(Table::Feedbacks))?;
        Ok(id)
    }

    /// Current values of all enabled bindings, in registration order.
    pub fn render(&self) -> heapless::Vec<FeedbackView, MAX_FEEDBACKS> {
        let mut out = heapless::Vec::new();
        for (i, binding) in self.bindings.iter().enumerate() {
            if !is_enabled(binding.condition.as_ref()) {
                continue;
            }
            let mut display = heapless::String::new();
            // Every formatted value fits DISPLAY_LEN.
            let kind = match &binding.source {
                Source::Int(read) => {
                    let _ = write!(display, "{}", read());
                    FeedbackKind::Int
                }
                Source::Float { read, precision } => {
                    let _ = write!(display, "{:.*}", usize::from(*precision), read());
                    FeedbackKind::Float
                }
                Source::Bool(read) => {
                    let _ = display.push_str(if read() { "True" } else { "False" });
                    FeedbackKind::Bool
                }
                Source::Action(_) => FeedbackKind::Action,
            };
            // `out` has the same capacity as `bindings`.
            let _ = out.push(FeedbackView {
                id: FeedbackId(i as u8),
                name: binding.name,
                kind,
                display,
            });
        }
        out
    }

    /// [`render`](Self::render) as a JSON array.
    pub fn render_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self.render().as_slice())
    }

    /// Run an action binding.
    pub fn invoke(&mut self, id: FeedbackId) -> Result<(), RegistryError> {
        let binding = self
            .bindings
            .get_mut(usize::from(id.0))
            .ok_or(RegistryError::UnknownId)?;
        match &mut binding.source {
            Source::Action(action) => {
                log::info!("feedback: action '{}'", binding.name);
                action();
                Ok(())
            }
            _ => Err(RegistryError::NotAnAction),
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
