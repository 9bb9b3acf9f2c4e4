//! Typed registries exposed to the admin surface.
//!
//! - [`config`]: named, typed configuration slots backed by one fixed blob.
//! - [`feedback`]: read-only windows onto live values, plus actions.
//!
//! Callbacks, config slots and feedback bindings can each carry an
//! [`EnableCondition`]. A disabled entry keeps its id and storage; it is
//! only hidden from rendering and (for callbacks) skipped by dispatch.

pub mod config;
pub mod feedback;

pub use config::{ConfigId, ConfigKind, ConfigRegistry, ConfigValue, OptionEntry, SlotView};
pub use feedback::{FeedbackId, FeedbackKind, FeedbackRegistry, FeedbackView};

/// Visibility predicate. `None` means always enabled.
pub type EnableCondition = Box<dyn Fn() -> bool>;

/// Evaluate an optional predicate.
#[inline]
pub fn is_enabled(condition: Option<&EnableCondition>) -> bool {
    condition.is_none_or(|cond| cond())
}
