//! The payload contract shared by every channel

use serde::Serialize;
use std::fmt::Debug;

/// Trait implemented by every payload a channel can carry.
///
/// A payload is constructed by an interception point right before dispatch,
/// handed by `&mut` to each handler in turn, and read back once afterwards.
/// Cancellable payloads expose their "is-allowed" flag through
/// [`Event::is_allowed`] / [`Event::set_allowed`] so the dispatcher can keep
/// veto handling fail-open when a handler crashes.
///
/// Implement it with [`event_payload!`](crate::event_payload) rather than by hand.
pub trait Event: Serialize + Send + Sync + Debug + 'static {
    /// Stable name used in logs and diagnostics
    fn event_name() -> &'static str;

    /// Current value of the veto flag, `None` for payloads that cannot be cancelled
    fn is_allowed(&self) -> Option<bool> {
        None
    }

    /// Overwrites the veto flag. No-op for payloads that cannot be cancelled.
    fn set_allowed(&mut self, _allowed: bool) {}
}

/// The empty payload carried by zero-argument channels
impl Event for () {
    fn event_name() -> &'static str {
        "empty"
    }
}
