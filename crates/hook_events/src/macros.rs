//! Declaration helpers for payload types

/// Implements [`Event`](crate::Event) for a payload struct.
///
/// Append `cancellable` when the struct has an `is_allowed: bool` field that
/// handlers flip to veto the underlying host operation.
///
/// ```rust
/// use hook_events::event_payload;
/// use serde::Serialize;
///
/// #[derive(Debug, Serialize)]
/// pub struct OpeningDoorEventArgs {
///     pub door: u32,
///     pub is_allowed: bool,
/// }
///
/// event_payload!(OpeningDoorEventArgs, "opening_door", cancellable);
/// ```
#[macro_export]
macro_rules! event_payload {
    ($payload:ty, $name:literal) => {
        impl $crate::Event for $payload {
            fn event_name() -> &'static str {
                $name
            }
        }
    };
    ($payload:ty, $name:literal, cancellable) => {
        impl $crate::Event for $payload {
            fn event_name() -> &'static str {
                $name
            }

            fn is_allowed(&self) -> Option<bool> {
                Some(self.is_allowed)
            }

            fn set_allowed(&mut self, allowed: bool) {
                self.is_allowed = allowed;
            }
        }
    };
}
