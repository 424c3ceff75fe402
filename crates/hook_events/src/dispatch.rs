//! Safe handler invocation
//!
//! Every channel publishes through [`dispatch`]. Each handler call is wrapped
//! so a returned error or a panic is caught right there, reported to the
//! diagnostics capability with the channel and handler identity, and then
//! delivery continues with the next handler.
//!
//! Veto handling is fail-open: when a failing handler had flipped the
//! payload's "is-allowed" flag before failing, the flag is put back to the
//! value it had before that handler ran.

use crate::channel::{Binding, Handler};
use crate::diagnostics::Diagnostics;
use crate::error::HandlerFailure;
use crate::event::Event;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Calls one handler, converting a returned error or a panic into a [`HandlerFailure`].
pub fn invoke_safely<T: Event>(handler: &Handler<T>, payload: &mut T) -> Result<(), HandlerFailure> {
    match catch_unwind(AssertUnwindSafe(|| handler.call(payload))) {
        Ok(result) => result.map_err(HandlerFailure::from),
        Err(panic_info) => Err(HandlerFailure::from_panic(panic_info)),
    }
}

/// Runs every binding in order against the same payload. Returns the number of failures.
pub(crate) fn dispatch<T: Event>(
    channel: &str,
    bindings: &[Binding<T>],
    payload: &mut T,
    diagnostics: &dyn Diagnostics,
) -> u64 {
    let mut failures = 0;

    for binding in bindings {
        let allowed_before = payload.is_allowed();

        if let Err(failure) = invoke_safely(binding.handler(), payload) {
            failures += 1;
            diagnostics.error(&format!(
                "Handler '{}' ({}) failed on channel '{}': {} | payload: {}",
                binding.handler().name(),
                binding.origin(),
                channel,
                failure,
                snapshot(payload),
            ));

            if let Some(before) = allowed_before {
                if payload.is_allowed() != Some(before) {
                    payload.set_allowed(before);
                    diagnostics.warn(&format!(
                        "Discarded veto from failing handler '{}' on channel '{}', is_allowed restored to {}",
                        binding.handler().name(),
                        channel,
                        before,
                    ));
                }
            }
        }
    }

    failures
}

fn snapshot<T: Event>(payload: &T) -> String {
    serde_json::to_string(payload).unwrap_or_else(|e| format!("<unserializable {}: {}>", T::event_name(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::diagnostics::RecordingDiagnostics;
    use crate::error::EventError;
    use serde::Serialize;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Serialize)]
    struct Opening {
        door: u32,
        is_allowed: bool,
    }

    crate::event_payload!(Opening, "opening", cancellable);

    fn recording_channel() -> (Channel<Opening>, Arc<RecordingDiagnostics>) {
        let diagnostics = Arc::new(RecordingDiagnostics::new());
        (Channel::new("Opening", diagnostics.clone()), diagnostics)
    }

    #[test]
    fn invoke_safely_catches_panics() {
        let handler = Handler::new("boom", |_: &mut Opening| -> Result<(), EventError> {
            panic!("door jammed")
        });
        let mut payload = Opening { door: 1, is_allowed: true };

        match invoke_safely(&handler, &mut payload) {
            Err(HandlerFailure::Panicked(message)) => assert_eq!(message, "door jammed"),
            other => panic!("expected a caught panic, got {other:?}"),
        }
    }

    #[test_log::test]
    fn later_handlers_still_run_after_a_failure() {
        let (channel, diagnostics) = recording_channel();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let log = calls.clone();
        channel.subscribe(Handler::new("h1", move |_: &mut Opening| {
            log.lock().unwrap().push("h1");
            Ok(())
        }));
        let log = calls.clone();
        channel.subscribe(Handler::new("h2", move |_: &mut Opening| {
            log.lock().unwrap().push("h2");
            Err(EventError::HandlerExecution("no access".into()))
        }));
        let log = calls.clone();
        channel.subscribe(Handler::new("h3", move |_: &mut Opening| -> Result<(), EventError> {
            log.lock().unwrap().push("h3");
            panic!("h3 exploded")
        }));
        let log = calls.clone();
        channel.subscribe(Handler::new("h4", move |_: &mut Opening| {
            log.lock().unwrap().push("h4");
            Ok(())
        }));

        let mut payload = Opening { door: 7, is_allowed: true };
        channel.publish(&mut payload);

        assert_eq!(*calls.lock().unwrap(), vec!["h1", "h2", "h3", "h4"]);
        let errors = diagnostics.errors();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("'h2'") && errors[0].contains("'Opening'"));
        assert!(errors[1].contains("h3 exploded"));
        assert_eq!(channel.stats().handler_failures, 2);
    }

    #[test]
    fn failing_handler_cannot_veto() {
        let (channel, diagnostics) = recording_channel();
        channel.subscribe(Handler::new("deny-then-fail", |o: &mut Opening| {
            o.is_allowed = false;
            Err(EventError::HandlerExecution("gave up".into()))
        }));

        let mut payload = Opening { door: 2, is_allowed: true };
        channel.publish(&mut payload);

        assert!(payload.is_allowed);
        assert_eq!(diagnostics.warnings().len(), 1);
    }

    #[test]
    fn veto_from_a_successful_handler_survives_a_later_failure() {
        let (channel, _) = recording_channel();
        channel.subscribe(Handler::new("deny", |o: &mut Opening| {
            o.is_allowed = false;
            Ok(())
        }));
        channel.subscribe(Handler::new("crash", |o: &mut Opening| -> Result<(), EventError> {
            o.is_allowed = true;
            panic!("crashed after re-allowing")
        }));

        let mut payload = Opening { door: 3, is_allowed: true };
        channel.publish(&mut payload);

        assert!(!payload.is_allowed);
    }

    #[test]
    fn non_veto_mutations_of_a_failing_handler_are_kept() {
        let (channel, _) = recording_channel();
        channel.subscribe(Handler::new("renumber", |o: &mut Opening| {
            o.door = 99;
            Err(EventError::InvalidPayload("door out of range".into()))
        }));

        let mut payload = Opening { door: 4, is_allowed: true };
        channel.publish(&mut payload);

        assert_eq!(payload.door, 99);
    }
}
