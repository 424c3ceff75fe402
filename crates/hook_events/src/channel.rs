//! Typed notification channels and the handler bindings they hold
//!
//! A [`Channel`] is the unit collaborators subscribe to. It owns an ordered
//! list of [`Binding`]s, each pairing a [`Handler`] with the [`Origin`] of the
//! subscription. The list is stored as an immutable snapshot behind an
//! [`ArcSwap`], so [`Channel::publish`] reads it without taking a lock and
//! subscribe/unsubscribe swap in a new snapshot.
//!
//! Handler identity is reference identity: two [`Handler`] values are the same
//! handler when they were cloned from the same [`Handler::new`] call. That is
//! what [`Channel::unsubscribe`] compares against.

use crate::diagnostics::Diagnostics;
use crate::dispatch;
use crate::error::{BindError, EventError};
use crate::event::Event;
use arc_swap::ArcSwap;
use compact_str::CompactString;
use smallvec::SmallVec;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

type HandlerFn<T> = dyn Fn(&mut T) -> Result<(), EventError> + Send + Sync;

/// Identity of a handler callable, stable across clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerKey(usize);

/// A named callable bound to one payload type.
pub struct Handler<T: Event> {
    name: CompactString,
    func: Arc<HandlerFn<T>>,
}

impl<T: Event> Handler<T> {
    /// Wraps a closure as a handler. Every call creates a new identity.
    ///
    /// # Arguments
    ///
    /// * `name` - Shown in diagnostics when the handler fails
    /// * `handler` - Receives the payload by `&mut`; may mutate it or veto
    ///
    /// # Example
    ///
    /// ```rust
    /// use hook_events::Handler;
    /// use hook_events::events::ItemDroppedEventArgs;
    ///
    /// let on_drop = Handler::new("on_drop", |ev: &mut ItemDroppedEventArgs| {
    ///     println!("{:?} hit the floor", ev.pickup);
    ///     Ok(())
    /// });
    /// assert!(on_drop.same_as(&on_drop.clone()));
    /// ```
    pub fn new<F>(name: impl Into<CompactString>, handler: F) -> Self
    where
        F: Fn(&mut T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(handler),
        }
    }

    /// Handler name for diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity used for subscribe/unsubscribe matching.
    ///
    /// Clones share the key; two separate [`Handler::new`] calls never do,
    /// even with identical names and closures.
    pub fn key(&self) -> HandlerKey {
        HandlerKey(Arc::as_ptr(&self.func) as *const () as usize)
    }

    /// True when both values refer to the same underlying callable
    pub fn same_as(&self, other: &Self) -> bool {
        self.key() == other.key()
    }

    pub(crate) fn call(&self, payload: &mut T) -> Result<(), EventError> {
        (self.func)(payload)
    }
}

impl Handler<()> {
    /// Handler for a zero-payload channel
    pub fn empty<F>(name: impl Into<CompactString>, handler: F) -> Self
    where
        F: Fn() -> Result<(), EventError> + Send + Sync + 'static,
    {
        Self::new(name, move |_: &mut ()| handler())
    }
}

impl<T: Event> Clone for Handler<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<T: Event> fmt::Debug for Handler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("payload", &T::event_name())
            .finish()
    }
}

/// A handler with its payload type erased, as declared by plugins for
/// auto-subscription. Binding it to a channel checks the type again.
#[derive(Clone)]
pub struct ErasedHandler {
    name: CompactString,
    payload: TypeId,
    payload_name: &'static str,
    key: HandlerKey,
    inner: Arc<dyn Any + Send + Sync>,
}

impl ErasedHandler {
    /// Erases `handler`, remembering its payload type and identity
    pub fn new<T: Event>(handler: Handler<T>) -> Self {
        Self {
            name: handler.name.clone(),
            payload: TypeId::of::<T>(),
            payload_name: T::event_name(),
            key: handler.key(),
            inner: Arc::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> HandlerKey {
        self.key
    }

    /// The payload type the wrapped handler actually accepts
    pub fn payload_type(&self) -> TypeId {
        self.payload
    }

    pub fn payload_name(&self) -> &'static str {
        self.payload_name
    }

    /// Recovers the typed handler, or `None` when it accepts a different payload
    pub fn downcast<T: Event>(&self) -> Option<Handler<T>> {
        self.inner.downcast_ref::<Handler<T>>().cloned()
    }
}

impl<T: Event> From<Handler<T>> for ErasedHandler {
    fn from(handler: Handler<T>) -> Self {
        Self::new(handler)
    }
}

impl fmt::Debug for ErasedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedHandler")
            .field("name", &self.name)
            .field("payload", &self.payload_name)
            .finish()
    }
}

/// How a binding came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Explicit `subscribe` call
    Manual,
    /// Created by the auto-subscription resolver
    Auto,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Manual => write!(f, "manual"),
            Origin::Auto => write!(f, "auto"),
        }
    }
}

/// A handler bound to a channel
pub struct Binding<T: Event> {
    handler: Handler<T>,
    origin: Origin,
}

impl<T: Event> Binding<T> {
    /// The bound handler
    pub fn handler(&self) -> &Handler<T> {
        &self.handler
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }
}

impl<T: Event> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            origin: self.origin,
        }
    }
}

type BindingList<T> = SmallVec<[Binding<T>; 4]>;

/// Counters for a single channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Publishes that reached at least one handler
    pub published: u64,
    /// Handler invocations that returned an error or panicked
    pub handler_failures: u64,
    /// Currently bound handlers, both origins
    pub handlers: usize,
}

/// A named, typed notification channel.
pub struct Channel<T: Event> {
    name: CompactString,
    bindings: ArcSwap<BindingList<T>>,
    diagnostics: Arc<dyn Diagnostics>,
    published: AtomicU64,
    handler_failures: AtomicU64,
}

impl<T: Event> Channel<T> {
    /// Creates an empty channel.
    ///
    /// # Arguments
    ///
    /// * `name` - Channel name used in logs, e.g. `ItemDropped`
    /// * `diagnostics` - Where handler failures on this channel are reported
    pub fn new(name: impl Into<CompactString>, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            name: name.into(),
            bindings: ArcSwap::from_pointee(BindingList::new()),
            diagnostics,
            published: AtomicU64::new(0),
            handler_failures: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Binds a handler as a manual subscription.
    ///
    /// Returns `false` when this handler is already manually bound here.
    pub fn subscribe(&self, handler: Handler<T>) -> bool {
        self.bind(handler, Origin::Manual)
    }

    /// Removes a manual subscription by handler identity.
    ///
    /// Auto-origin bindings of the same callable are left alone.
    pub fn unsubscribe(&self, handler: &Handler<T>) -> bool {
        self.unbind(handler.key(), Origin::Manual)
    }

    /// Invokes every bound handler in subscription order with the same payload.
    ///
    /// Handler failures are caught and reported, and never stop delivery to
    /// the handlers after them.
    pub fn publish(&self, payload: &mut T) {
        let bindings = self.bindings.load();
        if bindings.is_empty() {
            return;
        }

        self.published.fetch_add(1, Ordering::Relaxed);
        let failures = dispatch::dispatch(&self.name, &bindings, payload, self.diagnostics.as_ref());
        if failures > 0 {
            self.handler_failures.fetch_add(failures, Ordering::Relaxed);
        }
    }

    /// Number of handlers bound right now, both origins
    pub fn handler_count(&self) -> usize {
        self.bindings.load().len()
    }

    /// Handler names in invocation order, tagged with their origin
    pub fn handler_names(&self) -> Vec<(String, Origin)> {
        self.bindings
            .load()
            .iter()
            .map(|b| (b.handler.name().to_string(), b.origin))
            .collect()
    }

    /// Snapshot of this channel's counters.
    ///
    /// # Returns
    ///
    /// [`ChannelStats`] with the number of publishes that reached a handler,
    /// the number of failed handler calls, and the current binding count.
    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            published: self.published.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            handlers: self.handler_count(),
        }
    }

    pub(crate) fn bind(&self, handler: Handler<T>, origin: Origin) -> bool {
        let key = handler.key();
        let mut added = false;
        self.bindings.rcu(|current| {
            if current.iter().any(|b| b.origin == origin && b.handler.key() == key) {
                added = false;
                return Arc::clone(current);
            }
            added = true;
            let mut next: BindingList<T> = (**current).clone();
            next.push(Binding {
                handler: handler.clone(),
                origin,
            });
            Arc::new(next)
        });

        if added {
            debug!("📝 Bound {} handler '{}' to {}", origin, handler.name(), self.name);
        } else {
            debug!("Handler '{}' already bound to {} ({})", handler.name(), self.name, origin);
        }
        added
    }

    pub(crate) fn unbind(&self, key: HandlerKey, origin: Origin) -> bool {
        let mut removed = false;
        self.bindings.rcu(|current| {
            match current
                .iter()
                .position(|b| b.origin == origin && b.handler.key() == key)
            {
                Some(index) => {
                    removed = true;
                    let mut next: BindingList<T> = (**current).clone();
                    next.remove(index);
                    Arc::new(next)
                }
                None => {
                    removed = false;
                    Arc::clone(current)
                }
            }
        });
        removed
    }
}

impl Channel<()> {
    /// Publishes on a zero-payload channel
    pub fn invoke(&self) {
        self.publish(&mut ());
    }
}

impl<T: Event> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("payload", &T::event_name())
            .field("handlers", &self.handler_count())
            .finish()
    }
}

/// Object-safe view of a channel, used where the payload type is only known
/// at runtime (registry, auto-subscription).
pub trait AnyChannel: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn payload_type(&self) -> TypeId;

    fn payload_name(&self) -> &'static str;

    /// Binds an erased handler, checking that it accepts this channel's payload.
    ///
    /// `Ok(false)` means the handler was already bound with that origin.
    fn bind_erased(&self, handler: &ErasedHandler, origin: Origin) -> Result<bool, BindError>;

    fn unbind_erased(&self, handler: &ErasedHandler, origin: Origin) -> bool;

    fn is_bound(&self, key: HandlerKey, origin: Origin) -> bool;

    /// Number of bindings with the given origin
    fn count_origin(&self, origin: Origin) -> usize;

    fn stats(&self) -> ChannelStats;
}

impl<T: Event> AnyChannel for Channel<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn payload_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn payload_name(&self) -> &'static str {
        T::event_name()
    }

    fn bind_erased(&self, handler: &ErasedHandler, origin: Origin) -> Result<bool, BindError> {
        let typed = handler
            .downcast::<T>()
            .ok_or_else(|| BindError::IncompatiblePayload {
                handler: CompactString::new(handler.name()),
                channel: self.name.clone(),
                expected: T::event_name(),
                found: handler.payload_name(),
            })?;
        Ok(self.bind(typed, origin))
    }

    fn unbind_erased(&self, handler: &ErasedHandler, origin: Origin) -> bool {
        self.unbind(handler.key(), origin)
    }

    fn is_bound(&self, key: HandlerKey, origin: Origin) -> bool {
        self.bindings
            .load()
            .iter()
            .any(|b| b.origin == origin && b.handler.key() == key)
    }

    fn count_origin(&self, origin: Origin) -> usize {
        self.bindings.load().iter().filter(|b| b.origin == origin).count()
    }

    fn stats(&self) -> ChannelStats {
        Channel::stats(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingDiagnostics;
    use serde::Serialize;
    use std::sync::Mutex;

    #[derive(Debug, Serialize)]
    struct Ping {
        hops: u32,
        is_allowed: bool,
    }

    crate::event_payload!(Ping, "ping", cancellable);

    #[derive(Debug, Serialize)]
    struct Pong;

    crate::event_payload!(Pong, "pong");

    fn channel() -> (Channel<Ping>, Arc<RecordingDiagnostics>) {
        let diagnostics = Arc::new(RecordingDiagnostics::new());
        (Channel::new("Ping", diagnostics.clone()), diagnostics)
    }

    #[test]
    fn publish_without_handlers_leaves_payload_untouched() {
        let (channel, diagnostics) = channel();
        let mut payload = Ping { hops: 3, is_allowed: true };

        channel.publish(&mut payload);

        assert_eq!(payload.hops, 3);
        assert!(payload.is_allowed);
        assert_eq!(channel.stats(), ChannelStats::default());
        assert!(diagnostics.entries().is_empty());
    }

    #[test]
    fn handlers_run_in_subscription_order_on_the_same_payload() {
        let (channel, _) = channel();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let seen = seen.clone();
            channel.subscribe(Handler::new(name, move |ping: &mut Ping| {
                ping.hops += 1;
                seen.lock().unwrap().push((name, ping.hops));
                Ok(())
            }));
        }

        let mut payload = Ping { hops: 0, is_allowed: true };
        channel.publish(&mut payload);

        assert_eq!(payload.hops, 3);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("first", 1), ("second", 2), ("third", 3)]
        );
    }

    #[test]
    fn subscribing_the_same_handler_twice_binds_once() {
        let (channel, _) = channel();
        let handler = Handler::new("once", |_: &mut Ping| Ok(()));

        assert!(channel.subscribe(handler.clone()));
        assert!(!channel.subscribe(handler.clone()));
        assert_eq!(channel.handler_count(), 1);
    }

    #[test]
    fn unsubscribe_matches_by_identity_not_by_name() {
        let (channel, _) = channel();
        let kept = Handler::new("same-name", |_: &mut Ping| Ok(()));
        let removed = Handler::new("same-name", |_: &mut Ping| Ok(()));
        channel.subscribe(kept.clone());
        channel.subscribe(removed.clone());

        assert!(channel.unsubscribe(&removed));
        assert!(!channel.unsubscribe(&removed));
        assert_eq!(channel.handler_count(), 1);
        assert!(channel.is_bound(kept.key(), Origin::Manual));
    }

    #[test]
    fn manual_and_auto_bindings_of_one_callable_are_tracked_separately() {
        let (channel, _) = channel();
        let handler = Handler::new("dual", |_: &mut Ping| Ok(()));
        let erased = ErasedHandler::new(handler.clone());

        assert!(channel.subscribe(handler.clone()));
        assert_eq!(channel.bind_erased(&erased, Origin::Auto), Ok(true));
        assert_eq!(channel.bind_erased(&erased, Origin::Auto), Ok(false));
        assert_eq!(channel.count_origin(Origin::Manual), 1);
        assert_eq!(channel.count_origin(Origin::Auto), 1);

        assert!(channel.unbind_erased(&erased, Origin::Auto));
        assert_eq!(channel.count_origin(Origin::Manual), 1);
        assert_eq!(channel.count_origin(Origin::Auto), 0);
    }

    #[test]
    fn binding_a_handler_for_another_payload_is_rejected() {
        let (channel, _) = channel();
        let erased = ErasedHandler::new(Handler::new("pong", |_: &mut Pong| Ok(())));

        let err = channel.bind_erased(&erased, Origin::Auto).unwrap_err();
        assert_eq!(
            err,
            BindError::IncompatiblePayload {
                handler: CompactString::new("pong"),
                channel: CompactString::new("Ping"),
                expected: "ping",
                found: "pong",
            }
        );
        assert_eq!(channel.handler_count(), 0);
    }

    #[test]
    fn subscribing_from_inside_a_handler_takes_effect_on_the_next_publish() {
        let diagnostics: Arc<dyn Diagnostics> = Arc::new(RecordingDiagnostics::new());
        let channel = Arc::new(Channel::<Ping>::new("Ping", diagnostics));
        let late = Handler::new("late", |ping: &mut Ping| {
            ping.hops += 100;
            Ok(())
        });

        let inner = channel.clone();
        let late_clone = late.clone();
        channel.subscribe(Handler::new("adder", move |_: &mut Ping| {
            inner.subscribe(late_clone.clone());
            Ok(())
        }));

        let mut first = Ping { hops: 0, is_allowed: true };
        channel.publish(&mut first);
        assert_eq!(first.hops, 0);

        let mut second = Ping { hops: 0, is_allowed: true };
        channel.publish(&mut second);
        assert_eq!(second.hops, 100);
    }

    #[test]
    fn zero_payload_channels_invoke_their_handlers() {
        let diagnostics: Arc<dyn Diagnostics> = Arc::new(RecordingDiagnostics::new());
        let channel = Channel::<()>::new("WaitingForPlayers", diagnostics);
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();
        channel.subscribe(Handler::empty("count", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        channel.invoke();
        channel.invoke();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(channel.stats().published, 2);
    }
}
