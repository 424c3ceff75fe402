//! Plugin records as seen by the event layer
//!
//! Loading plugins is the host's job. The event layer only needs each
//! plugin's name, priority and its table of auto-subscribed handlers, read
//! once during resolution.

use crate::channel::{ErasedHandler, Handler};
use crate::event::Event;
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

/// Load priority of a plugin. Higher priorities are enabled and resolved first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PluginPriority {
    Last,
    Lower,
    Low,
    #[default]
    Medium,
    High,
    Higher,
    First,
}

/// Handlers a plugin wants bound automatically, keyed by payload type.
///
/// Order within one payload type is preserved and becomes binding order.
#[derive(Default, Clone)]
pub struct AutoSubscribers {
    entries: HashMap<TypeId, Vec<ErasedHandler>>,
}

impl AutoSubscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a handler for payload `T`
    pub fn on<T: Event>(mut self, handler: Handler<T>) -> Self {
        self.declare(TypeId::of::<T>(), ErasedHandler::new(handler));
        self
    }

    /// Declares an already erased handler under an explicit payload key.
    ///
    /// The key is trusted here and checked again when the handler is bound.
    pub fn declare(&mut self, payload: TypeId, handler: ErasedHandler) {
        self.entries.entry(payload).or_default().push(handler);
    }

    /// Candidate handlers for a payload type, in declaration order
    pub fn candidates(&self, payload: TypeId) -> &[ErasedHandler] {
        self.entries.get(&payload).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of declared handlers
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }
}

impl std::fmt::Debug for AutoSubscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoSubscribers")
            .field("payload_types", &self.entries.len())
            .field("handlers", &self.len())
            .finish()
    }
}

/// Read-only view of a loaded plugin
pub trait PluginRecord: Send + Sync {
    fn name(&self) -> &str;

    fn priority(&self) -> PluginPriority {
        PluginPriority::Medium
    }

    fn auto_subscribers(&self) -> &AutoSubscribers;
}

/// Ordered list of loaded plugins.
///
/// Implementations return plugins by descending [`PluginPriority`], ties kept
/// in load order. Auto-subscriptions are bound in exactly the order returned;
/// the event layer does not sort.
pub trait PluginDirectory {
    fn plugins(&self) -> Vec<Arc<dyn PluginRecord>>;
}

/// A fixed plugin list that honours the [`PluginDirectory`] ordering contract
#[derive(Default, Clone)]
pub struct StaticPluginDirectory {
    plugins: Vec<Arc<dyn PluginRecord>>,
}

impl StaticPluginDirectory {
    /// Takes plugins in load order and sorts them by priority
    pub fn new(mut plugins: Vec<Arc<dyn PluginRecord>>) -> Self {
        plugins.sort_by(|a, b| b.priority().cmp(&a.priority()));
        Self { plugins }
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl PluginDirectory for StaticPluginDirectory {
    fn plugins(&self) -> Vec<Arc<dyn PluginRecord>> {
        self.plugins.clone()
    }
}

/// Minimal [`PluginRecord`] for plugins that only need auto-subscriptions
#[derive(Debug, Clone)]
pub struct BasicPlugin {
    pub name: String,
    pub priority: PluginPriority,
    pub subscribers: AutoSubscribers,
}

impl BasicPlugin {
    pub fn new(name: &str, priority: PluginPriority, subscribers: AutoSubscribers) -> Self {
        Self {
            name: name.to_string(),
            priority,
            subscribers,
        }
    }
}

impl PluginRecord for BasicPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> PluginPriority {
        self.priority
    }

    fn auto_subscribers(&self) -> &AutoSubscribers {
        &self.subscribers
    }
}
