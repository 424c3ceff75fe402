//! Auto-subscription: binding plugin handlers to channels by payload type
//!
//! For every plugin (except the event layer itself) and every channel in the
//! [`ChannelRegistry`], the plugin's declared handlers for that channel's
//! payload type are bound with [`Origin::Auto`]. Every binding made is kept in
//! a reverse index keyed by handler identity so the whole set can be removed
//! later without touching manual subscriptions.

use crate::channel::{AnyChannel, ErasedHandler, HandlerKey, Origin};
use crate::diagnostics::Diagnostics;
use crate::plugin::PluginRecord;
use crate::registry::ChannelRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

struct AutoBinding {
    handler: ErasedHandler,
    channel: Arc<dyn AnyChannel>,
    plugin: String,
}

/// Result of one [`AutoSubscriptions::resolve_all`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// New bindings created by this pass
    pub bound: usize,
    /// Candidates that were already bound from an earlier pass
    pub already_bound: usize,
    /// Candidates rejected at bind time
    pub failed: usize,
}

/// Reverse index of every auto-origin binding currently in place
pub struct AutoSubscriptions {
    index: HashMap<HandlerKey, AutoBinding>,
    order: Vec<HandlerKey>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl AutoSubscriptions {
    /// Creates an empty index. Bind failures are reported to `diagnostics`.
    pub fn new(diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            index: HashMap::new(),
            order: Vec::new(),
            diagnostics,
        }
    }

    /// Binds every declared candidate of every plugin to its channel.
    ///
    /// Plugins are taken in the order given, which is the order handlers end
    /// up in on each channel. `skip` names the plugin doing the resolving,
    /// whose own handlers are subscribed manually instead. A candidate that
    /// fails to bind is reported as a warning and does not stop the rest.
    pub fn resolve_all(
        &mut self,
        registry: &ChannelRegistry,
        plugins: &[Arc<dyn PluginRecord>],
        skip: &str,
    ) -> ResolveReport {
        let mut report = ResolveReport::default();

        for plugin in plugins.iter().filter(|p| p.name() != skip) {
            let subscribers = plugin.auto_subscribers();
            if subscribers.is_empty() {
                continue;
            }

            for (payload, channel) in registry.iter() {
                for candidate in subscribers.candidates(payload) {
                    if self.index.contains_key(&candidate.key()) {
                        report.already_bound += 1;
                        continue;
                    }

                    match channel.bind_erased(candidate, Origin::Auto) {
                        Ok(true) => {
                            report.bound += 1;
                            self.record(candidate, channel, plugin.name());
                        }
                        // Bound by someone else; it stays theirs to remove
                        Ok(false) => report.already_bound += 1,
                        Err(e) => {
                            report.failed += 1;
                            self.diagnostics.warn(&format!(
                                "Unable to register event {} of plugin '{}' automatically. {}",
                                candidate.name(),
                                plugin.name(),
                                e
                            ));
                        }
                    }
                }
            }
        }

        info!(
            "🔗 Auto-subscribed {} handlers ({} already bound, {} failed)",
            report.bound, report.already_bound, report.failed
        );
        report
    }

    fn record(&mut self, handler: &ErasedHandler, channel: &Arc<dyn AnyChannel>, plugin: &str) {
        debug!(
            "Auto-subscribed '{}' from '{}' to {}",
            handler.name(),
            plugin,
            channel.name()
        );
        self.order.push(handler.key());
        self.index.insert(
            handler.key(),
            AutoBinding {
                handler: handler.clone(),
                channel: channel.clone(),
                plugin: plugin.to_string(),
            },
        );
    }

    /// Removes every auto-origin binding recorded so far and clears the index.
    ///
    /// Each binding is removed at most once. Manual bindings of the same
    /// callables are not touched. Returns the number of bindings removed.
    pub fn unresolve_all(&mut self) -> usize {
        let mut removed = 0;

        for key in self.order.drain(..) {
            let Some(binding) = self.index.remove(&key) else {
                continue;
            };
            if binding.channel.unbind_erased(&binding.handler, Origin::Auto) {
                removed += 1;
            } else {
                debug!(
                    "Auto-subscription '{}' from '{}' was already gone from {}",
                    binding.handler.name(),
                    binding.plugin,
                    binding.channel.name()
                );
            }
        }
        self.index.clear();

        info!("🔓 Removed {} auto-subscriptions", removed);
        removed
    }

    /// Number of auto-origin bindings currently tracked
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Whether a handler is tracked as auto-subscribed
    pub fn contains(&self, key: HandlerKey) -> bool {
        self.index.contains_key(&key)
    }

    /// Channel names grouped by the plugin whose handler is bound there, in binding order
    pub fn bindings(&self) -> Vec<(String, String, String)> {
        self.order
            .iter()
            .filter_map(|key| self.index.get(key))
            .map(|b| {
                (
                    b.plugin.clone(),
                    b.handler.name().to_string(),
                    b.channel.name().to_string(),
                )
            })
            .collect()
    }
}

impl std::fmt::Debug for AutoSubscriptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoSubscriptions")
            .field("bindings", &self.index.len())
            .finish()
    }
}
