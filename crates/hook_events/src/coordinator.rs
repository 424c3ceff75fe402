//! The lifecycle coordinator
//!
//! [`EventsCore`] is built once by the host and owned by it. Enabling runs
//!
//! 1. install patches
//! 2. discover channels (first enable only)
//! 3. resolve auto-subscriptions of every other plugin
//! 4. subscribe the internal round handlers
//!
//! and disabling runs the inverse. Both are no-ops when already in the
//! requested state, so a host may reload plugins without restarting.

use crate::config::EventsConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{LifecycleError, PatchError};
use crate::handlers::Handlers;
use crate::intercept::{CommandAuditLog, Interceptors};
use crate::patch::{PatchManager, PatchProvider, PatchState, PatchTarget};
use crate::plugin::{AutoSubscribers, PluginDirectory, PluginPriority, PluginRecord};
use crate::registry::ChannelRegistry;
use crate::resolver::{AutoSubscriptions, ResolveReport};
use crate::round::{HostServices, RoundHandlers};
use std::sync::Arc;
use tracing::{debug, info};

/// Owns every piece of the event layer and sequences enable/disable
pub struct EventsCore {
    config: EventsConfig,
    handlers: Arc<Handlers>,
    interceptors: Arc<Interceptors>,
    registry: ChannelRegistry,
    subscriptions: AutoSubscriptions,
    patches: PatchManager,
    round: RoundHandlers,
    host: Arc<dyn HostServices>,
    no_subscribers: AutoSubscribers,
    enabled: bool,
}

impl EventsCore {
    /// Plugin name the core registers under; skipped during auto-subscription
    pub const NAME: &'static str = "hook_events";

    /// Builds the layer in its disabled state.
    ///
    /// # Arguments
    ///
    /// * `config` - Enable switch, exclusion list and audit log path
    /// * `provider` - Installs and removes the interception points
    /// * `host` - Host operations the internal round handlers call back into
    /// * `diagnostics` - Sink for handler failures and resolver warnings
    pub fn new(
        config: EventsConfig,
        provider: Arc<dyn PatchProvider>,
        host: Arc<dyn HostServices>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        let handlers = Arc::new(Handlers::new(diagnostics.clone()));
        let audit = CommandAuditLog::new(config.command_log_path.clone());
        let interceptors = Arc::new(Interceptors::new(handlers.clone(), audit, diagnostics.clone()));
        let patches = PatchManager::new(provider, config.exclusion_list()).with_verbose(config.debug);

        Self {
            handlers,
            interceptors,
            registry: ChannelRegistry::new(),
            subscriptions: AutoSubscriptions::new(diagnostics),
            patches,
            round: RoundHandlers::new(host.clone()),
            host,
            no_subscribers: AutoSubscribers::new(),
            enabled: false,
            config,
        }
    }

    /// Brings the layer up. Aborts at the first patch failure, leaving nothing bound.
    ///
    /// # Arguments
    ///
    /// * `directory` - Plugins whose declared handlers get auto-subscribed
    ///
    /// # Returns
    ///
    /// `Ok(())` when the layer is up, already up, or disabled by
    /// configuration. [`LifecycleError::Install`] when the provider refused.
    pub fn on_enable(&mut self, directory: &dyn PluginDirectory) -> Result<(), LifecycleError> {
        if self.enabled {
            debug!("Event layer already enabled");
            return Ok(());
        }
        if !self.config.is_enabled {
            info!("⏸️ Event layer disabled by configuration");
            return Ok(());
        }

        let id = self.patches.install_all().map_err(LifecycleError::Install)?;

        self.registry.discover(&self.handlers.sources());

        let plugins = directory.plugins();
        let report = self.subscriptions.resolve_all(&self.registry, &plugins, Self::NAME);

        self.round.subscribe(&self.handlers);
        self.host.reload_server_name();

        self.enabled = true;
        info!(
            "✅ Event layer enabled under '{}' ({} channels, {} auto-subscriptions)",
            id,
            self.registry.len(),
            report.bound
        );
        Ok(())
    }

    /// Tears the layer down in reverse order.
    ///
    /// When removing patches fails the layer stays enabled, so calling this
    /// again retries the removal.
    pub fn on_disable(&mut self) -> Result<(), LifecycleError> {
        if !self.enabled {
            debug!("Event layer already disabled");
            return Ok(());
        }

        self.round.unsubscribe(&self.handlers);
        let removed = self.subscriptions.unresolve_all();
        self.patches.uninstall_all().map_err(LifecycleError::Uninstall)?;

        self.enabled = false;
        info!("🛑 Event layer disabled ({} auto-subscriptions removed)", removed);
        Ok(())
    }

    /// Stops installing `target` and removes it now if it is live.
    ///
    /// The point stays out until this core is dropped.
    pub fn disable_patch(&mut self, target: PatchTarget) -> Result<usize, PatchError> {
        self.patches.exclude(target);
        self.patches.reapply_exclusions()
    }

    /// Removes every live point on the exclusion list
    pub fn reload_disabled_patches(&mut self) -> Result<usize, PatchError> {
        self.patches.reapply_exclusions()
    }

    /// Re-runs auto-subscription, e.g. after the host loaded another plugin
    pub fn resolve(&mut self, directory: &dyn PluginDirectory) -> ResolveReport {
        self.subscriptions
            .resolve_all(&self.registry, &directory.plugins(), Self::NAME)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn handlers(&self) -> &Arc<Handlers> {
        &self.handlers
    }

    pub fn interceptors(&self) -> &Arc<Interceptors> {
        &self.interceptors
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn subscriptions(&self) -> &AutoSubscriptions {
        &self.subscriptions
    }

    pub fn patch_state(&self) -> &PatchState {
        self.patches.state()
    }

    pub fn patches(&self) -> &PatchManager {
        &self.patches
    }

    pub fn config(&self) -> &EventsConfig {
        &self.config
    }
}

impl PluginRecord for EventsCore {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> PluginPriority {
        PluginPriority::Last
    }

    fn auto_subscribers(&self) -> &AutoSubscribers {
        &self.no_subscribers
    }
}

impl std::fmt::Debug for EventsCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventsCore")
            .field("enabled", &self.enabled)
            .field("patches", &self.patches)
            .field("registry", &self.registry)
            .field("auto_subscriptions", &self.subscriptions.len())
            .finish()
    }
}
