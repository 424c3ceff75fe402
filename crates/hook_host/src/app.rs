//! Application lifecycle: owns the event layer, the hook table and the
//! bundled plugin, and drives simulated rounds until told to stop.

use crate::cli::CliArgs;
use crate::config::AppConfig;
use crate::logging::display_banner;
use crate::signals::wait_for_shutdown_signal;
use crate::simulation::{play_round, RoundOutcome, SimulatedHost};
use hook_events::{
    AnyChannel, EventsCore, HookTable, LifecycleError, PluginRecord, StaticPluginDirectory,
    TracingDiagnostics,
};
use plugin_round_logger::RoundLoggerPlugin;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// The running host.
pub struct Application {
    config: AppConfig,
    core: EventsCore,
    table: Arc<HookTable>,
    directory: StaticPluginDirectory,
    logger: Arc<RoundLoggerPlugin>,
    host: Arc<SimulatedHost>,
}

impl Application {
    /// Loads configuration, applies CLI overrides and validates the result.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }
        if let Some(rounds) = args.rounds {
            config.host.rounds = rounds;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        Ok(Self::from_config(config))
    }

    /// Builds the application around an already validated configuration
    pub fn from_config(config: AppConfig) -> Self {
        let table = Arc::new(HookTable::new());
        let host = Arc::new(SimulatedHost::new(&config.host.server_name));
        let core = EventsCore::new(
            config.events.clone(),
            table.clone(),
            host.clone(),
            Arc::new(TracingDiagnostics),
        );
        let logger = Arc::new(RoundLoggerPlugin::new(config.round_logger.clone()));
        let plugins: Vec<Arc<dyn PluginRecord>> = vec![logger.clone()];

        Self {
            config,
            core,
            table,
            directory: StaticPluginDirectory::new(plugins),
            logger,
            host,
        }
    }

    /// Enables the event layer and plays rounds until the configured count is
    /// reached or a shutdown signal arrives.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.log_configuration_summary();
        self.enable()?;

        info!("✅ Hook host is now running!");
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        let tick = Duration::from_millis(self.config.host.tick_interval_ms);
        let shutdown = wait_for_shutdown_signal();
        tokio::pin!(shutdown);

        let mut round = 0u32;
        loop {
            if self.config.host.rounds != 0 && round >= self.config.host.rounds {
                info!("🏁 Played all {} rounds", round);
                break;
            }

            tokio::select! {
                result = &mut shutdown => {
                    if let Err(e) = result {
                        error!("❌ Signal handling failed: {}", e);
                    }
                    info!("🛑 Shutdown signal received, beginning graceful shutdown...");
                    break;
                }
                _ = tokio::time::sleep(tick) => {
                    round += 1;
                    let outcome = self.play(round);
                    log_round(round, &outcome);

                    let every = self.config.host.reload_every_rounds;
                    if every != 0 && round % every == 0 {
                        self.reload()?;
                    }
                }
            }
        }

        self.shutdown()?;
        self.log_final_statistics();
        info!("✅ Hook host shutdown complete");
        Ok(())
    }

    /// Plays a single round against the current hook table
    pub fn play(&self, round: u32) -> RoundOutcome {
        self.host.set_round(round);
        play_round(round, &self.table, self.core.interceptors())
    }

    /// Brings the layer up, then lets the plugin bind its manual handlers
    pub fn enable(&mut self) -> Result<(), LifecycleError> {
        self.core.on_enable(&self.directory)?;
        if self.core.is_enabled() {
            self.logger.register_events(self.core.handlers());
        }
        Ok(())
    }

    /// Disables and re-enables everything, the way a plugin reload would
    pub fn reload(&mut self) -> Result<(), LifecycleError> {
        info!("🔄 Reloading event layer");
        self.shutdown()?;
        self.enable()?;
        if let Some(id) = self.core.patches().current_id() {
            info!("🔄 Event layer reinstalled under '{}'", id);
        }
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), LifecycleError> {
        self.logger.unregister_events(self.core.handlers());
        self.core.on_disable()
    }

    pub fn core(&self) -> &EventsCore {
        &self.core
    }

    pub fn table(&self) -> &HookTable {
        &self.table
    }

    pub fn logger(&self) -> &RoundLoggerPlugin {
        &self.logger
    }

    pub fn host(&self) -> &SimulatedHost {
        &self.host
    }

    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🎲 Rounds: {}", match self.config.host.rounds {
            0 => "until stopped".to_string(),
            n => n.to_string(),
        });
        info!("  ⏱️ Tick interval: {}ms", self.config.host.tick_interval_ms);
        info!("  🔄 Reload every: {} rounds", self.config.host.reload_every_rounds);
        info!("  🪝 Event layer enabled: {}", self.config.events.is_enabled);
        info!("  🚫 Disabled patches: {}", self.config.events.disabled_patches.len());
        info!("  📝 Command log: {}", self.config.events.command_log_path.display());
    }

    fn log_final_statistics(&self) {
        let stats = self.logger.stats();
        info!("📊 Final Statistics:");
        info!("  - Server name: {}", self.host.server_name());
        info!("  - Server name reloads: {}", self.host.name_reloads());
        info!("  - Spawn roles applied: {}", self.host.spawns_applied());
        info!("  - Rounds ended: {}", stats.rounds_ended.load(Ordering::Relaxed));
        info!("  - Items dropped: {}", stats.items_dropped.load(Ordering::Relaxed));
        info!("  - Friendly fire blocked: {}", stats.friendly_fire_blocked.load(Ordering::Relaxed));
        info!("  - Commands blocked: {}", stats.commands_blocked.load(Ordering::Relaxed));

        for (_, channel) in self.core.registry().iter() {
            let channel_stats = channel.stats();
            if channel_stats.handler_failures > 0 {
                warn!(
                    "  - {} had {} failing handler calls",
                    channel.name(),
                    channel_stats.handler_failures
                );
            }
        }
    }
}

fn log_round(round: u32, outcome: &RoundOutcome) {
    info!(
        "🎲 Round {} done: {:.0} damage, {} drops, {} commands run, {} refused, {} respawned",
        round,
        outcome.damage_dealt,
        outcome.items_dropped,
        outcome.commands_run,
        outcome.commands_refused,
        outcome.respawned
    );
    if !outcome.ended {
        warn!("⏸️ Round {} was kept running by a plugin", round);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hook_events::{Origin, PatchTarget};

    fn config(dir: &tempfile::TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.events.command_log_path = dir.path().join("RemoteAdminLog.txt");
        config
    }

    #[test]
    fn the_logger_sees_rounds_through_the_event_layer() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = Application::from_config(config(&dir));
        app.enable().unwrap();

        let outcome = app.play(1);

        let stats = app.logger().stats();
        assert_eq!(stats.rounds_ended.load(Ordering::Relaxed), 1);
        assert_eq!(stats.items_dropped.load(Ordering::Relaxed), 2);
        assert_eq!(stats.friendly_fire_blocked.load(Ordering::Relaxed), 1);
        assert_eq!(outcome.commands_refused, 1);
        assert_eq!(outcome.damage_dealt, 120.0);
        assert_eq!(app.logger().drops_by("grace@steam"), 2);
        assert_eq!(app.host().spawns_applied(), 4);
    }

    #[test]
    fn reload_keeps_exactly_one_binding_per_handler() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = Application::from_config(config(&dir));
        app.enable().unwrap();

        for _ in 0..3 {
            app.reload().unwrap();
        }

        let handlers = app.core().handlers();
        assert_eq!(handlers.server.waiting_for_players.count_origin(Origin::Manual), 2);
        assert_eq!(handlers.server.ending_round.count_origin(Origin::Manual), 1);
        assert_eq!(handlers.player.item_dropped.count_origin(Origin::Auto), 1);
        assert_eq!(app.core().patches().installs(), 4);
    }

    #[test]
    fn a_disabled_patch_keeps_its_channel_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config
            .events
            .disabled_patches
            .push(PatchTarget::new("HostInventory", "SpawnPickup"));
        let mut app = Application::from_config(config);
        app.enable().unwrap();

        let outcome = app.play(1);

        assert_eq!(outcome.items_dropped, 2);
        assert_eq!(app.logger().stats().items_dropped.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn a_disabled_layer_leaves_the_host_unpatched() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.events.is_enabled = false;
        let mut app = Application::from_config(config);

        app.enable().unwrap();
        let outcome = app.play(1);

        assert_eq!(app.table().installed_count(), 0);
        assert_eq!(outcome.commands_refused, 0);
        assert_eq!(app.core().handlers().handler_count(), 0);
    }

    #[tokio::test]
    async fn run_stops_after_the_configured_rounds() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.host.rounds = 3;
        config.host.tick_interval_ms = 1;
        let app = Application::from_config(config);

        app.run().await.unwrap();

        let log = std::fs::read_to_string(dir.path().join("RemoteAdminLog.txt")).unwrap();
        assert_eq!(log.lines().count(), 9);
    }
}
