//! Round logger plugin
//!
//! Shows both ways of hooking into the event layer:
//!
//! - auto-subscribed handlers declared in [`RoundLoggerPlugin::auto_subscribers`]
//!   for round results, item drops, friendly fire and remote-admin commands
//! - manual subscriptions made in [`RoundLoggerPlugin::register_events`] for
//!   the lobby and round-ending notifications

use compact_str::CompactString;
use dashmap::DashMap;
use hook_events::events::{
    ChangingRoleEventArgs, EndingRoundEventArgs, HurtingEventArgs, ItemDroppedEventArgs, RoleType,
    RoundEndedEventArgs, SendingRemoteAdminCommandEventArgs,
};
use hook_events::{AutoSubscribers, Handler, Handlers, PluginPriority, PluginRecord};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

fn default_block_friendly_fire() -> bool {
    true
}

fn default_blocked_commands() -> Vec<String> {
    vec!["sudo".to_string()]
}

/// Settings for the round logger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundLoggerConfig {
    /// Cancel damage between players on the same team
    #[serde(default = "default_block_friendly_fire")]
    pub block_friendly_fire: bool,
    /// Remote-admin commands that are always refused
    #[serde(default = "default_blocked_commands")]
    pub blocked_commands: Vec<String>,
}

impl Default for RoundLoggerConfig {
    fn default() -> Self {
        Self {
            block_friendly_fire: default_block_friendly_fire(),
            blocked_commands: default_blocked_commands(),
        }
    }
}

/// Counters kept by the plugin
#[derive(Debug, Default)]
pub struct RoundLoggerStats {
    pub rounds_ended: AtomicU64,
    pub items_dropped: AtomicU64,
    pub friendly_fire_blocked: AtomicU64,
    pub commands_blocked: AtomicU64,
}

#[derive(Default)]
struct State {
    roles: DashMap<u32, RoleType>,
    drops: DashMap<CompactString, u64>,
    stats: RoundLoggerStats,
}

/// Manual subscriptions; kept so they can be removed by identity
struct ManualHandlers {
    waiting_for_players: Handler<()>,
    ending_round: Handler<EndingRoundEventArgs>,
}

pub struct RoundLoggerPlugin {
    name: String,
    state: Arc<State>,
    subscribers: AutoSubscribers,
    manual: ManualHandlers,
}

impl RoundLoggerPlugin {
    pub fn new(config: RoundLoggerConfig) -> Self {
        info!("📜 RoundLoggerPlugin: Creating new instance");
        let state = Arc::new(State::default());
        let blocked: Arc<[String]> = config.blocked_commands.into();

        let mut subscribers = AutoSubscribers::new()
            .on(on_round_ended(state.clone()))
            .on(on_item_dropped(state.clone()))
            .on(on_changing_role(state.clone()))
            .on(on_remote_admin_command(state.clone(), blocked));
        if config.block_friendly_fire {
            subscribers = subscribers.on(on_hurting(state.clone()));
        }

        Self {
            name: "round_logger".to_string(),
            state,
            subscribers,
            manual: ManualHandlers {
                waiting_for_players: Handler::empty("round_logger::on_waiting_for_players", || {
                    info!("📜 RoundLoggerPlugin: Waiting for players...");
                    Ok(())
                }),
                ending_round: Handler::new("round_logger::on_ending_round", |ev: &mut EndingRoundEventArgs| {
                    debug!(
                        "📜 RoundLoggerPlugin: Round ending check, leading team {:?}, ended: {}",
                        ev.leading_team, ev.is_round_ended
                    );
                    Ok(())
                }),
            },
        }
    }

    /// Subscribes the manual handlers
    pub fn register_events(&self, handlers: &Handlers) {
        handlers
            .server
            .waiting_for_players
            .subscribe(self.manual.waiting_for_players.clone());
        handlers.server.ending_round.subscribe(self.manual.ending_round.clone());
    }

    pub fn unregister_events(&self, handlers: &Handlers) {
        handlers
            .server
            .waiting_for_players
            .unsubscribe(&self.manual.waiting_for_players);
        handlers.server.ending_round.unsubscribe(&self.manual.ending_round);
    }

    pub fn stats(&self) -> &RoundLoggerStats {
        &self.state.stats
    }

    /// Items dropped by a player, by account id
    pub fn drops_by(&self, user_id: &str) -> u64 {
        self.state.drops.get(user_id).map(|n| *n).unwrap_or(0)
    }
}

impl Default for RoundLoggerPlugin {
    fn default() -> Self {
        Self::new(RoundLoggerConfig::default())
    }
}

impl PluginRecord for RoundLoggerPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> PluginPriority {
        PluginPriority::Medium
    }

    fn auto_subscribers(&self) -> &AutoSubscribers {
        &self.subscribers
    }
}

fn on_round_ended(state: Arc<State>) -> Handler<RoundEndedEventArgs> {
    Handler::new("round_logger::on_round_ended", move |ev: &mut RoundEndedEventArgs| {
        let round = state.stats.rounds_ended.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            "📜 RoundLoggerPlugin: Round {} ended, {:?} won. Restarting in {}s",
            round, ev.leading_team, ev.timer_to_restart
        );
        state.roles.clear();
        Ok(())
    })
}

fn on_item_dropped(state: Arc<State>) -> Handler<ItemDroppedEventArgs> {
    Handler::new("round_logger::on_item_dropped", move |ev: &mut ItemDroppedEventArgs| {
        state.stats.items_dropped.fetch_add(1, Ordering::Relaxed);
        *state.drops.entry(ev.player.user_id.clone()).or_insert(0) += 1;
        debug!("📜 RoundLoggerPlugin: {} dropped {:?}", ev.player, ev.pickup);
        Ok(())
    })
}

fn on_changing_role(state: Arc<State>) -> Handler<ChangingRoleEventArgs> {
    Handler::new("round_logger::on_changing_role", move |ev: &mut ChangingRoleEventArgs| {
        state.roles.insert(ev.player.id, ev.new_role);
        Ok(())
    })
}

fn on_hurting(state: Arc<State>) -> Handler<HurtingEventArgs> {
    Handler::new("round_logger::on_hurting", move |ev: &mut HurtingEventArgs| {
        if ev.attacker.id == ev.target.id {
            return Ok(());
        }
        let attacker = state.roles.get(&ev.attacker.id).map(|r| r.team());
        let target = state.roles.get(&ev.target.id).map(|r| r.team());
        if let (Some(a), Some(t)) = (attacker, target) {
            if a == t {
                ev.is_allowed = false;
                state.stats.friendly_fire_blocked.fetch_add(1, Ordering::Relaxed);
                debug!("📜 RoundLoggerPlugin: Blocked friendly fire from {} on {}", ev.attacker, ev.target);
            }
        }
        Ok(())
    })
}

fn on_remote_admin_command(state: Arc<State>, blocked: Arc<[String]>) -> Handler<SendingRemoteAdminCommandEventArgs> {
    Handler::new(
        "round_logger::on_remote_admin_command",
        move |ev: &mut SendingRemoteAdminCommandEventArgs| {
            if blocked.iter().any(|c| c.eq_ignore_ascii_case(&ev.name)) {
                ev.is_allowed = false;
                state.stats.commands_blocked.fetch_add(1, Ordering::Relaxed);
                warn!("📜 RoundLoggerPlugin: Refused '{}' from {}", ev.name, ev.sender);
            }
            Ok(())
        },
    )
}
