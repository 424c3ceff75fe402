//! Handlers owned by the event layer itself
//!
//! These keep host-side state consistent with round flow. They are bound
//! manually on enable and unbound on disable, like any other subscriber.

use crate::channel::Handler;
use crate::events::{ChangingRoleEventArgs, PlayerRef, RoleType};
use crate::handlers::Handlers;
use std::sync::Arc;
use tracing::debug;

/// Host operations the internal handlers call back into
pub trait HostServices: Send + Sync {
    /// Rebuilds the cached server name shown in the server list
    fn reload_server_name(&self);

    /// Re-applies the side effects of spawning `player` as `role`
    fn apply_spawn_role(&self, player: &PlayerRef, role: RoleType);
}

/// The internal handler set
pub struct RoundHandlers {
    waiting_for_players: Handler<()>,
    round_started: Handler<()>,
    changing_role: Handler<ChangingRoleEventArgs>,
}

impl RoundHandlers {
    pub fn new(host: Arc<dyn HostServices>) -> Self {
        let on_waiting = host.clone();
        let on_started = host.clone();
        let on_role = host;

        Self {
            waiting_for_players: Handler::empty("hook_events::round::on_waiting_for_players", move || {
                on_waiting.reload_server_name();
                Ok(())
            }),
            round_started: Handler::empty("hook_events::round::on_round_started", move || {
                on_started.reload_server_name();
                Ok(())
            }),
            changing_role: Handler::new(
                "hook_events::round::on_changing_role",
                move |ev: &mut ChangingRoleEventArgs| {
                    on_role.apply_spawn_role(&ev.player, ev.new_role);
                    Ok(())
                },
            ),
        }
    }

    pub fn subscribe(&self, handlers: &Handlers) {
        handlers.server.waiting_for_players.subscribe(self.waiting_for_players.clone());
        handlers.server.round_started.subscribe(self.round_started.clone());
        handlers.player.changing_role.subscribe(self.changing_role.clone());
        debug!("Internal round handlers subscribed");
    }

    pub fn unsubscribe(&self, handlers: &Handlers) {
        handlers.server.waiting_for_players.unsubscribe(&self.waiting_for_players);
        handlers.server.round_started.unsubscribe(&self.round_started);
        handlers.player.changing_role.unsubscribe(&self.changing_role);
        debug!("Internal round handlers unsubscribed");
    }
}

impl std::fmt::Debug for RoundHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundHandlers").finish_non_exhaustive()
    }
}
