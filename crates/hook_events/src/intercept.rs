//! Interception points: where host operations turn into published payloads
//!
//! Each method on [`Interceptors`] is what an installed patch runs in place of
//! (or around) a host member. It builds the payload from the host's
//! arguments, publishes it, and reads the handlers' decision back out.
//! [`interception_catalog`] lists every host member this layer patches.

use crate::diagnostics::Diagnostics;
use crate::events::{
    ChangingItemEventArgs, ChangingRoleEventArgs, DamageType, DiedEventArgs, DroppingItemEventArgs,
    EndingRoundEventArgs, HurtingEventArgs, ItemDroppedEventArgs, ItemType, JoinedEventArgs,
    KickingEventArgs, LeadingTeam, LeftEventArgs, PickingUpItemEventArgs, PlayerRef,
    ReportingCheaterEventArgs, RespawningTeamEventArgs, RoleType, RoundEndedEventArgs, RoundSummary,
    SendingConsoleCommandEventArgs, SendingRemoteAdminCommandEventArgs, Team,
};
use crate::handlers::Handlers;
use crate::patch::PatchTarget;
use compact_str::CompactString;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A host member this layer patches, and the channel it publishes on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptionPoint {
    pub target: PatchTarget,
    pub channel: &'static str,
}

const CATALOG: &[(&str, &str, &str)] = &[
    ("HostRoundManager", "WaitForPlayers", "WaitingForPlayers"),
    ("HostRoundManager", "StartRound", "RoundStarted"),
    ("HostRoundManager", "EndRound", "EndingRound"),
    ("HostRoundManager", "ShowRoundSummary", "RoundEnded"),
    ("HostRoundManager", "RestartRound", "RestartingRound"),
    ("HostCheaterReport", "IssueReport", "ReportingCheater"),
    ("HostRespawnManager", "Spawn", "RespawningTeam"),
    ("HostGameConsole", "ProcessCommand", "SendingConsoleCommand"),
    ("HostCommandProcessor", "ProcessQuery", "SendingRemoteAdminCommand"),
    ("HostPlayerManager", "AddPlayer", "Joined"),
    ("HostPlayerManager", "RemovePlayer", "Left"),
    ("HostBanPlayer", "KickUser", "Kicking"),
    ("HostPlayerStats", "HurtPlayer", "Hurting"),
    ("HostPlayerStats", "Kill", "Died"),
    ("HostCharacterClassManager", "SetPlayersClass", "ChangingRole"),
    ("HostInventory", "DropItem", "DroppingItem"),
    ("HostInventory", "SpawnPickup", "ItemDropped"),
    ("HostInventory", "PickupItem", "PickingUpItem"),
    ("HostInventory", "SetCurrentItem", "ChangingItem"),
];

/// Every interception point tagged for this process
pub fn interception_catalog() -> Vec<InterceptionPoint> {
    CATALOG
        .iter()
        .map(|&(target, member, channel)| InterceptionPoint {
            target: PatchTarget::new(target, member),
            channel,
        })
        .collect()
}

/// Append-only audit trail of remote-admin commands.
///
/// Appends are serialized by a lock private to this log; the host may run
/// interception points from more than one thread.
#[derive(Debug)]
pub struct CommandAuditLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CommandAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line for a dispatched command
    pub fn record(&self, sender: &PlayerRef, command: &str, permitted: bool) -> std::io::Result<()> {
        let line = format!(
            "[{}] {} ({}) ran command: {}. Command Permitted: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            sender.nickname,
            sender.user_id,
            command,
            if permitted { "[YES]" } else { "[NO]" },
        );

        let _guard = match self.lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

/// The bodies of the installed interception points
pub struct Interceptors {
    handlers: Arc<Handlers>,
    audit: CommandAuditLog,
    diagnostics: Arc<dyn Diagnostics>,
}

impl Interceptors {
    /// # Arguments
    ///
    /// * `handlers` - The channels every interception point publishes on
    /// * `audit` - Log the remote-admin interception point appends to
    /// * `diagnostics` - Receives audit write failures
    pub fn new(handlers: Arc<Handlers>, audit: CommandAuditLog, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            handlers,
            audit,
            diagnostics,
        }
    }

    pub fn handlers(&self) -> &Handlers {
        &self.handlers
    }

    pub fn waiting_for_players(&self) {
        self.handlers.server.waiting_for_players.invoke();
    }

    pub fn round_started(&self) {
        self.handlers.server.round_started.invoke();
    }

    /// Returns whether the host should end the round now
    pub fn ending_round(&self, class_list: RoundSummary, is_round_ended: bool) -> bool {
        let mut ev = EndingRoundEventArgs {
            leading_team: class_list.leading_team(),
            class_list,
            is_round_ended,
            is_allowed: true,
        };
        self.handlers.server.ending_round.publish(&mut ev);
        ev.is_allowed && ev.is_round_ended
    }

    /// Returns the restart delay in seconds
    pub fn round_ended(&self, leading_team: LeadingTeam, class_list: RoundSummary, timer_to_restart: i32) -> i32 {
        let mut ev = RoundEndedEventArgs {
            leading_team,
            class_list,
            timer_to_restart,
        };
        self.handlers.server.round_ended.publish(&mut ev);
        ev.timer_to_restart
    }

    pub fn restarting_round(&self) {
        self.handlers.server.restarting_round.invoke();
    }

    /// Returns whether the report is forwarded
    pub fn reporting_cheater(&self, issuer: PlayerRef, target: PlayerRef, server_port: u16, reason: &str) -> bool {
        let mut ev = ReportingCheaterEventArgs {
            issuer,
            target,
            server_port,
            reason: reason.to_string(),
            is_allowed: true,
        };
        self.handlers.server.reporting_cheater.publish(&mut ev);
        ev.is_allowed
    }

    /// Returns the team and players to spawn, or `None` when the wave is cancelled
    pub fn respawning_team(
        &self,
        players: Vec<PlayerRef>,
        maximum_respawn_amount: u32,
        next_known_team: Team,
    ) -> Option<(Team, Vec<PlayerRef>)> {
        let mut ev = RespawningTeamEventArgs {
            players,
            maximum_respawn_amount,
            next_known_team,
            is_allowed: true,
        };
        self.handlers.server.respawning_team.publish(&mut ev);
        if !ev.is_allowed {
            return None;
        }
        let mut players = ev.players;
        players.truncate(ev.maximum_respawn_amount as usize);
        Some((ev.next_known_team, players))
    }

    /// Runs a game console command line through the handlers.
    ///
    /// The returned payload carries the decision and the reply to show.
    pub fn console_command(&self, player: PlayerRef, line: &str, is_encrypted: bool) -> SendingConsoleCommandEventArgs {
        let (name, arguments) = split_command(line);
        let mut ev = SendingConsoleCommandEventArgs {
            player,
            name,
            arguments,
            is_encrypted,
            return_message: String::new(),
            color: CompactString::new("white"),
            is_allowed: true,
        };
        self.handlers.server.sending_console_command.publish(&mut ev);
        ev
    }

    /// Runs a remote-admin query through the handlers and audits it.
    ///
    /// Returns whether the host should execute the command.
    pub fn remote_admin_command(&self, sender: PlayerRef, query: &str) -> bool {
        let (name, arguments) = split_command(query);
        let mut ev = SendingRemoteAdminCommandEventArgs {
            sender,
            name,
            arguments,
            is_success: true,
            is_allowed: true,
        };
        self.handlers.server.sending_remote_admin_command.publish(&mut ev);

        if let Err(e) = self.audit.record(&ev.sender, &ev.name, ev.is_allowed) {
            self.diagnostics.warn(&format!(
                "Could not append to command log '{}': {}",
                self.audit.path().display(),
                e
            ));
        }
        ev.is_allowed
    }

    pub fn joined(&self, player: PlayerRef) {
        self.handlers.player.joined.publish(&mut JoinedEventArgs { player });
    }

    pub fn left(&self, player: PlayerRef) {
        self.handlers.player.left.publish(&mut LeftEventArgs { player });
    }

    /// Returns whether the kick goes ahead
    pub fn kicking(&self, target: PlayerRef, issuer: PlayerRef, reason: &str) -> bool {
        let mut ev = KickingEventArgs {
            target,
            issuer,
            reason: reason.to_string(),
            is_allowed: true,
        };
        self.handlers.player.kicking.publish(&mut ev);
        ev.is_allowed
    }

    /// Returns the damage to apply, or `None` when the hit is cancelled
    pub fn hurting(&self, attacker: PlayerRef, target: PlayerRef, amount: f32, damage_type: DamageType) -> Option<f32> {
        let mut ev = HurtingEventArgs {
            attacker,
            target,
            amount,
            damage_type,
            is_allowed: true,
        };
        self.handlers.player.hurting.publish(&mut ev);
        ev.is_allowed.then_some(ev.amount.max(0.0))
    }

    pub fn died(&self, killer: PlayerRef, target: PlayerRef, damage_type: DamageType) {
        self.handlers.player.died.publish(&mut DiedEventArgs {
            killer,
            target,
            damage_type,
        });
    }

    /// Returns the loadout the player spawns with
    pub fn changing_role(
        &self,
        player: PlayerRef,
        new_role: RoleType,
        items: Vec<ItemType>,
        is_escaped: bool,
    ) -> Vec<ItemType> {
        let mut ev = ChangingRoleEventArgs {
            player,
            new_role,
            items,
            should_preserve_position: is_escaped,
            is_escaped,
        };
        self.handlers.player.changing_role.publish(&mut ev);
        ev.items
    }

    /// Returns whether the item leaves the inventory
    pub fn dropping_item(&self, player: PlayerRef, item: ItemType) -> bool {
        let mut ev = DroppingItemEventArgs {
            player,
            item,
            is_allowed: true,
        };
        self.handlers.player.dropping_item.publish(&mut ev);
        ev.is_allowed
    }

    pub fn item_dropped(&self, player: PlayerRef, pickup: ItemType) {
        self.handlers.player.item_dropped.publish(&mut ItemDroppedEventArgs { player, pickup });
    }

    /// Returns whether the pickup goes ahead
    pub fn picking_up_item(&self, player: PlayerRef, pickup: ItemType) -> bool {
        let mut ev = PickingUpItemEventArgs {
            player,
            pickup,
            is_allowed: true,
        };
        self.handlers.player.picking_up_item.publish(&mut ev);
        ev.is_allowed
    }

    /// Returns the item the player ends up holding
    pub fn changing_item(&self, player: PlayerRef, old_item: ItemType, new_item: ItemType) -> ItemType {
        let mut ev = ChangingItemEventArgs {
            player,
            old_item,
            new_item,
        };
        self.handlers.player.changing_item.publish(&mut ev);
        ev.new_item
    }
}

impl std::fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptors")
            .field("audit", &self.audit.path())
            .finish_non_exhaustive()
    }
}

fn split_command(line: &str) -> (CompactString, Vec<String>) {
    let mut parts = line.split_whitespace();
    let name = parts.next().map(CompactString::new).unwrap_or_default();
    (name, parts.map(str::to_string).collect())
}
