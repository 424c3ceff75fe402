//! A scripted stand-in for the game host.
//!
//! Each round walks a fixed roster through the host operations the event
//! layer intercepts. An operation only goes through its interceptor while the
//! matching point is installed in the [`HookTable`]; otherwise the host
//! carries on with its default behaviour, as an unpatched host would.

use hook_events::events::{DamageType, ItemType, PlayerRef, RoleType, RoundSummary, Team};
use hook_events::{HookTable, HostServices, Interceptors};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{debug, info};

/// Host-side state the event layer calls back into
#[derive(Debug)]
pub struct SimulatedHost {
    name_template: String,
    round: AtomicU32,
    server_name: Mutex<String>,
    name_reloads: AtomicU64,
    spawns_applied: AtomicU64,
}

impl SimulatedHost {
    pub fn new(name_template: &str) -> Self {
        Self {
            name_template: name_template.to_string(),
            round: AtomicU32::new(0),
            server_name: Mutex::new(String::new()),
            name_reloads: AtomicU64::new(0),
            spawns_applied: AtomicU64::new(0),
        }
    }

    pub fn set_round(&self, round: u32) {
        self.round.store(round, Ordering::Relaxed);
    }

    pub fn server_name(&self) -> String {
        self.server_name
            .lock()
            .map(|name| name.clone())
            .unwrap_or_default()
    }

    pub fn name_reloads(&self) -> u64 {
        self.name_reloads.load(Ordering::Relaxed)
    }

    pub fn spawns_applied(&self) -> u64 {
        self.spawns_applied.load(Ordering::Relaxed)
    }
}

impl HostServices for SimulatedHost {
    fn reload_server_name(&self) {
        let round = self.round.load(Ordering::Relaxed);
        let name = self.name_template.replace("{round}", &round.to_string());
        if let Ok(mut current) = self.server_name.lock() {
            *current = name;
        }
        self.name_reloads.fetch_add(1, Ordering::Relaxed);
    }

    fn apply_spawn_role(&self, player: &PlayerRef, role: RoleType) {
        self.spawns_applied.fetch_add(1, Ordering::Relaxed);
        debug!("🧍 {} spawned as {:?}", player, role);
    }
}

/// What the host did with one round
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundOutcome {
    pub damage_dealt: f32,
    pub items_dropped: u32,
    pub commands_run: u32,
    pub commands_refused: u32,
    pub respawned: usize,
    pub ended: bool,
    pub restart_in: i32,
}

fn roster() -> Vec<(PlayerRef, RoleType, Vec<ItemType>)> {
    vec![
        (PlayerRef::new(2, "Ada", "ada@steam"), RoleType::ClassD, vec![]),
        (
            PlayerRef::new(3, "Grace", "grace@steam"),
            RoleType::Scientist,
            vec![ItemType::KeycardScientist, ItemType::Medkit],
        ),
        (
            PlayerRef::new(4, "Linus", "linus@steam"),
            RoleType::NtfCadet,
            vec![ItemType::KeycardGuard, ItemType::GunE11Sr, ItemType::Radio],
        ),
        (
            PlayerRef::new(5, "Barbara", "barbara@discord"),
            RoleType::FacilityGuard,
            vec![ItemType::KeycardGuard, ItemType::GunCom15, ItemType::Ammo9],
        ),
    ]
}

/// Plays one scripted round against whatever is currently installed
pub fn play_round(round: u32, table: &HookTable, interceptors: &Interceptors) -> RoundOutcome {
    let active = |target: &str, member: &str| table.is_active(target, member);
    let mut outcome = RoundOutcome::default();
    let players = roster();
    let admin = PlayerRef::new(1, "Admin", "admin@northwood");

    info!("🎲 Round {} starting with {} players", round, players.len());

    if active("HostRoundManager", "WaitForPlayers") {
        interceptors.waiting_for_players();
    }
    for (player, _, _) in &players {
        if active("HostPlayerManager", "AddPlayer") {
            interceptors.joined(player.clone());
        }
    }
    if active("HostRoundManager", "StartRound") {
        interceptors.round_started();
    }

    let mut loadouts = Vec::with_capacity(players.len());
    for (player, role, items) in &players {
        let loadout = if active("HostCharacterClassManager", "SetPlayersClass") {
            interceptors.changing_role(player.clone(), *role, items.clone(), false)
        } else {
            items.clone()
        };
        loadouts.push(loadout);
    }

    let cadet = &players[2].0;
    let guard = &players[3].0;
    let class_d = &players[0].0;
    let scientist = &players[1].0;

    // Friendly fire first, then a hit across teams
    for (attacker, target, amount) in [(cadet, guard, 35.0), (guard, class_d, 120.0)] {
        let dealt = if active("HostPlayerStats", "HurtPlayer") {
            interceptors.hurting(attacker.clone(), target.clone(), amount, DamageType::Firearm)
        } else {
            Some(amount)
        };
        if let Some(dealt) = dealt {
            outcome.damage_dealt += dealt;
            if dealt >= 100.0 && active("HostPlayerStats", "Kill") {
                interceptors.died(attacker.clone(), target.clone(), DamageType::Firearm);
            }
        }
    }

    for item in loadouts[1].clone() {
        let allowed = !active("HostInventory", "DropItem") || interceptors.dropping_item(scientist.clone(), item);
        if !allowed {
            continue;
        }
        outcome.items_dropped += 1;
        if active("HostInventory", "SpawnPickup") {
            interceptors.item_dropped(scientist.clone(), item);
        }
    }

    if !active("HostInventory", "PickupItem") || interceptors.picking_up_item(class_d.clone(), ItemType::Medkit) {
        let held = if active("HostInventory", "SetCurrentItem") {
            interceptors.changing_item(class_d.clone(), ItemType::None, ItemType::Medkit)
        } else {
            ItemType::Medkit
        };
        debug!("{} now holds {:?}", class_d, held);
    }

    for query in ["sudo quit", "roundrestart", "give 2 Radio"] {
        let permitted = !active("HostCommandProcessor", "ProcessQuery")
            || interceptors.remote_admin_command(admin.clone(), query);
        if permitted {
            outcome.commands_run += 1;
        } else {
            outcome.commands_refused += 1;
        }
    }
    if active("HostGameConsole", "ProcessCommand") {
        let reply = interceptors.console_command(scientist.clone(), ".help", false);
        debug!("Console reply to {}: '{}' ({})", reply.player, reply.return_message, reply.color);
    }

    if active("HostCheaterReport", "IssueReport") {
        interceptors.reporting_cheater(scientist.clone(), cadet.clone(), 7777, "aimbot");
    }

    let spectators = vec![class_d.clone()];
    outcome.respawned = if active("HostRespawnManager", "Spawn") {
        interceptors
            .respawning_team(spectators, 5, Team::Chaos)
            .map(|(_, players)| players.len())
            .unwrap_or(0)
    } else {
        spectators.len()
    };

    let summary = RoundSummary {
        class_ds: 1,
        scientists: 1,
        mtf: 2,
        ..Default::default()
    };
    outcome.ended = !active("HostRoundManager", "EndRound") || interceptors.ending_round(summary, true);
    if outcome.ended {
        outcome.restart_in = if active("HostRoundManager", "ShowRoundSummary") {
            interceptors.round_ended(summary.leading_team(), summary, 10)
        } else {
            10
        };
        if active("HostRoundManager", "RestartRound") {
            interceptors.restarting_round();
        }
        for (player, _, _) in &players {
            if active("HostPlayerManager", "RemovePlayer") {
                interceptors.left(player.clone());
            }
        }
    }

    outcome
}
