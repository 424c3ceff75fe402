//! Server and round payloads

use super::types::{LeadingTeam, PlayerRef, RoundSummary, Team};
use crate::event_payload;
use compact_str::CompactString;
use serde::Serialize;

/// Raised before the host ends a round
#[derive(Debug, Clone, Serialize)]
pub struct EndingRoundEventArgs {
    pub class_list: RoundSummary,
    pub leading_team: LeadingTeam,
    /// Whether the host considers the round over. Handlers may force it either way.
    pub is_round_ended: bool,
    pub is_allowed: bool,
}

event_payload!(EndingRoundEventArgs, "ending_round", cancellable);

/// Raised after the host ended a round
#[derive(Debug, Clone, Serialize)]
pub struct RoundEndedEventArgs {
    pub leading_team: LeadingTeam,
    pub class_list: RoundSummary,
    /// Seconds until the next round restart. Handlers may change it.
    pub timer_to_restart: i32,
}

event_payload!(RoundEndedEventArgs, "round_ended");

/// Raised when a player reports another player for cheating
#[derive(Debug, Clone, Serialize)]
pub struct ReportingCheaterEventArgs {
    pub issuer: PlayerRef,
    pub target: PlayerRef,
    pub server_port: u16,
    pub reason: String,
    pub is_allowed: bool,
}

event_payload!(ReportingCheaterEventArgs, "reporting_cheater", cancellable);

/// Raised before a respawn wave
#[derive(Debug, Clone, Serialize)]
pub struct RespawningTeamEventArgs {
    /// Players that will be respawned. Handlers may add or remove entries.
    pub players: Vec<PlayerRef>,
    pub maximum_respawn_amount: u32,
    /// Team that will be spawned. Handlers may change it.
    pub next_known_team: Team,
    pub is_allowed: bool,
}

event_payload!(RespawningTeamEventArgs, "respawning_team", cancellable);

/// Raised when a command is sent through a player's in-game console
#[derive(Debug, Clone, Serialize)]
pub struct SendingConsoleCommandEventArgs {
    pub player: PlayerRef,
    pub name: CompactString,
    pub arguments: Vec<String>,
    pub is_encrypted: bool,
    /// Reply shown to the player. Handlers may set it.
    pub return_message: String,
    pub color: CompactString,
    pub is_allowed: bool,
}

event_payload!(SendingConsoleCommandEventArgs, "sending_console_command", cancellable);

/// Raised when a command is sent through the remote admin console
#[derive(Debug, Clone, Serialize)]
pub struct SendingRemoteAdminCommandEventArgs {
    pub sender: PlayerRef,
    pub name: CompactString,
    pub arguments: Vec<String>,
    /// Whether the command succeeded. Handlers that answer the command themselves set it.
    pub is_success: bool,
    pub is_allowed: bool,
}

event_payload!(SendingRemoteAdminCommandEventArgs, "sending_remote_admin_command", cancellable);
