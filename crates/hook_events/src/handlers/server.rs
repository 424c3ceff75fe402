//! Server and round channels

use crate::channel::Channel;
use crate::diagnostics::Diagnostics;
use crate::events::{
    EndingRoundEventArgs, ReportingCheaterEventArgs, RespawningTeamEventArgs, RoundEndedEventArgs,
    SendingConsoleCommandEventArgs, SendingRemoteAdminCommandEventArgs,
};
use crate::registry::{ChannelDeclaration, ChannelSource};
use std::sync::Arc;

const GROUP: &str = "Server";

/// Channels raised by round flow and server-side commands
#[derive(Debug)]
pub struct ServerHandlers {
    /// The lobby opened and the server waits for players
    pub waiting_for_players: Arc<Channel<()>>,
    pub round_started: Arc<Channel<()>>,
    pub ending_round: Arc<Channel<EndingRoundEventArgs>>,
    pub round_ended: Arc<Channel<RoundEndedEventArgs>>,
    pub restarting_round: Arc<Channel<()>>,
    pub reporting_cheater: Arc<Channel<ReportingCheaterEventArgs>>,
    pub respawning_team: Arc<Channel<RespawningTeamEventArgs>>,
    pub sending_console_command: Arc<Channel<SendingConsoleCommandEventArgs>>,
    pub sending_remote_admin_command: Arc<Channel<SendingRemoteAdminCommandEventArgs>>,
}

impl ServerHandlers {
    pub fn new(diagnostics: Arc<dyn Diagnostics>) -> Self {
        let d = || diagnostics.clone();
        Self {
            waiting_for_players: Arc::new(Channel::new("WaitingForPlayers", d())),
            round_started: Arc::new(Channel::new("RoundStarted", d())),
            ending_round: Arc::new(Channel::new("EndingRound", d())),
            round_ended: Arc::new(Channel::new("RoundEnded", d())),
            restarting_round: Arc::new(Channel::new("RestartingRound", d())),
            reporting_cheater: Arc::new(Channel::new("ReportingCheater", d())),
            respawning_team: Arc::new(Channel::new("RespawningTeam", d())),
            sending_console_command: Arc::new(Channel::new("SendingConsoleCommand", d())),
            sending_remote_admin_command: Arc::new(Channel::new("SendingRemoteAdminCommand", d())),
        }
    }
}

impl ChannelSource for ServerHandlers {
    fn declare_channels(&self) -> Vec<ChannelDeclaration> {
        vec![
            ChannelDeclaration::of(GROUP, &self.waiting_for_players),
            ChannelDeclaration::of(GROUP, &self.round_started),
            ChannelDeclaration::of(GROUP, &self.ending_round),
            ChannelDeclaration::of(GROUP, &self.round_ended),
            ChannelDeclaration::of(GROUP, &self.restarting_round),
            ChannelDeclaration::of(GROUP, &self.reporting_cheater),
            ChannelDeclaration::of(GROUP, &self.respawning_team),
            ChannelDeclaration::of(GROUP, &self.sending_console_command),
            ChannelDeclaration::of(GROUP, &self.sending_remote_admin_command),
        ]
    }
}
