//! Value types shared by the payloads

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lightweight handle to a connected player as the host reports it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerRef {
    /// Host-side connection id
    pub id: u32,
    pub nickname: CompactString,
    /// Platform account id, e.g. `76561198000000000@steam`
    pub user_id: CompactString,
}

impl PlayerRef {
    pub fn new(id: u32, nickname: &str, user_id: &str) -> Self {
        Self {
            id,
            nickname: CompactString::new(nickname),
            user_id: CompactString::new(user_id),
        }
    }

    /// The host console pseudo-player used for server-issued commands
    pub fn server() -> Self {
        Self::new(0, "Dedicated Server", "server")
    }
}

impl fmt::Display for PlayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.nickname, self.user_id)
    }
}

/// Sides a player can fight for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Scp,
    Mtf,
    Chaos,
    Research,
    ClassD,
    Spectator,
    Tutorial,
}

/// Role a player can be spawned as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleType {
    None,
    Spectator,
    ClassD,
    Scientist,
    FacilityGuard,
    NtfCadet,
    NtfLieutenant,
    NtfCommander,
    ChaosInsurgency,
    Scp049,
    Scp096,
    Scp106,
    Scp173,
    Tutorial,
}

impl RoleType {
    pub fn team(self) -> Team {
        match self {
            RoleType::None | RoleType::Spectator => Team::Spectator,
            RoleType::ClassD => Team::ClassD,
            RoleType::Scientist => Team::Research,
            RoleType::FacilityGuard
            | RoleType::NtfCadet
            | RoleType::NtfLieutenant
            | RoleType::NtfCommander => Team::Mtf,
            RoleType::ChaosInsurgency => Team::Chaos,
            RoleType::Scp049 | RoleType::Scp096 | RoleType::Scp106 | RoleType::Scp173 => Team::Scp,
            RoleType::Tutorial => Team::Tutorial,
        }
    }

    /// Roles that exist in the world and can carry items
    pub fn is_alive(self) -> bool {
        !matches!(self, RoleType::None | RoleType::Spectator)
    }
}

/// Items the host knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    None,
    KeycardJanitor,
    KeycardScientist,
    KeycardGuard,
    KeycardO5,
    Radio,
    Medkit,
    Adrenaline,
    GrenadeFrag,
    GunCom15,
    GunE11Sr,
    GunLogicer,
    Ammo9,
}

/// What caused a damage event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageType {
    Firearm,
    Grenade,
    Falldown,
    Tesla,
    Scp,
    Decontamination,
    Wall,
}

/// Side credited with the win when a round ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadingTeam {
    FacilityForces,
    ChaosInsurgency,
    Anomalies,
    Draw,
}

/// Head-count per side the host uses to decide whether a round is over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub class_ds: u32,
    pub scientists: u32,
    pub mtf: u32,
    pub chaos: u32,
    pub scps: u32,
}

impl RoundSummary {
    /// Which side the host would credit with this head-count
    pub fn leading_team(&self) -> LeadingTeam {
        let facility = self.mtf + self.scientists;
        let insurgents = self.chaos + self.class_ds;
        match (facility > 0, insurgents > 0, self.scps > 0) {
            (true, false, false) => LeadingTeam::FacilityForces,
            (false, true, false) => LeadingTeam::ChaosInsurgency,
            (false, false, true) => LeadingTeam::Anomalies,
            _ => LeadingTeam::Draw,
        }
    }

    /// More than one side still standing
    pub fn is_contested(&self) -> bool {
        let sides = [self.mtf + self.scientists, self.chaos + self.class_ds, self.scps];
        sides.iter().filter(|n| **n > 0).count() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_summary_picks_the_only_side_left() {
        let summary = RoundSummary { mtf: 2, scientists: 1, ..Default::default() };
        assert_eq!(summary.leading_team(), LeadingTeam::FacilityForces);
        assert!(!summary.is_contested());

        let summary = RoundSummary { scps: 1, class_ds: 3, ..Default::default() };
        assert_eq!(summary.leading_team(), LeadingTeam::Draw);
        assert!(summary.is_contested());
    }

    #[test]
    fn role_teams() {
        assert_eq!(RoleType::NtfCadet.team(), Team::Mtf);
        assert_eq!(RoleType::Scp173.team(), Team::Scp);
        assert!(!RoleType::Spectator.is_alive());
        assert!(RoleType::ClassD.is_alive());
    }
}
