//! Player payloads

use super::types::{DamageType, ItemType, PlayerRef, RoleType};
use crate::event_payload;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct JoinedEventArgs {
    pub player: PlayerRef,
}

event_payload!(JoinedEventArgs, "joined");

#[derive(Debug, Clone, Serialize)]
pub struct LeftEventArgs {
    pub player: PlayerRef,
}

event_payload!(LeftEventArgs, "left");

/// Raised before a player is kicked
#[derive(Debug, Clone, Serialize)]
pub struct KickingEventArgs {
    pub target: PlayerRef,
    pub issuer: PlayerRef,
    pub reason: String,
    pub is_allowed: bool,
}

event_payload!(KickingEventArgs, "kicking", cancellable);

/// Raised before damage is applied to a player
#[derive(Debug, Clone, Serialize)]
pub struct HurtingEventArgs {
    pub attacker: PlayerRef,
    pub target: PlayerRef,
    /// Damage to apply. Handlers may scale it.
    pub amount: f32,
    pub damage_type: DamageType,
    pub is_allowed: bool,
}

event_payload!(HurtingEventArgs, "hurting", cancellable);

#[derive(Debug, Clone, Serialize)]
pub struct DiedEventArgs {
    pub killer: PlayerRef,
    pub target: PlayerRef,
    pub damage_type: DamageType,
}

event_payload!(DiedEventArgs, "died");

/// Raised before a player's role changes
#[derive(Debug, Clone, Serialize)]
pub struct ChangingRoleEventArgs {
    pub player: PlayerRef,
    pub new_role: RoleType,
    /// Items granted on spawn. Handlers may replace the loadout.
    pub items: Vec<ItemType>,
    pub should_preserve_position: bool,
    pub is_escaped: bool,
}

event_payload!(ChangingRoleEventArgs, "changing_role");

/// Raised before a player drops an item
#[derive(Debug, Clone, Serialize)]
pub struct DroppingItemEventArgs {
    pub player: PlayerRef,
    pub item: ItemType,
    pub is_allowed: bool,
}

event_payload!(DroppingItemEventArgs, "dropping_item", cancellable);

/// Raised after a player dropped an item
#[derive(Debug, Clone, Serialize)]
pub struct ItemDroppedEventArgs {
    pub player: PlayerRef,
    pub pickup: ItemType,
}

event_payload!(ItemDroppedEventArgs, "item_dropped");

#[derive(Debug, Clone, Serialize)]
pub struct PickingUpItemEventArgs {
    pub player: PlayerRef,
    pub pickup: ItemType,
    pub is_allowed: bool,
}

event_payload!(PickingUpItemEventArgs, "picking_up_item", cancellable);

#[derive(Debug, Clone, Serialize)]
pub struct ChangingItemEventArgs {
    pub player: PlayerRef,
    pub old_item: ItemType,
    /// Item the player ends up holding. Handlers may swap it.
    pub new_item: ItemType,
}

event_payload!(ChangingItemEventArgs, "changing_item");
