//! Player channels

use crate::channel::Channel;
use crate::diagnostics::Diagnostics;
use crate::events::{
    ChangingItemEventArgs, ChangingRoleEventArgs, DiedEventArgs, DroppingItemEventArgs,
    HurtingEventArgs, ItemDroppedEventArgs, JoinedEventArgs, KickingEventArgs, LeftEventArgs,
    PickingUpItemEventArgs,
};
use crate::registry::{ChannelDeclaration, ChannelSource};
use std::sync::Arc;

const GROUP: &str = "Player";

/// Channels raised by player actions
#[derive(Debug)]
pub struct PlayerHandlers {
    pub joined: Arc<Channel<JoinedEventArgs>>,
    pub left: Arc<Channel<LeftEventArgs>>,
    pub kicking: Arc<Channel<KickingEventArgs>>,
    pub hurting: Arc<Channel<HurtingEventArgs>>,
    pub died: Arc<Channel<DiedEventArgs>>,
    pub changing_role: Arc<Channel<ChangingRoleEventArgs>>,
    pub dropping_item: Arc<Channel<DroppingItemEventArgs>>,
    pub item_dropped: Arc<Channel<ItemDroppedEventArgs>>,
    pub picking_up_item: Arc<Channel<PickingUpItemEventArgs>>,
    pub changing_item: Arc<Channel<ChangingItemEventArgs>>,
}

impl PlayerHandlers {
    pub fn new(diagnostics: Arc<dyn Diagnostics>) -> Self {
        let d = || diagnostics.clone();
        Self {
            joined: Arc::new(Channel::new("Joined", d())),
            left: Arc::new(Channel::new("Left", d())),
            kicking: Arc::new(Channel::new("Kicking", d())),
            hurting: Arc::new(Channel::new("Hurting", d())),
            died: Arc::new(Channel::new("Died", d())),
            changing_role: Arc::new(Channel::new("ChangingRole", d())),
            dropping_item: Arc::new(Channel::new("DroppingItem", d())),
            item_dropped: Arc::new(Channel::new("ItemDropped", d())),
            picking_up_item: Arc::new(Channel::new("PickingUpItem", d())),
            changing_item: Arc::new(Channel::new("ChangingItem", d())),
        }
    }
}

impl ChannelSource for PlayerHandlers {
    fn declare_channels(&self) -> Vec<ChannelDeclaration> {
        vec![
            ChannelDeclaration::of(GROUP, &self.joined),
            ChannelDeclaration::of(GROUP, &self.left),
            ChannelDeclaration::of(GROUP, &self.kicking),
            ChannelDeclaration::of(GROUP, &self.hurting),
            ChannelDeclaration::of(GROUP, &self.died),
            ChannelDeclaration::of(GROUP, &self.changing_role),
            ChannelDeclaration::of(GROUP, &self.dropping_item),
            ChannelDeclaration::of(GROUP, &self.item_dropped),
            ChannelDeclaration::of(GROUP, &self.picking_up_item),
            ChannelDeclaration::of(GROUP, &self.changing_item),
        ]
    }
}
