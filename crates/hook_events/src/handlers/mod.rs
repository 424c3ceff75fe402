//! # Channel groups
//!
//! Every channel this layer exposes lives in one of two groups, [`ServerHandlers`]
//! and [`PlayerHandlers`]. External code subscribes to a field directly:
//!
//! ```rust
//! use hook_events::{Handler, Handlers, TracingDiagnostics};
//! use hook_events::events::RoundEndedEventArgs;
//! use std::sync::Arc;
//!
//! let handlers = Handlers::new(Arc::new(TracingDiagnostics));
//! let announce = Handler::new("announce", |ev: &mut RoundEndedEventArgs| {
//!     println!("{:?} won", ev.leading_team);
//!     Ok(())
//! });
//! handlers.server.round_ended.subscribe(announce.clone());
//! handlers.server.round_ended.unsubscribe(&announce);
//! ```
//!
//! Both groups implement [`ChannelSource`](crate::ChannelSource) so the
//! capability registry can index them.

mod player;
mod server;

pub use player::PlayerHandlers;
pub use server::ServerHandlers;

use crate::diagnostics::Diagnostics;
use crate::registry::{ChannelDeclaration, ChannelSource};
use std::sync::Arc;

/// All channel groups
#[derive(Debug)]
pub struct Handlers {
    pub server: ServerHandlers,
    pub player: PlayerHandlers,
}

impl Handlers {
    pub fn new(diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            server: ServerHandlers::new(diagnostics.clone()),
            player: PlayerHandlers::new(diagnostics),
        }
    }

    /// The groups as discovery sources
    pub fn sources(&self) -> [&dyn ChannelSource; 2] {
        [&self.server as &dyn ChannelSource, &self.player]
    }

    /// Total bindings across every channel, both origins
    pub fn handler_count(&self) -> usize {
        self.sources()
            .iter()
            .flat_map(|source| source.declare_channels())
            .map(|declaration: ChannelDeclaration| declaration.channel.stats().handlers)
            .sum()
    }
}
