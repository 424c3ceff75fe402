//! # Hook Events
//!
//! Runtime event distribution for a long-running plugin host. Host operations
//! are intercepted and republished as typed payloads on named channels;
//! plugins subscribe to those channels, mutate the payloads, or veto the
//! underlying operation.
//!
//! ## Key Features
//!
//! - **Typed channels**: one [`Channel`] per payload type, manual subscribe and
//!   unsubscribe by handler identity
//! - **Auto-subscription**: plugins declare handlers per payload type in their
//!   [`AutoSubscribers`] table and get bound without registration code
//! - **Failure isolation**: a handler that errors or panics is reported and
//!   skipped; its veto is discarded and delivery continues
//! - **Reload-safe patching**: every install gets a fresh identity, so
//!   disable/enable cycles never collide with earlier installs
//!
//! ## Architecture
//!
//! - **[`ChannelRegistry`]**: payload type → channel index, built once
//! - **[`AutoSubscriptions`]**: binds plugin handlers and remembers them for removal
//! - **[`PatchManager`]**: drives a [`PatchProvider`] through install cycles
//! - **[`EventsCore`]**: sequences all of the above on enable and disable
//! - **[`Interceptors`]**: what installed interception points run
//!
//! ## Usage
//!
//! ```rust
//! use hook_events::*;
//! use hook_events::events::{ItemDroppedEventArgs, ItemType, PlayerRef, RoleType};
//! use std::sync::Arc;
//!
//! struct Host;
//!
//! impl HostServices for Host {
//!     fn reload_server_name(&self) {}
//!     fn apply_spawn_role(&self, _player: &PlayerRef, _role: RoleType) {}
//! }
//!
//! let tracker = BasicPlugin::new(
//!     "tracker",
//!     PluginPriority::Medium,
//!     AutoSubscribers::new().on(Handler::new("on_item_dropped", |ev: &mut ItemDroppedEventArgs| {
//!         println!("{} dropped {:?}", ev.player, ev.pickup);
//!         Ok(())
//!     })),
//! );
//! let plugins: Vec<Arc<dyn PluginRecord>> = vec![Arc::new(tracker)];
//! let directory = StaticPluginDirectory::new(plugins);
//!
//! let mut events_core = EventsCore::new(
//!     EventsConfig::default(),
//!     Arc::new(HookTable::new()),
//!     Arc::new(Host),
//!     Arc::new(TracingDiagnostics),
//! );
//! events_core.on_enable(&directory)?;
//!
//! events_core.interceptors().item_dropped(PlayerRef::new(2, "Ada", "ada@steam"), ItemType::Medkit);
//!
//! events_core.on_disable()?;
//! # Ok::<(), hook_events::LifecycleError>(())
//! ```

pub mod channel;
pub mod config;
pub mod coordinator;
pub mod diagnostics;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod events;
pub mod handlers;
pub mod hook_table;
pub mod intercept;
pub mod macros;
pub mod patch;
pub mod plugin;
pub mod registry;
pub mod resolver;
pub mod round;

#[cfg(test)]
mod tests;

pub use channel::{AnyChannel, Binding, Channel, ChannelStats, ErasedHandler, Handler, HandlerKey, Origin};
pub use config::EventsConfig;
pub use coordinator::EventsCore;
pub use diagnostics::{Diagnostics, RecordingDiagnostics, Severity, TracingDiagnostics};
pub use dispatch::invoke_safely;
pub use error::{
    BindError, ConfigError, DiscoveryError, EventError, HandlerFailure, LifecycleError, PatchError,
};
pub use event::Event;
pub use handlers::{Handlers, PlayerHandlers, ServerHandlers};
pub use hook_table::HookTable;
pub use intercept::{interception_catalog, CommandAuditLog, InterceptionPoint, Interceptors};
pub use patch::{ExclusionList, PatchId, PatchManager, PatchProvider, PatchState, PatchTarget};
pub use plugin::{
    AutoSubscribers, BasicPlugin, PluginDirectory, PluginPriority, PluginRecord, StaticPluginDirectory,
};
pub use registry::{ChannelDeclaration, ChannelRegistry, ChannelSource, HandlerShape};
pub use resolver::{AutoSubscriptions, ResolveReport};
pub use round::{HostServices, RoundHandlers};

/// Result type returned by handlers
pub type Result<T> = std::result::Result<T, EventError>;
