//! Capability registry: which channel carries which payload type
//!
//! Channel groups describe themselves through [`ChannelSource`]. The registry
//! scans those declarations once per process and indexes every well-formed
//! channel by its payload type, which is the key auto-subscription matches
//! plugin handlers against. Malformed declarations are skipped and recorded,
//! never fatal.

use crate::channel::{AnyChannel, Channel};
use crate::error::DiscoveryError;
use crate::event::Event;
use compact_str::CompactString;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// The handler shape a channel dispatches with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerShape {
    /// `Fn(&mut Payload)`; keyable by payload type
    Payload,
    /// `Fn()`; dispatchable but has no payload type to key on
    Empty,
    /// Some other calling convention this layer does not dispatch
    Foreign(&'static str),
}

/// One declared channel, as reported by a [`ChannelSource`]
#[derive(Clone)]
pub struct ChannelDeclaration {
    /// Group the channel belongs to, e.g. `"Server"`
    pub group: &'static str,
    pub channel: Arc<dyn AnyChannel>,
    pub shape: HandlerShape,
}

impl ChannelDeclaration {
    /// Declares a typed channel. Channels carrying `()` are declared [`HandlerShape::Empty`].
    pub fn of<T: Event>(group: &'static str, channel: &Arc<Channel<T>>) -> Self {
        let shape = if TypeId::of::<T>() == TypeId::of::<()>() {
            HandlerShape::Empty
        } else {
            HandlerShape::Payload
        };
        Self {
            group,
            channel: channel.clone(),
            shape,
        }
    }

    pub fn with_shape(mut self, shape: HandlerShape) -> Self {
        self.shape = shape;
        self
    }
}

/// Anything that exposes channels for discovery
pub trait ChannelSource {
    fn declare_channels(&self) -> Vec<ChannelDeclaration>;
}

/// Payload type → channel index, filled once.
#[derive(Default)]
pub struct ChannelRegistry {
    channels: Vec<(TypeId, Arc<dyn AnyChannel>)>,
    by_payload: HashMap<TypeId, usize>,
    skipped: Vec<DiscoveryError>,
    discovered: bool,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans every source and indexes its well-formed channels.
    ///
    /// Only the first call does any work; later calls return `0` without
    /// touching the index. Returns the number of channels indexed.
    pub fn discover(&mut self, sources: &[&dyn ChannelSource]) -> usize {
        if self.discovered {
            debug!("Channel registry already populated, skipping discovery");
            return 0;
        }

        for source in sources {
            for declaration in source.declare_channels() {
                if let Err(reason) = self.index(declaration) {
                    debug!("Skipping channel during discovery: {}", reason);
                    self.skipped.push(reason);
                }
            }
        }

        self.discovered = true;
        info!(
            "🔍 Discovered {} event channels ({} skipped)",
            self.channels.len(),
            self.skipped.len()
        );
        self.channels.len()
    }

    fn index(&mut self, declaration: ChannelDeclaration) -> Result<(), DiscoveryError> {
        let channel = declaration.channel;
        let name = CompactString::new(channel.name());

        if name.is_empty() {
            return Err(DiscoveryError::Unnamed {
                payload: channel.payload_name(),
            });
        }

        match declaration.shape {
            HandlerShape::Payload => {}
            HandlerShape::Empty => return Err(DiscoveryError::Unkeyed { channel: name }),
            HandlerShape::Foreign(shape) => {
                return Err(DiscoveryError::ForeignShape { channel: name, shape })
            }
        }

        let payload = channel.payload_type();
        if payload == TypeId::of::<()>() {
            return Err(DiscoveryError::Unkeyed { channel: name });
        }

        if let Some(&existing) = self.by_payload.get(&payload) {
            return Err(DiscoveryError::DuplicatePayload {
                channel: name,
                payload: channel.payload_name(),
                owner: CompactString::new(self.channels[existing].1.name()),
            });
        }

        self.by_payload.insert(payload, self.channels.len());
        self.channels.push((payload, channel));
        Ok(())
    }

    pub fn is_discovered(&self) -> bool {
        self.discovered
    }

    /// Channel carrying the given payload type
    pub fn get(&self, payload: TypeId) -> Option<&Arc<dyn AnyChannel>> {
        self.by_payload.get(&payload).map(|&i| &self.channels[i].1)
    }

    pub fn channel_for<T: Event>(&self) -> Option<&Arc<dyn AnyChannel>> {
        self.get(TypeId::of::<T>())
    }

    /// Indexed channels in discovery order
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &Arc<dyn AnyChannel>)> {
        self.channels.iter().map(|(payload, channel)| (*payload, channel))
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Declarations left out of the index, with the reason
    pub fn skipped(&self) -> &[DiscoveryError] {
        &self.skipped
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("channels", &self.channels.len())
            .field("skipped", &self.skipped.len())
            .field("discovered", &self.discovered)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Diagnostics, TracingDiagnostics};
    use serde::Serialize;

    #[derive(Debug, Serialize)]
    struct Alpha;
    crate::event_payload!(Alpha, "alpha");

    #[derive(Debug, Serialize)]
    struct Beta;
    crate::event_payload!(Beta, "beta");

    struct Fixture {
        declarations: Vec<ChannelDeclaration>,
    }

    impl ChannelSource for Fixture {
        fn declare_channels(&self) -> Vec<ChannelDeclaration> {
            self.declarations.clone()
        }
    }

    fn diagnostics() -> Arc<dyn Diagnostics> {
        Arc::new(TracingDiagnostics)
    }

    #[test]
    fn discovery_indexes_payload_channels() {
        let alpha = Arc::new(Channel::<Alpha>::new("Alpha", diagnostics()));
        let beta = Arc::new(Channel::<Beta>::new("Beta", diagnostics()));
        let source = Fixture {
            declarations: vec![
                ChannelDeclaration::of("Test", &alpha),
                ChannelDeclaration::of("Test", &beta),
            ],
        };

        let mut registry = ChannelRegistry::new();
        assert_eq!(registry.discover(&[&source]), 2);
        assert_eq!(registry.channel_for::<Alpha>().map(|c| c.name()), Some("Alpha"));
        assert_eq!(registry.channel_for::<Beta>().map(|c| c.name()), Some("Beta"));
        assert!(registry.skipped().is_empty());
    }

    #[test]
    fn discovery_runs_once() {
        let alpha = Arc::new(Channel::<Alpha>::new("Alpha", diagnostics()));
        let first = Fixture { declarations: vec![ChannelDeclaration::of("Test", &alpha)] };
        let beta = Arc::new(Channel::<Beta>::new("Beta", diagnostics()));
        let second = Fixture { declarations: vec![ChannelDeclaration::of("Test", &beta)] };

        let mut registry = ChannelRegistry::new();
        registry.discover(&[&first]);
        assert_eq!(registry.discover(&[&second]), 0);

        assert!(registry.is_discovered());
        assert_eq!(registry.len(), 1);
        assert!(registry.channel_for::<Beta>().is_none());
    }

    #[test]
    fn malformed_declarations_are_skipped_without_blocking_the_rest() {
        let empty = Arc::new(Channel::<()>::new("RoundStarted", diagnostics()));
        let foreign = Arc::new(Channel::<Alpha>::new("Legacy", diagnostics()));
        let unnamed = Arc::new(Channel::<Beta>::new("", diagnostics()));
        let alpha = Arc::new(Channel::<Alpha>::new("Alpha", diagnostics()));
        let alpha_again = Arc::new(Channel::<Alpha>::new("AlphaAgain", diagnostics()));
        let source = Fixture {
            declarations: vec![
                ChannelDeclaration::of("Test", &empty),
                ChannelDeclaration::of("Test", &foreign).with_shape(HandlerShape::Foreign("delegate")),
                ChannelDeclaration::of("Test", &unnamed),
                ChannelDeclaration::of("Test", &alpha),
                ChannelDeclaration::of("Test", &alpha_again),
            ],
        };

        let mut registry = ChannelRegistry::new();
        assert_eq!(registry.discover(&[&source]), 1);
        assert_eq!(registry.channel_for::<Alpha>().map(|c| c.name()), Some("Alpha"));
        assert_eq!(
            registry.skipped(),
            &[
                DiscoveryError::Unkeyed { channel: "RoundStarted".into() },
                DiscoveryError::ForeignShape { channel: "Legacy".into(), shape: "delegate" },
                DiscoveryError::Unnamed { payload: "beta" },
                DiscoveryError::DuplicatePayload {
                    channel: "AlphaAgain".into(),
                    payload: "alpha",
                    owner: "Alpha".into(),
                },
            ]
        );
    }
}
