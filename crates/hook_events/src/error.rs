//! Error types for the event hook layer

use compact_str::CompactString;

/// Error a handler returns to signal that it could not process a payload.
///
/// Returning an error never stops delivery to the remaining handlers of a
/// channel; the dispatcher reports it and moves on.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// Handler execution failed
    #[error("Handler execution failed: {0}")]
    HandlerExecution(String),

    /// The payload carried values the handler could not accept
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Outcome of a single failed handler invocation, as seen by the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum HandlerFailure {
    /// The handler returned an error
    #[error("handler returned an error: {0}")]
    Returned(#[from] EventError),

    /// The handler panicked and the panic was caught at the call site
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerFailure {
    /// Converts a caught panic payload into a failure with a readable message
    pub fn from_panic(panic_info: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = panic_info.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = panic_info.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        HandlerFailure::Panicked(message)
    }
}

/// Reasons a declared channel is left out of the capability registry.
///
/// None of these are fatal; discovery skips the channel and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    /// The channel's handler shape is not one this layer dispatches
    #[error("channel '{channel}' uses foreign handler shape '{shape}'")]
    ForeignShape { channel: CompactString, shape: &'static str },

    /// The channel carries no payload, so there is no type to match handlers against
    #[error("channel '{channel}' has no payload type to key on")]
    Unkeyed { channel: CompactString },

    /// Another channel already claimed this payload type
    #[error("channel '{channel}' duplicates payload type '{payload}' already owned by '{owner}'")]
    DuplicatePayload {
        channel: CompactString,
        payload: &'static str,
        owner: CompactString,
    },

    /// The channel was declared without a name
    #[error("channel for payload '{payload}' was declared without a name")]
    Unnamed { payload: &'static str },
}

/// Errors raised while binding an auto-subscription candidate to a channel
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    /// The candidate's handler does not accept the channel's payload type
    #[error("handler '{handler}' expects '{found}' but channel '{channel}' carries '{expected}'")]
    IncompatiblePayload {
        handler: CompactString,
        channel: CompactString,
        expected: &'static str,
        found: &'static str,
    },
}

/// Errors reported by a patch provider or by the patch lifecycle state machine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    /// The provider failed to apply or remove patches
    #[error("patch provider failed: {0}")]
    Provider(String),

    /// A patch set is already installed and must be uninstalled first
    #[error("patch set '{0}' is already installed")]
    AlreadyInstalled(String),

    /// The interception point is owned by a different patch identity
    #[error("interception point {target} is owned by '{owner}'")]
    Conflict { target: String, owner: String },

    /// The interception point is not installed under the given identity
    #[error("interception point {target} is not installed under '{id}'")]
    NotInstalled { target: String, id: String },
}

/// A lifecycle transition was aborted because patches are not in the expected state
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Installing interception points failed during enable
    #[error("failed to install event patches: {0}")]
    Install(#[source] PatchError),

    /// Removing interception points failed during disable
    #[error("failed to remove event patches: {0}")]
    Uninstall(#[source] PatchError),
}

/// Errors raised while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Values parsed but are not usable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
