//! # Payloads
//!
//! The records handed to handlers for each host operation. They are plain
//! data: an interception point fills the input fields, handlers may change
//! the mutable ones (`is_allowed`, overridable results), and the interception
//! point reads them back once dispatch is over.
//!
//! Fields named `is_allowed` are the veto flag. Everything else a handler is
//! expected to change is documented on the field.

mod player;
mod server;
mod types;

pub use player::*;
pub use server::*;
pub use types::{DamageType, ItemType, LeadingTeam, PlayerRef, RoleType, RoundSummary, Team};
