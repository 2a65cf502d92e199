//! Entity modules - typed access over the host ports.
//!
//! Each module wraps a port with the logic that belongs to the data it
//! serves. Use cases build on these and on the ports directly.

pub mod flag;
pub mod settings;
pub mod spells;

pub use flag::ActorFlags;
pub use settings::Settings;
pub use spells::{FetchedSpells, Spells};
