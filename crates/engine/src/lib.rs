//! Spellbook Engine library.
//!
//! Spell preparation for a tabletop host: rule resolution, spell lists,
//! wizard spellbooks, scrolls, loadouts and the save pipeline, behind ports
//! the host implements.
//!
//! ## Structure
//!
//! - `entities/` - Typed access to flags, settings and compendium spells
//! - `use_cases/` - User story orchestration across entities
//! - `infrastructure/` - Ports to the host plus in-memory adapters
//! - `worker` - Serial request loop around an open spellbook
//! - `app` - Application composition

pub mod app;
pub mod entities;
pub mod infrastructure;
pub mod use_cases;
pub mod worker;

pub use app::App;
pub use worker::{SpellbookHandle, SpellbookWorker};
