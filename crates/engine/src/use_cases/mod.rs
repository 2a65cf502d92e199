//! Use cases - User story orchestration.
//!
//! Each module contains use cases for a specific area of the spellbook.
//! Use cases orchestrate across entity modules and host ports.

pub mod commit;
pub mod lifecycle;
pub mod loadouts;
pub mod rules;
pub mod scrolls;
pub mod spell_list;
pub mod spellbook;
pub mod wizard;

// Re-export main types
pub use commit::{CommitPipeline, CommitReport};
pub use lifecycle::LifecycleOps;
pub use loadouts::LoadoutOps;
pub use rules::{ActorRules, RulesUseCases};
pub use scrolls::ScrollOps;
pub use spell_list::SpellListOps;
pub use spellbook::{SpellbookError, SpellbookState};
pub use wizard::WizardBooks;
