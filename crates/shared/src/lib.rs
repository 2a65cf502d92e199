//! Spellbook Shared - Contracts between the spellbook engine and the host UI
//!
//! This crate contains the types the host's UI layer consumes or produces:
//! - View models projected per tab
//! - The `Action` enum dispatched from the UI
//! - Render requests
//! - The GM notification payload
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - Only serde and the domain vocabulary
//! 2. **No business logic** - Pure data types and serialization

pub mod actions;
pub mod notifications;
pub mod render;
pub mod view;

pub use actions::Action;
pub use notifications::{PrepNotification, PrepNotificationDetails, PREP_NOTIFY_EVENT};
pub use render::{RenderPart, RenderRequest};
pub use view::{
    LearnableScroll, LevelGroup, NoticeLevel, PreparationCount, SpellEntryView, SpellbookView,
    TabKind, TabView, UserNotice, WizardStats,
};
