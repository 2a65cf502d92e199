//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Actor documents and flags (owned by the host)
//! - World settings
//! - Compendium indexes
//! - Notifications to the user and the GM
//! - Clock/Random (for testing)

mod error;
mod external;
mod repos;
mod testing;
pub mod types;

// =============================================================================
// Host Ports
// =============================================================================
pub use repos::{ActorRepo, CompendiumRepo, FlagRepo, SettingsRepo};

pub use types::{
    ActorPatch, EmbeddedDocument, EmbeddedPatch, FlagScope, PackInfo, PackKind, SpellListPage,
    FLAG_NAMESPACE,
};

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::NotificationPort;

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use repos::{MockActorRepo, MockCompendiumRepo, MockFlagRepo, MockSettingsRepo};

#[cfg(test)]
pub use external::MockNotificationPort;

#[cfg(test)]
pub use testing::{MockClockPort, MockRandomPort};

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::{ClockPort, RandomPort};

// =============================================================================
// Error Types
// =============================================================================
pub use error::RepoError;
