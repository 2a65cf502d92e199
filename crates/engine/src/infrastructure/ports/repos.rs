//! Host port traits for actor, flag, settings and compendium access.

use async_trait::async_trait;
use serde_json::Value;
use spellbook_domain::{Actor, ActorId, ItemId, PackId, Spell, SpellUuid};

use super::error::RepoError;
use super::types::{ActorPatch, EmbeddedDocument, EmbeddedPatch, FlagScope, PackInfo, SpellListPage};

// =============================================================================
// Actor Documents
// =============================================================================

/// Actor documents owned by the host.
///
/// Every mutation is read back through `get`; implementations never hand
/// out references into their own state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActorRepo: Send + Sync {
    async fn get(&self, id: &ActorId) -> Result<Option<Actor>, RepoError>;

    async fn update(&self, id: &ActorId, patch: ActorPatch) -> Result<(), RepoError>;

    /// Create embedded items, returning their new ids in input order.
    async fn create_embedded(
        &self,
        id: &ActorId,
        documents: Vec<EmbeddedDocument>,
    ) -> Result<Vec<ItemId>, RepoError>;

    async fn update_embedded(
        &self,
        id: &ActorId,
        patches: Vec<EmbeddedPatch>,
    ) -> Result<(), RepoError>;

    async fn delete_embedded(&self, id: &ActorId, item_ids: Vec<ItemId>)
        -> Result<(), RepoError>;
}

// =============================================================================
// Flag Storage
// =============================================================================

/// Module-scoped key/value flags on actors and the current user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FlagRepo: Send + Sync {
    async fn get_flag(
        &self,
        scope: &FlagScope,
        namespace: &str,
        key: &str,
    ) -> Result<Option<Value>, RepoError>;

    async fn set_flag(
        &self,
        scope: &FlagScope,
        namespace: &str,
        key: &str,
        value: Value,
    ) -> Result<(), RepoError>;

    async fn unset_flag(&self, scope: &FlagScope, namespace: &str, key: &str)
        -> Result<(), RepoError>;
}

// =============================================================================
// World Settings
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettingsRepo: Send + Sync {
    async fn get_setting(&self, namespace: &str, key: &str) -> Result<Option<Value>, RepoError>;
}

// =============================================================================
// Compendium Access
// =============================================================================

/// Read-only compendium indexes shared with the host.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompendiumRepo: Send + Sync {
    async fn packs(&self) -> Result<Vec<PackInfo>, RepoError>;

    /// All spell documents of a pack, with the fields the spellbook reads.
    async fn index_pack(&self, pack: &PackId) -> Result<Vec<Spell>, RepoError>;

    async fn resolve_uuid(&self, uuid: &SpellUuid) -> Result<Option<Spell>, RepoError>;

    async fn spell_list_pages(&self, pack: &PackId) -> Result<Vec<SpellListPage>, RepoError>;
}
