//! In-memory host for development and testing.
//!
//! Implements every host port over a world snapshot loaded from JSON. Nothing
//! is persisted; the binary and the scenario tests run against it.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spellbook_domain::{
    Actor, ActorId, ActorItem, ItemId, OwnedSpell, PackId, Spell, SpellUuid,
};
use spellbook_shared::{PrepNotification, UserNotice};
use tokio::sync::RwLock;

use crate::infrastructure::ports::{
    ActorPatch, ActorRepo, CompendiumRepo, EmbeddedDocument, EmbeddedPatch, FlagRepo, FlagScope,
    NotificationPort, PackInfo, RepoError, SettingsRepo, SpellListPage,
};

/// A compendium pack with its contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackSnapshot {
    #[serde(flatten)]
    pub info: PackInfo,
    #[serde(default)]
    pub spells: Vec<Spell>,
    #[serde(default)]
    pub pages: Vec<SpellListPage>,
}

/// Everything the in-memory host serves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    #[serde(default)]
    pub actors: Vec<Actor>,
    #[serde(default)]
    pub packs: Vec<PackSnapshot>,
    /// `namespace.key` to value
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
    /// Actor id to `namespace.key` to value
    #[serde(default)]
    pub flags: BTreeMap<String, BTreeMap<String, Value>>,
    #[serde(default)]
    pub user_flags: BTreeMap<String, Value>,
}

#[derive(Default)]
struct HostState {
    actors: BTreeMap<ActorId, Actor>,
    flags: HashMap<FlagScope, BTreeMap<String, Value>>,
}

/// In-memory implementation of the host ports.
pub struct InMemoryHost {
    state: Arc<RwLock<HostState>>,
    packs: Arc<RwLock<Vec<PackSnapshot>>>,
    settings: Arc<RwLock<BTreeMap<String, Value>>>,
    notices: Arc<RwLock<Vec<UserNotice>>>,
    gm_notifications: Arc<RwLock<Vec<PrepNotification>>>,
    next_item: AtomicU64,
}

fn flag_key(namespace: &str, key: &str) -> String {
    format!("{namespace}.{key}")
}

impl InMemoryHost {
    pub fn new(snapshot: WorldSnapshot) -> Self {
        let mut state = HostState::default();
        for actor in snapshot.actors {
            state.actors.insert(actor.id.clone(), actor);
        }
        for (actor_id, flags) in snapshot.flags {
            state
                .flags
                .insert(FlagScope::Actor(ActorId::new(actor_id)), flags);
        }
        state.flags.insert(FlagScope::User, snapshot.user_flags);

        Self {
            state: Arc::new(RwLock::new(state)),
            packs: Arc::new(RwLock::new(snapshot.packs)),
            settings: Arc::new(RwLock::new(snapshot.settings)),
            notices: Arc::new(RwLock::new(Vec::new())),
            gm_notifications: Arc::new(RwLock::new(Vec::new())),
            next_item: AtomicU64::new(1),
        }
    }

    /// Load a snapshot from a JSON file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RepoError::host("load_snapshot", format!("{}: {e}", path.display())))?;
        let snapshot: WorldSnapshot = serde_json::from_str(&raw)?;
        Ok(Self::new(snapshot))
    }

    pub async fn set_setting(&self, namespace: &str, key: &str, value: Value) {
        self.settings
            .write()
            .await
            .insert(flag_key(namespace, key), value);
    }

    pub async fn add_pack(&self, pack: PackSnapshot) {
        self.packs.write().await.push(pack);
    }

    pub async fn notices(&self) -> Vec<UserNotice> {
        self.notices.read().await.clone()
    }

    pub async fn gm_notifications(&self) -> Vec<PrepNotification> {
        self.gm_notifications.read().await.clone()
    }

    fn next_item_id(&self) -> ItemId {
        let next = self.next_item.fetch_add(1, Ordering::SeqCst);
        ItemId::new(format!("item-{next:04}"))
    }

    fn materialize(&self, document: EmbeddedDocument) -> ActorItem {
        match document {
            EmbeddedDocument::Spell(spell) => ActorItem::Spell(OwnedSpell {
                id: self.next_item_id(),
                name: spell.name,
                level: spell.level,
                source_id: Some(spell.source_id),
                source_class: Some(spell.source_class),
                preparation_mode: spell.preparation_mode,
                prepared: spell.prepared,
                source_item: None,
                ritual: spell.ritual,
            }),
            EmbeddedDocument::Consumable(mut item) => {
                item.id = self.next_item_id();
                ActorItem::Consumable(item)
            }
        }
    }
}

// =============================================================================
// Actor Documents
// =============================================================================

#[async_trait]
impl ActorRepo for InMemoryHost {
    async fn get(&self, id: &ActorId) -> Result<Option<Actor>, RepoError> {
        Ok(self.state.read().await.actors.get(id).cloned())
    }

    async fn update(&self, id: &ActorId, patch: ActorPatch) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        let actor = state
            .actors
            .get_mut(id)
            .ok_or_else(|| RepoError::not_found("Actor", id))?;
        if let Some(gold) = patch.gold {
            actor.currency.gp = gold;
        }
        Ok(())
    }

    async fn create_embedded(
        &self,
        id: &ActorId,
        documents: Vec<EmbeddedDocument>,
    ) -> Result<Vec<ItemId>, RepoError> {
        let items: Vec<ActorItem> = documents
            .into_iter()
            .map(|document| self.materialize(document))
            .collect();
        let ids = items.iter().filter_map(|item| item.id().cloned()).collect();

        let mut state = self.state.write().await;
        let actor = state
            .actors
            .get_mut(id)
            .ok_or_else(|| RepoError::not_found("Actor", id))?;
        actor.items.extend(items);
        Ok(ids)
    }

    async fn update_embedded(
        &self,
        id: &ActorId,
        patches: Vec<EmbeddedPatch>,
    ) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        let actor = state
            .actors
            .get_mut(id)
            .ok_or_else(|| RepoError::not_found("Actor", id))?;

        // Validate the whole batch before touching anything
        if let Some(missing) = patches.iter().find(|patch| actor.item(patch.id()).is_none()) {
            return Err(RepoError::not_found("Item", missing.id()));
        }

        for patch in patches {
            let Some(item) = actor
                .items
                .iter_mut()
                .find(|item| item.id() == Some(patch.id()))
            else {
                continue;
            };
            match (item, patch) {
                (ActorItem::Spell(spell), EmbeddedPatch::Spell(patch)) => patch.apply_to(spell),
                (ActorItem::Consumable(consumable), EmbeddedPatch::Quantity { quantity, .. }) => {
                    consumable.quantity = quantity;
                }
                (_, patch) => {
                    return Err(RepoError::constraint(format!(
                        "patch does not fit item {}",
                        patch.id()
                    )))
                }
            }
        }
        Ok(())
    }

    async fn delete_embedded(
        &self,
        id: &ActorId,
        item_ids: Vec<ItemId>,
    ) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        let actor = state
            .actors
            .get_mut(id)
            .ok_or_else(|| RepoError::not_found("Actor", id))?;
        if let Some(missing) = item_ids.iter().find(|item_id| actor.item(item_id).is_none()) {
            return Err(RepoError::not_found("Item", missing));
        }
        actor
            .items
            .retain(|item| item.id().map_or(true, |item_id| !item_ids.contains(item_id)));
        Ok(())
    }
}

// =============================================================================
// Flags
// =============================================================================

#[async_trait]
impl FlagRepo for InMemoryHost {
    async fn get_flag(
        &self,
        scope: &FlagScope,
        namespace: &str,
        key: &str,
    ) -> Result<Option<Value>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .flags
            .get(scope)
            .and_then(|flags| flags.get(&flag_key(namespace, key)))
            .cloned())
    }

    async fn set_flag(
        &self,
        scope: &FlagScope,
        namespace: &str,
        key: &str,
        value: Value,
    ) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if let FlagScope::Actor(actor_id) = scope {
            if !state.actors.contains_key(actor_id) {
                return Err(RepoError::not_found("Actor", actor_id));
            }
        }
        state
            .flags
            .entry(scope.clone())
            .or_default()
            .insert(flag_key(namespace, key), value);
        Ok(())
    }

    async fn unset_flag(
        &self,
        scope: &FlagScope,
        namespace: &str,
        key: &str,
    ) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if let Some(flags) = state.flags.get_mut(scope) {
            flags.remove(&flag_key(namespace, key));
        }
        Ok(())
    }
}

// =============================================================================
// Settings
// =============================================================================

#[async_trait]
impl SettingsRepo for InMemoryHost {
    async fn get_setting(&self, namespace: &str, key: &str) -> Result<Option<Value>, RepoError> {
        Ok(self
            .settings
            .read()
            .await
            .get(&flag_key(namespace, key))
            .cloned())
    }
}

// =============================================================================
// Compendium
// =============================================================================

#[async_trait]
impl CompendiumRepo for InMemoryHost {
    async fn packs(&self) -> Result<Vec<PackInfo>, RepoError> {
        Ok(self
            .packs
            .read()
            .await
            .iter()
            .map(|pack| pack.info.clone())
            .collect())
    }

    async fn index_pack(&self, pack: &PackId) -> Result<Vec<Spell>, RepoError> {
        self.packs
            .read()
            .await
            .iter()
            .find(|candidate| &candidate.info.id == pack)
            .map(|found| found.spells.clone())
            .ok_or_else(|| RepoError::not_found("Pack", pack))
    }

    async fn resolve_uuid(&self, uuid: &SpellUuid) -> Result<Option<Spell>, RepoError> {
        Ok(self
            .packs
            .read()
            .await
            .iter()
            .flat_map(|pack| pack.spells.iter())
            .find(|spell| &spell.uuid == uuid)
            .cloned())
    }

    async fn spell_list_pages(&self, pack: &PackId) -> Result<Vec<SpellListPage>, RepoError> {
        self.packs
            .read()
            .await
            .iter()
            .find(|candidate| &candidate.info.id == pack)
            .map(|found| found.pages.clone())
            .ok_or_else(|| RepoError::not_found("Pack", pack))
    }
}

// =============================================================================
// Notifications
// =============================================================================

#[async_trait]
impl NotificationPort for InMemoryHost {
    async fn user_notify(&self, notice: UserNotice) {
        tracing::debug!(level = ?notice.level, message = %notice.message, "User notice");
        self.notices.write().await.push(notice);
    }

    async fn notify_gm(&self, notification: PrepNotification) -> Result<(), RepoError> {
        tracing::info!(
            actor_id = %notification.actor_id,
            class_id = %notification.class_id,
            kind = ?notification.kind,
            "GM preparation notice"
        );
        self.gm_notifications.write().await.push(notification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{PackKind, FLAG_NAMESPACE};
    use spellbook_domain::{
        ClassIdentifier, ConsumableItem, NewOwnedSpell, OwnedSpellPatch, PreparationMode,
    };
    use std::io::Write;

    fn host() -> InMemoryHost {
        let mut snapshot = WorldSnapshot::default();
        snapshot.actors.push(Actor::new("actor1", "Elminster").with_gold(100));
        snapshot.packs.push(PackSnapshot {
            info: PackInfo {
                id: PackId::new("dnd5e.spells"),
                label: "Spells".into(),
                kind: PackKind::Item,
                package: "dnd5e".into(),
                folder: None,
            },
            spells: vec![Spell::new(
                SpellUuid::new("Compendium.dnd5e.spells.Item.shield"),
                "Shield",
                1,
            )],
            pages: Vec::new(),
        });
        InMemoryHost::new(snapshot)
    }

    fn new_spell() -> EmbeddedDocument {
        EmbeddedDocument::Spell(NewOwnedSpell {
            source_id: SpellUuid::new("Compendium.dnd5e.spells.Item.shield"),
            name: "Shield".into(),
            level: 1.into(),
            source_class: ClassIdentifier::new("wizard"),
            preparation_mode: PreparationMode::Prepared,
            prepared: true,
            ritual: false,
        })
    }

    #[tokio::test]
    async fn embedded_lifecycle() {
        let host = host();
        let actor_id = ActorId::new("actor1");

        let ids = host
            .create_embedded(&actor_id, vec![new_spell()])
            .await
            .unwrap();
        assert_eq!(ids.len(), 1);

        host.update_embedded(
            &actor_id,
            vec![EmbeddedPatch::Spell(OwnedSpellPatch::prepared(
                ids[0].clone(),
                false,
            ))],
        )
        .await
        .unwrap();
        let actor = host.get(&actor_id).await.unwrap().unwrap();
        assert!(!actor.spells().next().unwrap().prepared);

        host.delete_embedded(&actor_id, ids.clone()).await.unwrap();
        let actor = host.get(&actor_id).await.unwrap().unwrap();
        assert_eq!(actor.spells().count(), 0);
    }

    #[tokio::test]
    async fn batch_with_missing_item_is_rejected_whole() {
        let host = host();
        let actor_id = ActorId::new("actor1");
        let ids = host
            .create_embedded(&actor_id, vec![new_spell()])
            .await
            .unwrap();

        let result = host
            .delete_embedded(&actor_id, vec![ids[0].clone(), ItemId::new("missing")])
            .await;
        assert!(result.unwrap_err().is_not_found());
        let actor = host.get(&actor_id).await.unwrap().unwrap();
        assert_eq!(actor.spells().count(), 1);
    }

    #[tokio::test]
    async fn consumables_get_fresh_ids() {
        let host = host();
        let actor_id = ActorId::new("actor1");
        let scroll = ConsumableItem::scroll(
            "old-id",
            "Scroll of Shield",
            SpellUuid::new("Compendium.dnd5e.spells.Item.shield"),
        );
        let ids = host
            .create_embedded(&actor_id, vec![EmbeddedDocument::Consumable(scroll)])
            .await
            .unwrap();
        assert_ne!(ids[0].as_str(), "old-id");
    }

    #[tokio::test]
    async fn flags_are_scoped() {
        let host = host();
        let scope = FlagScope::Actor(ActorId::new("actor1"));
        host.set_flag(&scope, FLAG_NAMESPACE, "longRestCompleted", Value::Bool(true))
            .await
            .unwrap();
        assert_eq!(
            host.get_flag(&scope, FLAG_NAMESPACE, "longRestCompleted")
                .await
                .unwrap(),
            Some(Value::Bool(true))
        );
        assert_eq!(
            host.get_flag(&FlagScope::User, FLAG_NAMESPACE, "longRestCompleted")
                .await
                .unwrap(),
            None
        );

        let unknown = FlagScope::Actor(ActorId::new("nobody"));
        assert!(host
            .set_flag(&unknown, FLAG_NAMESPACE, "x", Value::Null)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn loads_snapshot_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"actors": [{{"id": "a1", "name": "Tasha"}}],
                "settings": {{"spell-book.spellcastingRuleSet": "modern"}}}}"#
        )
        .unwrap();

        let host = InMemoryHost::load(file.path()).await.unwrap();
        assert!(host.get(&ActorId::new("a1")).await.unwrap().is_some());
        assert_eq!(
            host.get_setting("spell-book", "spellcastingRuleSet")
                .await
                .unwrap(),
            Some(Value::String("modern".into()))
        );
    }

    #[tokio::test]
    async fn compendium_lookups() {
        let host = host();
        let pack = PackId::new("dnd5e.spells");
        assert_eq!(host.index_pack(&pack).await.unwrap().len(), 1);
        assert!(host
            .resolve_uuid(&SpellUuid::new("Compendium.dnd5e.spells.Item.shield"))
            .await
            .unwrap()
            .is_some());
        assert!(host
            .index_pack(&PackId::new("missing"))
            .await
            .unwrap_err()
            .is_not_found());
    }
}
