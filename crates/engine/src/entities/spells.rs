//! Spell document entity module.
//!
//! Fetches spell documents from the compendium. Requests are grouped by
//! pack and served from the pack index; the per-pack fetches run behind a
//! concurrency gate. Anything the index does not hold is resolved by uuid.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use spellbook_domain::{PackId, Spell, SpellUuid};

use crate::infrastructure::cache::TtlCache;
use crate::infrastructure::ports::{CompendiumRepo, RepoError};

type PackIndex = Arc<HashMap<SpellUuid, Spell>>;

/// Result of a batched fetch.
#[derive(Debug, Default)]
pub struct FetchedSpells {
    pub spells: BTreeMap<SpellUuid, Spell>,
    /// Uuids that did not resolve; already logged
    pub unresolved: Vec<SpellUuid>,
}

/// Spell entity - compendium reads with a pack index cache.
pub struct Spells {
    compendium: Arc<dyn CompendiumRepo>,
    indexes: TtlCache<PackId, PackIndex>,
}

impl Spells {
    pub fn new(compendium: Arc<dyn CompendiumRepo>, ttl: Duration) -> Self {
        Self {
            compendium,
            indexes: TtlCache::new(ttl),
        }
    }

    async fn pack_index(&self, pack: &PackId) -> Result<PackIndex, RepoError> {
        if let Some(index) = self.indexes.get(pack).await {
            return Ok(index);
        }
        let spells = self.compendium.index_pack(pack).await?;
        let index: PackIndex = Arc::new(
            spells
                .into_iter()
                .map(|spell| (spell.uuid.clone(), spell))
                .collect(),
        );
        self.indexes.insert(pack.clone(), index.clone()).await;
        tracing::debug!(pack = %pack, entries = index.len(), "Indexed pack");
        Ok(index)
    }

    /// Resolve a single spell.
    pub async fn resolve(&self, uuid: &SpellUuid) -> Result<Option<Spell>, RepoError> {
        if let Some(pack) = uuid.pack_id() {
            if let Ok(index) = self.pack_index(&pack).await {
                if let Some(spell) = index.get(uuid) {
                    return Ok(Some(spell.clone()));
                }
            }
        }
        self.compendium.resolve_uuid(uuid).await
    }

    async fn resolve_loose(&self, uuids: Vec<SpellUuid>) -> Vec<(SpellUuid, Option<Spell>)> {
        let mut resolved = Vec::with_capacity(uuids.len());
        for uuid in uuids {
            let spell = match self.compendium.resolve_uuid(&uuid).await {
                Ok(spell) => spell,
                Err(e) => {
                    tracing::warn!(uuid = %uuid, error = %e, "Spell resolution failed");
                    None
                }
            };
            resolved.push((uuid, spell));
        }
        resolved
    }

    async fn fetch_group(
        &self,
        pack: Option<PackId>,
        uuids: Vec<SpellUuid>,
    ) -> Vec<(SpellUuid, Option<Spell>)> {
        let Some(pack) = pack else {
            return self.resolve_loose(uuids).await;
        };
        let index = match self.pack_index(&pack).await {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(pack = %pack, error = %e, "Pack index unavailable, resolving by uuid");
                return self.resolve_loose(uuids).await;
            }
        };

        let (found, missing): (Vec<_>, Vec<_>) =
            uuids.into_iter().partition(|uuid| index.contains_key(uuid));
        let mut resolved: Vec<_> = found
            .into_iter()
            .map(|uuid| {
                let spell = index.get(&uuid).cloned();
                (uuid, spell)
            })
            .collect();
        resolved.extend(self.resolve_loose(missing).await);
        resolved
    }

    /// Fetch many spells, at most `concurrency` packs in flight.
    pub async fn fetch_many(
        &self,
        uuids: impl IntoIterator<Item = SpellUuid>,
        concurrency: usize,
    ) -> FetchedSpells {
        let mut groups: BTreeMap<Option<PackId>, Vec<SpellUuid>> = BTreeMap::new();
        for uuid in uuids {
            let group = groups.entry(uuid.pack_id()).or_default();
            if !group.contains(&uuid) {
                group.push(uuid);
            }
        }

        let results: Vec<Vec<(SpellUuid, Option<Spell>)>> = stream::iter(groups)
            .map(|(pack, uuids)| self.fetch_group(pack, uuids))
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut fetched = FetchedSpells::default();
        for (uuid, spell) in results.into_iter().flatten() {
            match spell {
                Some(spell) => {
                    fetched.spells.insert(uuid, spell);
                }
                None => {
                    tracing::warn!(uuid = %uuid, "Spell could not be resolved, omitting");
                    fetched.unresolved.push(uuid);
                }
            }
        }
        fetched
    }

    /// Drop cached pack indexes.
    pub async fn invalidate(&self) {
        self.indexes.clear().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::MockCompendiumRepo;

    fn uuid(pack: &str, id: &str) -> SpellUuid {
        SpellUuid::new(format!("Compendium.{pack}.Item.{id}"))
    }

    #[tokio::test]
    async fn one_index_call_per_pack() {
        let mut compendium = MockCompendiumRepo::new();
        compendium
            .expect_index_pack()
            .times(1)
            .returning(|pack| {
                Ok(vec![
                    Spell::new(uuid(pack.as_str(), "a"), "Alarm", 1),
                    Spell::new(uuid(pack.as_str(), "b"), "Bless", 1),
                ])
            });
        let spells = Spells::new(Arc::new(compendium), Duration::from_secs(60));

        let fetched = spells
            .fetch_many(
                [uuid("dnd5e.spells", "a"), uuid("dnd5e.spells", "b")],
                5,
            )
            .await;
        assert_eq!(fetched.spells.len(), 2);

        // Served from the cached index
        let again = spells.fetch_many([uuid("dnd5e.spells", "a")], 5).await;
        assert_eq!(again.spells.len(), 1);
    }

    #[tokio::test]
    async fn unresolvable_spells_are_omitted() {
        let mut compendium = MockCompendiumRepo::new();
        compendium
            .expect_index_pack()
            .returning(|_| Err(RepoError::host("index_pack", "locked")));
        compendium.expect_resolve_uuid().returning(|uuid| {
            if uuid.as_str().ends_with(".a") {
                Ok(Some(Spell::new(uuid.clone(), "Alarm", 1)))
            } else {
                Ok(None)
            }
        });
        let spells = Spells::new(Arc::new(compendium), Duration::from_secs(60));

        let fetched = spells
            .fetch_many(
                [uuid("dnd5e.spells", "a"), uuid("dnd5e.spells", "gone")],
                2,
            )
            .await;
        assert_eq!(fetched.spells.len(), 1);
        assert_eq!(fetched.unresolved, vec![uuid("dnd5e.spells", "gone")]);
    }
}
