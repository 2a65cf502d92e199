//! Spell list resolution.
//!
//! Produces the set of spell uuids a class may prepare. Resolution order:
//! the wizard spellbook when the class keeps one, the custom lists chosen
//! on the class rules, the spell list pages shipped alongside the class
//! item, any indexed page carrying the class identifier, and finally an
//! empty list.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use spellbook_domain::{ClassIdentifier, ClassRules, PackId, SpellUuid, SpellcastingClass};

use crate::infrastructure::app_settings::SpellbookSettings;
use crate::infrastructure::cache::TtlCache;
use crate::infrastructure::ports::{
    CompendiumRepo, PackInfo, PackKind, RepoError, SpellListPage,
};

/// Where a resolved list came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListSource {
    /// Known spells of the class's spellbook
    Spellbook,
    /// Custom list pages selected on the class rules
    Custom,
    /// A page shipped in the same package as the class item
    ClassPackage { page: String },
    /// A page found by identifier alone
    Identifier { page: String },
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedList {
    pub spells: BTreeSet<SpellUuid>,
    pub source: ListSource,
}

impl ResolvedList {
    fn empty() -> Self {
        Self {
            spells: BTreeSet::new(),
            source: ListSource::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }
}

/// A spell list page offered for custom list selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableList {
    pub uuid: String,
    pub name: String,
    pub identifier: ClassIdentifier,
    pub pack: PackId,
}

/// Cache key: class plus everything that changes the outcome.
type ListKey = (ClassIdentifier, String);

/// Spell list resolution with page and result caches.
pub struct SpellListOps {
    compendium: Arc<dyn CompendiumRepo>,
    pages: TtlCache<PackId, Arc<Vec<SpellListPage>>>,
    resolved: TtlCache<ListKey, Arc<ResolvedList>>,
}

impl SpellListOps {
    pub fn new(compendium: Arc<dyn CompendiumRepo>, ttl: Duration) -> Self {
        Self {
            compendium,
            pages: TtlCache::new(ttl),
            resolved: TtlCache::new(ttl),
        }
    }

    /// Resolve the preparable list of a class.
    ///
    /// # Arguments
    /// * `class` - The class on the actor
    /// * `rules` - Effective rules of that class
    /// * `known` - Known spells when the class keeps a spellbook
    /// * `settings` - World settings (indexed packs, list mappings)
    pub async fn resolve(
        &self,
        class: &SpellcastingClass,
        rules: &ClassRules,
        known: Option<&[SpellUuid]>,
        settings: &SpellbookSettings,
    ) -> Result<ResolvedList, RepoError> {
        if let Some(known) = known.filter(|_| rules.uses_spellbook()) {
            let mut spells: BTreeSet<SpellUuid> = known.iter().cloned().collect();
            if !rules.custom_spell_list.is_empty() {
                spells.extend(self.custom_lists(rules, settings).await?);
            }
            return Ok(ResolvedList {
                spells,
                source: ListSource::Spellbook,
            });
        }
        Ok(self.class_list(class, rules, settings).await?.as_ref().clone())
    }

    /// The class's list ignoring any spellbook. Wizard classes learn from it.
    pub async fn class_list(
        &self,
        class: &SpellcastingClass,
        rules: &ClassRules,
        settings: &SpellbookSettings,
    ) -> Result<Arc<ResolvedList>, RepoError> {
        let key = (class.identifier.clone(), fingerprint(class, rules, settings));
        if let Some(list) = self.resolved.get(&key).await {
            return Ok(list);
        }

        let list = Arc::new(self.resolve_uncached(class, rules, settings).await?);
        match &list.source {
            ListSource::Empty => tracing::warn!(
                class_id = %class.identifier,
                "No spell list found for class"
            ),
            source => tracing::debug!(
                class_id = %class.identifier,
                source = ?source,
                spells = list.spells.len(),
                "Resolved spell list"
            ),
        }
        self.resolved.insert(key, list.clone()).await;
        Ok(list)
    }

    async fn resolve_uncached(
        &self,
        class: &SpellcastingClass,
        rules: &ClassRules,
        settings: &SpellbookSettings,
    ) -> Result<ResolvedList, RepoError> {
        if !rules.custom_spell_list.is_empty() {
            let spells = self.custom_lists(rules, settings).await?;
            if !spells.is_empty() {
                return Ok(ResolvedList {
                    spells,
                    source: ListSource::Custom,
                });
            }
        }

        let journals = self.journal_packs(settings).await?;

        if let Some(page) = self.class_package_page(class, &journals, settings).await? {
            return Ok(ResolvedList {
                spells: page.spells.iter().cloned().collect(),
                source: ListSource::ClassPackage { page: page.uuid },
            });
        }

        for pack in &journals {
            let pages = self.pack_pages(&pack.id).await?;
            if let Some(page) = pages
                .iter()
                .find(|page| page.identifier == class.identifier && !page.spells.is_empty())
            {
                let page = self.mapped_page(page, settings).await?;
                return Ok(ResolvedList {
                    spells: page.spells.iter().cloned().collect(),
                    source: ListSource::Identifier { page: page.uuid },
                });
            }
        }

        Ok(ResolvedList::empty())
    }

    /// First non-empty page for the class inside the package of the class
    /// item's pack, preferring pages in the class item's folder.
    async fn class_package_page(
        &self,
        class: &SpellcastingClass,
        journals: &[PackInfo],
        settings: &SpellbookSettings,
    ) -> Result<Option<SpellListPage>, RepoError> {
        let Some(source) = &class.source_item else {
            return Ok(None);
        };
        let Some(source_pack) = &source.pack else {
            return Ok(None);
        };
        let all_packs = self.compendium.packs().await?;
        let Some(package) = all_packs
            .iter()
            .find(|pack| &pack.id == source_pack)
            .map(|pack| pack.package.clone())
        else {
            return Ok(None);
        };

        let mut first = None;
        for pack in journals.iter().filter(|pack| pack.package == package) {
            for page in self.pack_pages(&pack.id).await?.iter() {
                if page.identifier != class.identifier || page.spells.is_empty() {
                    continue;
                }
                let folder = page.folder.as_ref().or(pack.folder.as_ref());
                if source.folder.is_some() && folder == source.folder.as_ref() {
                    return Ok(Some(self.mapped_page(page, settings).await?));
                }
                if first.is_none() {
                    first = Some(page.clone());
                }
            }
        }
        match first {
            Some(page) => Ok(Some(self.mapped_page(&page, settings).await?)),
            None => Ok(None),
        }
    }

    /// Union of the custom list pages, after mappings.
    async fn custom_lists(
        &self,
        rules: &ClassRules,
        settings: &SpellbookSettings,
    ) -> Result<BTreeSet<SpellUuid>, RepoError> {
        let mut spells = BTreeSet::new();
        for uuid in &rules.custom_spell_list {
            let target = settings.mapped_list(uuid.as_str());
            match self.find_page(target, settings).await? {
                Some(page) => spells.extend(page.spells),
                None => tracing::warn!(page = %target, "Custom spell list page not found"),
            }
        }
        Ok(spells)
    }

    /// Replace a page with its mapped substitute when one exists.
    async fn mapped_page(
        &self,
        page: &SpellListPage,
        settings: &SpellbookSettings,
    ) -> Result<SpellListPage, RepoError> {
        let target = settings.mapped_list(&page.uuid);
        if target == page.uuid {
            return Ok(page.clone());
        }
        match self.find_page(target, settings).await? {
            Some(mapped) => Ok(mapped),
            None => {
                tracing::warn!(page = %page.uuid, mapped = %target, "Mapped spell list missing");
                Ok(page.clone())
            }
        }
    }

    async fn find_page(
        &self,
        uuid: &str,
        settings: &SpellbookSettings,
    ) -> Result<Option<SpellListPage>, RepoError> {
        // Page uuids name their pack the same way spell uuids do
        if let Some(pack) = SpellUuid::new(uuid).pack_id() {
            if let Some(page) = self.pack_pages(&pack).await?.iter().find(|p| p.uuid == uuid) {
                return Ok(Some(page.clone()));
            }
        }
        for pack in self.journal_packs(settings).await? {
            if let Some(page) = self.pack_pages(&pack.id).await?.iter().find(|p| p.uuid == uuid) {
                return Ok(Some(page.clone()));
            }
        }
        Ok(None)
    }

    async fn journal_packs(&self, settings: &SpellbookSettings) -> Result<Vec<PackInfo>, RepoError> {
        Ok(self
            .compendium
            .packs()
            .await?
            .into_iter()
            .filter(|pack| pack.kind == PackKind::JournalEntry && settings.indexes(&pack.id))
            .collect())
    }

    async fn pack_pages(&self, pack: &PackId) -> Result<Arc<Vec<SpellListPage>>, RepoError> {
        if let Some(pages) = self.pages.get(pack).await {
            return Ok(pages);
        }
        let pages = Arc::new(self.compendium.spell_list_pages(pack).await?);
        self.pages.insert(pack.clone(), pages.clone()).await;
        Ok(pages)
    }

    /// Every selectable spell list, hidden lists excluded, sorted by name.
    pub async fn available(
        &self,
        settings: &SpellbookSettings,
    ) -> Result<Vec<AvailableList>, RepoError> {
        let mut lists = Vec::new();
        for pack in self.journal_packs(settings).await? {
            for page in self.pack_pages(&pack.id).await?.iter() {
                if settings.is_hidden_list(&page.uuid) {
                    continue;
                }
                lists.push(AvailableList {
                    uuid: page.uuid.clone(),
                    name: page.name.clone(),
                    identifier: page.identifier.clone(),
                    pack: pack.id.clone(),
                });
            }
        }
        lists.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.uuid.cmp(&b.uuid)));
        Ok(lists)
    }

    /// Drop every cached page and resolved list.
    pub async fn invalidate(&self) {
        self.pages.clear().await;
        self.resolved.clear().await;
    }

    pub async fn invalidate_class(&self, class: &ClassIdentifier) {
        let dropped = self
            .resolved
            .invalidate_where(|(cached, _)| cached == class)
            .await;
        tracing::debug!(class_id = %class, dropped, "Spell list cache invalidated");
    }
}

fn fingerprint(class: &SpellcastingClass, rules: &ClassRules, settings: &SpellbookSettings) -> String {
    let source = class
        .source_item
        .as_ref()
        .map(|item| {
            format!(
                "{}/{}",
                item.pack.as_ref().map(PackId::as_str).unwrap_or_default(),
                item.folder.as_deref().unwrap_or_default()
            )
        })
        .unwrap_or_default();
    let mappings: Vec<String> = settings
        .custom_spell_mappings
        .iter()
        .map(|(from, to)| format!("{from}>{to}"))
        .collect();
    let packs: Vec<&str> = settings
        .indexed_compendiums
        .iter()
        .map(PackId::as_str)
        .collect();
    format!(
        "{}#{}#{}#{}",
        rules.list_fingerprint(),
        source,
        mappings.join(","),
        packs.join(",")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::{InMemoryHost, PackSnapshot, WorldSnapshot};
    use crate::infrastructure::ports::MockCompendiumRepo;
    use spellbook_domain::{ClassItemRef, RuleSet, SpellProgression};

    fn uuid(id: &str) -> SpellUuid {
        SpellUuid::new(format!("Compendium.dnd5e.spells.Item.{id}"))
    }

    fn page(pack: &str, id: &str, class: &str, folder: Option<&str>, spells: &[&str]) -> SpellListPage {
        SpellListPage {
            uuid: format!("Compendium.{pack}.JournalEntry.lists.JournalEntryPage.{id}"),
            name: format!("{class} spells ({id})"),
            identifier: ClassIdentifier::new(class),
            folder: folder.map(String::from),
            spells: spells.iter().map(|s| uuid(s)).collect(),
        }
    }

    fn journal(id: &str, package: &str, pages: Vec<SpellListPage>) -> PackSnapshot {
        PackSnapshot {
            info: PackInfo {
                id: PackId::new(id),
                label: id.to_string(),
                kind: PackKind::JournalEntry,
                package: package.to_string(),
                folder: None,
            },
            spells: vec![],
            pages,
        }
    }

    fn item_pack(id: &str, package: &str) -> PackSnapshot {
        PackSnapshot {
            info: PackInfo {
                id: PackId::new(id),
                label: id.to_string(),
                kind: PackKind::Item,
                package: package.to_string(),
                folder: None,
            },
            spells: vec![],
            pages: vec![],
        }
    }

    fn world() -> Arc<InMemoryHost> {
        Arc::new(InMemoryHost::new(WorldSnapshot {
            packs: vec![
                item_pack("phb.classes", "phb"),
                journal(
                    "srd.lists",
                    "srd",
                    vec![page("srd.lists", "srd-cleric", "cleric", None, &["bless"])],
                ),
                journal(
                    "phb.lists",
                    "phb",
                    vec![
                        page("phb.lists", "empty", "cleric", None, &[]),
                        page("phb.lists", "other", "cleric", Some("Other"), &["guidance"]),
                        page("phb.lists", "core", "cleric", Some("Core"), &["cure", "bless"]),
                    ],
                ),
            ],
            ..Default::default()
        }))
    }

    fn cleric(source: Option<ClassItemRef>) -> SpellcastingClass {
        let class = SpellcastingClass::new("cleric", "Cleric", 3)
            .with_progression(SpellProgression::Full);
        match source {
            Some(source) => class.with_source_item(source),
            None => class,
        }
    }

    fn rules(class: &SpellcastingClass) -> ClassRules {
        ClassRules::defaults(RuleSet::Legacy, class, true)
    }

    fn ops(host: Arc<InMemoryHost>) -> SpellListOps {
        SpellListOps::new(host, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn class_package_prefers_same_folder() {
        let class = cleric(Some(ClassItemRef {
            uuid: "Compendium.phb.classes.Item.cleric".into(),
            pack: Some(PackId::new("phb.classes")),
            folder: Some("Core".into()),
        }));
        let list = ops(world())
            .resolve(&class, &rules(&class), None, &SpellbookSettings::default())
            .await
            .unwrap();
        assert!(matches!(list.source, ListSource::ClassPackage { ref page } if page.ends_with(".core")));
        assert_eq!(list.spells, [uuid("bless"), uuid("cure")].into_iter().collect());
    }

    #[tokio::test]
    async fn class_package_falls_back_to_first_non_empty() {
        let class = cleric(Some(ClassItemRef {
            uuid: "Compendium.phb.classes.Item.cleric".into(),
            pack: Some(PackId::new("phb.classes")),
            folder: None,
        }));
        let list = ops(world())
            .resolve(&class, &rules(&class), None, &SpellbookSettings::default())
            .await
            .unwrap();
        assert!(matches!(list.source, ListSource::ClassPackage { ref page } if page.ends_with(".other")));
    }

    #[tokio::test]
    async fn identifier_search_without_class_source() {
        let class = cleric(None);
        let list = ops(world())
            .resolve(&class, &rules(&class), None, &SpellbookSettings::default())
            .await
            .unwrap();
        assert!(matches!(list.source, ListSource::Identifier { .. }));
        assert!(!list.is_empty());
    }

    #[tokio::test]
    async fn custom_list_with_mapping() {
        let class = cleric(None);
        let mut class_rules = rules(&class);
        class_rules.custom_spell_list = vec![SpellUuid::new(
            "Compendium.srd.lists.JournalEntry.lists.JournalEntryPage.srd-cleric",
        )];
        let mut settings = SpellbookSettings::default();
        settings.custom_spell_mappings.insert(
            "Compendium.srd.lists.JournalEntry.lists.JournalEntryPage.srd-cleric".into(),
            "Compendium.phb.lists.JournalEntry.lists.JournalEntryPage.other".into(),
        );

        let list = ops(world())
            .resolve(&class, &class_rules, None, &settings)
            .await
            .unwrap();
        assert_eq!(list.source, ListSource::Custom);
        assert_eq!(list.spells, [uuid("guidance")].into_iter().collect());
    }

    #[tokio::test]
    async fn spellbook_class_uses_known_spells() {
        let class = SpellcastingClass::new("wizard", "Wizard", 3)
            .with_progression(SpellProgression::Full);
        let class_rules = rules(&class);
        let known = vec![uuid("shield"), uuid("sleep")];
        let list = ops(world())
            .resolve(&class, &class_rules, Some(&known), &SpellbookSettings::default())
            .await
            .unwrap();
        assert_eq!(list.source, ListSource::Spellbook);
        assert_eq!(list.spells.len(), 2);
    }

    #[tokio::test]
    async fn unknown_class_resolves_empty() {
        let class = SpellcastingClass::new("artificer", "Artificer", 2)
            .with_progression(SpellProgression::Artificer);
        let list = ops(world())
            .resolve(&class, &rules(&class), None, &SpellbookSettings::default())
            .await
            .unwrap();
        assert_eq!(list.source, ListSource::Empty);
    }

    #[tokio::test]
    async fn results_are_cached_per_class() {
        let mut compendium = MockCompendiumRepo::new();
        compendium.expect_packs().times(1).returning(|| {
            Ok(vec![PackInfo {
                id: PackId::new("srd.lists"),
                label: "Lists".into(),
                kind: PackKind::JournalEntry,
                package: "srd".into(),
                folder: None,
            }])
        });
        compendium
            .expect_spell_list_pages()
            .times(1)
            .returning(|_| Ok(vec![page("srd.lists", "c", "cleric", None, &["bless"])]));
        let ops = SpellListOps::new(Arc::new(compendium), Duration::from_secs(60));
        let class = cleric(None);

        let first = ops
            .resolve(&class, &rules(&class), None, &SpellbookSettings::default())
            .await
            .unwrap();
        let second = ops
            .resolve(&class, &rules(&class), None, &SpellbookSettings::default())
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn available_lists_skip_hidden() {
        let mut settings = SpellbookSettings::default();
        settings
            .hidden_spell_lists
            .push("Compendium.phb.lists.JournalEntry.lists.JournalEntryPage.empty".into());
        let lists = ops(world()).available(&settings).await.unwrap();
        assert_eq!(lists.len(), 3);
        assert!(lists.windows(2).all(|pair| pair[0].name <= pair[1].name));
    }
}
