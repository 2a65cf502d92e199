//! Projection of the session into per-tab view models.

use std::collections::{BTreeMap, BTreeSet};

use spellbook_domain::{
    max_castable_level, ritual_castable, ClassPending, EntryFlags, Spell, SpellUuid, SwapKind,
    Verdict,
};
use spellbook_shared::{
    LevelGroup, PreparationCount, SpellEntryView, SpellbookView, TabKind, TabView, WizardStats,
};

use super::context::ClassContext;
use super::SpellbookState;

pub fn class_tab_id(class: &str) -> String {
    format!("{class}Tab")
}

pub fn wizardbook_tab_id(class: &str) -> String {
    format!("wizardbook-{class}")
}

pub fn level_name(level: u8) -> String {
    match level {
        0 => "Cantrips".to_string(),
        1 => "1st Level".to_string(),
        2 => "2nd Level".to_string(),
        3 => "3rd Level".to_string(),
        n => format!("{n}th Level"),
    }
}

pub(super) fn kind_of(spell: &Spell) -> SwapKind {
    if spell.is_cantrip() {
        SwapKind::Cantrip
    } else {
        SwapKind::Spell
    }
}

impl SpellbookState {
    /// Project the whole spellbook.
    pub fn view(&self) -> SpellbookView {
        let mut tabs = Vec::new();
        for ctx in self.context.classes.values() {
            tabs.push(self.class_tab(ctx));
            if ctx.book.is_some() {
                tabs.push(self.wizardbook_tab(ctx));
            }
        }
        let active_tab = self
            .active_tab
            .clone()
            .filter(|id| tabs.iter().any(|tab| &tab.id == id))
            .or_else(|| tabs.first().map(|tab| tab.id.clone()));

        SpellbookView {
            actor_id: self.context.actor.id.to_string(),
            actor_name: self.context.actor.name.clone(),
            tabs,
            active_tab,
            sidebar_collapsed: self.sidebar_collapsed,
            dirty: self.pending.is_dirty(),
            scrolls: self.context.scrolls.clone(),
            notices: self.notices.clone(),
        }
    }

    fn class_tab(&self, ctx: &ClassContext) -> TabView {
        let class = &ctx.class.identifier;
        let mut uuids: BTreeSet<&SpellUuid> = ctx.list.spells.iter().collect();
        // Spellbook classes copy leveled spells only; cantrips come from the class list
        if let Some(learnable) = &ctx.learnable {
            uuids.extend(
                learnable
                    .spells
                    .iter()
                    .filter(|uuid| self.context.docs.get(*uuid).is_some_and(Spell::is_cantrip)),
            );
        }
        uuids.extend(
            self.context
                .actor
                .class_spells(class)
                .filter_map(|owned| owned.source_id.as_ref()),
        );

        let visible_cantrips = ctx.rules.cantrips_visible();
        let entries = uuids
            .into_iter()
            .filter_map(|uuid| self.context.docs.get(uuid))
            .filter(|doc| {
                visible_cantrips
                    || !doc.is_cantrip()
                    || self.context.actor.find_owned(class, &doc.uuid).is_some()
            })
            .map(|doc| self.entry(ctx, doc));

        let pending = self.pending.class(class);
        let count = |kind| pending.map_or(0, |pending: &ClassPending| pending.count(kind));
        TabView {
            id: class_tab_id(class.as_str()),
            kind: TabKind::Class,
            class_identifier: class.clone(),
            title: ctx.class.name.clone(),
            spell_levels: self.group(entries),
            spell_preparation: PreparationCount {
                current: count(SwapKind::Spell),
                max: ctx.spell_max,
            },
            cantrips: visible_cantrips.then(|| PreparationCount {
                current: count(SwapKind::Cantrip),
                max: ctx.cantrip_max,
            }),
            wizard_stats: None,
            spell_window: ctx.window(SwapKind::Spell),
            cantrip_window: ctx.window(SwapKind::Cantrip),
        }
    }

    fn wizardbook_tab(&self, ctx: &ClassContext) -> TabView {
        let class = &ctx.class.identifier;
        let max_level = max_castable_level(std::slice::from_ref(&ctx.class));
        let entries = ctx
            .learnable
            .iter()
            .flat_map(|list| list.spells.iter())
            .filter_map(|uuid| self.context.docs.get(uuid))
            .filter(|doc| {
                let level = doc.level.as_number();
                level >= 1 && level <= max_level
            })
            .map(|doc| {
                let mut entry = self.entry(ctx, doc);
                entry.disabled_reason = None;
                entry
            });

        let wizard_stats = ctx.book.as_ref().map(|book| WizardStats {
            total_known: book.known_spells().len() as u32,
            free_remaining: book.free_slots(),
            max_free: book.max_free(),
            is_at_max: book.free_slots() == 0,
        });
        let spell_count = self
            .pending
            .class(class)
            .map_or(0, |pending| pending.count(SwapKind::Spell));
        TabView {
            id: wizardbook_tab_id(class.as_str()),
            kind: TabKind::Wizardbook,
            class_identifier: class.clone(),
            title: format!("{} Spellbook", ctx.class.name),
            spell_levels: self.group(entries),
            spell_preparation: PreparationCount {
                current: spell_count,
                max: ctx.spell_max,
            },
            cantrips: None,
            wizard_stats,
            spell_window: ctx.window(SwapKind::Spell),
            cantrip_window: ctx.window(SwapKind::Cantrip),
        }
    }

    fn entry(&self, ctx: &ClassContext, doc: &Spell) -> SpellEntryView {
        let class = &ctx.class.identifier;
        let owned = self.context.actor.find_owned(class, &doc.uuid);
        let (prepared, was_prepared) = self.prepared_state(class, doc);
        let known = if doc.is_cantrip() {
            None
        } else {
            ctx.is_known(&doc.uuid)
        };

        let disabled_reason = match self.verdict(ctx, doc, !prepared) {
            Verdict::Rejected(rejection) => Some(rejection.to_string()),
            _ => None,
        };
        SpellEntryView {
            uuid: doc.uuid.clone(),
            name: doc.name.clone(),
            level: doc.level.as_number(),
            school: doc.school.clone(),
            prepared,
            is_owned: owned.is_some(),
            is_granted: self
                .context
                .actor
                .find_any_owned(&doc.uuid)
                .any(|owned| owned.is_granted()),
            preparation_mode: owned.map(|owned| owned.preparation_mode),
            in_wizard_spellbook: known,
            ritual_castable: ritual_castable(
                &ctx.rules,
                doc.is_ritual(),
                prepared,
                known.unwrap_or(false),
            ),
            disabled_reason,
            pending: prepared != was_prepared,
        }
    }

    /// Filter, then group by level. Empty levels are dropped.
    fn group(&self, entries: impl Iterator<Item = SpellEntryView>) -> Vec<LevelGroup> {
        let mut levels: BTreeMap<u8, Vec<SpellEntryView>> = BTreeMap::new();
        for entry in entries {
            let Some(doc) = self.context.docs.get(&entry.uuid) else {
                continue;
            };
            let flags = EntryFlags {
                prepared: entry.prepared,
                favorited: false,
            };
            if self.filter.matches(doc, flags) {
                levels.entry(entry.level).or_default().push(entry);
            }
        }
        levels
            .into_iter()
            .map(|(level, mut spells)| {
                spells.sort_by(|a, b| a.name.cmp(&b.name));
                LevelGroup {
                    level,
                    name: level_name(level),
                    collapsed: self.collapsed_levels.contains(&level),
                    spells,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names() {
        assert_eq!(level_name(0), "Cantrips");
        assert_eq!(level_name(2), "2nd Level");
        assert_eq!(level_name(7), "7th Level");
        assert_eq!(class_tab_id("wizard"), "wizardTab");
        assert_eq!(wizardbook_tab_id("wizard"), "wizardbook-wizard");
    }
}
