//! Read-back snapshot of a host actor.
//!
//! The host owns the actor; the engine fetches a fresh snapshot per
//! operation and never mutates one in place to stand for host state.

use serde::{Deserialize, Serialize};

use crate::ids::{ActorId, ClassIdentifier, ItemId, SpellUuid};

use super::class::SpellcastingClass;
use super::owned_spell::OwnedSpell;

/// Consumable sub-types the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConsumableKind {
    Scroll,
    Potion,
    Wand,
    #[serde(other)]
    Other,
}

/// Activity kinds on an item; only `cast` matters here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityKind {
    Cast,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(default)]
    pub spell_uuid: Option<SpellUuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumableItem {
    pub id: ItemId,
    pub name: String,
    pub subtype: ConsumableKind,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

impl ConsumableItem {
    pub fn scroll(id: impl Into<ItemId>, name: impl Into<String>, spell: SpellUuid) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            subtype: ConsumableKind::Scroll,
            activities: vec![Activity {
                kind: ActivityKind::Cast,
                spell_uuid: Some(spell),
            }],
            quantity: 1,
        }
    }

    pub fn is_scroll(&self) -> bool {
        self.subtype == ConsumableKind::Scroll
    }

    /// Spell cast by the item's first `cast` activity.
    pub fn cast_spell(&self) -> Option<&SpellUuid> {
        self.activities
            .iter()
            .filter(|activity| activity.kind == ActivityKind::Cast)
            .find_map(|activity| activity.spell_uuid.as_ref())
    }
}

/// An item owned by an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ActorItem {
    Spell(OwnedSpell),
    Consumable(ConsumableItem),
    /// Anything the engine does not read
    #[serde(other)]
    Other,
}

impl ActorItem {
    pub fn id(&self) -> Option<&ItemId> {
        match self {
            ActorItem::Spell(spell) => Some(&spell.id),
            ActorItem::Consumable(item) => Some(&item.id),
            ActorItem::Other => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    #[serde(default)]
    pub gp: u32,
}

/// Actor snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    #[serde(default)]
    pub spellcasting_ability: Option<String>,
    /// Classes in host order
    #[serde(default)]
    pub classes: Vec<SpellcastingClass>,
    #[serde(default)]
    pub items: Vec<ActorItem>,
    #[serde(default)]
    pub currency: Currency,
}

impl Actor {
    pub fn new(id: impl Into<ActorId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            spellcasting_ability: None,
            classes: Vec::new(),
            items: Vec::new(),
            currency: Currency::default(),
        }
    }

    pub fn with_class(mut self, class: SpellcastingClass) -> Self {
        self.classes.push(class);
        self
    }

    pub fn with_item(mut self, item: ActorItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_gold(mut self, gp: u32) -> Self {
        self.currency.gp = gp;
        self
    }

    pub fn class(&self, identifier: &ClassIdentifier) -> Option<&SpellcastingClass> {
        self.classes.iter().find(|class| &class.identifier == identifier)
    }

    pub fn spellcasting_classes(&self) -> impl Iterator<Item = &SpellcastingClass> {
        self.classes.iter().filter(|class| class.is_spellcaster())
    }

    pub fn spells(&self) -> impl Iterator<Item = &OwnedSpell> {
        self.items.iter().filter_map(|item| match item {
            ActorItem::Spell(spell) => Some(spell),
            _ => None,
        })
    }

    pub fn consumables(&self) -> impl Iterator<Item = &ConsumableItem> {
        self.items.iter().filter_map(|item| match item {
            ActorItem::Consumable(consumable) => Some(consumable),
            _ => None,
        })
    }

    pub fn item(&self, id: &ItemId) -> Option<&ActorItem> {
        self.items.iter().find(|item| item.id() == Some(id))
    }

    /// Owned spells assigned to a class.
    pub fn class_spells(
        &self,
        class: &ClassIdentifier,
    ) -> impl Iterator<Item = &OwnedSpell> + '_ {
        let class = class.clone();
        self.spells().filter(move |spell| spell.belongs_to(&class))
    }

    /// Owned spell for a (class, source UUID) pair. Matches on the
    /// recorded source UUID, never on the item id.
    pub fn find_owned(&self, class: &ClassIdentifier, uuid: &SpellUuid) -> Option<&OwnedSpell> {
        self.class_spells(class).find(|spell| spell.matches_source(uuid))
    }

    /// Any owned spell with this source UUID, whatever class it belongs to.
    pub fn find_any_owned(&self, uuid: &SpellUuid) -> impl Iterator<Item = &OwnedSpell> {
        let uuid = uuid.clone();
        self.spells().filter(move |spell| spell.matches_source(&uuid))
    }

    /// Prepared leveled spells counting against a class maximum.
    pub fn prepared_count(&self, class: &ClassIdentifier) -> u32 {
        self.class_spells(class)
            .filter(|spell| spell.counts_toward_maximum())
            .count() as u32
    }

    /// Prepared cantrips a class selected (locked modes excluded).
    pub fn cantrip_count(&self, class: &ClassIdentifier) -> u32 {
        self.class_spells(class)
            .filter(|spell| {
                spell.is_cantrip()
                    && spell.prepared
                    && !spell.preparation_mode.is_locked()
            })
            .count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::owned_spell::PreparationMode;
    use crate::entities::spell::SpellLevel;

    fn owned(id: &str, uuid: &str, class: &str, level: u8, prepared: bool) -> ActorItem {
        ActorItem::Spell(OwnedSpell {
            id: ItemId::new(id),
            name: id.to_string(),
            level: SpellLevel::from(level),
            source_id: Some(SpellUuid::new(uuid)),
            source_class: Some(ClassIdentifier::new(class)),
            preparation_mode: PreparationMode::Prepared,
            prepared,
            source_item: None,
            ritual: false,
        })
    }

    #[test]
    fn find_owned_matches_source_uuid_not_item_id() {
        let actor = Actor::new("a1", "Elminster")
            .with_item(owned("item-1", "Compendium.dnd5e.spells.Item.mm", "wizard", 1, true));
        let wizard = ClassIdentifier::new("wizard");
        assert!(actor
            .find_owned(&wizard, &SpellUuid::new("Compendium.dnd5e.spells.Item.mm"))
            .is_some());
        assert!(actor.find_owned(&wizard, &SpellUuid::new("item-1")).is_none());
    }

    #[test]
    fn counts_per_class() {
        let actor = Actor::new("a1", "Multi")
            .with_item(owned("1", "u1", "wizard", 1, true))
            .with_item(owned("2", "u2", "wizard", 1, false))
            .with_item(owned("3", "u3", "wizard", 0, true))
            .with_item(owned("4", "u4", "cleric", 1, true));
        assert_eq!(actor.prepared_count(&ClassIdentifier::new("wizard")), 1);
        assert_eq!(actor.cantrip_count(&ClassIdentifier::new("wizard")), 1);
        assert_eq!(actor.prepared_count(&ClassIdentifier::new("cleric")), 1);
    }

    #[test]
    fn scroll_cast_spell() {
        let scroll = ConsumableItem::scroll(
            "s1",
            "Scroll of Sleep",
            SpellUuid::new("Compendium.dnd5e.spells.Item.sleep"),
        );
        assert!(scroll.is_scroll());
        assert_eq!(scroll.cast_spell().map(|u| u.as_str()), Some("Compendium.dnd5e.spells.Item.sleep"));
    }

    #[test]
    fn unknown_items_deserialize_as_other() {
        let json = r#"[{"type": "weapon", "id": "w1"}, {"type": "consumable", "id": "c1", "name": "Potion", "subtype": "potion"}]"#;
        let items: Vec<ActorItem> = serde_json::from_str(json).unwrap();
        assert_eq!(items[0], ActorItem::Other);
        assert!(matches!(items[1], ActorItem::Consumable(_)));
    }
}
