//! Scroll use cases - learning spells from scrolls in the actor's inventory.

mod error;

use std::sync::Arc;

use spellbook_domain::{
    max_castable_level, Actor, ActorId, ClassIdentifier, ClassRules, ConsumableItem, CopyOptions,
    CopyOutcome, ItemId, SpellUuid, SpellcastingClass,
};
use spellbook_shared::LearnableScroll;

use crate::entities::Spells;
use crate::infrastructure::app_settings::SpellbookSettings;
use crate::infrastructure::ports::{ActorPatch, ActorRepo, EmbeddedDocument, EmbeddedPatch};
use crate::use_cases::rules::ActorRules;
use crate::use_cases::wizard::{CopyReport, WizardBooks};

pub use error::ScrollError;

/// What happened to the scroll item when its spell was learned.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollConsumption {
    Kept,
    Deleted,
    /// Quantity lowered by one
    Decremented,
}

/// Everything needed to revert one scroll learning.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollUndo {
    pub actor_id: ActorId,
    pub class: ClassIdentifier,
    pub uuid: SpellUuid,
    pub gold_paid: u32,
    /// The scroll as it was before learning
    pub scroll: ConsumableItem,
    pub consumption: ScrollConsumption,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollLearning {
    pub report: CopyReport,
    /// `None` when the spell was already known and nothing changed
    pub undo: Option<ScrollUndo>,
}

/// Scroll scanning and learning.
pub struct ScrollOps {
    actors: Arc<dyn ActorRepo>,
    books: Arc<WizardBooks>,
    spells: Arc<Spells>,
}

impl ScrollOps {
    pub fn new(actors: Arc<dyn ActorRepo>, books: Arc<WizardBooks>, spells: Arc<Spells>) -> Self {
        Self {
            actors,
            books,
            spells,
        }
    }

    /// List the scrolls `actor` could learn from.
    ///
    /// Only spells between 1st level and the actor's highest castable level
    /// are listed. Empty when no class keeps a spellbook.
    pub async fn scan(
        &self,
        actor: &Actor,
        rules: &ActorRules,
        settings: &SpellbookSettings,
    ) -> Result<Vec<LearnableScroll>, ScrollError> {
        let mut books = Vec::new();
        for (class, class_rules) in rules.classes.iter().filter(|(_, r)| r.uses_spellbook()) {
            books.push(self.books.load(actor, class, class_rules, settings).await?);
        }
        if books.is_empty() {
            return Ok(Vec::new());
        }

        let classes: Vec<SpellcastingClass> = actor.spellcasting_classes().cloned().collect();
        let max_level = max_castable_level(&classes);
        let rates = settings.copy_rates();

        let mut scrolls = Vec::new();
        for item in actor.consumables().filter(|item| item.is_scroll()) {
            let Some(uuid) = item.cast_spell() else {
                continue;
            };
            let Some(spell) = self.spells.resolve(uuid).await? else {
                tracing::warn!(actor_id = %actor.id, item_id = %item.id, uuid = %uuid, "Scroll spell could not be resolved");
                continue;
            };
            let level = spell.level.as_number();
            if level == 0 || level > max_level {
                continue;
            }
            scrolls.push(LearnableScroll {
                scroll_item_id: item.id.clone(),
                spell_uuid: uuid.clone(),
                name: spell.name.clone(),
                level,
                cost: rates.cost(spell.level),
                time: rates.hours(spell.level),
                already_known: books.iter().any(|book| book.is_known(uuid)),
            });
        }
        tracing::debug!(actor_id = %actor.id, count = scrolls.len(), max_level, "Scanned scrolls");
        Ok(scrolls)
    }

    /// Copy the spell of a scroll into a class's spellbook.
    ///
    /// # Returns
    /// * `Ok(None)` - The scroll is no longer in the inventory; nothing changed
    /// * `Ok(Some(ScrollLearning))` - The copy result and its undo record
    pub async fn learn(
        &self,
        actor_id: &ActorId,
        class: &ClassIdentifier,
        rules: &ClassRules,
        scroll_id: &ItemId,
        settings: &SpellbookSettings,
    ) -> Result<Option<ScrollLearning>, ScrollError> {
        let actor = self
            .actors
            .get(actor_id)
            .await?
            .ok_or(ScrollError::ActorNotFound)?;
        let Some(scroll) = actor
            .consumables()
            .find(|item| &item.id == scroll_id && item.is_scroll())
            .cloned()
        else {
            tracing::debug!(actor_id = %actor_id, item_id = %scroll_id, "Scroll already gone");
            return Ok(None);
        };
        let Some(uuid) = scroll.cast_spell().cloned() else {
            tracing::warn!(actor_id = %actor_id, item_id = %scroll_id, "Scroll casts no spell");
            return Ok(None);
        };

        let options = CopyOptions {
            pay_cost: settings.deduct_spell_learning_cost,
            pay_time: true,
            is_free: false,
        };
        let report = self
            .books
            .copy_spell(actor_id, class, rules, &uuid, options, settings)
            .await?;
        let gold_paid = match &report.outcome {
            CopyOutcome::AlreadyKnown => return Ok(Some(ScrollLearning { report, undo: None })),
            CopyOutcome::Copied { gold_due, .. } => *gold_due,
        };

        let consumption = if !settings.consume_scrolls_when_learning {
            ScrollConsumption::Kept
        } else if scroll.quantity > 1 {
            self.actors
                .update_embedded(
                    actor_id,
                    vec![EmbeddedPatch::Quantity {
                        id: scroll.id.clone(),
                        quantity: scroll.quantity - 1,
                    }],
                )
                .await?;
            ScrollConsumption::Decremented
        } else {
            self.actors
                .delete_embedded(actor_id, vec![scroll.id.clone()])
                .await?;
            ScrollConsumption::Deleted
        };
        tracing::info!(
            actor_id = %actor_id,
            class_id = %class,
            uuid = %uuid,
            consumption = ?consumption,
            "Learned spell from scroll"
        );

        Ok(Some(ScrollLearning {
            report,
            undo: Some(ScrollUndo {
                actor_id: actor_id.clone(),
                class: class.clone(),
                uuid,
                gold_paid,
                scroll,
                consumption,
            }),
        }))
    }

    /// Revert a scroll learning: forget the spell, refund gold and give the
    /// scroll back.
    pub async fn undo(
        &self,
        undo: ScrollUndo,
        rules: &ClassRules,
        settings: &SpellbookSettings,
    ) -> Result<(), ScrollError> {
        let ScrollUndo {
            actor_id,
            class,
            uuid,
            gold_paid,
            scroll,
            consumption,
        } = undo;

        self.books
            .forget_spell(&actor_id, &class, rules, &uuid, settings)
            .await?;

        let actor = self
            .actors
            .get(&actor_id)
            .await?
            .ok_or(ScrollError::ActorNotFound)?;
        if gold_paid > 0 {
            self.actors
                .update(&actor_id, ActorPatch::gold(actor.currency.gp + gold_paid))
                .await?;
        }

        match consumption {
            ScrollConsumption::Kept => {}
            ScrollConsumption::Decremented
                if actor.consumables().any(|item| item.id == scroll.id) =>
            {
                let current = actor
                    .consumables()
                    .find(|item| item.id == scroll.id)
                    .map_or(0, |item| item.quantity);
                self.actors
                    .update_embedded(
                        &actor_id,
                        vec![EmbeddedPatch::Quantity {
                            id: scroll.id.clone(),
                            quantity: current + 1,
                        }],
                    )
                    .await?;
            }
            ScrollConsumption::Decremented | ScrollConsumption::Deleted => {
                let restored = ConsumableItem {
                    quantity: 1,
                    ..scroll
                };
                self.actors
                    .create_embedded(&actor_id, vec![EmbeddedDocument::Consumable(restored)])
                    .await?;
            }
        }
        tracing::info!(actor_id = %actor_id, class_id = %class, uuid = %uuid, "Scroll learning undone");
        Ok(())
    }
}
