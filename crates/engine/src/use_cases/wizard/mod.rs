//! Wizard spellbook use cases.
//!
//! Each class that keeps a spellbook has its own known list and copy ledger
//! in actor flags. Books are cached per (actor, class) and the cache is
//! rewritten on every change made through here.

mod error;

use std::collections::HashMap;
use std::sync::Arc;

use spellbook_domain::{
    Actor, ActorId, ClassIdentifier, ClassRules, CopyOptions, CopyOutcome, CopyRecord,
    DomainError, Spell, SpellUuid, WizardSpellbook,
};
use tokio::sync::Mutex;

use crate::entities::{ActorFlags, Spells};
use crate::infrastructure::app_settings::SpellbookSettings;
use crate::infrastructure::ports::{ActorPatch, ActorRepo, ClockPort};

pub use error::WizardError;

type BookKey = (ActorId, ClassIdentifier);

/// Result of a copy.
#[derive(Debug, Clone, PartialEq)]
pub struct CopyReport {
    pub outcome: CopyOutcome,
    pub spell: Spell,
    pub free_remaining: u32,
}

/// What `forget_spell` removed, enough to put it back.
#[derive(Debug, Clone, PartialEq)]
pub struct Forgotten {
    pub position: usize,
    pub record: Option<CopyRecord>,
}

/// Spellbook store.
pub struct WizardBooks {
    actors: Arc<dyn ActorRepo>,
    flags: Arc<ActorFlags>,
    spells: Arc<Spells>,
    clock: Arc<dyn ClockPort>,
    cache: Mutex<HashMap<BookKey, WizardSpellbook>>,
}

impl WizardBooks {
    pub fn new(
        actors: Arc<dyn ActorRepo>,
        flags: Arc<ActorFlags>,
        spells: Arc<Spells>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            actors,
            flags,
            spells,
            clock,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Load the spellbook of a class.
    ///
    /// # Returns
    /// * `Ok(WizardSpellbook)` - The book, from cache when present
    /// * `Err(WizardError::Validation(NoSpellbook))` - The class keeps no spellbook
    pub async fn load(
        &self,
        actor: &Actor,
        class: &ClassIdentifier,
        rules: &ClassRules,
        settings: &SpellbookSettings,
    ) -> Result<WizardSpellbook, WizardError> {
        if !rules.uses_spellbook() {
            return Err(DomainError::NoSpellbook(class.clone()).into());
        }
        let Some(spellcasting) = actor.class(class) else {
            return Err(WizardError::ClassNotFound(class.clone()));
        };

        let key = (actor.id.clone(), class.clone());
        if let Some(book) = self.cache.lock().await.get(&key) {
            // Stale once the class level or the copy rates changed
            if *book.rates() == settings.copy_rates()
                && book.max_free() == settings.copy_rates().level_grants(spellcasting.level)
            {
                return Ok(book.clone());
            }
        }

        let known = self.flags.wizard_known_spells(&actor.id, class).await?;
        let ledger = self.flags.wizard_copied_spells(&actor.id, class).await?;
        let book = WizardSpellbook::from_parts(
            class.clone(),
            spellcasting.level,
            settings.copy_rates(),
            known,
            ledger,
        );
        tracing::debug!(
            actor_id = %actor.id,
            class_id = %class,
            known = book.known_spells().len(),
            free_remaining = book.free_slots(),
            "Loaded spellbook"
        );
        self.cache.lock().await.insert(key, book.clone());
        Ok(book)
    }

    async fn fresh_actor(&self, actor_id: &ActorId) -> Result<Actor, WizardError> {
        self.actors
            .get(actor_id)
            .await?
            .ok_or(WizardError::ActorNotFound)
    }

    async fn persist(&self, actor_id: &ActorId, book: &WizardSpellbook) -> Result<(), WizardError> {
        self.flags
            .set_wizard_spellbook(actor_id, book.class(), book.known_spells(), book.ledger())
            .await?;
        self.cache
            .lock()
            .await
            .insert((actor_id.clone(), book.class().clone()), book.clone());
        Ok(())
    }

    /// Copy a spell into a class's spellbook.
    ///
    /// Gold is checked before anything is written and deducted before the
    /// book is saved; a failed save refunds it. Copying a known spell
    /// changes nothing.
    ///
    /// # Arguments
    /// * `actor_id` - Actor owning the book; re-read for this operation
    /// * `class` - Class whose book receives the spell
    /// * `uuid` - Source spell
    /// * `options` - How the copy is paid for
    pub async fn copy_spell(
        &self,
        actor_id: &ActorId,
        class: &ClassIdentifier,
        rules: &ClassRules,
        uuid: &SpellUuid,
        options: CopyOptions,
        settings: &SpellbookSettings,
    ) -> Result<CopyReport, WizardError> {
        let actor = self.fresh_actor(actor_id).await?;
        let mut book = self.load(&actor, class, rules, settings).await?;
        let spell = self
            .spells
            .resolve(uuid)
            .await?
            .ok_or_else(|| WizardError::SpellNotFound(uuid.clone()))?;

        let outcome = book.copy_spell(uuid.clone(), spell.level, options, self.clock.now())?;
        let CopyOutcome::Copied { gold_due, .. } = &outcome else {
            tracing::info!(actor_id = %actor_id, class_id = %class, uuid = %uuid, "Spell already known");
            return Ok(CopyReport {
                outcome,
                spell,
                free_remaining: book.free_slots(),
            });
        };

        let gold_due = *gold_due;
        if gold_due > actor.currency.gp {
            return Err(DomainError::insufficient_gold(gold_due, actor.currency.gp).into());
        }

        if gold_due > 0 {
            self.actors
                .update(actor_id, ActorPatch::gold(actor.currency.gp - gold_due))
                .await?;
        }
        if let Err(err) = self.persist(actor_id, &book).await {
            if gold_due > 0 {
                // Refund so a failed write never costs gold
                if let Err(refund) = self
                    .actors
                    .update(actor_id, ActorPatch::gold(actor.currency.gp))
                    .await
                {
                    tracing::error!(actor_id = %actor_id, gold = gold_due, error = %refund, "Copy refund failed");
                }
            }
            return Err(err);
        }
        tracing::info!(
            actor_id = %actor_id,
            class_id = %class,
            uuid = %uuid,
            gold = gold_due,
            free_remaining = book.free_slots(),
            "Spell copied into spellbook"
        );
        Ok(CopyReport {
            outcome,
            spell,
            free_remaining: book.free_slots(),
        })
    }

    /// Remove a spell from a spellbook.
    ///
    /// # Returns
    /// * `Ok(Some(Forgotten))` - Where it was, for `restore`
    /// * `Ok(None)` - The spell was not known
    pub async fn forget_spell(
        &self,
        actor_id: &ActorId,
        class: &ClassIdentifier,
        rules: &ClassRules,
        uuid: &SpellUuid,
        settings: &SpellbookSettings,
    ) -> Result<Option<Forgotten>, WizardError> {
        let actor = self.fresh_actor(actor_id).await?;
        let mut book = self.load(&actor, class, rules, settings).await?;
        let Some(position) = book.position(uuid) else {
            return Ok(None);
        };
        let record = book.forget(uuid);
        self.persist(actor_id, &book).await?;
        tracing::info!(actor_id = %actor_id, class_id = %class, uuid = %uuid, "Spell forgotten");
        Ok(Some(Forgotten { position, record }))
    }

    /// Put a forgotten spell back where it was.
    pub async fn restore(
        &self,
        actor_id: &ActorId,
        class: &ClassIdentifier,
        rules: &ClassRules,
        uuid: &SpellUuid,
        forgotten: Forgotten,
        settings: &SpellbookSettings,
    ) -> Result<(), WizardError> {
        let actor = self.fresh_actor(actor_id).await?;
        let mut book = self.load(&actor, class, rules, settings).await?;
        book.restore(uuid.clone(), forgotten.position, forgotten.record);
        self.persist(actor_id, &book).await
    }

    /// Drop cached books of an actor.
    pub async fn invalidate(&self, actor_id: &ActorId) {
        self.cache
            .lock()
            .await
            .retain(|(cached, _), _| cached != actor_id);
    }
}
