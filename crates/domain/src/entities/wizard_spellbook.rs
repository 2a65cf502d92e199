//! Wizard spellbook: the per-class known list and its copy ledger.
//!
//! A spell must be recorded here before a wizard class may prepare it. The
//! spellbook is stored in actor flags; this type is the in-memory form and
//! holds all the arithmetic (costs, free slots).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::{ClassIdentifier, SpellUuid};

use super::spell::SpellLevel;

/// Rates for copying spells and granting free slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyRates {
    pub cost_per_level: u32,
    pub hours_per_level: u32,
    pub starting_spells: u32,
    pub spells_per_level: u32,
}

impl Default for CopyRates {
    fn default() -> Self {
        Self {
            cost_per_level: 50,
            hours_per_level: 2,
            starting_spells: 2,
            spells_per_level: 2,
        }
    }
}

impl CopyRates {
    pub fn cost(&self, level: SpellLevel) -> u32 {
        u32::from(level.as_number()) * self.cost_per_level
    }

    pub fn hours(&self, level: SpellLevel) -> u32 {
        u32::from(level.as_number()) * self.hours_per_level
    }

    /// Free spells granted up to `class_level`.
    pub fn level_grants(&self, class_level: u8) -> u32 {
        let gained = u32::from(class_level.saturating_sub(1));
        self.spells_per_level * gained + self.starting_spells
    }
}

/// Ledger entry for a copied spell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyRecord {
    pub cost: u32,
    pub time: u32,
    pub was_free: bool,
    #[serde(rename = "at")]
    pub learned_at: DateTime<Utc>,
}

/// How a copy should be paid for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyOptions {
    pub pay_cost: bool,
    pub pay_time: bool,
    pub is_free: bool,
}

impl CopyOptions {
    pub fn free() -> Self {
        Self {
            pay_cost: false,
            pay_time: false,
            is_free: true,
        }
    }

    pub fn paid() -> Self {
        Self {
            pay_cost: true,
            pay_time: true,
            is_free: false,
        }
    }
}

/// Outcome of a copy.
#[derive(Debug, Clone, PartialEq)]
pub enum CopyOutcome {
    /// The spell was already known; nothing changed.
    AlreadyKnown,
    /// Newly recorded; `gold_due` is what the caller must deduct.
    Copied { record: CopyRecord, gold_due: u32 },
}

/// Known spells of one wizard-enabled class.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardSpellbook {
    class: ClassIdentifier,
    class_level: u8,
    known: Vec<SpellUuid>,
    ledger: BTreeMap<SpellUuid, CopyRecord>,
    rates: CopyRates,
}

impl WizardSpellbook {
    pub fn new(class: ClassIdentifier, class_level: u8, rates: CopyRates) -> Self {
        Self {
            class,
            class_level,
            known: Vec::new(),
            ledger: BTreeMap::new(),
            rates,
        }
    }

    /// Rebuild from persisted parts; duplicate entries are dropped.
    pub fn from_parts(
        class: ClassIdentifier,
        class_level: u8,
        rates: CopyRates,
        known: Vec<SpellUuid>,
        ledger: BTreeMap<SpellUuid, CopyRecord>,
    ) -> Self {
        let mut book = Self::new(class, class_level, rates);
        for uuid in known {
            if !book.known.contains(&uuid) {
                book.known.push(uuid);
            }
        }
        book.ledger = ledger;
        book
    }

    pub fn class(&self) -> &ClassIdentifier {
        &self.class
    }

    pub fn rates(&self) -> &CopyRates {
        &self.rates
    }

    pub fn is_known(&self, uuid: &SpellUuid) -> bool {
        self.known.contains(uuid)
    }

    pub fn known_spells(&self) -> &[SpellUuid] {
        &self.known
    }

    pub fn ledger(&self) -> &BTreeMap<SpellUuid, CopyRecord> {
        &self.ledger
    }

    pub fn record(&self, uuid: &SpellUuid) -> Option<&CopyRecord> {
        self.ledger.get(uuid)
    }

    pub fn free_slots_used(&self) -> u32 {
        self.ledger.values().filter(|record| record.was_free).count() as u32
    }

    pub fn free_slots(&self) -> u32 {
        self.rates
            .level_grants(self.class_level)
            .saturating_sub(self.free_slots_used())
    }

    pub fn max_free(&self) -> u32 {
        self.rates.level_grants(self.class_level)
    }

    /// Record a spell as known.
    ///
    /// A free copy costs nothing and consumes a free slot; a paid copy
    /// reports the gold due when `pay_cost` is set. Copying an already known
    /// spell succeeds without changes.
    pub fn copy_spell(
        &mut self,
        uuid: SpellUuid,
        level: SpellLevel,
        options: CopyOptions,
        now: DateTime<Utc>,
    ) -> Result<CopyOutcome, DomainError> {
        if self.is_known(&uuid) {
            return Ok(CopyOutcome::AlreadyKnown);
        }
        if level.is_cantrip() {
            return Err(DomainError::CantripNotCopyable(uuid));
        }
        if options.is_free && self.free_slots() == 0 {
            return Err(DomainError::NoFreeSlots(self.class.clone()));
        }

        let (cost, time) = if options.is_free {
            (0, 0)
        } else {
            let cost = if options.pay_cost { self.rates.cost(level) } else { 0 };
            let time = if options.pay_time { self.rates.hours(level) } else { 0 };
            (cost, time)
        };
        let record = CopyRecord {
            cost,
            time,
            was_free: options.is_free,
            learned_at: now,
        };
        self.known.push(uuid.clone());
        self.ledger.insert(uuid, record.clone());
        Ok(CopyOutcome::Copied {
            record,
            gold_due: cost,
        })
    }

    /// Remove a spell and its ledger entry. Returns the removed record.
    pub fn forget(&mut self, uuid: &SpellUuid) -> Option<CopyRecord> {
        let position = self.known.iter().position(|known| known == uuid)?;
        self.known.remove(position);
        self.ledger.remove(uuid)
    }

    /// Restore a forgotten spell at its previous position.
    pub fn restore(&mut self, uuid: SpellUuid, position: usize, record: Option<CopyRecord>) {
        if self.is_known(&uuid) {
            return;
        }
        let position = position.min(self.known.len());
        self.known.insert(position, uuid.clone());
        if let Some(record) = record {
            self.ledger.insert(uuid, record);
        }
    }

    pub fn position(&self, uuid: &SpellUuid) -> Option<usize> {
        self.known.iter().position(|known| known == uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn book(level: u8) -> WizardSpellbook {
        WizardSpellbook::new(ClassIdentifier::new("wizard"), level, CopyRates::default())
    }

    #[test]
    fn level_three_has_six_free_slots() {
        assert_eq!(book(3).free_slots(), 6);
        assert_eq!(book(1).free_slots(), 2);
    }

    #[test]
    fn free_copy_consumes_slot() {
        let mut book = book(3);
        let outcome = book
            .copy_spell(SpellUuid::new("a1"), SpellLevel::Level(1), CopyOptions::free(), now())
            .unwrap();
        match outcome {
            CopyOutcome::Copied { record, gold_due } => {
                assert!(record.was_free);
                assert_eq!(record.cost, 0);
                assert_eq!(gold_due, 0);
            }
            CopyOutcome::AlreadyKnown => panic!("expected a copy"),
        }
        assert_eq!(book.free_slots(), 5);
    }

    #[test]
    fn paid_copy_keeps_free_slots() {
        let mut book = book(3);
        book.copy_spell(SpellUuid::new("a1"), SpellLevel::Level(1), CopyOptions::free(), now())
            .unwrap();
        let outcome = book
            .copy_spell(SpellUuid::new("a2"), SpellLevel::Level(1), CopyOptions::paid(), now())
            .unwrap();
        assert!(matches!(outcome, CopyOutcome::Copied { gold_due: 50, .. }));
        assert_eq!(book.record(&SpellUuid::new("a2")).map(|r| r.time), Some(2));
        assert_eq!(book.free_slots(), 5);
    }

    #[test]
    fn copy_is_idempotent() {
        let mut book = book(3);
        book.copy_spell(SpellUuid::new("a1"), SpellLevel::Level(2), CopyOptions::paid(), now())
            .unwrap();
        let again = book
            .copy_spell(SpellUuid::new("a1"), SpellLevel::Level(2), CopyOptions::paid(), now())
            .unwrap();
        assert_eq!(again, CopyOutcome::AlreadyKnown);
        assert_eq!(book.known_spells().len(), 1);
    }

    #[test]
    fn cantrips_are_not_copyable() {
        let mut book = book(3);
        let result = book.copy_spell(
            SpellUuid::new("c1"),
            SpellLevel::Cantrip,
            CopyOptions::free(),
            now(),
        );
        assert!(matches!(result, Err(DomainError::CantripNotCopyable(_))));
        assert_eq!(book.free_slots(), 6);
    }

    #[test]
    fn free_copy_without_slots_fails() {
        let mut book = book(1);
        for id in ["a", "b"] {
            book.copy_spell(SpellUuid::new(id), SpellLevel::Level(1), CopyOptions::free(), now())
                .unwrap();
        }
        let result = book.copy_spell(SpellUuid::new("c"), SpellLevel::Level(1), CopyOptions::free(), now());
        assert!(matches!(result, Err(DomainError::NoFreeSlots(_))));
    }

    #[test]
    fn forget_then_restore_is_identical() {
        let mut book = book(3);
        for id in ["a", "b", "c"] {
            book.copy_spell(SpellUuid::new(id), SpellLevel::Level(1), CopyOptions::paid(), now())
                .unwrap();
        }
        let before = book.clone();
        let uuid = SpellUuid::new("b");
        let position = book.position(&uuid).unwrap();
        let record = book.forget(&uuid);
        assert!(!book.is_known(&uuid));
        book.restore(uuid, position, record);
        assert_eq!(book, before);
    }
}
