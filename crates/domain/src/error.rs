//! Errors raised by domain operations.
//!
//! A preparation check that says "no" is not an error; it is a
//! [`crate::preparation::Rejection`] inside a verdict. These variants cover
//! malformed input and ledger operations that cannot proceed.

use thiserror::Error;

use crate::ids::{ClassIdentifier, SpellUuid};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Stored text that does not parse into the expected value object
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Class {0} does not keep a spellbook")]
    NoSpellbook(ClassIdentifier),

    /// Cantrips are granted by the class and never copied
    #[error("Cantrip {0} cannot be copied into a spellbook")]
    CantripNotCopyable(SpellUuid),

    #[error("No free spellbook slots remain for {0}")]
    NoFreeSlots(ClassIdentifier),

    #[error("Insufficient gold: need {needed}, have {available}")]
    InsufficientGold { needed: u32, available: u32 },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn insufficient_gold(needed: u32, available: u32) -> Self {
        Self::InsufficientGold { needed, available }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_subject() {
        let err = DomainError::not_found("Loadout", "123e4567-e89b-12d3-a456-426614174000");
        assert_eq!(
            err.to_string(),
            "Loadout not found: 123e4567-e89b-12d3-a456-426614174000"
        );

        let err = DomainError::CantripNotCopyable(SpellUuid::new("Compendium.dnd5e.spells.Item.fb"));
        assert!(err.to_string().contains("Compendium.dnd5e.spells.Item.fb"));
    }

    #[test]
    fn insufficient_gold_reports_both_amounts() {
        let err = DomainError::insufficient_gold(150, 20);
        assert_eq!(err.to_string(), "Insufficient gold: need 150, have 20");
    }
}
