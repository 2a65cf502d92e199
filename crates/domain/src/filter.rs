//! Spell filtering for a tab's view.
//!
//! Filtering is pure: the same spells and the same [`SpellFilter`] always
//! produce the same output.
//!
//! The name field accepts an advanced query when it starts with `^`. Tokens
//! are whitespace separated; `field:value` tokens target one attribute
//! (`name`, `school`, `damage`, `condition`, `level`, `component`), bare
//! flags (`ritual`, `concentration`, `save`, `prepared`, `consumed`) require
//! that property, and any other bare token must match the name, school,
//! a damage type or a condition. Values may be quoted.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::entities::{Spell, SpellLevel};
use crate::error::DomainError;

static QUERY_TOKEN_REGEX: OnceLock<regex_lite::Regex> = OnceLock::new();

fn query_token_regex() -> Result<&'static regex_lite::Regex, DomainError> {
    if let Some(regex) = QUERY_TOKEN_REGEX.get() {
        return Ok(regex);
    }
    let regex = regex_lite::Regex::new(r#"(?:(\w+):)?(?:"([^"]*)"|(\S+))"#)
        .map_err(|e| DomainError::parse(format!("query regex: {e}")))?;
    Ok(QUERY_TOKEN_REGEX.get_or_init(|| regex))
}

/// Unit for range bounds and range display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DistanceUnit {
    #[default]
    Feet,
    Meters,
}

/// Per-entry facts that do not live on the spell itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryFlags {
    pub prepared: bool,
    pub favorited: bool,
}

/// Filter state for one tab. Absent fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpellFilter {
    pub name: Option<String>,
    pub level: Option<u8>,
    pub school: Option<String>,
    /// `unit:amount` such as `action:1` or `minute:10`
    pub casting_time: Option<String>,
    pub range_min: Option<u32>,
    pub range_max: Option<u32>,
    pub range_unit: DistanceUnit,
    pub damage_type: Option<String>,
    pub condition: Option<String>,
    pub ritual: Option<bool>,
    pub concentration: Option<bool>,
    pub requires_save: Option<bool>,
    pub prepared: Option<bool>,
    pub favorited: Option<bool>,
    pub material_consumed: Option<bool>,
}

impl SpellFilter {
    pub fn is_empty(&self) -> bool {
        self == &Self {
            range_unit: self.range_unit,
            ..Self::default()
        }
    }

    pub fn matches(&self, spell: &Spell, flags: EntryFlags) -> bool {
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            let matched = match name.strip_prefix('^') {
                Some(query) => AdvancedQuery::parse(query)
                    .map(|query| query.matches(spell, flags))
                    .unwrap_or(false),
                None => contains_ci(&spell.name, name),
            };
            if !matched {
                return false;
            }
        }
        if self.level.is_some_and(|level| spell.level.as_number() != level) {
            return false;
        }
        if let Some(school) = &self.school {
            if !spell.school.as_deref().is_some_and(|s| s.eq_ignore_ascii_case(school)) {
                return false;
            }
        }
        if let Some(casting_time) = &self.casting_time {
            if !spell.activation.filter_key().eq_ignore_ascii_case(casting_time) {
                return false;
            }
        }
        if self.range_min.is_some() || self.range_max.is_some() {
            let range = match self.range_unit {
                DistanceUnit::Feet => spell.range.in_feet(),
                DistanceUnit::Meters => spell.range.in_meters(),
            };
            if self.range_min.is_some_and(|min| range < min)
                || self.range_max.is_some_and(|max| range > max)
            {
                return false;
            }
        }
        if let Some(damage) = &self.damage_type {
            if !spell.damage_types.iter().any(|d| d.eq_ignore_ascii_case(damage)) {
                return false;
            }
        }
        if let Some(condition) = &self.condition {
            if !spell.conditions.iter().any(|c| c.eq_ignore_ascii_case(condition)) {
                return false;
            }
        }
        tri(self.ritual, spell.is_ritual())
            && tri(self.concentration, spell.requires_concentration())
            && tri(self.requires_save, spell.requires_save)
            && tri(self.prepared, flags.prepared)
            && tri(self.favorited, flags.favorited)
            && tri(self.material_consumed, spell.material_consumed())
    }

    /// Filter any entries that expose a spell and its flags.
    pub fn apply<'a, T, F>(&self, entries: &'a [T], view: F) -> Vec<&'a T>
    where
        F: Fn(&T) -> (&Spell, EntryFlags),
    {
        entries
            .iter()
            .filter(|entry| {
                let (spell, flags) = view(entry);
                self.matches(spell, flags)
            })
            .collect()
    }
}

fn tri(wanted: Option<bool>, actual: bool) -> bool {
    !matches!(wanted, Some(wanted) if wanted != actual)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum QueryTerm {
    Name(String),
    School(String),
    Damage(String),
    Condition(String),
    Level(SpellLevel),
    Component(char),
    Ritual,
    Concentration,
    Save,
    Prepared,
    Consumed,
    Any(String),
}

/// Parsed `^` query; every term must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvancedQuery {
    terms: Vec<QueryTerm>,
}

impl AdvancedQuery {
    pub fn parse(query: &str) -> Result<Self, DomainError> {
        let regex = query_token_regex()?;
        let mut terms = Vec::new();
        for captures in regex.captures_iter(query) {
            let field = captures.get(1).map(|m| m.as_str().to_lowercase());
            let value = captures
                .get(2)
                .or_else(|| captures.get(3))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            terms.push(Self::term(field.as_deref(), value)?);
        }
        Ok(Self { terms })
    }

    fn term(field: Option<&str>, value: String) -> Result<QueryTerm, DomainError> {
        let term = match field {
            Some("name") => QueryTerm::Name(value),
            Some("school") => QueryTerm::School(value),
            Some("damage") => QueryTerm::Damage(value),
            Some("condition") => QueryTerm::Condition(value),
            Some("level") => {
                let level: u8 = value
                    .parse()
                    .map_err(|_| DomainError::parse(format!("invalid level: {value}")))?;
                QueryTerm::Level(SpellLevel::from(level))
            }
            Some("component") => match value.to_lowercase().as_str() {
                "v" | "verbal" => QueryTerm::Component('v'),
                "s" | "somatic" => QueryTerm::Component('s'),
                "m" | "material" => QueryTerm::Component('m'),
                other => return Err(DomainError::parse(format!("unknown component: {other}"))),
            },
            Some(other) => return Err(DomainError::parse(format!("unknown query field: {other}"))),
            None => match value.to_lowercase().as_str() {
                "ritual" => QueryTerm::Ritual,
                "concentration" => QueryTerm::Concentration,
                "save" => QueryTerm::Save,
                "prepared" => QueryTerm::Prepared,
                "consumed" => QueryTerm::Consumed,
                _ => QueryTerm::Any(value),
            },
        };
        Ok(term)
    }

    pub fn matches(&self, spell: &Spell, flags: EntryFlags) -> bool {
        self.terms.iter().all(|term| match term {
            QueryTerm::Name(value) => contains_ci(&spell.name, value),
            QueryTerm::School(value) => spell
                .school
                .as_deref()
                .is_some_and(|school| school.eq_ignore_ascii_case(value)),
            QueryTerm::Damage(value) => spell.damage_types.iter().any(|d| d.eq_ignore_ascii_case(value)),
            QueryTerm::Condition(value) => spell.conditions.iter().any(|c| c.eq_ignore_ascii_case(value)),
            QueryTerm::Level(level) => spell.level == *level,
            QueryTerm::Component('v') => spell.components.verbal,
            QueryTerm::Component('s') => spell.components.somatic,
            QueryTerm::Component(_) => spell.components.material.is_some(),
            QueryTerm::Ritual => spell.is_ritual(),
            QueryTerm::Concentration => spell.requires_concentration(),
            QueryTerm::Save => spell.requires_save,
            QueryTerm::Prepared => flags.prepared,
            QueryTerm::Consumed => spell.material_consumed(),
            QueryTerm::Any(value) => {
                contains_ci(&spell.name, value)
                    || spell.school.as_deref().is_some_and(|s| s.eq_ignore_ascii_case(value))
                    || spell.damage_types.iter().any(|d| d.eq_ignore_ascii_case(value))
                    || spell.conditions.iter().any(|c| c.eq_ignore_ascii_case(value))
            }
        })
    }
}
