use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn to_uuid(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

/// Host-issued identifiers are opaque strings; wrap them so they can't be mixed up.
macro_rules! define_key {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Loadouts are the only documents this engine mints itself
define_id!(LoadoutId);

// Host document ids
define_key!(ActorId);
define_key!(ItemId);
define_key!(PackId);
define_key!(SpellUuid);

impl SpellUuid {
    /// The compendium pack holding this spell, if it is compendium-sourced.
    ///
    /// Accepts both `Compendium.<scope>.<pack>.Item.<id>` and the older
    /// `Compendium.<scope>.<pack>.<id>` form.
    pub fn pack_id(&self) -> Option<PackId> {
        let mut parts = self.0.split('.');
        if parts.next() != Some("Compendium") {
            return None;
        }
        let scope = parts.next()?;
        let pack = parts.next()?;
        // a document id must follow the pack
        parts.next()?;
        Some(PackId::new(format!("{scope}.{pack}")))
    }

    /// Trailing document id segment.
    pub fn document_id(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

/// Stable lowercase slug naming a class (e.g. `wizard`, `eldritch-knight`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassIdentifier(String);

impl ClassIdentifier {
    /// Slugify a class name or identifier.
    pub fn new(value: impl AsRef<str>) -> Self {
        let slug = value
            .as_ref()
            .trim()
            .to_lowercase()
            .split(|c: char| c.is_whitespace() || c == '_')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        Self(slug)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassIdentifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spell_uuid_pack_id() {
        let uuid = SpellUuid::new("Compendium.dnd5e.spells.Item.abc123");
        assert_eq!(uuid.pack_id(), Some(PackId::new("dnd5e.spells")));
        assert_eq!(uuid.document_id(), "abc123");

        let legacy = SpellUuid::new("Compendium.world.my-spells.xyz");
        assert_eq!(legacy.pack_id(), Some(PackId::new("world.my-spells")));
    }

    #[test]
    fn world_item_has_no_pack() {
        assert_eq!(SpellUuid::new("Item.abc").pack_id(), None);
        assert_eq!(SpellUuid::new("Compendium.dnd5e").pack_id(), None);
    }

    #[test]
    fn class_identifier_slugifies() {
        assert_eq!(ClassIdentifier::new("Wizard").as_str(), "wizard");
        assert_eq!(ClassIdentifier::new(" Eldritch Knight ").as_str(), "eldritch-knight");
        assert_eq!(ClassIdentifier::new("arcane_trickster").as_str(), "arcane-trickster");
    }

    #[test]
    fn keys_serialize_transparently() {
        let id = ActorId::new("actor1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"actor1\"");
        let class: ClassIdentifier = serde_json::from_str("\"cleric\"").unwrap();
        assert_eq!(class, ClassIdentifier::new("cleric"));
    }
}
