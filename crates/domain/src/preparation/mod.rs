//! Preparation rules: transition checks for cantrips and spells, and
//! ritual castability.

mod cantrips;
mod rejection;
mod rituals;
mod spells;

pub use cantrips::{can_change_cantrip_status, CantripCheck};
pub use rejection::{Rejection, Verdict, ViolationKind};
pub use rituals::{ritual_castable, ritual_injections};
pub use spells::{can_change_spell_status, SpellCheck};
