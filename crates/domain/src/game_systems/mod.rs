//! Game system arithmetic.
//!
//! Only D&D 5e is supported.

mod dnd5e;

pub use dnd5e::max_castable_level;
