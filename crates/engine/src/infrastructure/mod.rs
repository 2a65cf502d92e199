//! Infrastructure implementations.
//!
//! Contains port traits, the in-memory host and shared helpers.

pub mod app_settings;
pub mod cache;
pub mod clock;
pub mod memory;
pub mod ports;
