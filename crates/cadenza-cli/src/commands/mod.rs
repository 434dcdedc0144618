//! CLI command implementations

pub mod build;
pub mod export_midi;
pub mod inspect;
pub mod render;
