//! Cadenza CLI library.
//!
//! Command implementations for building composition files from JSON
//! descriptions, inspecting them, and rendering them to WAV.

pub mod commands;
pub mod logging;
