//! Scene reconciliation use-cases.
//!
//! # Responsibility
//! - Own the authoritative in-memory scene.
//! - Decide which source wins on load and how mutations are persisted.
//! - Keep presentation layers decoupled from remote and cache details.

pub mod scene_controller;
