//! Scene domain model.
//!
//! # Responsibility
//! - Define the scene element record shared by the remote API and the local cache.
//! - Keep one insertion-ordered scene collection with unique ids.
//!
//! # Invariants
//! - Every element is identified by a stable `ElementId`.
//! - Category is carried by the variant payload and never changes.
//! - Elements are only removed by clearing the whole scene.

pub mod element;
pub mod scene;
