//! Domain model for pages, settings and lockout accounting.
//!
//! # Responsibility
//! - Define the canonical serialized shapes of the two persisted slots.
//! - Keep document state and security state as separate, unrelated values.
//!
//! # Invariants
//! - Page ids are opaque, immutable and unique within one document.
//! - Settings are always fully populated after deserialization.

pub mod document;
pub mod security;
pub mod settings;
