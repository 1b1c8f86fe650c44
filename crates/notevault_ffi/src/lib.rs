//! Flutter-facing bindings for the NoteVault core.

pub mod api;
