//! Core use-case services.
//!
//! # Responsibility
//! - Own the document state and its persistence ([`document_store`]).
//! - Run backup export/import over the vault primitives ([`vault_service`]).
//! - Tie a store, a search controller and an editor surface together
//!   ([`editor_session`]).

pub mod document_store;
pub mod editor_session;
pub mod vault_service;
