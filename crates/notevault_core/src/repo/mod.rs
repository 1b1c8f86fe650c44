//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define slot-oriented data access contracts.
//! - Isolate SQLite query details from stores and services.
//!
//! # Invariants
//! - Repositories store opaque text; (de)serialization belongs to callers.

pub mod kv_repo;
