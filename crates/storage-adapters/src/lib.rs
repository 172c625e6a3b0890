//! crates/storage-adapters/src/lib.rs
//!
//! Concrete implementations of the `domains` storage ports. The SQLite
//! adapter backs both the relational points store and the durable KV
//! table; the in-memory adapter serves tests and ephemeral deployments.

pub mod memory;

#[cfg(feature = "db-sqlite")]
pub mod sqlite;
