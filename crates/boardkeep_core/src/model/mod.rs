//! Board data model.
//!
//! # Responsibility
//! - Define the item and board shapes shared by validation, eviction,
//!   persistence and the board store.
//!
//! # Invariants
//! - Items are addressed by opaque string IDs.
//! - Board iteration order is insertion order.

pub mod item;
