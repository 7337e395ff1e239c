//! Board state holder.
//!
//! # Responsibility
//! - Keep each board's items in memory for concurrent editors.
//! - Persist boards in the background and expose readiness after load.
//!
//! # Invariants
//! - All mutations of one board go through its `BoardStore`.
//! - Only the store and its scheduler touch the save timer state.

pub mod message;
pub mod registry;
pub mod store;
