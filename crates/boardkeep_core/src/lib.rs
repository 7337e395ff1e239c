//! Authoritative in-memory state for collaborative drawing boards.
//! Boards are validated on write and persisted in the background.

pub mod board;
pub mod config;
pub mod evict;
pub mod logging;
pub mod model;
pub mod scheduler;
pub mod storage;
pub mod validate;

pub use board::message::{MessageError, MessageResult};
pub use board::registry::BoardRegistry;
pub use board::store::{BoardStats, BoardStore, Readiness};
pub use config::{BoardConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::item::{Board, Item, ItemId};
pub use storage::{board_path, StorageError, StorageResult};
pub use validate::Validator;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
