//! Deploy-time board configuration.
//!
//! # Responsibility
//! - Hold the limits and timings every board is constructed with.
//! - Read optional environment overrides once at process start.
//!
//! # Invariants
//! - A board never observes configuration changes after construction.
//! - Numeric limits are strictly positive.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

/// Default directory holding one JSON document per board.
pub const DEFAULT_HISTORY_DIR: &str = "server-data";
/// Quiet period after the last mutation before a save fires.
pub const DEFAULT_SAVE_INTERVAL: Duration = Duration::from_secs(2);
/// Upper bound between save attempts under continuous writes.
pub const DEFAULT_MAX_SAVE_DELAY: Duration = Duration::from_secs(60);
/// Items kept on a board after eviction.
pub const DEFAULT_MAX_ITEM_COUNT: usize = 65_536;
/// Children kept per item.
pub const DEFAULT_MAX_CHILDREN: usize = 128;
/// Largest accepted coordinate on either axis.
pub const DEFAULT_MAX_BOARD_SIZE: i64 = 65_536;
/// Deepest nesting level whose items may still carry children.
pub const DEFAULT_MAX_CHILD_DEPTH: usize = 32;
/// Deepest object/array nesting kept inside one item, the item itself
/// counting as level 1. Keeps saved documents readable by the JSON decoder,
/// which stops at 128 levels.
pub const DEFAULT_MAX_ITEM_NESTING: usize = 100;

const ENV_HISTORY_DIR: &str = "BOARDKEEP_HISTORY_DIR";
const ENV_SAVE_INTERVAL_MS: &str = "BOARDKEEP_SAVE_INTERVAL_MS";
const ENV_MAX_SAVE_DELAY_MS: &str = "BOARDKEEP_MAX_SAVE_DELAY_MS";
const ENV_MAX_ITEM_COUNT: &str = "BOARDKEEP_MAX_ITEM_COUNT";
const ENV_MAX_CHILDREN: &str = "BOARDKEEP_MAX_CHILDREN";
const ENV_MAX_BOARD_SIZE: &str = "BOARDKEEP_MAX_BOARD_SIZE";

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Invalid environment override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    NotANumber { key: &'static str, value: String },
    Zero { key: &'static str },
    EmptyPath { key: &'static str },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotANumber { key, value } => {
                write!(f, "{key} must be a positive integer, got `{value}`")
            }
            Self::Zero { key } => write!(f, "{key} must be greater than zero"),
            Self::EmptyPath { key } => write!(f, "{key} cannot be empty"),
        }
    }
}

impl Error for ConfigError {}

/// Limits and timings shared by every board of a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    /// Directory holding `board-<encoded name>.json` files.
    pub history_dir: PathBuf,
    /// Debounce interval between the last mutation and its save.
    pub save_interval: Duration,
    /// Staleness ceiling; a save is forced once this much time has passed
    /// since the previous attempt started.
    pub max_save_delay: Duration,
    pub max_item_count: usize,
    pub max_children: usize,
    pub max_board_size: i64,
    pub max_child_depth: usize,
    pub max_item_nesting: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            history_dir: PathBuf::from(DEFAULT_HISTORY_DIR),
            save_interval: DEFAULT_SAVE_INTERVAL,
            max_save_delay: DEFAULT_MAX_SAVE_DELAY,
            max_item_count: DEFAULT_MAX_ITEM_COUNT,
            max_children: DEFAULT_MAX_CHILDREN,
            max_board_size: DEFAULT_MAX_BOARD_SIZE,
            max_child_depth: DEFAULT_MAX_CHILD_DEPTH,
            max_item_nesting: DEFAULT_MAX_ITEM_NESTING,
        }
    }
}

impl BoardConfig {
    /// Creates the default configuration rooted at `history_dir`.
    pub fn with_history_dir(history_dir: impl Into<PathBuf>) -> Self {
        Self {
            history_dir: history_dir.into(),
            ..Self::default()
        }
    }

    /// Builds a configuration from process environment overrides.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    /// - Returns an error when a set variable is empty, zero or not an
    ///   unsigned integer.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_HISTORY_DIR) {
            let trimmed = dir.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::EmptyPath {
                    key: ENV_HISTORY_DIR,
                });
            }
            config.history_dir = PathBuf::from(trimmed);
        }
        if let Some(raw) = lookup(ENV_SAVE_INTERVAL_MS) {
            config.save_interval =
                Duration::from_millis(parse_positive(ENV_SAVE_INTERVAL_MS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_MAX_SAVE_DELAY_MS) {
            config.max_save_delay =
                Duration::from_millis(parse_positive(ENV_MAX_SAVE_DELAY_MS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_MAX_ITEM_COUNT) {
            config.max_item_count = to_usize(ENV_MAX_ITEM_COUNT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_CHILDREN) {
            config.max_children = to_usize(ENV_MAX_CHILDREN, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_BOARD_SIZE) {
            let value = parse_positive(ENV_MAX_BOARD_SIZE, &raw)?;
            config.max_board_size =
                i64::try_from(value).map_err(|_| ConfigError::NotANumber {
                    key: ENV_MAX_BOARD_SIZE,
                    value: raw.clone(),
                })?;
        }

        Ok(config)
    }
}

fn parse_positive(key: &'static str, raw: &str) -> ConfigResult<u64> {
    let value = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::NotANumber {
            key,
            value: raw.to_string(),
        })?;
    if value == 0 {
        return Err(ConfigError::Zero { key });
    }
    Ok(value)
}

fn to_usize(key: &'static str, raw: &str) -> ConfigResult<usize> {
    let value = parse_positive(key, raw)?;
    usize::try_from(value).map_err(|_| ConfigError::NotANumber {
        key,
        value: raw.to_string(),
    })
}
