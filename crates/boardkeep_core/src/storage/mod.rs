//! Durable board storage.
//!
//! # Responsibility
//! - Map board names to files under the history directory.
//! - Encode/decode the whole board as one JSON document.
//!
//! # Invariants
//! - One file per board; the file name is derived only from the board name.
//! - A document on disk is always a complete write (temp file + rename).

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

mod file;

pub use file::{decode_board, encode_board, load_board, save_board, write_document, SaveOutcome};

/// Characters left readable in encoded board names.
const BOARD_NAME_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const BOARD_FILE_PREFIX: &str = "board-";
const BOARD_FILE_EXTENSION: &str = ".json";

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug)]
pub enum StorageError {
    Io { path: PathBuf, source: io::Error },
    Malformed { path: PathBuf, source: serde_json::Error },
    NotADocument { path: PathBuf },
    Encode(serde_json::Error),
}

impl StorageError {
    /// Returns whether the board file simply does not exist yet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "i/o error on `{}`: {source}", path.display()),
            Self::Malformed { path, source } => {
                write!(f, "malformed board file `{}`: {source}", path.display())
            }
            Self::NotADocument { path } => write!(
                f,
                "board file `{}` does not hold an id-to-item mapping",
                path.display()
            ),
            Self::Encode(err) => write!(f, "failed to encode board: {err}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Malformed { source, .. } => Some(source),
            Self::NotADocument { .. } => None,
            Self::Encode(err) => Some(err),
        }
    }
}

/// Returns the file backing board `name` under `history_dir`.
///
/// The name is percent-encoded so any board name maps to a single flat file.
pub fn board_path(history_dir: &Path, name: &str) -> PathBuf {
    let encoded = utf8_percent_encode(name, BOARD_NAME_SET);
    history_dir.join(format!(
        "{BOARD_FILE_PREFIX}{encoded}{BOARD_FILE_EXTENSION}"
    ))
}

#[cfg(test)]
mod tests {
    use super::{board_path, StorageError};
    use std::io;
    use std::path::{Path, PathBuf};

    #[test]
    fn board_path_is_percent_encoded() {
        let root = Path::new("/data");
        assert_eq!(
            board_path(root, "anonymous"),
            PathBuf::from("/data/board-anonymous.json")
        );
        assert_eq!(
            board_path(root, "../etc/passwd"),
            PathBuf::from("/data/board-..%2Fetc%2Fpasswd.json")
        );
        assert_eq!(
            board_path(root, "été 2024"),
            PathBuf::from("/data/board-%C3%A9t%C3%A9%202024.json")
        );
    }

    #[test]
    fn not_found_is_distinguished() {
        let err = StorageError::Io {
            path: PathBuf::from("/nope"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(err.is_not_found());
        let err = StorageError::NotADocument {
            path: PathBuf::from("/nope"),
        };
        assert!(!err.is_not_found());
    }
}
