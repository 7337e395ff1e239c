//! JSON file codec for boards.
//!
//! # Responsibility
//! - Read a board document and reject anything that is not an ID mapping.
//! - Write a board document atomically next to its final path.
//!
//! # Invariants
//! - Readers never see a partially written document.
//! - An empty board is represented by the absence of its file.

use super::{StorageError, StorageResult};
use crate::model::item::Board;
use log::warn;
use serde_json::Value;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Result of a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Document written with this many bytes.
    Written { bytes: usize },
    /// Board was empty; any previous file was removed.
    Removed,
}

/// Serializes a board into its on-disk document.
pub fn encode_board(board: &Board) -> StorageResult<Vec<u8>> {
    serde_json::to_vec(board).map_err(StorageError::Encode)
}

/// Parses an on-disk document read from `path`.
///
/// # Errors
/// - `Malformed` when the bytes are not JSON.
/// - `NotADocument` when the top-level value is not an object.
pub fn decode_board(path: &Path, bytes: &[u8]) -> StorageResult<Board> {
    let value: Value = serde_json::from_slice(bytes).map_err(|source| StorageError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Object(fields) => Ok(fields.into_iter().collect()),
        _ => Err(StorageError::NotADocument {
            path: path.to_path_buf(),
        }),
    }
}

/// Reads and decodes the board stored at `path`.
pub async fn load_board(path: &Path) -> StorageResult<Board> {
    let bytes = tokio::fs::read(path).await.map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_board(path, &bytes)
}

/// Encodes and writes `board` to `path`.
pub async fn save_board(path: &Path, board: &Board) -> StorageResult<SaveOutcome> {
    let document = if board.is_empty() {
        None
    } else {
        Some(encode_board(board)?)
    };
    write_document(path, document).await
}

/// Writes an encoded document, or removes the file when `document` is `None`.
///
/// The parent directory is created on demand.
pub async fn write_document(path: &Path, document: Option<Vec<u8>>) -> StorageResult<SaveOutcome> {
    let Some(bytes) = document else {
        return match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(SaveOutcome::Removed),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(SaveOutcome::Removed),
            Err(source) => Err(io_error(path, source)),
        };
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| io_error(parent, source))?;
    }

    let temp_path = temp_path_for(path);
    let written = bytes.len();
    if let Err(source) = tokio::fs::write(&temp_path, bytes).await {
        discard_temp(&temp_path).await;
        return Err(io_error(&temp_path, source));
    }
    if let Err(source) = tokio::fs::rename(&temp_path, path).await {
        discard_temp(&temp_path).await;
        return Err(io_error(path, source));
    }

    Ok(SaveOutcome::Written { bytes: written })
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
    path.with_file_name(name)
}

async fn discard_temp(temp_path: &Path) {
    if let Err(err) = tokio::fs::remove_file(temp_path).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            warn!(
                "event=temp_cleanup module=storage status=error path={} error={}",
                temp_path.display(),
                err
            );
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_board, encode_board, load_board, save_board, SaveOutcome};
    use crate::model::item::Board;
    use crate::storage::StorageError;
    use serde_json::json;
    use std::path::Path;

    #[test]
    fn decode_rejects_non_mapping_documents() {
        let path = Path::new("board-x.json");
        let err = decode_board(path, b"[1, 2]").unwrap_err();
        assert!(matches!(err, StorageError::NotADocument { .. }));
        let err = decode_board(path, b"{\"a\": ").unwrap_err();
        assert!(matches!(err, StorageError::Malformed { .. }));
    }

    #[test]
    fn decode_keeps_document_order() {
        let board = decode_board(Path::new("b.json"), br#"{"z1": {}, "a2": {"x": 1}}"#).unwrap();
        let ids: Vec<_> = board.keys().cloned().collect();
        assert_eq!(ids, vec!["z1", "a2"]);
    }

    #[tokio::test]
    async fn save_then_load_reproduces_board() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("board-demo.json");

        let mut board = Board::new();
        board.insert("l2".to_string(), json!({"tool": "Pencil", "children": [{"x": 1, "y": 2}]}));
        board.insert("t1".to_string(), json!({"tool": "Text", "txt": "hi", "size": 20}));

        let outcome = save_board(&path, &board).await.unwrap();
        assert_eq!(
            outcome,
            SaveOutcome::Written {
                bytes: encode_board(&board).unwrap().len()
            }
        );
        assert_eq!(load_board(&path).await.unwrap(), board);

        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[tokio::test]
    async fn empty_board_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board-gone.json");
        std::fs::write(&path, b"{\"a1\": {}}").unwrap();

        assert_eq!(
            save_board(&path, &Board::new()).await.unwrap(),
            SaveOutcome::Removed
        );
        assert!(!path.exists());
        assert_eq!(
            save_board(&path, &Board::new()).await.unwrap(),
            SaveOutcome::Removed
        );
    }

    #[tokio::test]
    async fn load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_board(&dir.path().join("board-none.json"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
