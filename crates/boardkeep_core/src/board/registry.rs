//! Name-addressed board handles.

use super::store::BoardStore;
use crate::config::BoardConfig;
use log::info;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Keeps one [`BoardStore`] per board name for the whole process.
pub struct BoardRegistry {
    config: BoardConfig,
    boards: Mutex<HashMap<String, BoardStore>>,
}

impl BoardRegistry {
    pub fn new(config: BoardConfig) -> Self {
        Self {
            config,
            boards: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Returns the board called `name`, loading it on first use.
    ///
    /// Concurrent callers asking for the same new board share one load; all of
    /// them return only after that load has finished.
    pub async fn open(&self, name: &str) -> BoardStore {
        let store = {
            let mut boards = self.boards.lock();
            match boards.get(name) {
                Some(store) => store.clone(),
                None => {
                    info!("event=board_open module=registry status=start board={name}");
                    let store = BoardStore::spawn(name, &self.config);
                    boards.insert(name.to_string(), store.clone());
                    store
                }
            }
        };
        store.ready().await;
        store
    }

    /// Returns the board called `name` if it has been opened.
    pub fn get(&self, name: &str) -> Option<BoardStore> {
        self.boards.lock().get(name).cloned()
    }

    /// Names of open boards, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.boards.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Saves every open board now and waits for the writes.
    pub async fn flush_all(&self) {
        let boards: Vec<BoardStore> = self.boards.lock().values().cloned().collect();
        for board in &boards {
            board.flush().await;
        }
        info!(
            "event=board_flush module=registry status=ok boards={}",
            boards.len()
        );
    }
}
