//! In-memory board state with background persistence.
//!
//! # Responsibility
//! - Own the ID-to-item mapping of one board.
//! - Validate writes, schedule saves and report readiness after load.
//!
//! # Invariants
//! - Mutations never wait on I/O and never fail because of it.
//! - Every stored item has been through the validator.
//! - At most one save writes the board file at a time.
//! - Readiness moves `Loading -> Ready` exactly once.

use crate::config::BoardConfig;
use crate::evict;
use crate::model::item::{empty_item, is_structured, Board, Item, CHILDREN_FIELD};
use crate::scheduler::{Persist, PersistenceScheduler};
use crate::storage::{self, board_path, SaveOutcome};
use crate::validate::Validator;
use log::{error, info};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::watch;

/// Initial-load state of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Loading,
    Ready,
}

/// Point-in-time summary of a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardStats {
    pub name: String,
    pub items: usize,
    pub path: PathBuf,
    pub readiness: Readiness,
}

/// Shared handle to one board. Cloning is cheap; all clones see the same state.
#[derive(Clone)]
pub struct BoardStore {
    shared: Arc<BoardShared>,
}

struct BoardShared {
    name: String,
    path: PathBuf,
    max_item_count: usize,
    validator: Validator,
    items: Mutex<Board>,
    scheduler: PersistenceScheduler,
    write_lock: tokio::sync::Mutex<()>,
    readiness: watch::Sender<Readiness>,
}

impl BoardStore {
    /// Creates board `name` and starts loading it in the background.
    ///
    /// The returned store is `Loading`; await [`BoardStore::ready`] before
    /// serving clients.
    ///
    /// # Panics
    /// - Panics when called outside a Tokio runtime.
    pub fn spawn(name: impl Into<String>, config: &BoardConfig) -> Self {
        let runtime = Handle::current();
        let name = name.into();
        let (readiness, _) = watch::channel(Readiness::Loading);
        let shared = Arc::new(BoardShared {
            path: board_path(&config.history_dir, &name),
            name,
            max_item_count: config.max_item_count,
            validator: Validator::new(config),
            items: Mutex::new(Board::new()),
            scheduler: PersistenceScheduler::new(
                config.save_interval,
                config.max_save_delay,
                runtime.clone(),
            ),
            write_lock: tokio::sync::Mutex::new(()),
            readiness,
        });

        runtime.spawn(Arc::clone(&shared).load());
        Self { shared }
    }

    /// Creates board `name` and returns once its initial load has finished.
    pub async fn open(name: impl Into<String>, config: &BoardConfig) -> Self {
        let store = Self::spawn(name, config);
        store.ready().await;
        store
    }

    /// Resolves once the initial load has completed (successfully or not).
    pub async fn ready(&self) {
        let mut receiver = self.shared.readiness.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here.
        let _ = receiver.wait_for(|state| *state == Readiness::Ready).await;
    }

    pub fn readiness(&self) -> Readiness {
        *self.shared.readiness.borrow()
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// File backing this board.
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    pub fn len(&self) -> usize {
        self.shared.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.items.lock().is_empty()
    }

    pub fn stats(&self) -> BoardStats {
        BoardStats {
            name: self.shared.name.clone(),
            items: self.len(),
            path: self.shared.path.clone(),
            readiness: self.readiness(),
        }
    }

    /// Stores `item` under `id`, replacing whatever was there.
    pub fn set(&self, id: impl Into<String>, mut item: Item) {
        self.shared.validator.validate(&mut item);
        self.shared.items.lock().insert(id.into(), item);
        self.schedule_save();
    }

    /// Appends `child` to the children of `parent_id`.
    ///
    /// A missing parent is created empty when `create` is set; otherwise the
    /// call returns `false` and nothing changes. A parent that is not an
    /// object is replaced by an empty item.
    pub fn add_child(&self, parent_id: &str, child: Item, create: bool) -> bool {
        {
            let mut items = self.shared.items.lock();
            if !items.contains_key(parent_id) {
                if !create {
                    return false;
                }
                items.insert(parent_id.to_string(), empty_item());
            }
            let Some(parent) = items.get_mut(parent_id) else {
                return false;
            };
            if !is_structured(parent) {
                *parent = empty_item();
            }
            if let Some(fields) = parent.as_object_mut() {
                let children = fields
                    .entry(CHILDREN_FIELD)
                    .or_insert_with(|| Value::Array(Vec::new()));
                if !children.is_array() {
                    *children = Value::Array(Vec::new());
                }
                if let Some(list) = children.as_array_mut() {
                    list.push(child);
                }
            }
            self.shared.validator.validate(parent);
        }
        self.schedule_save();
        true
    }

    /// Merges `patch` into the item at `id`.
    ///
    /// - Existing object and object patch: patch fields win, others stay.
    /// - Otherwise, when an item exists or `create` is set, the slot is
    ///   replaced by `patch`.
    /// - Otherwise nothing changes.
    ///
    /// The resulting item is validated. Returns whether the board changed.
    pub fn update(&self, id: &str, patch: Item, create: bool) -> bool {
        let applied = {
            let mut items = self.shared.items.lock();
            match items.get_mut(id) {
                Some(existing) => {
                    match patch {
                        Value::Object(changes) if is_structured(existing) => {
                            if let Some(fields) = existing.as_object_mut() {
                                fields.extend(changes);
                            }
                        }
                        replacement => *existing = replacement,
                    }
                    self.shared.validator.validate(existing);
                    true
                }
                None if create => {
                    let mut item = patch;
                    self.shared.validator.validate(&mut item);
                    items.insert(id.to_string(), item);
                    true
                }
                None => false,
            }
        };
        self.schedule_save();
        applied
    }

    /// Removes the item at `id`. Returns whether it existed.
    pub fn delete(&self, id: &str) -> bool {
        let removed = self.shared.items.lock().shift_remove(id).is_some();
        self.schedule_save();
        removed
    }

    pub fn get(&self, id: &str) -> Option<Item> {
        self.shared.items.lock().get(id).cloned()
    }

    /// Returns, in insertion order, every item whose ID sorts after
    /// `since_id`. An empty `since_id` returns the whole board.
    pub fn get_all(&self, since_id: &str) -> Vec<(String, Item)> {
        self.shared
            .items
            .lock()
            .iter()
            .filter(|(id, _)| since_id.is_empty() || id.as_str() > since_id)
            .map(|(id, item)| (id.clone(), item.clone()))
            .collect()
    }

    /// Saves now, skipping the debounce timer, and waits for the write.
    ///
    /// Does nothing while the board is still loading.
    pub async fn flush(&self) {
        self.shared.scheduler.cancel();
        self.shared.save().await;
    }

    fn schedule_save(&self) {
        self.shared.scheduler.trigger(&self.shared);
    }
}

impl BoardShared {
    async fn load(self: Arc<Self>) {
        let started_at = Instant::now();
        info!(
            "event=board_load module=board status=start board={}",
            self.name
        );

        let mut loaded = match storage::load_board(&self.path).await {
            Ok(board) => {
                info!(
                    "event=board_load module=board status=ok board={} items={} duration_ms={}",
                    self.name,
                    board.len(),
                    started_at.elapsed().as_millis()
                );
                board
            }
            Err(err) if err.is_not_found() => {
                info!(
                    "event=board_load module=board status=skip board={} reason=not_found",
                    self.name
                );
                Board::new()
            }
            Err(err) => {
                error!(
                    "event=board_load module=board status=error board={} duration_ms={} error_code=board_load_failed error={}",
                    self.name,
                    started_at.elapsed().as_millis(),
                    err
                );
                Board::new()
            }
        };

        for item in loaded.values_mut() {
            self.validator.validate(item);
        }

        let raced = {
            let mut items = self.items.lock();
            let raced = !items.is_empty();
            // Writes that raced the load are newer than the file.
            for (id, item) in items.drain(..) {
                loaded.insert(id, item);
            }
            *items = loaded;
            raced
        };

        self.readiness.send_if_modified(|state| {
            if *state == Readiness::Loading {
                *state = Readiness::Ready;
                true
            } else {
                false
            }
        });
        if raced {
            self.scheduler.trigger(&self);
        }
    }

    async fn save(&self) {
        if *self.readiness.borrow() == Readiness::Loading {
            // Saving now would overwrite the file with a partial board.
            info!(
                "event=board_save module=board status=skip board={} reason=loading",
                self.name
            );
            return;
        }
        self.scheduler.mark_attempt();
        let _writer = self.write_lock.lock().await;
        let started_at = Instant::now();

        // Only eviction and the copy happen under the items lock.
        let snapshot = {
            let mut items = self.items.lock();
            evict::clean(&mut items, self.max_item_count);
            items.clone()
        };
        let count = snapshot.len();
        let encoded = if count == 0 {
            Ok(None)
        } else {
            storage::encode_board(&snapshot).map(Some)
        };
        drop(snapshot);
        let document = match encoded {
            Ok(document) => document,
            Err(err) => {
                error!(
                    "event=board_save module=board status=error board={} error_code=board_encode_failed error={}",
                    self.name, err
                );
                return;
            }
        };

        match storage::write_document(&self.path, document).await {
            Ok(SaveOutcome::Written { bytes }) => info!(
                "event=board_save module=board status=ok board={} items={} bytes={} duration_ms={}",
                self.name,
                count,
                bytes,
                started_at.elapsed().as_millis()
            ),
            Ok(SaveOutcome::Removed) => info!(
                "event=board_save module=board status=ok board={} items=0 removed=true duration_ms={}",
                self.name,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=board_save module=board status=error board={} duration_ms={} error_code=board_save_failed error={}",
                self.name,
                started_at.elapsed().as_millis(),
                err
            ),
        }
    }
}

impl Persist for BoardShared {
    fn persist(self: Arc<Self>) -> impl Future<Output = ()> + Send {
        async move { self.save().await }
    }
}
