//! Board size bounding.
//!
//! Items are ordered by the part of their ID after the type tag; the oldest
//! ones are dropped until the board fits.

use crate::model::item::{sequence_key, Board};
use log::warn;
use std::collections::HashSet;

/// Removes the oldest items so at most `max_items` remain.
///
/// Returns the number of removed items. Survivors keep their relative order.
pub fn clean(board: &mut Board, max_items: usize) -> usize {
    if board.len() <= max_items {
        return 0;
    }

    let mut ids: Vec<&str> = board.keys().map(String::as_str).collect();
    ids.sort_unstable_by(|a, b| sequence_key(a).cmp(sequence_key(b)).then_with(|| a.cmp(b)));

    let excess = board.len() - max_items;
    let doomed: HashSet<String> = ids[..excess].iter().map(|id| id.to_string()).collect();
    board.retain(|id, _| !doomed.contains(id));

    warn!(
        "event=board_evict module=evict status=ok removed={} kept={}",
        excess,
        board.len()
    );
    excess
}
