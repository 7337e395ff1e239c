//! Item and board shapes.
//!
//! # Responsibility
//! - Keep items loosely structured so unknown fields pass through untouched.
//! - Provide the ID ordering key used by eviction.
//!
//! # Invariants
//! - A board maps each ID to exactly one item.
//! - Re-inserting an existing ID keeps its original position.

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Item identifier issued by the transport layer, e.g. `l1a2b3`.
///
/// The first character is a type tag; the remainder is expected to sort in
/// creation order.
pub type ItemId = String;

/// Single drawable element. Recognized fields are `size`, `x`, `y` and
/// `children`; everything else is opaque payload.
pub type Item = Value;

/// Ordered mapping from item ID to item.
pub type Board = IndexMap<ItemId, Item>;

/// Field holding nested child items.
pub const CHILDREN_FIELD: &str = "children";
/// Stroke size field.
pub const SIZE_FIELD: &str = "size";
/// Horizontal coordinate field.
pub const X_FIELD: &str = "x";
/// Vertical coordinate field.
pub const Y_FIELD: &str = "y";

/// Returns an item with no fields.
pub fn empty_item() -> Item {
    Value::Object(Map::new())
}

/// Returns whether `item` carries named fields (as opposed to a bare scalar
/// or array written by a misbehaving client).
pub fn is_structured(item: &Item) -> bool {
    item.is_object()
}

/// Returns the ordering key of an item ID: everything after the type tag.
///
/// Multi-byte tags are handled; an empty ID yields an empty key.
pub fn sequence_key(id: &str) -> &str {
    let mut chars = id.chars();
    chars.next();
    chars.as_str()
}
