//! Raw edit message dispatch.
//!
//! Collaborator edits arrive as loose JSON objects; this module routes each
//! one to the matching [`BoardStore`] operation.

use super::store::BoardStore;
use crate::model::item::Item;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

const TYPE_FIELD: &str = "type";
const ID_FIELD: &str = "id";
const PARENT_FIELD: &str = "parent";
const BATCH_FIELD: &str = "_children";

pub type MessageResult<T> = Result<T, MessageError>;

/// Rejected edit message. A rejected message changes nothing; the rest of its
/// batch is still applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    NotAnObject,
    MissingId,
    MissingParent,
}

impl Display for MessageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "message must be a JSON object"),
            Self::MissingId => write!(f, "message has no string `id`"),
            Self::MissingParent => write!(f, "child message has no string `parent`"),
        }
    }
}

impl Error for MessageError {}

impl BoardStore {
    /// Applies one edit message.
    ///
    /// - `_children: [...]` applies every nested message in order and reports
    ///   the first failure after trying them all.
    /// - `type: "delete"` removes `id`.
    /// - `type: "update"` merges the message into `id` (never creates).
    /// - `type: "child"` appends the message to `parent` (creating it).
    /// - anything else stores the message under `id`.
    pub fn apply(&self, message: Item) -> MessageResult<()> {
        let Value::Object(mut fields) = message else {
            return Err(MessageError::NotAnObject);
        };

        if let Some(Value::Array(batch)) = fields.remove(BATCH_FIELD) {
            let mut first_error = None;
            for nested in batch {
                if let Err(err) = self.apply(nested) {
                    first_error.get_or_insert(err);
                }
            }
            return first_error.map_or(Ok(()), Err);
        }

        match fields.get(TYPE_FIELD).and_then(Value::as_str) {
            Some("delete") => {
                let id = required_string(&fields, ID_FIELD).ok_or(MessageError::MissingId)?;
                self.delete(&id);
            }
            Some("update") => {
                let id = required_string(&fields, ID_FIELD).ok_or(MessageError::MissingId)?;
                fields.remove(TYPE_FIELD);
                self.update(&id, Value::Object(fields), false);
            }
            Some("child") => {
                let parent =
                    required_string(&fields, PARENT_FIELD).ok_or(MessageError::MissingParent)?;
                fields.remove(TYPE_FIELD);
                fields.remove(PARENT_FIELD);
                self.add_child(&parent, Value::Object(fields), true);
            }
            _ => {
                let id = required_string(&fields, ID_FIELD).ok_or(MessageError::MissingId)?;
                self.set(id, Value::Object(fields));
            }
        }
        Ok(())
    }
}

fn required_string(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
