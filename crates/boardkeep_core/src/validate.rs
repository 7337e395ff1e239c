//! Item field sanitization.
//!
//! # Responsibility
//! - Clamp recognized numeric fields into their accepted ranges.
//! - Bound the children sequence in length and nesting depth.
//! - Bound the nesting depth of every value inside an item.
//!
//! # Invariants
//! - Validation never rejects an item; bad values are coerced.
//! - Validation is idempotent.
//! - Unknown fields are left untouched.

use crate::config::BoardConfig;
use crate::model::item::{Item, CHILDREN_FIELD, SIZE_FIELD, X_FIELD, Y_FIELD};
use serde_json::{Map, Value};

/// Smallest stroke size kept after validation.
pub const MIN_SIZE: i64 = 1;
/// Largest stroke size kept after validation.
pub const MAX_SIZE: i64 = 50;

/// Field sanitizer configured with board limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validator {
    max_children: usize,
    max_board_size: i64,
    max_child_depth: usize,
    max_item_nesting: usize,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(&BoardConfig::default())
    }
}

impl Validator {
    pub fn new(config: &BoardConfig) -> Self {
        Self {
            max_children: config.max_children,
            max_board_size: config.max_board_size,
            max_child_depth: config.max_child_depth,
            max_item_nesting: config.max_item_nesting,
        }
    }

    /// Sanitizes `item` in place, recursing into its children.
    ///
    /// Items that are not objects only get their nesting bounded. Values
    /// nested deeper than the configured limit are replaced by `null`.
    pub fn validate(&self, item: &mut Item) {
        self.validate_at(item, 0);
        prune_nesting(item, 1, self.max_item_nesting);
    }

    fn validate_at(&self, item: &mut Item, depth: usize) {
        let Some(fields) = item.as_object_mut() else {
            return;
        };

        if let Some(size) = fields.get_mut(SIZE_FIELD) {
            *size = Value::from(clamp_size(size));
        }

        if fields.contains_key(X_FIELD) || fields.contains_key(Y_FIELD) {
            for axis in [X_FIELD, Y_FIELD] {
                let coordinate = clamp_coordinate(fields.get(axis), self.max_board_size);
                fields.insert(axis.to_string(), Value::from(coordinate));
            }
        }

        if fields.contains_key(CHILDREN_FIELD) {
            self.validate_children(fields, depth);
        }
    }

    fn validate_children(&self, fields: &mut Map<String, Value>, depth: usize) {
        let Some(children) = fields.get_mut(CHILDREN_FIELD) else {
            return;
        };
        if depth >= self.max_child_depth || !children.is_array() {
            *children = Value::Array(Vec::new());
            return;
        }
        if let Some(list) = children.as_array_mut() {
            list.truncate(self.max_children);
            for child in list.iter_mut() {
                self.validate_at(child, depth + 1);
            }
        }
    }
}

/// Nulls out every container that would sit below level `max`, where `value`
/// is at `level`.
fn prune_nesting(value: &mut Value, level: usize, max: usize) {
    match value {
        Value::Object(fields) => {
            for entry in fields.values_mut() {
                prune_entry(entry, level, max);
            }
        }
        Value::Array(list) => {
            for entry in list.iter_mut() {
                prune_entry(entry, level, max);
            }
        }
        _ => {}
    }
}

fn prune_entry(entry: &mut Value, parent_level: usize, max: usize) {
    if !(entry.is_object() || entry.is_array()) {
        return;
    }
    if parent_level >= max {
        *entry = Value::Null;
    } else {
        prune_nesting(entry, parent_level + 1, max);
    }
}

fn clamp_size(value: &Value) -> i64 {
    let parsed = leading_number(value, true)
        .filter(|n| *n != 0.0)
        .unwrap_or(MIN_SIZE as f64);
    parsed.clamp(MIN_SIZE as f64, MAX_SIZE as f64) as i64
}

fn clamp_coordinate(value: Option<&Value>, max: i64) -> i64 {
    let parsed = value.and_then(|v| leading_number(v, false)).unwrap_or(0.0);
    parsed.clamp(0.0, max as f64).round() as i64
}

/// Best-effort numeric reading of a JSON value.
///
/// Numbers are taken as-is (truncated toward zero when `integer`). Strings are
/// read up to the first character that cannot continue a number, so `"12px"`
/// reads as 12. Anything else has no numeric value.
fn leading_number(value: &Value, integer: bool) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_prefix(s.trim_start(), integer)?,
        _ => return None,
    };
    if number.is_nan() {
        return None;
    }
    Some(if integer { number.trunc() } else { number })
}

fn parse_prefix(text: &str, integer: bool) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut has_digits = end > digits_start;

    if !integer {
        if bytes.get(end) == Some(&b'.') {
            let fraction_start = end + 1;
            let mut cursor = fraction_start;
            while bytes.get(cursor).is_some_and(u8::is_ascii_digit) {
                cursor += 1;
            }
            if has_digits || cursor > fraction_start {
                has_digits = true;
                end = cursor;
            }
        }
        if has_digits && matches!(bytes.get(end), Some(b'e' | b'E')) {
            let mut cursor = end + 1;
            if matches!(bytes.get(cursor), Some(b'+' | b'-')) {
                cursor += 1;
            }
            let exponent_start = cursor;
            while bytes.get(cursor).is_some_and(u8::is_ascii_digit) {
                cursor += 1;
            }
            if cursor > exponent_start {
                end = cursor;
            }
        }
    }

    if !has_digits {
        return None;
    }
    text[..end].parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::{parse_prefix, Validator};
    use crate::config::BoardConfig;
    use serde_json::json;

    #[test]
    fn clamps_out_of_range_fields() {
        let mut item = json!({"x": 100000, "y": -5, "size": 999});
        Validator::default().validate(&mut item);
        assert_eq!(item, json!({"x": 65536, "y": 0, "size": 50}));
    }

    #[test]
    fn size_zero_and_garbage_fall_back_to_one() {
        let validator = Validator::default();
        for raw in [json!(0), json!("abc"), json!(null), json!(true), json!(0.4)] {
            let mut item = json!({ "size": raw });
            validator.validate(&mut item);
            assert_eq!(item["size"], json!(1));
        }
    }

    #[test]
    fn size_parses_leading_integer() {
        let validator = Validator::default();
        let mut item = json!({"size": "12px"});
        validator.validate(&mut item);
        assert_eq!(item["size"], json!(12));

        let mut item = json!({"size": 7.9});
        validator.validate(&mut item);
        assert_eq!(item["size"], json!(7));
    }

    #[test]
    fn coordinates_are_validated_together() {
        let mut item = json!({"x": "12.6", "color": "#ff0000"});
        Validator::default().validate(&mut item);
        assert_eq!(item, json!({"x": 13, "y": 0, "color": "#ff0000"}));
    }

    #[test]
    fn absent_fields_are_not_added() {
        let mut item = json!({"tool": "Text", "txt": "hello"});
        Validator::default().validate(&mut item);
        assert_eq!(item, json!({"tool": "Text", "txt": "hello"}));
    }

    #[test]
    fn children_are_truncated_and_validated() {
        let children: Vec<_> = (0..200).map(|i| json!({"x": i * 1000, "size": 0})).collect();
        let mut item = json!({ "children": children });
        Validator::default().validate(&mut item);

        let kept = item["children"].as_array().unwrap();
        assert_eq!(kept.len(), 128);
        assert_eq!(kept[0], json!({"x": 0, "y": 0, "size": 1}));
        assert_eq!(kept[127]["x"], json!(65536));
    }

    #[test]
    fn non_sequence_children_become_empty() {
        let mut item = json!({"children": {"a": 1}});
        Validator::default().validate(&mut item);
        assert_eq!(item, json!({"children": []}));
    }

    #[test]
    fn nesting_is_capped() {
        let config = BoardConfig {
            max_child_depth: 2,
            ..BoardConfig::default()
        };
        let mut item = json!({"children": [{"children": [{"children": [{"size": 3}]}]}]});
        Validator::new(&config).validate(&mut item);
        assert_eq!(item, json!({"children": [{"children": [{"children": []}]}]}));
    }

    fn nesting_of(value: &serde_json::Value) -> usize {
        let inner = match value {
            serde_json::Value::Object(fields) => fields.values().map(nesting_of).max(),
            serde_json::Value::Array(list) => list.iter().map(nesting_of).max(),
            _ => return 0,
        };
        1 + inner.unwrap_or(0)
    }

    #[test]
    fn payload_nesting_is_capped() {
        let config = BoardConfig {
            max_item_nesting: 4,
            ..BoardConfig::default()
        };
        let mut item = json!({"data": [[[[["deep"]]]]], "flat": [1, 2], "x": 1, "y": 1});
        Validator::new(&config).validate(&mut item);
        assert_eq!(
            item,
            json!({"data": [[[null]]], "flat": [1, 2], "x": 1, "y": 1})
        );
        assert_eq!(nesting_of(&item), 4);
    }

    #[test]
    fn default_nesting_stays_below_decoder_limit() {
        let mut deep = json!(1);
        for _ in 0..300 {
            deep = json!([deep]);
        }
        let mut item = json!({ "data": deep });
        Validator::default().validate(&mut item);
        assert_eq!(nesting_of(&item), 100);

        let document = serde_json::to_vec(&json!({ "l1": item })).unwrap();
        assert!(serde_json::from_slice::<serde_json::Value>(&document).is_ok());
    }

    #[test]
    fn validation_is_idempotent() {
        let validator = Validator::default();
        let mut item = json!({
            "x": "-3.5e2", "y": 70000.4, "size": "49.99",
            "children": [{"size": -1, "y": "7"}, "opaque"]
        });
        validator.validate(&mut item);
        let once = item.clone();
        validator.validate(&mut item);
        assert_eq!(item, once);
    }

    #[test]
    fn parse_prefix_follows_number_grammar() {
        assert_eq!(parse_prefix("42abc", true), Some(42.0));
        assert_eq!(parse_prefix("-7.5", true), Some(-7.0));
        assert_eq!(parse_prefix("-7.5", false), Some(-7.5));
        assert_eq!(parse_prefix(".5", false), Some(0.5));
        assert_eq!(parse_prefix("1e3x", false), Some(1000.0));
        assert_eq!(parse_prefix("1e", false), Some(1.0));
        assert_eq!(parse_prefix("-", false), None);
        assert_eq!(parse_prefix("px", true), None);
    }
}
