//! Keys and key paths.

use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::fmt;

/// A valid engine key.
///
/// Keys are totally ordered: every number sorts before every string, and
/// every string before every array. Numbers compare numerically, strings
/// by UTF-16 code units, arrays element by element and then by length.
#[derive(Debug, Clone)]
pub enum Key {
    /// Numeric key. NaN is never produced by [`Key::from_json`].
    Number(f64),
    /// String key.
    Text(String),
    /// Compound key.
    Array(Vec<Key>),
}

impl Key {
    /// Converts a JSON value into a key.
    ///
    /// Returns `None` for values that are not valid keys (`null`,
    /// booleans, objects, and arrays containing any of those).
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().filter(|f| !f.is_nan()).map(Key::Number),
            Value::String(s) => Some(Key::Text(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(Key::from_json)
                .collect::<Option<Vec<_>>>()
                .map(Key::Array),
            Value::Null | Value::Bool(_) | Value::Object(_) => None,
        }
    }

    /// Converts the key back into JSON.
    ///
    /// Integral numbers are emitted as JSON integers.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Key::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
                    Value::Number(Number::from(*n as i64))
                } else {
                    Number::from_f64(*n).map_or(Value::Null, Value::Number)
                }
            }
            Key::Text(s) => Value::String(s.clone()),
            Key::Array(items) => Value::Array(items.iter().map(Key::to_json).collect()),
        }
    }

    /// Returns the number if this is a numeric key.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Key::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string if this is a text key.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Key::Text(s) => Some(s),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Key::Number(_) => 0,
            Key::Text(_) => 1,
            Key::Array(_) => 2,
        }
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Number(a), Key::Number(b)) => a.partial_cmp(b).unwrap_or_else(|| a.total_cmp(b)),
            (Key::Text(a), Key::Text(b)) => a.encode_utf16().cmp(b.encode_utf16()),
            (Key::Array(a), Key::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Number(n) => write!(f, "{n}"),
            Key::Text(s) => write!(f, "{s:?}"),
            Key::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Number(value as f64)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Number(f64::from(value))
    }
}

impl From<u32> for Key {
    fn from(value: u32) -> Self {
        Key::Number(f64::from(value))
    }
}

impl From<f64> for Key {
    fn from(value: f64) -> Self {
        Key::Number(value)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Text(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Text(value)
    }
}

impl From<Vec<Key>> for Key {
    fn from(value: Vec<Key>) -> Self {
        Key::Array(value)
    }
}

/// Reads the key at a dotted key path (`"profile.email"`).
///
/// Returns `None` when any segment is missing or the value found is not
/// a valid key.
#[must_use]
pub fn extract_key(record: &Value, key_path: &str) -> Option<Key> {
    let mut current = record;
    for segment in key_path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Key::from_json(current)
}

/// Writes `key` into `record` at a dotted key path, creating intermediate
/// objects as needed.
///
/// Returns `false` if the record (or an intermediate segment) is not an
/// object.
pub fn inject_key(record: &mut Value, key_path: &str, key: &Key) -> bool {
    let mut segments = key_path.split('.').peekable();
    let mut current = record;
    while let Some(segment) = segments.next() {
        let Some(object) = current.as_object_mut() else {
            return false;
        };
        if segments.peek().is_none() {
            object.insert(segment.to_string(), key.to_json());
            return true;
        }
        current = object
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_rank_ordering() {
        let number = Key::from(1000);
        let text = Key::from("a");
        let array = Key::Array(vec![]);
        assert!(number < text);
        assert!(text < array);
    }

    #[test]
    fn numbers_compare_numerically() {
        assert!(Key::from(30) < Key::from(200));
        assert_eq!(Key::from(-0.0), Key::from(0.0));
    }

    #[test]
    fn text_compares_by_utf16_units() {
        // U+FFFF sorts after a surrogate pair lead unit (0xD83D).
        let emoji = Key::from("ab\u{1F600}");
        let max_bmp = Key::from("ab\u{FFFF}");
        assert!(emoji < max_bmp);
    }

    #[test]
    fn arrays_compare_elementwise_then_length() {
        let short = Key::Array(vec![Key::from(1)]);
        let long = Key::Array(vec![Key::from(1), Key::from(0)]);
        let bigger = Key::Array(vec![Key::from(2)]);
        assert!(short < long);
        assert!(long < bigger);
    }

    #[test]
    fn from_json_rejects_non_keys() {
        assert!(Key::from_json(&json!(null)).is_none());
        assert!(Key::from_json(&json!(true)).is_none());
        assert!(Key::from_json(&json!({"a": 1})).is_none());
        assert!(Key::from_json(&json!([1, null])).is_none());
        assert_eq!(Key::from_json(&json!([1, "x"])), Some(Key::Array(vec![1.into(), "x".into()])));
    }

    #[test]
    fn to_json_keeps_integers_integral() {
        assert_eq!(Key::from(42).to_json(), json!(42));
        assert_eq!(Key::from(1.5).to_json(), json!(1.5));
    }

    #[test]
    fn extract_nested_key() {
        let record = json!({"profile": {"email": "a@b.c"}, "id": 7});
        assert_eq!(extract_key(&record, "id"), Some(Key::from(7)));
        assert_eq!(extract_key(&record, "profile.email"), Some(Key::from("a@b.c")));
        assert_eq!(extract_key(&record, "profile.phone"), None);
    }

    #[test]
    fn inject_creates_intermediate_objects() {
        let mut record = json!({"name": "x"});
        assert!(inject_key(&mut record, "meta.id", &Key::from(3)));
        assert_eq!(record, json!({"name": "x", "meta": {"id": 3}}));

        let mut scalar = json!(5);
        assert!(!inject_key(&mut scalar, "id", &Key::from(1)));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn numbers_order_like_f64(a in -1e9f64..1e9, b in -1e9f64..1e9) {
                prop_assert_eq!(Some(Key::from(a).cmp(&Key::from(b))), a.partial_cmp(&b));
            }

            #[test]
            fn numbers_sort_before_text(n in any::<i64>(), s in "[a-z]{0,8}") {
                prop_assert!(Key::from(n) < Key::from(s));
            }

            #[test]
            fn ascii_text_orders_like_strings(a in "[ -~]{0,8}", b in "[ -~]{0,8}") {
                prop_assert_eq!(Key::from(a.as_str()).cmp(&Key::from(b.as_str())), a.cmp(&b));
            }
        }
    }
}
