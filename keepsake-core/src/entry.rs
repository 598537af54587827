use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clock;

/// A stored scalar value.
///
/// The set of representable types is deliberately closed so that snapshot
/// round-trips and equality checks are well-defined. Integers and floats are
/// kept apart: an `Int` written to disk comes back as an `Int`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// A stored value together with its optional expiration instant.
///
/// `expires_at` is an absolute UNIX timestamp in seconds; `None` means the
/// entry never expires. Absolute timestamps survive process restarts, which
/// is what keeps residual TTLs correct across a snapshot round-trip.
///
/// This struct doubles as the persisted per-key record in the snapshot file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    value: Value,
    expires_at: Option<u64>,
}

impl Entry {
    /// Creates a new entry with the given value and expiration timestamp
    pub fn new(value: Value, expires_at: Option<u64>) -> Self {
        Self { value, expires_at }
    }

    /// Returns the stored value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the expiration timestamp (UNIX seconds), if any
    pub fn expires_at(&self) -> Option<u64> {
        self.expires_at
    }

    /// Checks if this entry has expired.
    ///
    /// An entry whose expiration instant equals the current second is already
    /// expired, so a TTL of zero makes the key unreadable from the next
    /// access on.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => clock::now() >= at,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_not_expired() {
        let entry = Entry::new(Value::from("test_value"), Some(clock::now() + 60));

        assert_eq!(entry.value(), &Value::Str("test_value".to_string()));
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expired() {
        let entry = Entry::new(Value::from("test_value"), Some(clock::now() - 1));

        assert!(entry.is_expired());
    }

    #[test]
    fn test_entry_without_expiration_never_expires() {
        let entry = Entry::new(Value::from(42i64), None);

        assert!(!entry.is_expired());
        assert_eq!(entry.expires_at(), None);
    }

    #[test]
    fn test_entry_expiring_now_counts_as_expired() {
        // A TTL of zero produces exactly this shape
        let entry = Entry::new(Value::Bool(true), Some(clock::now()));

        assert!(entry.is_expired());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::Str("hi".into()).to_string(), "hi");
    }

    #[test]
    fn test_entry_serde_shape() {
        let entry = Entry::new(Value::from("USA"), None);
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"value":"USA","expires_at":null}"#);

        let entry = Entry::new(Value::Int(7), Some(1_700_000_000));
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"value":7,"expires_at":1700000000}"#);
    }

    #[test]
    fn test_value_round_trips_preserve_type() {
        for value in [
            Value::Null,
            Value::Bool(true),
            Value::Int(123),
            Value::Float(1.5),
            Value::Str("text".into()),
        ] {
            let json = serde_json::to_string(&value).unwrap();
            let back: Value = serde_json::from_str(&json).unwrap();
            assert_eq!(back, value, "round-trip changed {:?}", value);
        }
    }
}
