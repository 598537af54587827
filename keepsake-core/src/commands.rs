//! The command surface an external dispatcher drives the store through.
//!
//! Parsing text into a [`Command`] and rendering a [`Reply`] back to the
//! user belong to the dispatcher; this module only validates arguments,
//! applies the configured default TTL, and executes against the store.

use crate::entry::Value;
use crate::store::{Store, StoreError};

/// Maximum allowed key length (1 KB)
const MAX_KEY_LENGTH: usize = 1024;

/// Maximum allowed length for string values (1 MB)
const MAX_VALUE_LENGTH: usize = 1024 * 1024;

/// One request from the dispatcher.
///
/// TTLs arrive already parsed; a negative or non-numeric TTL never reaches
/// this layer because `ttl_seconds` is unsigned. A `Set` without a TTL gets
/// the store's configured default.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set {
        key: String,
        value: Value,
        ttl_seconds: Option<u64>,
    },
    Get {
        key: String,
    },
    Delete {
        key: String,
    },
    Save,
    Load,
    EnableAutosave,
    DisableAutosave,
}

/// The outcome handed back to the dispatcher
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The command completed with nothing further to report
    Ok,
    /// GET result; `None` is the "absent" sentinel, not an error
    Value(Option<Value>),
    /// Whether DELETE removed a live entry
    Deleted(bool),
}

/// Truncates a key for safe logging (prevents leaking sensitive key data)
fn truncate_key_for_log(key: &str) -> String {
    const MAX_LOG_LEN: usize = 16;
    if key.len() <= MAX_LOG_LEN {
        key.to_string()
    } else {
        let mut end = MAX_LOG_LEN;
        while !key.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &key[..end])
    }
}

/// Validates that a key is non-empty and within size limits
fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(StoreError::InvalidArgument("key cannot be empty".into()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(StoreError::InvalidArgument(format!(
            "key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

/// Validates that a value is within size limits
fn validate_value(value: &Value) -> Result<(), StoreError> {
    if let Value::Str(s) = value {
        if s.len() > MAX_VALUE_LENGTH {
            return Err(StoreError::InvalidArgument(format!(
                "value exceeds maximum length of {} bytes",
                MAX_VALUE_LENGTH
            )));
        }
    }
    Ok(())
}

/// Executes a single command against the store.
///
/// Validation failures never mutate anything. Absent keys are normal
/// outcomes (`Reply::Value(None)`, `Reply::Deleted(false)`), never errors.
pub fn execute(store: &Store, command: Command) -> Result<Reply, StoreError> {
    match command {
        Command::Set {
            key,
            value,
            ttl_seconds,
        } => {
            validate_key(&key)?;
            validate_value(&value)?;

            // A SET without a TTL gets the configured default; a key that
            // should never expire is set through the Store API directly.
            let ttl = ttl_seconds.unwrap_or_else(|| store.config().default_ttl.as_secs());
            tracing::debug!("SET {} (ttl: {}s)", truncate_key_for_log(&key), ttl);

            store.set(key, value, Some(ttl))?;
            Ok(Reply::Ok)
        }
        Command::Get { key } => {
            validate_key(&key)?;
            tracing::debug!("GET {}", truncate_key_for_log(&key));

            Ok(Reply::Value(store.get(&key)))
        }
        Command::Delete { key } => {
            validate_key(&key)?;
            tracing::debug!("DELETE {}", truncate_key_for_log(&key));

            Ok(Reply::Deleted(store.delete(&key)?))
        }
        Command::Save => {
            tracing::debug!("SAVE to {:?}", store.config().snapshot_path);
            store.save()?;
            Ok(Reply::Ok)
        }
        Command::Load => {
            let count = store.load()?;
            tracing::debug!(
                "LOAD from {:?}: {} live entries",
                store.config().snapshot_path,
                count
            );
            Ok(Reply::Ok)
        }
        Command::EnableAutosave => {
            tracing::debug!("autosave enabled");
            store.enable_autosave();
            Ok(Reply::Ok)
        }
        Command::DisableAutosave => {
            tracing::debug!("autosave disabled");
            store.disable_autosave();
            Ok(Reply::Ok)
        }
    }
}
