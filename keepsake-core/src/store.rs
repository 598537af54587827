use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::clock;
use crate::config::StoreConfig;
use crate::entry::{Entry, Value};
use crate::snapshot::{self, SnapshotError};

/// Error type for store operations
#[derive(Debug)]
pub enum StoreError {
    /// A key or TTL was rejected at the API boundary; nothing was mutated
    InvalidArgument(String),
    /// An autosave or lifecycle snapshot failed. The mutation that triggered
    /// it has already been applied and is never rolled back; in-memory state
    /// is the source of truth and persistence is best-effort.
    Snapshot(SnapshotError),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            StoreError::Snapshot(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::InvalidArgument(_) => None,
            StoreError::Snapshot(e) => Some(e),
        }
    }
}

impl From<SnapshotError> for StoreError {
    fn from(e: SnapshotError) -> Self {
        StoreError::Snapshot(e)
    }
}

// Cap TTLs at ~100 years so `now + ttl` cannot overflow, while staying
// effectively infinite for practical purposes.
const MAX_TTL_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

/// Internal shared state for the store
struct StoreInner {
    data: DashMap<String, Entry>,
    config: StoreConfig,
    /// While set, every SET/DELETE is followed by a snapshot save
    autosave: AtomicBool,
    /// Sender to signal shutdown to the periodic snapshot task
    shutdown_tx: watch::Sender<bool>,
}

/// In-memory key-value store with per-key TTL and snapshot persistence.
///
/// Uses `DashMap` for the key space, so reads never block other reads and a
/// write only locks the key being written. Cloning the store is cheap and
/// yields a handle to the same data.
///
/// # Expiration
///
/// Expiration is lazy: every read is the enforcement point. An expired entry
/// is treated as absent the moment its instant passes and is physically
/// purged on the next access that touches it (or wholesale by [`cleanup`]
/// and snapshot enumeration). There is no background expiration sweep; the
/// trade-off is that an expired key nobody touches holds its memory until
/// the next access or snapshot.
///
/// # Persistence
///
/// Snapshots go to the configured path as a JSON file. Saves happen on
/// demand ([`save`]), after every mutation while autosave is enabled, on
/// [`close`], and optionally on a timer when the config carries a snapshot
/// interval. A crash between saves loses unsaved mutations.
///
/// [`cleanup`]: Store::cleanup
/// [`save`]: Store::save
/// [`close`]: Store::close
///
/// # Example
///
/// ```rust,no_run
/// use keepsake_core::{Store, StoreConfig, Value};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = StoreConfig::default().with_snapshot_path("dump.json");
///     let store = Store::open(config)?;
///
///     store.set("country", "USA", Some(3600))?;
///     assert_eq!(store.get("country"), Some(Value::from("USA")));
///
///     store.close()?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Creates an empty store with default configuration, without touching
    /// the filesystem. Use [`Store::open`] to restore prior state.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates an empty store with the given configuration, without touching
    /// the filesystem.
    ///
    /// # Panics
    ///
    /// Panics if the configuration enables periodic snapshotting and no
    /// Tokio runtime is available to spawn the save task.
    pub fn with_config(config: StoreConfig) -> Self {
        // Fail loudly up front instead of a cryptic panic from tokio::spawn.
        if config.snapshot_interval.is_some()
            && tokio::runtime::Handle::try_current().is_err()
        {
            panic!(
                "keepsake_core::Store requires a Tokio runtime when a snapshot \
                 interval is configured. Construct the store from within a \
                 #[tokio::main] or #[tokio::test] context, or leave \
                 snapshot_interval unset."
            );
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let inner = Arc::new(StoreInner {
            data: DashMap::new(),
            config,
            autosave: AtomicBool::new(false),
            shutdown_tx,
        });

        if let Some(interval) = inner.config.snapshot_interval {
            let task_inner = Arc::clone(&inner);
            tokio::spawn(Self::periodic_save_task(task_inner, interval, shutdown_rx));
        }

        Self { inner }
    }

    /// Opens a store, restoring prior state from the configured snapshot
    /// path.
    ///
    /// A missing snapshot file is not an error; the store starts empty. A
    /// corrupt file is returned as [`SnapshotError::Corrupt`] so the caller
    /// can decide between aborting and starting empty.
    ///
    /// # Panics
    ///
    /// As [`Store::with_config`].
    pub fn open(config: StoreConfig) -> Result<Self, SnapshotError> {
        let loaded = snapshot::load(&config.snapshot_path)?;
        let store = Self::with_config(config);
        if let Some(entries) = loaded {
            for (key, entry) in entries {
                store.inner.data.insert(key, entry);
            }
        }
        Ok(store)
    }

    /// Writes a final snapshot and stops the periodic save task.
    ///
    /// The store remains usable afterwards, but nothing persists further
    /// mutations unless autosave is on or [`Store::save`] is called again.
    pub fn close(&self) -> Result<(), SnapshotError> {
        let result = Self::save_inner(&self.inner);
        let _ = self.inner.shutdown_tx.send(true);
        result
    }

    /// Background task that saves a snapshot on every tick
    async fn periodic_save_task(
        inner: Arc<StoreInner>,
        interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        // Skip the first immediate tick - we want to wait for the interval first
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // A tick has no caller to hand the error to, so report
                    // it here and keep ticking
                    if let Err(e) = Self::save_inner(&inner) {
                        tracing::warn!("periodic snapshot save failed: {}", e);
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    }

    /// Purges expired entries, then collects every live pair (shared between
    /// explicit saves, autosave, and the periodic task)
    fn live_entries_inner(inner: &StoreInner) -> Vec<(String, Entry)> {
        inner.data.retain(|_, entry| !entry.is_expired());
        inner
            .data
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    fn save_inner(inner: &StoreInner) -> Result<(), SnapshotError> {
        let entries = Self::live_entries_inner(inner);
        snapshot::save(&entries, &inner.config.snapshot_path)
    }

    /// Best-effort persistence after a successful mutation. When this
    /// reports a failure, the mutation has already been applied.
    fn autosave_after_mutation(&self) -> Result<(), StoreError> {
        if self.inner.autosave.load(Ordering::Relaxed) {
            Self::save_inner(&self.inner)?;
        }
        Ok(())
    }

    /// Stores a value with an optional TTL in seconds.
    ///
    /// `None` means the entry never expires. A TTL of zero is valid and
    /// makes the key expire immediately: the next read treats it as absent.
    /// Overwriting an existing key replaces its value and expiration in a
    /// single map insert, so no reader can observe the old value paired
    /// with the new expiration or vice versa.
    ///
    /// # Errors
    ///
    /// `StoreError::InvalidArgument` for an empty key (nothing is mutated);
    /// `StoreError::Snapshot` when autosave is enabled and the triggered
    /// save fails (the write itself has been applied).
    pub fn set(
        &self,
        key: impl Into<String>,
        value: impl Into<Value>,
        ttl_seconds: Option<u64>,
    ) -> Result<(), StoreError> {
        let key = key.into();
        if key.is_empty() {
            return Err(StoreError::InvalidArgument("key cannot be empty".into()));
        }

        let expires_at =
            ttl_seconds.map(|ttl| clock::now().saturating_add(ttl.min(MAX_TTL_SECONDS)));

        self.inner.data.insert(key, Entry::new(value.into(), expires_at));

        self.autosave_after_mutation()
    }

    /// Retrieves a value by key.
    ///
    /// Returns `None` if the key doesn't exist or has expired. An expired
    /// entry is purged on the way out.
    pub fn get(&self, key: &str) -> Option<Value> {
        let entry = self.inner.data.get(key)?;

        if entry.value().is_expired() {
            // Drop the read reference before removing
            drop(entry);
            // remove_if re-checks expiration, so a concurrent overwrite
            // between our check and the removal is left alone
            self.inner.data.remove_if(key, |_, e| e.is_expired());
            return None;
        }

        Some(entry.value().value().clone())
    }

    /// Deletes a key from the store.
    ///
    /// Returns whether a live entry was removed. Deleting an absent key is
    /// a successful no-op reported as `false`, and an expired entry is
    /// purged but also reported as `false`: expired data is observably
    /// absent everywhere, including the deletion report.
    ///
    /// # Errors
    ///
    /// `StoreError::Snapshot` when autosave is enabled and the triggered
    /// save fails (the removal itself has been applied).
    pub fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let deleted = match self.inner.data.remove(key) {
            Some((_, entry)) => !entry.is_expired(),
            None => false,
        };

        self.autosave_after_mutation()?;
        Ok(deleted)
    }

    /// Checks if a key exists and is not expired.
    ///
    /// Expired entries are lazily purged when checked.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        match self.inner.data.get(key) {
            Some(entry) => {
                if entry.value().is_expired() {
                    drop(entry);
                    self.inner.data.remove_if(key, |_, e| e.is_expired());
                    false
                } else {
                    true
                }
            }
            None => false,
        }
    }

    /// Returns the number of live entries in the store
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .data
            .iter()
            .filter(|e| !e.value().is_expired())
            .count()
    }

    /// Returns `true` if the store holds no live entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Purges all expired entries, returning how many were removed.
    ///
    /// Reads do this per-key already; this is the wholesale version used by
    /// snapshot enumeration and available to callers that want to reclaim
    /// memory for keys nothing reads anymore.
    pub fn cleanup(&self) -> usize {
        let mut removed = 0;
        self.inner.data.retain(|_, entry| {
            if entry.is_expired() {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    /// Purges expired entries and returns every live `(key, entry)` pair.
    ///
    /// This is the enumeration snapshots are built from; dead data never
    /// reaches the file because it is removed during this traversal.
    pub fn live_entries(&self) -> Vec<(String, Entry)> {
        Self::live_entries_inner(&self.inner)
    }

    /// Writes a snapshot of all live entries to the configured path
    pub fn save(&self) -> Result<(), SnapshotError> {
        Self::save_inner(&self.inner)
    }

    /// Replaces the in-memory contents with the snapshot at the configured
    /// path, returning how many live entries were loaded.
    ///
    /// A missing file means no prior state: the store comes up empty.
    /// Entries already expired on disk are dropped, never resurrected. On a
    /// read or parse failure the in-memory state is left untouched.
    pub fn load(&self) -> Result<usize, SnapshotError> {
        let loaded = snapshot::load(&self.inner.config.snapshot_path)?;

        self.inner.data.clear();
        let mut count = 0;
        if let Some(entries) = loaded {
            for (key, entry) in entries {
                self.inner.data.insert(key, entry);
                count += 1;
            }
        }
        Ok(count)
    }

    /// Turns on save-after-every-mutation. Idempotent.
    pub fn enable_autosave(&self) {
        self.inner.autosave.store(true, Ordering::Relaxed);
    }

    /// Turns off save-after-every-mutation. Idempotent.
    pub fn disable_autosave(&self) {
        self.inner.autosave.store(false, Ordering::Relaxed);
    }

    /// Whether mutations currently trigger a snapshot save
    pub fn autosave_enabled(&self) -> bool {
        self.inner.autosave.load(Ordering::Relaxed)
    }

    /// The configuration this store was built with
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Stores a value that is already expired (for testing purposes)
    #[cfg(test)]
    fn set_expired(&self, key: impl Into<String>, value: impl Into<Value>) {
        let entry = Entry::new(value.into(), Some(clock::now().saturating_sub(1)));
        self.inner.data.insert(key.into(), entry);
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        // Stop the periodic save task when the last handle goes away
        let _ = self.shutdown_tx.send(true);
    }
}
