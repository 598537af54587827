use std::path::PathBuf;
use std::time::Duration;

/// Default snapshot file name, relative to the working directory
pub const DEFAULT_SNAPSHOT_PATH: &str = "keepsake_dump.json";

/// Default TTL the command layer applies when a SET carries none: one year.
/// Long, but finite.
pub const DEFAULT_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Constructor-time configuration for a store.
///
/// Everything here is fixed for the lifetime of the store instance; the only
/// runtime-mutable piece of state is the autosave flag, which lives on the
/// store itself.
///
/// # Example
///
/// ```rust
/// use keepsake_core::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::default()
///     .with_snapshot_path("state/dump.json")
///     .with_default_ttl(Duration::from_secs(3600));
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Where snapshots are written to and loaded from
    pub snapshot_path: PathBuf,
    /// TTL substituted by the command layer for a SET without one
    pub default_ttl: Duration,
    /// Interval between periodic snapshot saves (default: disabled)
    pub snapshot_interval: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            default_ttl: DEFAULT_TTL,
            snapshot_interval: None,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the snapshot file path
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = path.into();
        self
    }

    /// Sets the TTL applied to SET commands that do not specify one.
    ///
    /// This only affects the command layer; `Store::set` called directly
    /// with no TTL produces an entry that never expires.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Enables periodic snapshotting at the given interval.
    ///
    /// A store built with an interval spawns a background save task and
    /// therefore must be constructed inside a Tokio runtime.
    pub fn with_snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = Some(interval);
        self
    }
}
