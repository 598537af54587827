use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current UNIX time in whole seconds.
///
/// This is the single time source for expiration checks, so the in-memory
/// view and the snapshot file always agree on what "now" means.
pub(crate) fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is set before the UNIX epoch")
        .as_secs()
}
