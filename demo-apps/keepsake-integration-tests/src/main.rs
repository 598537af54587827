use anyhow::Result;
use keepsake_core::{execute, Command, Reply, SnapshotError, Store, StoreConfig, Value};
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keepsake_integration_tests=info,keepsake_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let dir = tempfile::tempdir()?;

    tracing::info!("🧪 Keepsake Integration Tests");
    tracing::info!("   Snapshot dir: {:?}", dir.path());
    println!();

    // Run all tests
    test_basic_operations(dir.path())?;
    test_expiration(dir.path())?;
    test_snapshot_round_trip(dir.path())?;
    test_autosave(dir.path())?;
    test_corrupt_snapshot_fallback(dir.path())?;
    test_periodic_snapshot(dir.path()).await?;

    println!();
    tracing::info!("✅ All tests passed!");

    Ok(())
}

fn set_cmd(key: &str, value: Value, ttl_seconds: Option<u64>) -> Command {
    Command::Set {
        key: key.to_string(),
        value,
        ttl_seconds,
    }
}

/// Test basic SET/GET/DELETE through the command API
fn test_basic_operations(dir: &Path) -> Result<()> {
    tracing::info!("Test: Basic Operations");

    let config = StoreConfig::default().with_snapshot_path(dir.join("basic.json"));
    let store = Store::with_config(config);

    let reply = execute(&store, set_cmd("country", Value::from("USA"), None))?;
    assert_eq!(reply, Reply::Ok, "SET should succeed");

    let reply = execute(&store, Command::Get { key: "country".into() })?;
    assert_eq!(
        reply,
        Reply::Value(Some(Value::from("USA"))),
        "GET should return the stored value"
    );

    let reply = execute(&store, Command::Delete { key: "country".into() })?;
    assert_eq!(reply, Reply::Deleted(true), "first DELETE removes the key");

    let reply = execute(&store, Command::Get { key: "country".into() })?;
    assert_eq!(reply, Reply::Value(None), "deleted key should be absent");

    let reply = execute(&store, Command::Delete { key: "country".into() })?;
    assert_eq!(reply, Reply::Deleted(false), "second DELETE is a no-op");

    tracing::info!("   ✓ Basic operations work correctly");
    Ok(())
}

/// Test TTL semantics: zero expires immediately, default TTL is applied
fn test_expiration(dir: &Path) -> Result<()> {
    tracing::info!("Test: Expiration");

    let config = StoreConfig::default().with_snapshot_path(dir.join("expiration.json"));
    let store = Store::with_config(config);

    execute(&store, set_cmd("gone", Value::from("v"), Some(0)))?;
    let reply = execute(&store, Command::Get { key: "gone".into() })?;
    assert_eq!(reply, Reply::Value(None), "TTL 0 expires on the next read");

    execute(&store, set_cmd("defaulted", Value::from("v"), None))?;
    let entries = store.live_entries();
    assert!(
        entries.iter().any(|(k, e)| k == "defaulted" && e.expires_at().is_some()),
        "SET without TTL should carry the default expiration"
    );

    // The store primitive is the spelling for "never expires"
    store.set("forever", "v", None)?;
    let entries = store.live_entries();
    assert!(
        entries.iter().any(|(k, e)| k == "forever" && e.expires_at().is_none()),
        "direct set with no TTL should never expire"
    );

    tracing::info!("   ✓ Expiration semantics hold");
    Ok(())
}

/// Test SAVE into one store, open a fresh one, verify contents survive
fn test_snapshot_round_trip(dir: &Path) -> Result<()> {
    tracing::info!("Test: Snapshot Round-Trip");

    let config = StoreConfig::default().with_snapshot_path(dir.join("roundtrip.json"));

    let store = Store::with_config(config.clone());
    store.set("a", 1i64, None)?;
    store.set("b", 2i64, Some(3600))?;
    store.close()?;

    let reopened = Store::open(config)?;
    assert_eq!(reopened.get("a"), Some(Value::Int(1)), "a should survive");
    assert_eq!(reopened.get("b"), Some(Value::Int(2)), "b should survive");

    tracing::info!("   ✓ Snapshot round-trip preserves state");
    Ok(())
}

/// Test that autosave persists mutations without an explicit SAVE
fn test_autosave(dir: &Path) -> Result<()> {
    tracing::info!("Test: Autosave");

    let path = dir.join("autosave.json");
    let config = StoreConfig::default().with_snapshot_path(path.clone());
    let store = Store::with_config(config);

    execute(&store, Command::EnableAutosave)?;
    execute(&store, set_cmd("k", Value::from("v"), None))?;

    let contents = std::fs::read_to_string(&path)?;
    assert!(contents.contains("\"k\""), "autosaved file should contain the key");

    execute(&store, Command::DisableAutosave)?;
    execute(&store, set_cmd("unsaved", Value::from("v"), None))?;

    let contents = std::fs::read_to_string(&path)?;
    assert!(
        !contents.contains("unsaved"),
        "file should be untouched while autosave is off"
    );

    tracing::info!("   ✓ Autosave triggers on mutation only while enabled");
    Ok(())
}

/// Test the recommended corrupt-snapshot policy: start empty and report
fn test_corrupt_snapshot_fallback(dir: &Path) -> Result<()> {
    tracing::info!("Test: Corrupt Snapshot Fallback");

    let path = dir.join("corrupt.json");
    std::fs::write(&path, "{definitely not json")?;

    let config = StoreConfig::default().with_snapshot_path(path);
    let store = match Store::open(config.clone()) {
        Ok(_) => anyhow::bail!("corrupt snapshot should not open cleanly"),
        Err(SnapshotError::Corrupt(e)) => {
            tracing::warn!("   snapshot unreadable ({}); starting empty", e);
            Store::with_config(config)
        }
        Err(e) => return Err(e.into()),
    };

    assert!(store.is_empty(), "fallback store should start empty");

    tracing::info!("   ✓ Corrupt snapshot reported and recovered from");
    Ok(())
}

/// Test interval-based snapshotting with no explicit saves at all
async fn test_periodic_snapshot(dir: &Path) -> Result<()> {
    tracing::info!("Test: Periodic Snapshot");

    let path = dir.join("periodic.json");
    let config = StoreConfig::default()
        .with_snapshot_path(path.clone())
        .with_snapshot_interval(Duration::from_millis(100));
    let store = Store::with_config(config);

    store.set("ticked", "v", Some(3600))?;
    tokio::time::sleep(Duration::from_millis(350)).await;

    let contents = std::fs::read_to_string(&path)?;
    assert!(contents.contains("ticked"), "interval save should have run");

    store.close()?;

    tracing::info!("   ✓ Periodic snapshotting works");
    Ok(())
}
