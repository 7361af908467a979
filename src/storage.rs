use crate::store::{CancelToken, MemoryStore};
use serde_json::Value;
use std::{path::Path, path::PathBuf, time::Duration, time::SystemTime};
use tokio::fs;
use tracing::{error, info};

/// Reads a JSON export of the realtime tree. A missing file is an empty tree;
/// an unreadable one is logged and treated the same way.
pub async fn load_snapshot(path: &Path) -> Value {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(root) => root,
            Err(err) => {
                error!("failed to parse data file {}: {err}", path.display());
                Value::Null
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Value::Null,
        Err(err) => {
            error!("failed to read data file {}: {err}", path.display());
            Value::Null
        }
    }
}

async fn modified_at(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).await.ok()?.modified().ok()
}

/// Polls the data file and swaps the whole tree into `store` when it changes,
/// until `cancel` fires.
pub fn spawn_reloader(
    store: MemoryStore,
    path: PathBuf,
    interval: Duration,
    cancel: CancelToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut seen = modified_at(&path).await;
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let current = modified_at(&path).await;
            if current != seen {
                seen = current;
                info!("data file {} changed, reloading", path.display());
                store.replace_root(load_snapshot(&path).await);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DataPath, RealtimeStore};
    use serde_json::json;

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("fleetx_{name}_{}_{nanos}.json", std::process::id()))
    }

    #[tokio::test]
    async fn missing_and_corrupt_files_are_empty() {
        let missing = temp_path("missing");
        assert_eq!(load_snapshot(&missing).await, Value::Null);

        let corrupt = temp_path("corrupt");
        fs::write(&corrupt, b"{ not json").await.unwrap();
        assert_eq!(load_snapshot(&corrupt).await, Value::Null);
        let _ = fs::remove_file(&corrupt).await;
    }

    #[tokio::test]
    async fn reloader_pushes_file_changes() {
        let path = temp_path("reload");
        fs::write(&path, br#"{ "drivers": { "L1": { "name": "A" } } }"#)
            .await
            .unwrap();
        let store = MemoryStore::new(load_snapshot(&path).await);
        let cancel = CancelToken::new();
        let mut subscription = store.subscribe(&DataPath::drivers(), &cancel);
        subscription.next().await.unwrap().unwrap();

        let reloader = spawn_reloader(
            store.clone(),
            path.clone(),
            Duration::from_millis(20),
            cancel.clone(),
        );
        // Coarse filesystem clocks need a visible gap between writes.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let staged = path.with_extension("tmp");
        fs::write(&staged, br#"{ "drivers": { "L2": { "name": "B" } } }"#)
            .await
            .unwrap();
        fs::rename(&staged, &path).await.unwrap();

        let pushed = tokio::time::timeout(Duration::from_secs(3), subscription.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(pushed, Some(json!({ "L2": { "name": "B" } })));

        cancel.cancel();
        reloader.await.unwrap();
        let _ = fs::remove_file(&path).await;
    }
}
