//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::EdgeConfig;

/// Pushes validated configs whenever the file on disk changes.
///
/// Invalid edits are logged and dropped; the running dispatcher keeps its
/// current config.
pub struct ConfigWatcher {
    path: PathBuf,
    updates: mpsc::UnboundedSender<EdgeConfig>,
}

impl ConfigWatcher {
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<EdgeConfig>) {
        let (updates, rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            updates,
        };
        (watcher, rx)
    }

    /// Start watching. Dropping the returned handle stops the watch.
    ///
    /// The parent directory is watched so editors that save by rename are
    /// picked up too.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let target = self.path.clone();
        let file_name = target.file_name().map(|n| n.to_os_string());
        let updates = self.updates;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = %e, "Config watch error");
                        return;
                    }
                };
                if !(event.kind.is_modify() || event.kind.is_create()) {
                    return;
                }
                let touches_config = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                if !touches_config {
                    return;
                }

                tracing::info!(path = %target.display(), "Config file changed, reloading");
                match load_config(&target) {
                    Ok(config) => {
                        if updates.send(config).is_err() {
                            tracing::debug!("Config receiver closed, dropping update");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Rejected config change, keeping current configuration");
                    }
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.path.display(), "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_valid_edit_is_pushed() {
        let dir = std::env::temp_dir().join(format!("edge-watch-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("edge.toml");
        std::fs::write(&path, "[cache]\nttl_secs = 10\n").unwrap();

        let (watcher, mut rx) = ConfigWatcher::new(&path);
        let _handle = watcher.run().unwrap();

        // Invalid edit: dropped.
        std::fs::write(&path, "[rate_limit]\nthreshold = 0\n").unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(&path, "[cache]\nttl_secs = 42\n").unwrap();

        let config = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let config = rx.recv().await.unwrap();
                if config.cache.ttl_secs == 42 {
                    return config;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(config.cache.ttl_secs, 42);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
