//! Filesystem watch mode.
//!
//! Events are debounced per path (300 ms by default); each coalesced change
//! re-extracts just that file and immediately re-resolves its references,
//! with one TF-IDF rebuild per event batch. Removals drop the file record
//! and everything derived from it. Per-file failures are logged and never
//! crash the watcher.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::Store;
use crate::indexer::{self, is_ignored_dirname};
use crate::languages::detect_language;

/// Configuration for the watch loop.
pub struct WatchConfig {
    /// Root directory to watch.
    pub root: PathBuf,
    /// Per-path debounce window for filesystem events.
    pub debounce: Duration,
}

impl WatchConfig {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            debounce: Duration::from_millis(300),
        }
    }
}

/// Handle returned by `spawn_watch`. Drop or call `stop()` to shut down the
/// watcher; both are idempotent.
pub struct WatchHandle {
    shutdown: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl WatchHandle {
    /// Signal the watch loop to stop and wait for it to finish.
    pub fn stop(mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Don't join on drop — the thread exits on its next loop iteration.
    }
}

/// Spawn the watch loop on a background thread. The watcher opens its own
/// store connection (WAL allows concurrent readers).
pub fn spawn_watch(config: WatchConfig, db_path: &Path) -> Result<WatchHandle> {
    let root = config
        .root
        .canonicalize()
        .context("cannot resolve watch root")?;
    if !root.is_dir() {
        anyhow::bail!("watch target is not a directory: {}", root.display());
    }

    let db_path = db_path.to_path_buf();
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = Arc::clone(&shutdown);

    let thread = std::thread::Builder::new()
        .name("codexray-watch".into())
        .spawn(move || {
            if let Err(e) = watch_loop(config, &root, &db_path, &shutdown_clone) {
                warn!(error = %e, "watch loop exited with error");
            }
        })
        .context("failed to spawn watch thread")?;

    Ok(WatchHandle {
        shutdown,
        thread: Some(thread),
    })
}

/// Run the watch loop in the foreground (blocking). Used by `codexray watch`.
pub fn run_watch(config: WatchConfig, db_path: &Path) -> Result<()> {
    let root = config
        .root
        .canonicalize()
        .context("cannot resolve watch root")?;
    if !root.is_dir() {
        anyhow::bail!("watch target is not a directory: {}", root.display());
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    install_ctrlc_handler(&shutdown);
    watch_loop(config, &root, db_path, &shutdown)
}

fn install_ctrlc_handler(flag: &Arc<AtomicBool>) {
    let flag = Arc::clone(flag);
    let _ = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    });
}

/// Core watch loop. Runs until `shutdown` is set.
fn watch_loop(
    config: WatchConfig,
    root: &Path,
    db_path: &Path,
    shutdown: &AtomicBool,
) -> Result<()> {
    let store = Store::open(db_path).context("failed to open store for watcher")?;
    let project = Config::load(root)?;

    info!(
        path = %root.display(),
        debounce_ms = config.debounce.as_millis(),
        "starting watch"
    );

    // Bring the store current before listening.
    match indexer::sync_directory(&store, root, &project) {
        Ok(r) => info!(
            files = r.files_indexed,
            skipped = r.files_skipped,
            removed = r.files_removed,
            "initial sync complete"
        ),
        Err(e) => warn!(error = %e, "initial sync failed"),
    }

    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer =
        new_debouncer(config.debounce, tx).context("failed to create file watcher")?;
    debouncer
        .watcher()
        .watch(root, notify::RecursiveMode::Recursive)
        .context("failed to start watching directory")?;

    info!("watching for changes (Ctrl+C to stop)");

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        match rx.recv_timeout(Duration::from_secs(1)) {
            Ok(Ok(events)) => {
                let mut touched = 0u32;
                for event in &events {
                    if event.kind != DebouncedEventKind::Any {
                        continue;
                    }
                    let Some(rel) = relevant_rel_path(&event.path, root) else {
                        continue;
                    };
                    match indexer::reindex_file(&store, root, &rel, &project) {
                        Ok(()) => {
                            touched += 1;
                            debug!(file = %rel, "re-indexed");
                        }
                        Err(e) => warn!(file = %rel, error = %e, "re-index failed"),
                    }
                }
                if touched > 0 {
                    if let Err(e) = store.rebuild_semantic_index() {
                        warn!(error = %e, "semantic index rebuild failed");
                    }
                    info!(files = touched, "watch batch applied");
                }
            }
            Ok(Err(error)) => {
                warn!(error = %error, "file watcher error");
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                warn!("file watcher channel disconnected");
                break;
            }
        }
    }

    info!("watch stopped");
    Ok(())
}

/// Map an event path to a watched relative path. Returns `None` for files
/// with unsupported extensions, outside the root, or under an ignored
/// directory.
fn relevant_rel_path(path: &Path, root: &Path) -> Option<String> {
    detect_language(path)?;

    let relative = path.strip_prefix(root).ok()?;
    if let Some(parent) = relative.parent() {
        for component in parent.components() {
            if let std::path::Component::Normal(name) = component {
                if name.to_str().is_some_and(is_ignored_dirname) {
                    return None;
                }
            }
        }
    }

    Some(relative.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relevant_paths_by_language() {
        let root = PathBuf::from("/project");
        assert_eq!(
            relevant_rel_path(Path::new("/project/src/app.ts"), &root),
            Some("src/app.ts".to_string())
        );
        assert!(relevant_rel_path(Path::new("/project/src/main.py"), &root).is_some());
        assert!(relevant_rel_path(Path::new("/project/lib.rs"), &root).is_some());
        assert!(relevant_rel_path(Path::new("/project/README.md"), &root).is_none());
        assert!(relevant_rel_path(Path::new("/project/Cargo.toml"), &root).is_none());
    }

    #[test]
    fn test_ignored_directories_not_relevant() {
        let root = PathBuf::from("/project");
        assert!(
            relevant_rel_path(Path::new("/project/node_modules/pkg/index.js"), &root).is_none()
        );
        assert!(relevant_rel_path(Path::new("/project/.git/hooks/x.py"), &root).is_none());
        assert!(relevant_rel_path(Path::new("/project/target/debug/b.rs"), &root).is_none());
        assert!(relevant_rel_path(Path::new("/project/.codexray/x.ts"), &root).is_none());
    }

    #[test]
    fn test_paths_outside_root_not_relevant() {
        let root = PathBuf::from("/workspace/project-a");
        assert!(relevant_rel_path(Path::new("/workspace/project-b/main.py"), &root).is_none());
        // String-prefix traps: /project-b is not under /project
        assert!(relevant_rel_path(
            Path::new("/workspace/project-ab/main.py"),
            &root
        )
        .is_none());
    }

    #[test]
    fn test_config_defaults() {
        let config = WatchConfig::new(PathBuf::from("."));
        assert_eq!(config.debounce, Duration::from_millis(300));
    }

    #[test]
    fn test_spawn_watch_rejects_bad_roots() {
        let config = WatchConfig::new(PathBuf::from("/nonexistent/path/xyz"));
        assert!(spawn_watch(config, Path::new(":memory:")).is_err());
    }

    #[test]
    fn test_watch_handle_drop_signals_shutdown() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let handle = WatchHandle {
            shutdown: Arc::clone(&shutdown),
            thread: None,
        };
        assert!(!shutdown.load(Ordering::SeqCst));
        drop(handle);
        assert!(shutdown.load(Ordering::SeqCst));
    }

    #[test]
    fn test_watch_handle_stop_joins_thread() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_for_thread = Arc::clone(&shutdown);
        let thread = std::thread::spawn(move || {
            while !shutdown_for_thread.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(10));
            }
        });

        let handle = WatchHandle {
            shutdown: Arc::clone(&shutdown),
            thread: Some(thread),
        };
        handle.stop();
        assert!(shutdown.load(Ordering::SeqCst));
    }
}
