//! Directory watching for the `serve` command.
//!
//! Stands in for a compiler: a burst of file changes opens a build cycle, and
//! once the directory is quiet again the cycle is finished with a content
//! hash of everything being served.

use crate::broadcast::{BuildStats, CompilerEvent};
use crate::error::{LiveError, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use walkdir::WalkDir;

/// Length of the hex content hash announced to clients.
const HASH_LEN: usize = 20;

/// Capacity of the raw change channel. Overflow is harmless: one change per
/// burst is enough to open a cycle.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Paths under the watched root that never trigger a rebuild.
///
/// Patterns are either extensions (`*.log`) or path segments
/// (`node_modules`). Hidden files and directories are always ignored.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    patterns: Vec<String>,
}

impl IgnoreRules {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    /// Rules used by `serve` unless told otherwise.
    pub fn standard() -> Self {
        Self::new(vec![
            "node_modules".to_string(),
            "target".to_string(),
            "*.log".to_string(),
            "*.swp".to_string(),
            "*~".to_string(),
        ])
    }

    pub fn with_patterns(mut self, patterns: impl IntoIterator<Item = String>) -> Self {
        self.patterns.extend(patterns);
        self
    }

    pub fn is_ignored(&self, path: &Path, root: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(root) else {
            return true;
        };

        let segments: Vec<&str> = relative
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect();

        if segments.iter().any(|s| s.starts_with('.')) {
            return true;
        }

        let relative = relative.to_string_lossy();
        self.patterns.iter().any(|pattern| match pattern.strip_prefix('*') {
            Some(suffix) => relative.ends_with(suffix),
            None => segments.iter().any(|s| s == pattern),
        })
    }
}

/// Recursive watcher over one directory.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `root`. Changes arrive on the returned channel.
    pub fn new(root: PathBuf, rules: IgnoreRules) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !root.is_dir() {
            return Err(LiveError::FileNotFound(root));
        }

        let (tx, rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);
        let watch_root = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, "file watcher error");
                    return;
                }
            };

            for path in event.paths {
                if rules.is_ignored(&path, &watch_root) {
                    continue;
                }
                let change = match event.kind {
                    EventKind::Create(_) => FileChange::Created(path),
                    EventKind::Modify(_) => FileChange::Modified(path),
                    EventKind::Remove(_) => FileChange::Removed(path),
                    _ => continue,
                };
                let _ = tx.try_send(change);
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        tracing::debug!(root = %root.display(), "watching for changes");

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Hash every non-ignored file under `root`, in path order.
pub fn content_hash(root: &Path, rules: &IgnoreRules) -> Result<String> {
    let mut hasher = blake3::Hasher::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.path() == root || !rules.is_ignored(entry.path(), root));

    for entry in walker {
        let entry = entry.map_err(|e| LiveError::Custom(format!("Failed to scan {}: {}", root.display(), e)))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        hasher.update(relative.to_string_lossy().as_bytes());
        hasher.update(&[0]);
        hasher.update(&std::fs::read(entry.path())?);
    }

    let mut hash = hasher.finalize().to_hex().to_string();
    hash.truncate(HASH_LEN);
    Ok(hash)
}

/// Turn file changes into build cycles.
///
/// The first change of a burst sends [`CompilerEvent::Invalid`]; when no
/// change has arrived for `settle`, the directory is hashed and
/// [`CompilerEvent::Done`] follows. Ends when either channel closes.
pub async fn drive_cycles(
    root: PathBuf,
    rules: IgnoreRules,
    mut changes: mpsc::Receiver<FileChange>,
    events: mpsc::Sender<CompilerEvent>,
    settle: Duration,
) {
    while let Some(first) = changes.recv().await {
        tracing::debug!(path = %first.path().display(), "change detected");
        if events.send(CompilerEvent::Invalid).await.is_err() {
            return;
        }

        // Swallow the rest of the burst.
        loop {
            match tokio::time::timeout(settle, changes.recv()).await {
                Ok(Some(change)) => {
                    tracing::trace!(path = %change.path().display(), "change coalesced");
                }
                Ok(None) => return,
                Err(_) => break,
            }
        }

        let scan_root = root.clone();
        let scan_rules = rules.clone();
        let scanned = tokio::task::spawn_blocking(move || content_hash(&scan_root, &scan_rules)).await;

        let stats = match scanned {
            Ok(Ok(hash)) => BuildStats::new(hash),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "failed to hash served directory");
                continue;
            }
            Err(e) => {
                tracing::warn!(error = %e, "hash task failed");
                continue;
            }
        };

        if events.send(CompilerEvent::Done(stats)).await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_ignore_rules() {
        let root = PathBuf::from("/project");
        let rules = IgnoreRules::new(vec!["node_modules".to_string(), "*.log".to_string()]);

        assert!(rules.is_ignored(Path::new("/project/node_modules/pkg/index.js"), &root));
        assert!(rules.is_ignored(Path::new("/project/debug.log"), &root));
        assert!(rules.is_ignored(Path::new("/project/.git/config"), &root));
        assert!(rules.is_ignored(Path::new("/project/src/.hidden/file.js"), &root));
        assert!(rules.is_ignored(Path::new("/other/file.js"), &root));

        assert!(!rules.is_ignored(Path::new("/project/src/index.js"), &root));
        // Segment match, not substring.
        assert!(!rules.is_ignored(Path::new("/project/src/node_modules_shim.js"), &root));
    }

    #[test]
    fn test_content_hash_tracks_contents() {
        let temp = TempDir::new().unwrap();
        let rules = IgnoreRules::standard();
        fs::write(temp.path().join("index.html"), "<h1>hi</h1>").unwrap();

        let first = content_hash(temp.path(), &rules).unwrap();
        assert_eq!(first.len(), HASH_LEN);
        assert_eq!(first, content_hash(temp.path(), &rules).unwrap());

        fs::write(temp.path().join("debug.log"), "noise").unwrap();
        assert_eq!(first, content_hash(temp.path(), &rules).unwrap());

        fs::write(temp.path().join("index.html"), "<h1>bye</h1>").unwrap();
        assert_ne!(first, content_hash(temp.path(), &rules).unwrap());
    }

    #[tokio::test]
    async fn test_drive_cycles_coalesces_bursts() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("app.js"), "1").unwrap();

        let (change_tx, change_rx) = mpsc::channel(16);
        let (event_tx, mut event_rx) = mpsc::channel(16);
        let driver = tokio::spawn(drive_cycles(
            temp.path().to_path_buf(),
            IgnoreRules::standard(),
            change_rx,
            event_tx,
            Duration::from_millis(30),
        ));

        for _ in 0..3 {
            change_tx
                .send(FileChange::Modified(temp.path().join("app.js")))
                .await
                .unwrap();
        }

        assert_eq!(event_rx.recv().await, Some(CompilerEvent::Invalid));
        match event_rx.recv().await {
            Some(CompilerEvent::Done(stats)) => {
                assert_eq!(stats.hash, content_hash(temp.path(), &IgnoreRules::standard()).unwrap());
            }
            other => panic!("expected done, got {:?}", other),
        }

        drop(change_tx);
        driver.await.unwrap();
        assert_eq!(event_rx.recv().await, None);
    }
}
