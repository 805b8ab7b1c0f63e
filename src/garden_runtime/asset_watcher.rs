use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

pub struct AssetWatcher {
    rx: Receiver<String>,
    _watcher: RecommendedWatcher,
}

impl AssetWatcher {
    /// Watches the assets root for `.png` changes. `None` if the directory
    /// is missing or the watcher fails to start.
    pub fn start(root: &str) -> Option<Self> {
        let watch_dir = PathBuf::from(root);
        if !watch_dir.is_dir() {
            log::info!("asset watcher: {watch_dir:?} not found, skipping");
            return None;
        }
        let base = watch_dir.canonicalize().unwrap_or_else(|_| watch_dir.clone());

        let (tx, rx) = mpsc::channel();
        let mut watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                let event = match res {
                    Ok(e) => e,
                    Err(e) => {
                        log::warn!("asset watcher error: {e}");
                        return;
                    }
                };
                if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                    return;
                }

                for path in &event.paths {
                    let Some(key) = texture_key(&base, path) else {
                        continue;
                    };
                    log::info!("asset watcher: detected change in {key}");
                    let _ = tx.send(key);
                }
            })
            .ok()?;

        if watcher.watch(&watch_dir, RecursiveMode::Recursive).is_err() {
            log::warn!("asset watcher: failed to watch {watch_dir:?}");
            return None;
        }

        log::info!("asset watcher started on {watch_dir:?}");
        Some(Self {
            rx,
            _watcher: watcher,
        })
    }

    /// Changed texture keys since the last call, deduplicated.
    pub fn drain_changes(&self) -> Vec<String> {
        let mut changes: Vec<String> = self.rx.try_iter().collect();
        changes.sort();
        changes.dedup();
        changes
    }
}

/// Path relative to the assets root with `/` separators, for `.png` files.
fn texture_key(base: &Path, path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some("png") {
        return None;
    }
    let relative = path.strip_prefix(base).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::texture_key;
    use std::path::Path;

    #[test]
    fn keys_are_relative_png_paths() {
        let base = Path::new("/srv/garden/assets");
        assert_eq!(
            texture_key(base, Path::new("/srv/garden/assets/21/Borago_officinalis.png")),
            Some("21/Borago_officinalis.png".to_string())
        );
        assert_eq!(texture_key(base, Path::new("/srv/garden/assets/readme.txt")), None);
        assert_eq!(texture_key(base, Path::new("/elsewhere/x.png")), None);
    }
}
