use std::collections::HashSet;

use thiserror::Error;

/// Decoded RGBA8 sprite, keyed by its path relative to the assets root.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub key: String,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },
}

pub struct TextureLoad {
    pub key: String,
    pub result: Result<TextureData, AssetError>,
}

pub fn decode_texture(key: &str, bytes: &[u8]) -> Result<TextureData, AssetError> {
    let image = image::load_from_memory(bytes).map_err(|source| AssetError::Decode {
        key: key.to_string(),
        source,
    })?;
    let rgba = image.to_rgba8();
    Ok(TextureData {
        key: key.to_string(),
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

// ---------------------------------------------------------------------------
// TextureLoader trait: platform-specific fetch and decode
// ---------------------------------------------------------------------------

pub trait TextureLoader {
    fn request(&mut self, key: &str);
    fn poll(&mut self) -> Vec<TextureLoad>;
}

// ---------------------------------------------------------------------------
// Native: read and decode on a rayon pool
// ---------------------------------------------------------------------------

#[cfg(not(target_arch = "wasm32"))]
mod threaded {
    use super::*;
    use std::path::PathBuf;
    use std::sync::mpsc::{self, Receiver, Sender};

    use rayon::{ThreadPool, ThreadPoolBuilder};

    pub struct ThreadedLoader {
        root: PathBuf,
        pool: ThreadPool,
        sender: Sender<TextureLoad>,
        receiver: Receiver<TextureLoad>,
    }

    impl ThreadedLoader {
        pub fn new(root: &str, threads: usize) -> anyhow::Result<Self> {
            let pool = ThreadPoolBuilder::new()
                .num_threads(threads.max(1))
                .thread_name(|i| format!("texture-load-{i}"))
                .build()?;
            let (sender, receiver) = mpsc::channel();
            Ok(Self {
                root: PathBuf::from(root),
                pool,
                sender,
                receiver,
            })
        }
    }

    impl TextureLoader for ThreadedLoader {
        fn request(&mut self, key: &str) {
            let key = key.to_string();
            let path = self.root.join(&key);
            let tx = self.sender.clone();
            self.pool.spawn(move || {
                let result = std::fs::read(&path)
                    .map_err(|source| AssetError::Io {
                        path: path.display().to_string(),
                        source,
                    })
                    .and_then(|bytes| decode_texture(&key, &bytes));
                let _ = tx.send(TextureLoad { key, result });
            });
        }

        fn poll(&mut self) -> Vec<TextureLoad> {
            self.receiver.try_iter().collect()
        }
    }
}

// ---------------------------------------------------------------------------
// Wasm: fetch relative to the page, decode on the main thread
// ---------------------------------------------------------------------------

#[cfg(target_arch = "wasm32")]
mod web {
    use super::*;
    use std::sync::{Arc, Mutex};

    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    pub struct WebLoader {
        root: String,
        completed: Arc<Mutex<Vec<TextureLoad>>>,
    }

    impl WebLoader {
        pub fn new(root: &str, _threads: usize) -> anyhow::Result<Self> {
            Ok(Self {
                root: root.trim_end_matches('/').to_string(),
                completed: Arc::new(Mutex::new(Vec::new())),
            })
        }
    }

    impl TextureLoader for WebLoader {
        fn request(&mut self, key: &str) {
            let key = key.to_string();
            let url = format!("{}/{}", self.root, key);
            let slot = Arc::clone(&self.completed);
            wasm_bindgen_futures::spawn_local(async move {
                let result = match fetch_bytes(&url).await {
                    Ok(bytes) => decode_texture(&key, &bytes),
                    Err(message) => Err(AssetError::Fetch { url, message }),
                };
                if let Ok(mut guard) = slot.lock() {
                    guard.push(TextureLoad { key, result });
                }
            });
        }

        fn poll(&mut self) -> Vec<TextureLoad> {
            match self.completed.lock() {
                Ok(mut guard) => std::mem::take(&mut *guard),
                Err(_) => Vec::new(),
            }
        }
    }

    async fn fetch_bytes(url: &str) -> Result<Vec<u8>, String> {
        let window = web_sys::window().ok_or_else(|| "window not available".to_string())?;
        let response_value = JsFuture::from(window.fetch_with_str(url))
            .await
            .map_err(|e| format!("fetch failed: {e:?}"))?;
        let response: web_sys::Response = response_value
            .dyn_into()
            .map_err(|_| "failed to cast fetch response".to_string())?;
        if !response.ok() {
            return Err(format!("HTTP {}", response.status()));
        }
        let buffer_promise = response
            .array_buffer()
            .map_err(|e| format!("response.arrayBuffer() failed: {e:?}"))?;
        let buffer = JsFuture::from(buffer_promise)
            .await
            .map_err(|e| format!("await arrayBuffer failed: {e:?}"))?;
        Ok(js_sys::Uint8Array::new(&buffer).to_vec())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub type PlatformLoader = threaded::ThreadedLoader;
#[cfg(target_arch = "wasm32")]
pub type PlatformLoader = web::WebLoader;

// ---------------------------------------------------------------------------
// AssetStreamer: generation-aware bookkeeping over a loader
// ---------------------------------------------------------------------------

pub struct AssetStreamer<L: TextureLoader = PlatformLoader> {
    loader: L,
    generation: u64,
    wanted: HashSet<String>,
    resolved: HashSet<String>,
    pending: HashSet<String>,
    failed: HashSet<String>,
    shut_down: bool,
}

impl AssetStreamer<PlatformLoader> {
    pub fn new(root: &str, threads: usize) -> anyhow::Result<Self> {
        Ok(Self::with_loader(PlatformLoader::new(root, threads)?))
    }
}

impl<L: TextureLoader> AssetStreamer<L> {
    pub fn with_loader(loader: L) -> Self {
        Self {
            loader,
            generation: 0,
            wanted: HashSet::new(),
            resolved: HashSet::new(),
            pending: HashSet::new(),
            failed: HashSet::new(),
            shut_down: false,
        }
    }

    /// Declares the textures a new generation draws with and requests the
    /// ones not already loaded or in flight. Returns textures the new
    /// generation no longer uses, so their GPU copies can be released.
    pub fn begin_generation<I>(&mut self, generation: u64, keys: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        if self.shut_down {
            return Vec::new();
        }
        self.generation = generation;
        let wanted: HashSet<String> = keys.into_iter().collect();

        let mut released: Vec<String> = self
            .resolved
            .iter()
            .filter(|key| !wanted.contains(*key))
            .cloned()
            .collect();
        released.sort();
        self.resolved.retain(|key| wanted.contains(key));
        self.pending.retain(|key| wanted.contains(key));

        let mut to_request: Vec<&String> = wanted
            .iter()
            .filter(|key| {
                !self.resolved.contains(*key)
                    && !self.pending.contains(*key)
                    && !self.failed.contains(*key)
            })
            .collect();
        to_request.sort();
        for key in to_request {
            self.loader.request(key);
            self.pending.insert(key.clone());
        }

        self.wanted = wanted;
        released
    }

    /// Re-requests a texture that changed on disk, if anything still draws
    /// with it. The old copy stays drawable until the new one lands.
    pub fn reload(&mut self, key: &str) -> bool {
        if self.shut_down || !self.wanted.contains(key) {
            return false;
        }
        self.failed.remove(key);
        self.pending.insert(key.to_string());
        self.loader.request(key);
        true
    }

    /// Finished loads for textures still wanted. Results for anything else
    /// are discarded; failures are logged and remembered.
    pub fn poll(&mut self) -> Vec<TextureData> {
        let loads = self.loader.poll();
        if self.shut_down {
            return Vec::new();
        }

        let mut ready = Vec::new();
        for load in loads {
            if !self.wanted.contains(&load.key) {
                log::debug!("dropping stale texture {}", load.key);
                continue;
            }
            self.pending.remove(&load.key);
            match load.result {
                Ok(texture) => {
                    self.resolved.insert(load.key);
                    ready.push(texture);
                }
                Err(e) => {
                    log::warn!("texture {} unavailable: {e}", load.key);
                    self.failed.insert(load.key);
                }
            }
        }
        ready
    }

    /// After this every in-flight or future result is ignored.
    pub fn shutdown(&mut self) {
        self.shut_down = true;
        self.wanted.clear();
        self.pending.clear();
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_wanted(&self, key: &str) -> bool {
        self.wanted.contains(key)
    }

    pub fn is_resolved(&self, key: &str) -> bool {
        self.resolved.contains(key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}
