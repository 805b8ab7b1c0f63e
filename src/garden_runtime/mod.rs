#[cfg(not(target_arch = "wasm32"))]
pub mod asset_watcher;
pub mod assets;
pub mod runtime;
