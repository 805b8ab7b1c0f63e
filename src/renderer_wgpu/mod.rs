#[cfg(not(target_arch = "wasm32"))]
pub mod egui_bridge;
#[cfg(not(target_arch = "wasm32"))]
pub mod egui_pass;
pub mod garden;
pub mod geometry;
pub mod gpu_context;
pub mod instancing;
pub mod material;
pub mod pipeline;
pub mod texture;

mod tile_pass;
mod vegetation_pass;

pub use vegetation_pass::{plan_batches, BatchKey, BatchPlan};
