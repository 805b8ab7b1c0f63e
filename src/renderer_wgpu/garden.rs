use glam::{Mat4, Vec3};

use super::material::{FrameBindGroup, FrameUniform};
use super::pipeline::DepthTexture;
use super::tile_pass::TilePass;
use super::vegetation_pass::VegetationPass;
use crate::garden_core::grid::TileGrid;
use crate::garden_core::placement::Placement;
use crate::garden_core::species::SpeciesCatalog;
use crate::garden_core::wind::InstanceAnimator;
use crate::garden_runtime::assets::TextureData;

pub fn clear_color() -> wgpu::Color {
    wgpu::Color::WHITE
}

pub struct GardenRenderer {
    frame_bg: FrameBindGroup,
    depth: DepthTexture,
    tiles: TilePass,
    vegetation: VegetationPass,
}

impl GardenRenderer {
    pub fn new(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration, grid: &TileGrid) -> Self {
        let frame_bg = FrameBindGroup::new(device);

        let tile_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tile-pipeline-layout"),
            bind_group_layouts: &[&frame_bg.layout],
            push_constant_ranges: &[],
        });
        let tiles = TilePass::new(device, config, &tile_layout, grid);
        let vegetation = VegetationPass::new(device, config, &frame_bg.layout);

        Self {
            depth: DepthTexture::new(device, config, "garden-depth"),
            frame_bg,
            tiles,
            vegetation,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) {
        self.depth = DepthTexture::new(device, config, "garden-depth");
    }

    pub fn update_frame(
        &self,
        queue: &wgpu::Queue,
        view_proj: Mat4,
        camera_position: Vec3,
        elapsed: f32,
    ) {
        self.frame_bg
            .update(queue, &FrameUniform::new(view_proj, camera_position, elapsed));
    }

    pub fn sync_grid(&mut self, device: &wgpu::Device, grid: &TileGrid) {
        self.tiles.rebuild_grid(device, grid);
    }

    pub fn sync_selection(&mut self, device: &wgpu::Device, grid: &TileGrid) {
        self.tiles.rebuild_selection(device, grid);
    }

    pub fn replace_vegetation(
        &mut self,
        device: &wgpu::Device,
        generation: u64,
        placement: &Placement,
        catalog: &SpeciesCatalog,
        ground_cover_texture: &str,
    ) {
        self.vegetation
            .replace_batches(device, generation, placement, catalog, ground_cover_texture);
    }

    pub fn insert_texture(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &TextureData) {
        self.vegetation.insert_texture(device, queue, data);
    }

    pub fn release_textures(&mut self, keys: &[String]) {
        self.vegetation.release_textures(keys);
    }

    pub fn animate(&mut self, queue: &wgpu::Queue, animator: &InstanceAnimator, elapsed: f64) {
        self.vegetation.update_sway(queue, animator, elapsed);
    }

    pub fn batch_count(&self) -> usize {
        self.vegetation.batch_count()
    }

    pub fn drawable_batch_count(&self) -> usize {
        self.vegetation.drawable_batch_count()
    }

    pub fn render<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        pass.set_bind_group(0, &self.frame_bg.bind_group, &[]);
        self.tiles.render(pass);
        self.vegetation.render(pass);
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth.view
    }
}
