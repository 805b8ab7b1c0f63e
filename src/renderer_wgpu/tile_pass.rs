use wgpu::util::DeviceExt;

use super::geometry::{garden_outline, selection_fill, ColorVertex};
use super::pipeline::{create_render_pipeline, PipelineOptions};
use crate::garden_core::grid::TileGrid;

struct LineBuffer {
    buffer: wgpu::Buffer,
    vertex_count: u32,
}

fn upload(device: &wgpu::Device, vertices: &[ColorVertex], label: &str) -> Option<LineBuffer> {
    if vertices.is_empty() {
        return None;
    }
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    Some(LineBuffer {
        buffer,
        vertex_count: vertices.len() as u32,
    })
}

/// Garden outline plus the translucent fill over selected tiles.
pub struct TilePass {
    line_pipeline: wgpu::RenderPipeline,
    fill_pipeline: wgpu::RenderPipeline,
    outline: Option<LineBuffer>,
    fill: Option<LineBuffer>,
}

impl TilePass {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        pipeline_layout: &wgpu::PipelineLayout,
        grid: &TileGrid,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tiles-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/tiles.wgsl").into()),
        });

        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ColorVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        };

        let line_pipeline = create_render_pipeline(
            device,
            config,
            pipeline_layout,
            &shader,
            std::slice::from_ref(&vertex_layout),
            "tile-outline-pipeline",
            PipelineOptions::overlay(wgpu::PrimitiveTopology::LineList),
        );
        let fill_pipeline = create_render_pipeline(
            device,
            config,
            pipeline_layout,
            &shader,
            &[vertex_layout],
            "tile-fill-pipeline",
            PipelineOptions::overlay(wgpu::PrimitiveTopology::TriangleList),
        );

        let mut pass = Self {
            line_pipeline,
            fill_pipeline,
            outline: None,
            fill: None,
        };
        pass.rebuild_grid(device, grid);
        pass
    }

    /// Garden dimensions changed: both outline and fill are stale.
    pub fn rebuild_grid(&mut self, device: &wgpu::Device, grid: &TileGrid) {
        self.outline = upload(device, &garden_outline(grid), "tile-outline-vb");
        self.rebuild_selection(device, grid);
    }

    pub fn rebuild_selection(&mut self, device: &wgpu::Device, grid: &TileGrid) {
        self.fill = upload(device, &selection_fill(grid), "tile-fill-vb");
    }

    pub fn render<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        if let Some(fill) = &self.fill {
            pass.set_pipeline(&self.fill_pipeline);
            pass.set_vertex_buffer(0, fill.buffer.slice(..));
            pass.draw(0..fill.vertex_count, 0..1);
        }
        if let Some(outline) = &self.outline {
            pass.set_pipeline(&self.line_pipeline);
            pass.set_vertex_buffer(0, outline.buffer.slice(..));
            pass.draw(0..outline.vertex_count, 0..1);
        }
    }
}
