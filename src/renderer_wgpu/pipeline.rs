pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub struct DepthTexture {
    pub view: wgpu::TextureView,
    _texture: wgpu::Texture,
}

impl DepthTexture {
    pub fn new(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: config.width.max(1),
                height: config.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            view,
            _texture: texture,
        }
    }
}

/// The knobs that differ between the garden's pipelines.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub topology: wgpu::PrimitiveTopology,
    pub blend: wgpu::BlendState,
    pub depth_write: bool,
}

impl PipelineOptions {
    /// Translucent overlay geometry that must not hide what is drawn after it.
    pub fn overlay(topology: wgpu::PrimitiveTopology) -> Self {
        Self {
            topology,
            blend: wgpu::BlendState::ALPHA_BLENDING,
            depth_write: false,
        }
    }

    /// Alpha-tested sprites: opaque where kept, discarded elsewhere.
    pub fn cutout() -> Self {
        Self {
            topology: wgpu::PrimitiveTopology::TriangleList,
            blend: wgpu::BlendState::ALPHA_BLENDING,
            depth_write: true,
        }
    }
}

pub fn create_render_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    buffers: &[wgpu::VertexBufferLayout<'_>],
    label: &str,
    options: PipelineOptions,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: config.format,
                blend: Some(options.blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        // Sprites are single quads seen from both sides, so nothing is culled.
        primitive: wgpu::PrimitiveState {
            topology: options.topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: options.depth_write,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
