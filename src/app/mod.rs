use anyhow::{Context, Result};
use glam::Vec2;
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::window::Window;

use crate::garden_core::config::GardenConfig;
use crate::garden_core::selection::SelectionEvent;
use crate::garden_runtime::assets::AssetStreamer;
use crate::garden_runtime::runtime::{GardenIntent, GardenRuntime};
use crate::renderer_wgpu::garden::{clear_color, GardenRenderer};
use crate::renderer_wgpu::gpu_context::GpuContext;

#[cfg(not(target_arch = "wasm32"))]
use crate::debug_api::{start_debug_api, DebugApiConfig, DebugApiHandle};
#[cfg(not(target_arch = "wasm32"))]
use crate::garden_runtime::asset_watcher::AssetWatcher;
#[cfg(not(target_arch = "wasm32"))]
use crate::renderer_wgpu::egui_bridge::EguiBridge;
#[cfg(not(target_arch = "wasm32"))]
use crate::renderer_wgpu::egui_pass::EguiPass;
#[cfg(not(target_arch = "wasm32"))]
use crate::ui::GardenPanel;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;
#[cfg(target_arch = "wasm32")]
use web_time::Instant;

#[cfg(not(target_arch = "wasm32"))]
mod debug_commands;
mod event_loop;

pub use event_loop::run_event_loop;
#[cfg(target_arch = "wasm32")]
pub use event_loop::run_event_loop_web;

pub struct AppState {
    window: &'static Window,
    gpu: GpuContext,
    renderer: GardenRenderer,
    runtime: GardenRuntime,
    assets: AssetStreamer,
    cursor: Option<Vec2>,
    dragging: bool,
    last_frame: Instant,
    frame_time_ms: f32,
    frame_index: u64,
    #[cfg(not(target_arch = "wasm32"))]
    debug_api: Option<DebugApiHandle>,
    #[cfg(not(target_arch = "wasm32"))]
    last_telemetry_emit: Instant,
    #[cfg(not(target_arch = "wasm32"))]
    asset_watcher: Option<AssetWatcher>,
    #[cfg(not(target_arch = "wasm32"))]
    egui_bridge: EguiBridge,
    #[cfg(not(target_arch = "wasm32"))]
    egui_pass: EguiPass,
    #[cfg(not(target_arch = "wasm32"))]
    panel: GardenPanel,
}

/// Everything both platforms build the same way.
struct Scene {
    gpu: GpuContext,
    renderer: GardenRenderer,
    runtime: GardenRuntime,
    assets: AssetStreamer,
}

impl Scene {
    async fn new(window: &'static Window, config: GardenConfig, threads: usize) -> Result<Self> {
        let gpu = GpuContext::new(window).await?;
        let assets = AssetStreamer::new(&config.assets.root, threads)?;
        let mut runtime = GardenRuntime::new(config, gpu.config.width, gpu.config.height)
            .context("invalid garden grid")?;
        runtime.add_listener(Box::new(|event: &SelectionEvent| match event {
            SelectionEvent::Changed { tiles } => log::debug!("{} tiles selected", tiles.len()),
            SelectionEvent::CapacityExceeded { tile, capacity } => {
                log::debug!("tile {},{} refused, {capacity} already selected", tile.x, tile.z)
            }
        }));
        let renderer = GardenRenderer::new(&gpu.device, &gpu.config, runtime.grid());
        Ok(Self {
            gpu,
            renderer,
            runtime,
            assets,
        })
    }
}

impl AppState {
    #[cfg(not(target_arch = "wasm32"))]
    pub async fn new(
        window: &'static Window,
        config: GardenConfig,
        debug_api_config: DebugApiConfig,
    ) -> Result<Self> {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
            .min(4);
        let watch = config.assets.watch;
        let asset_root = config.assets.root.clone();
        let panel = GardenPanel::new(&config.grid);

        let Scene {
            gpu,
            renderer,
            runtime,
            assets,
        } = Scene::new(window, config, threads).await?;

        let debug_api = start_debug_api(&debug_api_config)?;
        if let Some(api) = &debug_api {
            log::info!("debug api listening on {}", api.bind_addr());
            let controller = runtime.controller();
            api.sync_selection(controller.selection().as_slice(), controller.capacity());
        }

        let asset_watcher = if watch {
            AssetWatcher::start(&asset_root)
        } else {
            None
        };

        let egui_bridge = EguiBridge::new(
            window.scale_factor() as f32,
            gpu.config.width,
            gpu.config.height,
        );
        let egui_pass = EguiPass::new(&gpu.device, gpu.config.format);

        Ok(Self {
            window,
            gpu,
            renderer,
            runtime,
            assets,
            cursor: None,
            dragging: false,
            last_frame: Instant::now(),
            frame_time_ms: 0.0,
            frame_index: 0,
            debug_api,
            last_telemetry_emit: Instant::now() - Duration::from_secs(1),
            asset_watcher,
            egui_bridge,
            egui_pass,
            panel,
        })
    }

    #[cfg(target_arch = "wasm32")]
    pub async fn new_web(window: &'static Window) -> Result<Self> {
        let Scene {
            gpu,
            renderer,
            runtime,
            assets,
        } = Scene::new(window, GardenConfig::default(), 1).await?;

        Ok(Self {
            window,
            gpu,
            renderer,
            runtime,
            assets,
            cursor: None,
            dragging: false,
            last_frame: Instant::now(),
            frame_time_ms: 0.0,
            frame_index: 0,
        })
    }

    /// Turns pointer, wheel and focus events into garden intents.
    fn process_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                let position = Vec2::new(position.x as f32, position.y as f32);
                self.cursor = Some(position);
                if self.dragging {
                    self.runtime.push(GardenIntent::PointerMove { position });
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => {
                    if let Some(position) = self.cursor {
                        self.dragging = true;
                        self.runtime.push(GardenIntent::PointerDown { position });
                    }
                }
                ElementState::Released => self.end_drag(),
            },
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.end_drag();
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let line = self.runtime.config().scroll.line_height_px;
                let pixels = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y * line,
                    MouseScrollDelta::PixelDelta(d) => -(d.y as f32),
                };
                self.runtime.push(GardenIntent::ScrollBy(pixels));
            }
            WindowEvent::Focused(false) => self.end_drag(),
            _ => {}
        }
    }

    fn end_drag(&mut self) {
        if self.dragging {
            self.dragging = false;
            self.runtime.push(GardenIntent::PointerUp);
        }
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
        self.renderer.resize(&self.gpu.device, &self.gpu.config);
        self.runtime.push(GardenIntent::Resize {
            width: self.gpu.config.width,
            height: self.gpu.config.height,
        });
        #[cfg(not(target_arch = "wasm32"))]
        self.egui_bridge
            .resize(self.gpu.config.width, self.gpu.config.height);
    }

    fn update(&mut self) {
        self.frame_index = self.frame_index.saturating_add(1);

        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.frame_time_ms = self.frame_time_ms * 0.94 + (dt * 1000.0) * 0.06;

        #[cfg(not(target_arch = "wasm32"))]
        {
            self.apply_debug_commands();
            for intent in self.panel.take_intents(self.egui_bridge.ctx()) {
                self.runtime.push(intent);
            }
            if let Some(watcher) = &self.asset_watcher {
                for key in watcher.drain_changes() {
                    if self.assets.reload(&key) {
                        log::info!("re-streaming {key}");
                    }
                }
            }
        }

        let changes = self.runtime.update(dt);

        // Listeners already saw these; the buffer only feeds the debug API.
        let events = self.runtime.drain_events();
        #[cfg(not(target_arch = "wasm32"))]
        if let Some(api) = &self.debug_api {
            if changes.grid {
                let controller = self.runtime.controller();
                api.sync_selection(controller.selection().as_slice(), controller.capacity());
            }
            for event in &events {
                api.publish_selection(event);
            }
        }
        #[cfg(target_arch = "wasm32")]
        let _ = events;

        if changes.grid {
            self.renderer.sync_grid(&self.gpu.device, self.runtime.grid());
        } else if changes.selection {
            self.renderer
                .sync_selection(&self.gpu.device, self.runtime.grid());
        }

        if changes.placement {
            let config = self.runtime.config();
            self.renderer.replace_vegetation(
                &self.gpu.device,
                self.runtime.generation(),
                self.runtime.placement(),
                &config.species,
                &config.assets.ground_cover_texture,
            );
            let released = self
                .assets
                .begin_generation(self.runtime.generation(), self.runtime.texture_keys());
            self.renderer.release_textures(&released);
        }

        for texture in self.assets.poll() {
            self.renderer
                .insert_texture(&self.gpu.device, &self.gpu.queue, &texture);
        }

        let view = self.runtime.camera_view();
        let elapsed = self.runtime.elapsed();
        self.renderer.update_frame(
            &self.gpu.queue,
            view.view_projection(),
            view.pose.position(),
            elapsed as f32,
        );
        self.renderer
            .animate(&self.gpu.queue, self.runtime.animator(), elapsed);

        let stats = self.runtime.stats();
        #[cfg(not(target_arch = "wasm32"))]
        {
            self.panel.sync(&stats);
            self.publish_telemetry_if_due();
        }

        self.window.set_title(&format!(
            "garden-grid | {:.1}ms | {}x{} | selected {}/{} | plants {} | grass {} | gen {}",
            self.frame_time_ms,
            stats.garden_width,
            stats.garden_height,
            stats.selected,
            stats.capacity,
            stats.plants,
            stats.ground_cover,
            stats.generation,
        ));
    }

    fn render(&mut self) -> Result<(), SurfaceError> {
        let output = self.gpu.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("garden-render-encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("garden-render-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color()),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.renderer.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.renderer.render(&mut pass);
        }

        #[cfg(not(target_arch = "wasm32"))]
        if self.panel.is_visible() {
            let stats = self.runtime.stats();
            let warning = self.runtime.last_capacity_warning();
            let pending = self.assets.pending_count();
            let raw_input = self.egui_bridge.take_raw_input();
            let full_output = self.egui_bridge.ctx().run(raw_input, |ctx| {
                self.panel.ui(ctx, &stats, warning, pending);
            });

            self.egui_bridge
                .handle_platform_output(self.window, &full_output.platform_output);

            let screen = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [self.gpu.config.width, self.gpu.config.height],
                pixels_per_point: self.egui_bridge.pixels_per_point(),
            };
            self.egui_pass.render(
                &self.gpu.device,
                &self.gpu.queue,
                &mut encoder,
                &view,
                screen,
                full_output,
                self.egui_bridge.ctx(),
            );
        }

        self.gpu.queue.submit(Some(encoder.finish()));
        output.present();
        Ok(())
    }

    /// Late texture loads are dropped from here on.
    fn shutdown(&mut self) {
        self.assets.shutdown();
        log::info!("garden closed after {} frames", self.frame_index);
    }
}
