// Native binary; the wasm build starts from `wasm_main` in lib.rs.

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    use anyhow::Context;
    use winit::dpi::PhysicalSize;
    use winit::event_loop::EventLoop;
    use winit::window::WindowBuilder;

    use garden_grid::app::{self, AppState};
    use garden_grid::debug_api::DebugApiConfig;
    use garden_grid::garden_core::config::{GardenConfig, CONFIG_FILE};

    env_logger::init();

    let config = GardenConfig::load();
    config
        .validate()
        .with_context(|| format!("invalid {CONFIG_FILE}"))?;

    let debug_api = DebugApiConfig::from_env_args()?;
    log::info!(
        "debug api enabled: {}, bind: {}",
        debug_api.enabled,
        debug_api.bind_addr
    );

    let event_loop = EventLoop::new()?;
    let window = Box::leak(Box::new(
        WindowBuilder::new()
            .with_title("garden-grid")
            .with_inner_size(PhysicalSize::new(1280, 800))
            .build(&event_loop)
            .context("failed to create window")?,
    ));

    let app = pollster::block_on(AppState::new(window, config, debug_api))?;
    app::run_event_loop(app, event_loop)
}

#[cfg(target_arch = "wasm32")]
fn main() {}
