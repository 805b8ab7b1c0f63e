use anyhow::Result;
use wgpu::SurfaceError;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
#[cfg(not(target_arch = "wasm32"))]
use winit::event::ElementState;
#[cfg(not(target_arch = "wasm32"))]
use winit::keyboard::{KeyCode, PhysicalKey};

use super::AppState;

impl AppState {
    fn redraw(&mut self) -> bool {
        self.update();
        match self.render() {
            Ok(()) => true,
            Err(SurfaceError::Lost) => {
                self.resize(self.gpu.size);
                true
            }
            Err(SurfaceError::OutOfMemory) => {
                log::error!("out of GPU memory");
                false
            }
            Err(SurfaceError::Timeout | SurfaceError::Outdated) => {
                log::debug!("frame {} skipped", self.frame_index);
                true
            }
            Err(e) => {
                log::error!("surface error: {e}");
                true
            }
        }
    }

    /// F1 toggles the panel and Escape closes it. Returns true if consumed.
    #[cfg(not(target_arch = "wasm32"))]
    fn handle_panel_keys(&mut self, event: &WindowEvent) -> bool {
        let WindowEvent::KeyboardInput { event: key, .. } = event else {
            return false;
        };
        if key.state != ElementState::Pressed || key.repeat {
            return false;
        }
        match key.physical_key {
            PhysicalKey::Code(KeyCode::F1) => {
                self.panel.toggle();
                self.end_drag();
                true
            }
            PhysicalKey::Code(KeyCode::Escape) if self.panel.is_visible() => {
                self.panel.toggle();
                true
            }
            _ => false,
        }
    }
}

pub fn run_event_loop(mut app: AppState, event_loop: EventLoop<()>) -> Result<()> {
    event_loop.run(move |event, target| {
        target.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { window_id, event } if window_id == app.window.id() => {
                #[cfg(not(target_arch = "wasm32"))]
                {
                    if app.handle_panel_keys(&event) {
                        return;
                    }
                    // Clicks on the panel must not reach the tiles underneath.
                    let egui_wants_event =
                        app.panel.is_visible() && app.egui_bridge.on_window_event(&event);
                    if !egui_wants_event {
                        app.process_window_event(&event);
                    }
                }
                #[cfg(target_arch = "wasm32")]
                app.process_window_event(&event);

                match event {
                    WindowEvent::CloseRequested => {
                        app.shutdown();
                        target.exit();
                    }
                    WindowEvent::Resized(size) => app.resize(size),
                    WindowEvent::RedrawRequested => {
                        if !app.redraw() {
                            app.shutdown();
                            target.exit();
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                app.window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}

#[cfg(target_arch = "wasm32")]
pub fn run_event_loop_web(window: &'static winit::window::Window, event_loop: EventLoop<()>) {
    use std::cell::RefCell;
    use std::rc::Rc;
    use winit::platform::web::EventLoopExtWebSys;

    let app: Rc<RefCell<Option<AppState>>> = Rc::new(RefCell::new(None));
    let init_started = Rc::new(RefCell::new(false));

    let app_for_loop = Rc::clone(&app);
    let init_started_for_loop = Rc::clone(&init_started);

    event_loop.spawn(move |event, target| {
        target.set_control_flow(ControlFlow::Poll);

        // GPU setup is async on the web; start it on the first Resumed.
        if matches!(event, Event::Resumed) && !*init_started_for_loop.borrow() {
            *init_started_for_loop.borrow_mut() = true;
            let app_ref = Rc::clone(&app_for_loop);
            wasm_bindgen_futures::spawn_local(async move {
                match AppState::new_web(window).await {
                    Ok(state) => {
                        *app_ref.borrow_mut() = Some(state);
                        log::info!("garden initialized");
                    }
                    Err(e) => log::error!("failed to init: {e:#}"),
                }
            });
            return;
        }

        let mut app_borrow = app_for_loop.borrow_mut();
        let Some(app) = app_borrow.as_mut() else {
            return;
        };

        match event {
            Event::WindowEvent { window_id, event } if window_id == app.window.id() => {
                app.process_window_event(&event);
                match event {
                    WindowEvent::Resized(size) => app.resize(size),
                    WindowEvent::RedrawRequested => {
                        app.redraw();
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => app.window.request_redraw(),
            _ => {}
        }
    });
}
