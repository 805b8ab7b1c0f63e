use egui::{Context, Event, Key, Modifiers, Pos2, RawInput, Rect, Vec2};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorIcon, Window};

/// Translates winit input for the garden panel and reports whether egui
/// claimed it, so the garden never toggles a tile under a panel click.
pub struct EguiBridge {
    ctx: Context,
    events: Vec<Event>,
    pointer_pos: Pos2,
    modifiers: Modifiers,
    pixels_per_point: f32,
    screen_size: (u32, u32),
}

impl EguiBridge {
    pub fn new(pixels_per_point: f32, width: u32, height: u32) -> Self {
        Self {
            ctx: Context::default(),
            events: Vec::new(),
            pointer_pos: Pos2::ZERO,
            modifiers: Modifiers::NONE,
            pixels_per_point,
            screen_size: (width, height),
        }
    }

    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    pub fn pixels_per_point(&self) -> f32 {
        self.pixels_per_point
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.screen_size = (width, height);
    }

    fn wants_pointer(&self) -> bool {
        self.ctx.wants_pointer_input() || self.ctx.is_pointer_over_area()
    }

    /// Returns true when egui consumes the event.
    pub fn on_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.pointer_pos = Pos2::new(
                    position.x as f32 / self.pixels_per_point,
                    position.y as f32 / self.pixels_per_point,
                );
                self.events.push(Event::PointerMoved(self.pointer_pos));
                self.wants_pointer()
            }
            WindowEvent::CursorLeft { .. } => {
                self.events.push(Event::PointerGone);
                false
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = match button {
                    MouseButton::Left => egui::PointerButton::Primary,
                    MouseButton::Right => egui::PointerButton::Secondary,
                    MouseButton::Middle => egui::PointerButton::Middle,
                    _ => return false,
                };
                self.events.push(Event::PointerButton {
                    pos: self.pointer_pos,
                    button,
                    pressed: *state == ElementState::Pressed,
                    modifiers: self.modifiers,
                });
                self.wants_pointer()
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let delta = match delta {
                    MouseScrollDelta::LineDelta(x, y) => Vec2::new(*x, *y) * 24.0,
                    MouseScrollDelta::PixelDelta(d) => {
                        Vec2::new(d.x as f32, d.y as f32) / self.pixels_per_point
                    }
                };
                self.events.push(Event::MouseWheel {
                    unit: egui::MouseWheelUnit::Point,
                    delta,
                    modifiers: self.modifiers,
                });
                self.wants_pointer()
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                let state = modifiers.state();
                self.modifiers = Modifiers {
                    alt: state.alt_key(),
                    ctrl: state.control_key(),
                    shift: state.shift_key(),
                    mac_cmd: cfg!(target_os = "macos") && state.super_key(),
                    command: if cfg!(target_os = "macos") {
                        state.super_key()
                    } else {
                        state.control_key()
                    },
                };
                false
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let pressed = event.state == ElementState::Pressed;
                if let PhysicalKey::Code(code) = event.physical_key {
                    if let Some(key) = panel_key(code) {
                        self.events.push(Event::Key {
                            key,
                            physical_key: None,
                            pressed,
                            repeat: event.repeat,
                            modifiers: self.modifiers,
                        });
                    }
                }
                if pressed {
                    if let Some(text) = event.text.as_deref() {
                        let typed: String = text.chars().filter(|c| !c.is_control()).collect();
                        if !typed.is_empty() {
                            self.events.push(Event::Text(typed));
                        }
                    }
                }
                self.ctx.wants_keyboard_input()
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.pixels_per_point = *scale_factor as f32;
                false
            }
            _ => false,
        }
    }

    pub fn take_raw_input(&mut self) -> RawInput {
        let (w, h) = self.screen_size;
        let mut raw = RawInput {
            screen_rect: Some(Rect::from_min_size(
                Pos2::ZERO,
                Vec2::new(w as f32, h as f32) / self.pixels_per_point,
            )),
            events: std::mem::take(&mut self.events),
            modifiers: self.modifiers,
            ..Default::default()
        };
        raw.viewports
            .entry(egui::ViewportId::ROOT)
            .or_default()
            .native_pixels_per_point = Some(self.pixels_per_point);
        raw
    }

    pub fn handle_platform_output(&self, window: &Window, output: &egui::PlatformOutput) {
        let cursor = match output.cursor_icon {
            egui::CursorIcon::PointingHand => CursorIcon::Pointer,
            egui::CursorIcon::Text => CursorIcon::Text,
            egui::CursorIcon::ResizeHorizontal => CursorIcon::EwResize,
            egui::CursorIcon::ResizeVertical => CursorIcon::NsResize,
            _ => CursorIcon::Default,
        };
        window.set_cursor_icon(cursor);
    }
}

/// Keys the panel's numeric fields and buttons respond to.
fn panel_key(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::ArrowLeft => Key::ArrowLeft,
        KeyCode::ArrowRight => Key::ArrowRight,
        KeyCode::ArrowUp => Key::ArrowUp,
        KeyCode::ArrowDown => Key::ArrowDown,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Enter | KeyCode::NumpadEnter => Key::Enter,
        KeyCode::Escape => Key::Escape,
        KeyCode::Tab => Key::Tab,
        KeyCode::Space => Key::Space,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::Digit0 | KeyCode::Numpad0 => Key::Num0,
        KeyCode::Digit1 | KeyCode::Numpad1 => Key::Num1,
        KeyCode::Digit2 | KeyCode::Numpad2 => Key::Num2,
        KeyCode::Digit3 | KeyCode::Numpad3 => Key::Num3,
        KeyCode::Digit4 | KeyCode::Numpad4 => Key::Num4,
        KeyCode::Digit5 | KeyCode::Numpad5 => Key::Num5,
        KeyCode::Digit6 | KeyCode::Numpad6 => Key::Num6,
        KeyCode::Digit7 | KeyCode::Numpad7 => Key::Num7,
        KeyCode::Digit8 | KeyCode::Numpad8 => Key::Num8,
        KeyCode::Digit9 | KeyCode::Numpad9 => Key::Num9,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyC => Key::C,
        KeyCode::KeyV => Key::V,
        KeyCode::KeyX => Key::X,
        KeyCode::KeyZ => Key::Z,
        _ => return None,
    })
}
