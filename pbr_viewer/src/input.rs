//! Orbit camera input
//!
//! Window-system events are translated into [`InputEvent`]s by the main loop;
//! the controller turns them into [`ViewSettings`] for the renderer.

use pbr_engine::config::ViewDefaults;
use pbr_engine::render::ViewSettings;

/// Input the controller reacts to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Cursor position in window coordinates
    CursorMoved {
        /// Horizontal position
        x: f64,
        /// Vertical position
        y: f64,
    },
    /// Left mouse button pressed (`true`) or released
    LeftButton(bool),
    /// Vertical scroll offset
    Scrolled(f64),
    /// Escape key pressed
    Escape,
}

/// What the main loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputResponse {
    /// Keep running
    Continue,
    /// Close the window and shut down
    Exit,
}

/// Orbit camera: drag rotates, scroll zooms
#[derive(Debug, Clone)]
pub struct OrbitController {
    settings: ViewSettings,
    orbit_speed: f32,
    zoom_speed: f32,
    dragging: bool,
    last_cursor: Option<(f64, f64)>,
}

impl OrbitController {
    /// Start from the configured camera defaults
    pub fn new(defaults: &ViewDefaults) -> Self {
        Self {
            settings: ViewSettings {
                pitch: 0.0,
                yaw: 0.0,
                distance: defaults.distance,
                fov: defaults.fov,
            },
            orbit_speed: defaults.orbit_speed,
            zoom_speed: defaults.zoom_speed,
            dragging: false,
            last_cursor: None,
        }
    }

    /// Apply one event
    pub fn handle(&mut self, event: InputEvent) -> InputResponse {
        match event {
            InputEvent::CursorMoved { x, y } => {
                if self.dragging {
                    if let Some((last_x, last_y)) = self.last_cursor {
                        self.settings.yaw += self.orbit_speed * (x - last_x) as f32;
                        self.settings.pitch += self.orbit_speed * (y - last_y) as f32;
                    }
                }
                self.last_cursor = Some((x, y));
            }
            InputEvent::LeftButton(pressed) => self.dragging = pressed,
            InputEvent::Scrolled(offset) => {
                self.settings.distance += self.zoom_speed * -(offset as f32);
            }
            InputEvent::Escape => return InputResponse::Exit,
        }
        InputResponse::Continue
    }

    /// Camera for the next frame
    pub fn view_settings(&self) -> ViewSettings {
        self.settings
    }
}
