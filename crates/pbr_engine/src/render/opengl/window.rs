//! GLFW window with an OpenGL 4.5 core context
//!
//! The default framebuffer has no depth, stencil or multisample buffers:
//! the scene renders offscreen and only the tonemapped quad reaches the
//! window.

use std::ffi::c_void;

use glfw::Context;

use crate::config::WindowConfig;
use crate::render::device::BackendResult;
use crate::render::frame::FrameSurface;
use crate::render::opengl::{GlowDevice, ProgramValidation};
use crate::render::RenderError;

/// Window owning the GL context
pub struct GlWindow {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl GlWindow {
    /// Create the window and make its context current
    pub fn new(config: &WindowConfig) -> BackendResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|e| RenderError::ContextCreation(format!("GLFW initialization failed: {e:?}")))?;

        glfw.window_hint(glfw::WindowHint::ContextVersion(4, 5));
        glfw.window_hint(glfw::WindowHint::OpenGlProfile(glfw::OpenGlProfileHint::Core));
        glfw.window_hint(glfw::WindowHint::OpenGlForwardCompat(true));
        glfw.window_hint(glfw::WindowHint::DepthBits(Some(0)));
        glfw.window_hint(glfw::WindowHint::StencilBits(Some(0)));
        glfw.window_hint(glfw::WindowHint::Samples(Some(0)));
        glfw.window_hint(glfw::WindowHint::Resizable(false));
        glfw.window_hint(glfw::WindowHint::OpenGlDebugContext(cfg!(debug_assertions)));

        let (mut window, events) = glfw
            .create_window(config.width, config.height, &config.title, glfw::WindowMode::Windowed)
            .ok_or_else(|| RenderError::ContextCreation("Failed to create OpenGL 4.5 window".to_string()))?;

        window.make_current();
        glfw.set_swap_interval(if config.vsync {
            glfw::SwapInterval::Sync(1)
        } else {
            glfw::SwapInterval::Adaptive
        });

        window.set_key_polling(true);
        window.set_cursor_pos_polling(true);
        window.set_mouse_button_polling(true);
        window.set_scroll_polling(true);
        window.set_close_polling(true);

        log::info!("Created {}x{} window \"{}\"", config.width, config.height, config.title);
        Ok(Self { glfw, window, events })
    }

    /// Load GL entry points from the current context
    pub fn create_device(&mut self) -> BackendResult<GlowDevice> {
        #[cfg_attr(not(debug_assertions), allow(unused_mut))]
        let mut gl = unsafe {
            glow::Context::from_loader_function(|name| self.window.get_proc_address(name) as *const _)
        };

        #[cfg(debug_assertions)]
        unsafe {
            use glow::HasContext;
            gl.enable(glow::DEBUG_OUTPUT);
            gl.debug_message_callback(|_source, _kind, _id, severity, message| {
                if severity != glow::DEBUG_SEVERITY_NOTIFICATION {
                    log::warn!("GL: {}", message);
                }
            });
        }

        let validation =
            ProgramValidation::load(|name| self.window.get_proc_address(name) as *const c_void)?;
        Ok(GlowDevice::new(gl, validation))
    }

    /// True once the user asked to close the window
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Request the window to close
    pub fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    /// Process pending window system events
    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
    }

    /// Drain the events received since the last call
    pub fn flush_events(&self) -> glfw::FlushedMessages<(f64, glfw::WindowEvent)> {
        glfw::flush_messages(&self.events)
    }

    /// Framebuffer size in pixels
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width.max(0) as u32, height.max(0) as u32)
    }
}

impl FrameSurface for GlWindow {
    fn present(&mut self) {
        self.window.swap_buffers();
    }
}
