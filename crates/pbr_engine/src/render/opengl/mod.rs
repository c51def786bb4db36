//! OpenGL 4.5 backend: glow device and GLFW window
//!
//! Every GL call is FFI, so this is the one module allowed `unsafe`.

mod device;
mod window;

pub use device::{GlowDevice, ProgramValidation};
pub use window::GlWindow;
