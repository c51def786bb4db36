//! Math utilities and types
//!
//! Thin aliases over `nalgebra` plus the handful of OpenGL-convention
//! matrix builders the renderer needs.

pub use nalgebra::{
    Isometry3, Matrix4, Translation3, UnitQuaternion, Vector2, Vector3, Vector4,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }
}

/// Extension trait for Mat4 with OpenGL-convention builders
pub trait Mat4Ext {
    /// Right-handed perspective projection from a vertical field of view
    /// (radians) and a viewport size, with clip-space depth in `[-1, 1]`.
    fn perspective_fov(fov_y: f32, width: f32, height: f32, near: f32, far: f32) -> Mat4;

    /// Flatten into the column-major array layout uniform uploads expect.
    fn to_column_array(&self) -> [f32; 16];
}

impl Mat4Ext for Mat4 {
    fn perspective_fov(fov_y: f32, width: f32, height: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(width / height, fov_y, near, far)
    }

    fn to_column_array(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        out.copy_from_slice(self.as_slice());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perspective_fov_matches_gl_convention() {
        let fov = utils::deg_to_rad(90.0);
        let proj = Mat4::perspective_fov(fov, 1024.0, 512.0, 1.0, 1000.0);

        // cot(45°) = 1, scaled by height/width on X
        assert_relative_eq!(proj[(0, 0)], 0.5, epsilon = 1e-6);
        assert_relative_eq!(proj[(1, 1)], 1.0, epsilon = 1e-6);
        assert_relative_eq!(proj[(3, 2)], -1.0, epsilon = 1e-6);
        assert_relative_eq!(proj[(2, 2)], -(1000.0 + 1.0) / (1000.0 - 1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_column_array_is_column_major() {
        let m = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        let cols = m.to_column_array();
        assert_eq!(&cols[12..15], &[1.0, 2.0, 3.0]);
        assert_eq!(cols[15], 1.0);
    }
}
