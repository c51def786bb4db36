//! Per-frame rendering
//!
//! A frame is a fixed pass sequence: skybox and model into the main
//! (usually multisampled) framebuffer, resolve, then a tonemapping
//! full-screen quad onto the window surface.

use crate::foundation::math::{utils, Isometry3, Mat4, Mat4Ext, Quat, Translation3, Vec3};
use crate::render::device::{BufferMask, Capability, GraphicsDevice, Primitive};
use crate::render::environment::EnvironmentMaps;
use crate::render::factory::ResourceFactory;
use crate::render::program::{PbrProgram, ProgramHandle, SkyboxProgram, TonemapProgram};
use crate::render::resources::{FrameBuffer, Texture, VertexBuffer};

/// Near clip plane distance
pub const NEAR_PLANE: f32 = 1.0;
/// Far clip plane distance
pub const FAR_PLANE: f32 = 1000.0;

/// Camera parameters supplied for each frame
///
/// Angles are in degrees. The camera orbits the origin at `distance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSettings {
    /// Rotation about the horizontal axis
    pub pitch: f32,
    /// Rotation about the vertical axis
    pub yaw: f32,
    /// Distance from the origin
    pub distance: f32,
    /// Vertical field of view
    pub fov: f32,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            pitch: 0.0,
            yaw: 0.0,
            distance: 150.0,
            fov: 45.0,
        }
    }
}

/// Matrices derived from [`ViewSettings`] for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransforms {
    /// Perspective projection
    pub projection: Mat4,
    /// Camera rotation, pitch applied after yaw
    pub rotation: Mat4,
    /// Translation by `-distance` along Z times rotation
    pub view: Mat4,
    /// World-space camera position
    pub eye_position: Vec3,
}

impl FrameTransforms {
    /// Derive the frame matrices for a `width` x `height` target
    pub fn new(settings: &ViewSettings, width: u32, height: u32) -> Self {
        let projection = Mat4::perspective_fov(
            utils::deg_to_rad(settings.fov),
            width as f32,
            height as f32,
            NEAR_PLANE,
            FAR_PLANE,
        );

        let rotation = Quat::from_axis_angle(&Vec3::x_axis(), utils::deg_to_rad(settings.pitch))
            * Quat::from_axis_angle(&Vec3::y_axis(), utils::deg_to_rad(settings.yaw));
        let view = Isometry3::from_parts(Translation3::new(0.0, 0.0, -settings.distance), rotation);

        Self {
            projection,
            rotation: rotation.to_homogeneous(),
            view: view.to_homogeneous(),
            eye_position: view.inverse().translation.vector,
        }
    }

    /// Skybox transform: rotation only, so the box stays centered on the eye
    pub fn skybox_view_projection(&self) -> Mat4 {
        self.projection * self.rotation
    }

    /// Model transform
    pub fn model_view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// Window surface a finished frame is presented to
pub trait FrameSurface {
    /// Swap the finished frame onto the display
    fn present(&mut self);
}

/// Material textures of the PBR model
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MaterialTextures {
    /// Base color, sRGB
    pub albedo: Texture,
    /// Tangent-space normal map
    pub normal: Texture,
    /// Metalness
    pub metalness: Texture,
    /// Roughness
    pub roughness: Texture,
}

impl MaterialTextures {
    /// Release every texture and reset the handles
    pub fn release<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) {
        let mut factory = ResourceFactory::new(device);
        factory.delete_texture(&mut self.albedo);
        factory.delete_texture(&mut self.normal);
        factory.delete_texture(&mut self.metalness);
        factory.delete_texture(&mut self.roughness);
    }
}

/// Everything a frame reads, borrowed from the renderer
pub struct FrameResources<'a> {
    /// Main render target
    pub framebuffer: &'a FrameBuffer,
    /// Single-sample target whose color texture feeds tonemapping
    pub resolve_framebuffer: &'a FrameBuffer,
    /// Skybox cube
    pub skybox: &'a VertexBuffer,
    /// Skybox program
    pub skybox_program: &'a SkyboxProgram,
    /// PBR model
    pub model: &'a VertexBuffer,
    /// PBR program
    pub pbr_program: &'a PbrProgram,
    /// Model material
    pub material: &'a MaterialTextures,
    /// Precomputed lighting
    pub environment: &'a EnvironmentMaps,
    /// Full-screen quad
    pub screen_quad: &'a VertexBuffer,
    /// Tonemapping program
    pub tonemap_program: &'a TonemapProgram,
}

fn bind_texture<D: GraphicsDevice + ?Sized>(device: &mut D, unit: u32, texture: &Texture) {
    if let Some(id) = texture.id() {
        device.bind_texture_unit(unit, id);
    }
}

fn draw_indexed<D: GraphicsDevice + ?Sized>(device: &mut D, buffer: &VertexBuffer) {
    if let Some(vao) = buffer.vertex_array() {
        device.bind_vertex_array(vao);
        device.draw_elements(Primitive::Triangles, buffer.num_elements());
    }
}

/// Record one frame and return the transforms it used
///
/// Presentation is left to the caller.
pub fn render_frame<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    resources: &FrameResources<'_>,
    settings: &ViewSettings,
) -> FrameTransforms {
    let transforms = FrameTransforms::new(
        settings,
        resources.framebuffer.width(),
        resources.framebuffer.height(),
    );

    resources
        .skybox_program
        .set_view_projection(device, &transforms.skybox_view_projection());
    resources
        .pbr_program
        .set_view_projection(device, &transforms.model_view_projection());
    resources
        .pbr_program
        .set_eye_position(device, &transforms.eye_position);

    // The skybox covers every pixel, so color is never cleared.
    device.bind_framebuffer(resources.framebuffer.id());
    device.clear(BufferMask::DEPTH);

    device.disable(Capability::DepthTest);
    resources.skybox_program.bind(device);
    bind_texture(device, 0, &resources.environment.environment);
    draw_indexed(device, resources.skybox);

    device.enable(Capability::DepthTest);
    resources.pbr_program.bind(device);
    let material = resources.material;
    let environment = resources.environment;
    let units = [
        &material.albedo,
        &material.normal,
        &material.metalness,
        &material.roughness,
        &environment.irradiance,
        &environment.specular,
        &environment.brdf_lut,
    ];
    for (unit, texture) in (0u32..).zip(units) {
        bind_texture(device, unit, texture);
    }
    draw_indexed(device, resources.model);

    ResourceFactory::new(&mut *device)
        .resolve_framebuffer(resources.framebuffer, resources.resolve_framebuffer);

    device.bind_framebuffer(None);
    resources.tonemap_program.bind(device);
    if let Some(color) = resources.resolve_framebuffer.color_texture() {
        device.bind_texture_unit(0, color);
    }
    if let Some(vao) = resources.screen_quad.vertex_array() {
        device.bind_vertex_array(vao);
        device.draw_arrays(Primitive::TriangleStrip, 0, 4);
    }

    transforms
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::foundation::math::Vec4;

    #[test]
    fn test_eye_position_at_distance() {
        let settings = ViewSettings { distance: 10.0, ..ViewSettings::default() };
        let transforms = FrameTransforms::new(&settings, 1024, 1024);
        assert_relative_eq!(transforms.eye_position, Vec3::new(0.0, 0.0, 10.0), epsilon = 1e-5);
    }

    #[test]
    fn test_eye_position_at_origin_for_zero_distance() {
        let settings = ViewSettings { pitch: 30.0, yaw: -75.0, distance: 0.0, fov: 45.0 };
        let transforms = FrameTransforms::new(&settings, 800, 600);
        assert_relative_eq!(transforms.eye_position, Vec3::zeros(), epsilon = 1e-6);
    }

    #[test]
    fn test_eye_is_inverse_view_translation() {
        let settings = ViewSettings { pitch: 20.0, yaw: 40.0, distance: 150.0, fov: 45.0 };
        let transforms = FrameTransforms::new(&settings, 1024, 1024);

        let inverse = transforms.view.try_inverse().unwrap();
        let column = inverse.column(3);
        assert_relative_eq!(
            Vec4::new(column[0], column[1], column[2], column[3]),
            transforms.eye_position.push(1.0),
            epsilon = 1e-3
        );
        assert_relative_eq!(transforms.eye_position.norm(), 150.0, epsilon = 1e-3);
    }

    #[test]
    fn test_rotation_applies_yaw_before_pitch() {
        let settings = ViewSettings { pitch: 90.0, yaw: 90.0, distance: 0.0, fov: 45.0 };
        let transforms = FrameTransforms::new(&settings, 1, 1);

        // Ry(90) maps +X to -Z, then Rx(90) maps -Z to +Y
        let rotated = transforms.rotation * Vec4::new(1.0, 0.0, 0.0, 0.0);
        assert_relative_eq!(rotated, Vec4::new(0.0, 1.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_skybox_ignores_distance() {
        let near = FrameTransforms::new(&ViewSettings { distance: 1.0, ..ViewSettings::default() }, 640, 480);
        let far = FrameTransforms::new(&ViewSettings { distance: 500.0, ..ViewSettings::default() }, 640, 480);
        assert_relative_eq!(near.skybox_view_projection(), far.skybox_view_projection());
        assert!(near.model_view_projection() != far.model_view_projection());
    }
}
