//! Renderer lifecycle tests: setup, precomputation, frames and teardown

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::assets::{Face, ImageData, InMemoryAssets, Mesh, Vertex};
    use crate::config::AssetPaths;
    use crate::render::device::{BufferMask, Capability, Primitive, UniformValue};
    use crate::render::environment::{project_equirect_texel, CubeFace, PRECOMPUTE_BARRIER};
    use crate::render::frame::{FrameSurface, ViewSettings};
    use crate::render::program::shader_files;
    use crate::render::recording::{DeviceCall, RecordingDevice};
    use crate::render::renderer::Renderer;
    use crate::render::RenderError;

    const SKYBOX_OBJ: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../assets/meshes/skybox.obj"));

    const ALL_SHADERS: [&str; 10] = [
        shader_files::PASSTHROUGH_VS,
        shader_files::TONEMAP_FS,
        shader_files::SKYBOX_VS,
        shader_files::SKYBOX_FS,
        shader_files::PBR_VS,
        shader_files::PBR_FS,
        shader_files::EQUIRECT_TO_CUBE_CS,
        shader_files::IRRADIANCE_CS,
        shader_files::SPECULAR_MAP_CS,
        shader_files::SPECULAR_BRDF_CS,
    ];

    #[derive(Default)]
    struct CountingSurface {
        presented: usize,
    }

    impl FrameSurface for CountingSurface {
        fn present(&mut self) {
            self.presented += 1;
        }
    }

    fn triangle() -> Mesh {
        let vertex = |x: f32, y: f32| Vertex {
            position: [x, y, 0.0],
            normal: [0.0, 0.0, 1.0],
            tangent: [1.0, 0.0, 0.0],
            bitangent: [0.0, 1.0, 0.0],
            tex_coord: [x, y],
        };
        Mesh::new(vec![vertex(0.0, 0.0), vertex(1.0, 0.0), vertex(0.0, 1.0)], vec![Face::new(0, 1, 2)])
    }

    /// Complete scene, minus the shader named by `missing_shader`
    fn scene_assets(missing_shader: Option<&str>) -> InMemoryAssets {
        let paths = AssetPaths::default();
        let mut assets = InMemoryAssets::new();
        for file in ALL_SHADERS.iter().filter(|file| Some(**file) != missing_shader) {
            assets = assets.with_text(
                &paths.shader(file),
                format!("#version 450 core\n// {file}\nvoid main() {{}}\n"),
            );
        }

        assets
            .with_text(&paths.skybox_mesh, SKYBOX_OBJ)
            .with_mesh(&paths.model_mesh, triangle())
            .with_image(&paths.albedo, ImageData::solid_color(4, 4, &[200, 180, 160]))
            .with_image(&paths.normal, ImageData::solid_color(4, 4, &[128, 128, 255]))
            .with_image(&paths.metalness, ImageData::solid_color(4, 4, &[255]))
            .with_image(&paths.roughness, ImageData::solid_color(4, 4, &[64]))
            .with_image(&paths.environment, ImageData::hdr(8, 4, 3, vec![1.0; 96]).unwrap())
    }

    fn ready_renderer(samples: u32) -> Renderer<RecordingDevice> {
        let mut renderer = Renderer::initialize(RecordingDevice::new(), 1024, 1024, samples).unwrap();
        renderer
            .setup(&scene_assets(None), &AssetPaths::default())
            .unwrap();
        renderer
    }

    fn failed_setup(device: RecordingDevice, assets: &InMemoryAssets) -> (Renderer<RecordingDevice>, RenderError) {
        let mut renderer = Renderer::initialize(device, 256, 256, 4).unwrap();
        let error = renderer.setup(assets, &AssetPaths::default()).unwrap_err();
        (renderer, error)
    }

    fn label(call: &DeviceCall) -> &'static str {
        match call {
            DeviceCall::ProgramUniform { .. } => "uniform",
            DeviceCall::BindFramebuffer(Some(_)) => "bind_target",
            DeviceCall::BindFramebuffer(None) => "bind_default",
            DeviceCall::Clear(_) => "clear",
            DeviceCall::Disable(_) => "disable",
            DeviceCall::Enable(_) => "enable",
            DeviceCall::UseProgram(_) => "use_program",
            DeviceCall::BindTextureUnit { .. } => "texture",
            DeviceCall::BindVertexArray(_) => "vertex_array",
            DeviceCall::DrawElements { .. } => "draw_elements",
            DeviceCall::DrawArrays { .. } => "draw_arrays",
            DeviceCall::BlitFramebuffer { .. } => "blit",
            DeviceCall::InvalidateFramebuffer { .. } => "invalidate",
            _ => "other",
        }
    }

    #[test]
    fn test_setup_builds_scene_and_releases_transients() {
        let renderer = ready_renderer(16);
        let live = renderer.device().live_objects();

        // tonemap, skybox and PBR programs survive; compute programs do not
        assert_eq!(live.programs, 3);
        assert_eq!(live.shaders, 0);
        // 4 material maps, 4 lighting maps and the resolve color texture
        assert_eq!(live.textures, 9);
        assert_eq!(live.framebuffers, 2);
        assert_eq!(live.renderbuffers, 2);
        assert_eq!(live.vertex_arrays, 3);
        assert_eq!(live.buffers, 5);

        let environment = renderer.environment();
        assert_eq!(environment.environment.levels(), 11);
        assert_eq!(environment.specular.levels(), 11);
        assert_eq!(environment.irradiance.width(), 32);
        assert_eq!(environment.irradiance.levels(), 1);
        assert_eq!(environment.brdf_lut.width(), 256);
        assert_eq!(renderer.material().albedo.levels(), 3);
    }

    #[test]
    fn test_setup_enables_pipeline_state_first() {
        let renderer = ready_renderer(0);
        let calls = renderer.device().calls();
        let state: Vec<_> = calls
            .iter()
            .filter(|c| matches!(c, DeviceCall::Enable(_) | DeviceCall::FrontFace(_)))
            .take(3)
            .collect();
        assert_eq!(
            state,
            vec![
                &DeviceCall::Enable(Capability::CullFace),
                &DeviceCall::Enable(Capability::TextureCubeMapSeamless),
                &DeviceCall::FrontFace(crate::render::device::Winding::CounterClockwise),
            ]
        );
        assert_eq!(calls.last(), Some(&DeviceCall::Finish));
    }

    #[test]
    fn test_precompute_dispatch_sizes() {
        let renderer = ready_renderer(16);
        let dispatches: Vec<[u32; 3]> = renderer
            .device()
            .calls()
            .iter()
            .filter_map(|c| match c {
                DeviceCall::DispatchCompute(groups) => Some(*groups),
                _ => None,
            })
            .collect();

        let mut expected: Vec<[u32; 3]> = vec![[32, 32, 6], [1, 1, 6]];
        expected.extend([32, 16, 8, 4, 2, 1, 1, 1, 1, 1, 1, 1].map(|g| [g, g, 6]));
        expected.push([8, 8, 1]);
        assert_eq!(dispatches, expected);
    }

    #[test]
    fn test_specular_roughness_steps_per_level() {
        let renderer = ready_renderer(16);
        let calls = renderer.device().calls();

        let roughness: Vec<f32> = calls
            .iter()
            .filter_map(|c| match c {
                DeviceCall::ProgramUniform { location: 0, value: UniformValue::Float(v), .. } => Some(*v),
                _ => None,
            })
            .collect();
        assert_eq!(roughness.len(), 12);
        for (level, value) in roughness.iter().enumerate() {
            assert_relative_eq!(*value, level as f32 * 0.1, epsilon = 1e-6);
        }

        let specular = renderer.environment().specular.id().unwrap();
        let levels: Vec<u32> = calls
            .iter()
            .filter_map(|c| match c {
                DeviceCall::BindImageTexture { texture, level, layered: true, .. } if *texture == specular => {
                    Some(*level)
                }
                _ => None,
            })
            .collect();
        assert_eq!(levels, (0..=11u32).collect::<Vec<_>>());
    }

    #[test]
    fn test_environment_mipmaps_follow_barrier() {
        let renderer = ready_renderer(16);
        let calls = renderer.device().calls();
        let environment = renderer.environment().environment.id().unwrap();

        let barriers: Vec<usize> = calls
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == DeviceCall::MemoryBarrier(PRECOMPUTE_BARRIER))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(barriers.len(), 4);
        assert_eq!(calls[barriers[0] + 1], DeviceCall::GenerateMipmap(environment));

        let first_dispatch = calls
            .iter()
            .position(|c| matches!(c, DeviceCall::DispatchCompute(_)))
            .unwrap();
        assert!(first_dispatch < barriers[0]);
    }

    #[test]
    fn test_shader_compile_failure_reports_path_and_log() {
        let device = RecordingDevice::new().fail_compile_containing("tonemap_fs");
        let (renderer, error) = failed_setup(device, &scene_assets(None));

        let message = error.to_string();
        assert!(message.starts_with("Shader compilation failed: shaders/glsl/tonemap_fs.glsl\n"));
        assert!(message.contains("syntax error"));

        let live = renderer.device().live_objects();
        assert_eq!(live.shaders, 0, "compiled vertex stage must be deleted");
        assert_eq!(live.programs, 0);
    }

    #[test]
    fn test_link_failure_reports_log() {
        let (renderer, error) = failed_setup(RecordingDevice::new().fail_link(), &scene_assets(None));

        assert!(matches!(error, RenderError::ProgramLink { .. }));
        assert!(error.to_string().starts_with("Program link failed\n"));
        assert_eq!(renderer.device().live_objects().shaders, 0);
        assert_eq!(renderer.device().live_objects().programs, 0);

        let validated = renderer
            .device()
            .calls()
            .iter()
            .any(|c| matches!(c, DeviceCall::ValidateProgram { .. }));
        assert!(!validated, "validation only runs after a successful link");
    }

    #[test]
    fn test_validate_failure_is_a_link_error() {
        let (renderer, error) = failed_setup(RecordingDevice::new().fail_validate(), &scene_assets(None));
        assert!(matches!(&error, RenderError::ProgramLink { log } if log.contains("validation")));
        assert_eq!(renderer.device().live_objects().programs, 0);
    }

    #[test]
    fn test_missing_shader_source() {
        let assets = scene_assets(Some(shader_files::SPECULAR_MAP_CS));
        let (mut renderer, error) = failed_setup(RecordingDevice::new(), &assets);

        assert_eq!(error.to_string(), "Cannot read shader source file: shaders/glsl/spmap_cs.glsl");
        assert!(!renderer.environment().environment.is_empty());
        assert!(!renderer.environment().irradiance.is_empty());
        assert!(renderer.environment().specular.is_empty());

        renderer.shutdown();
        assert_eq!(renderer.device().live_objects().total(), 0);
    }

    #[test]
    fn test_failed_setup_leaks_nothing_after_shutdown() {
        for shader in ALL_SHADERS {
            let device = RecordingDevice::new().fail_compile_containing(shader);
            let (mut renderer, _) = failed_setup(device, &scene_assets(None));
            renderer.shutdown();
            assert_eq!(renderer.device().live_objects().total(), 0, "leak after {shader} failed");
        }
    }

    #[test]
    fn test_setup_twice_replaces_resources() {
        let mut renderer = ready_renderer(16);
        let before = renderer.device().live_objects();

        renderer
            .setup(&scene_assets(None), &AssetPaths::default())
            .unwrap();
        assert_eq!(renderer.device().live_objects(), before);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let mut renderer = ready_renderer(16);
        renderer.shutdown();
        assert_eq!(renderer.device().live_objects().total(), 0);
        assert!(renderer.framebuffer().is_empty());

        renderer.device_mut().take_calls();
        renderer.shutdown();
        assert!(renderer.device().calls().is_empty());
    }

    #[test]
    fn test_frame_pass_order() {
        let mut renderer = ready_renderer(16);
        renderer.device_mut().take_calls();

        let mut surface = CountingSurface::default();
        renderer.render(&mut surface, &ViewSettings::default());
        assert_eq!(surface.presented, 1);

        let calls = renderer.device().calls();
        let labels: Vec<_> = calls.iter().map(label).collect();
        let mut expected = vec![
            "uniform", "uniform", "uniform",
            "bind_target", "clear",
            "disable", "use_program", "texture", "vertex_array", "draw_elements",
            "enable", "use_program",
        ];
        expected.extend(["texture"; 7]);
        expected.extend([
            "vertex_array", "draw_elements",
            "blit", "invalidate",
            "bind_default", "use_program", "texture", "vertex_array", "draw_arrays",
        ]);
        assert_eq!(labels, expected);

        assert!(calls.contains(&DeviceCall::Clear(BufferMask::DEPTH)));
        assert!(calls.contains(&DeviceCall::Disable(Capability::DepthTest)));

        let draws: Vec<u32> = calls
            .iter()
            .filter_map(|c| match c {
                DeviceCall::DrawElements { primitive: Primitive::Triangles, count } => Some(*count),
                _ => None,
            })
            .collect();
        assert_eq!(draws, vec![36, 3]);

        let resolved = renderer.resolve_framebuffer().color_texture().unwrap();
        assert!(calls.contains(&DeviceCall::BindTextureUnit { unit: 0, texture: resolved }));
        assert_eq!(
            calls.last(),
            Some(&DeviceCall::DrawArrays { primitive: Primitive::TriangleStrip, first: 0, count: 4 })
        );
    }

    #[test]
    fn test_single_sample_target_resolves_in_place() {
        let mut renderer = ready_renderer(0);
        assert_eq!(renderer.resolve_framebuffer().id(), renderer.framebuffer().id());
        assert_eq!(renderer.device().live_objects().framebuffers, 1);

        renderer.device_mut().take_calls();
        renderer.render(&mut CountingSurface::default(), &ViewSettings::default());
        let calls = renderer.device().calls();
        assert!(!calls.iter().any(|c| matches!(c, DeviceCall::BlitFramebuffer { .. })));

        let color = renderer.framebuffer().color_texture().unwrap();
        assert!(calls.contains(&DeviceCall::BindTextureUnit { unit: 0, texture: color }));
    }

    #[test]
    fn test_eye_uniform_at_origin_for_zero_distance() {
        let mut renderer = ready_renderer(16);
        renderer.device_mut().take_calls();

        let settings = ViewSettings { pitch: 35.0, yaw: 120.0, distance: 0.0, fov: 45.0 };
        let transforms = renderer.render(&mut CountingSurface::default(), &settings);
        assert_relative_eq!(transforms.eye_position.norm(), 0.0, epsilon = 1e-6);

        let eye = renderer
            .device()
            .calls()
            .iter()
            .find_map(|c| match c {
                DeviceCall::ProgramUniform { location: 1, value: UniformValue::Vec3(v), .. } => Some(*v),
                _ => None,
            })
            .unwrap();
        for component in eye {
            assert_relative_eq!(component, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_equirect_projection_reference_on_coded_panorama() {
        // Each texel stores its 2x2 block coordinate, so samples landing on
        // a texel edge read the same value from either side.
        let (width, height) = (16u32, 8u32);
        let mut texels = Vec::new();
        for y in 0..height {
            for x in 0..width {
                texels.extend([(((x + 1) / 2) % 8) as f32, ((y + 1) / 2) as f32, 0.0]);
            }
        }
        let panorama = ImageData::hdr(width, height, 3, texels).unwrap();

        let cases = [
            (CubeFace::PositiveX, [0.0, 2.0, 0.0]),
            (CubeFace::NegativeX, [4.0, 2.0, 0.0]),
            (CubeFace::PositiveZ, [2.0, 2.0, 0.0]),
            (CubeFace::NegativeZ, [6.0, 2.0, 0.0]),
        ];
        for (face, expected) in cases {
            let texel = project_equirect_texel(&panorama, face, 512, 512, 1024);
            assert_eq!(texel, expected.to_vec(), "{face:?} center");
        }

        // Setup uploads the same panorama as float RGB before projecting it
        let assets = scene_assets(None).with_image(&AssetPaths::default().environment, panorama);
        let mut renderer = Renderer::initialize(RecordingDevice::new(), 64, 64, 0).unwrap();
        renderer.setup(&assets, &AssetPaths::default()).unwrap();
        let uploaded = renderer.device().calls().iter().any(|c| {
            matches!(
                c,
                DeviceCall::TextureSubImage { width: 16, height: 8, len: 384, .. }
            )
        });
        assert!(uploaded);
    }
}
