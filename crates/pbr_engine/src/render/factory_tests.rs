//! Resource factory tests against the recording device

#[cfg(test)]
mod tests {
    use crate::assets::{Face, ImageData, Mesh, Vertex};
    use crate::render::device::{
        Attachment, BufferMask, FramebufferStatus, GraphicsDevice, PixelFormat, TextureFilter,
        TextureFormat, TextureTarget,
    };
    use crate::render::factory::{full_mip_levels, with_transient_texture, MipLevels, ResourceFactory};
    use crate::render::recording::{DeviceCall, RecordingDevice, TexelKind};
    use crate::render::resources::AttachmentTarget;
    use crate::render::RenderError;

    fn triangle() -> Mesh {
        Mesh::new(vec![Vertex::default(); 3], vec![Face::new(0, 1, 2)])
    }

    #[test]
    fn test_full_mip_chain_length() {
        assert_eq!(full_mip_levels(1024, 1024), 11);
        assert_eq!(full_mip_levels(1000, 600), 10);
        assert_eq!(full_mip_levels(256, 1), 9);
        assert_eq!(full_mip_levels(1, 1), 1);
        assert_eq!(full_mip_levels(0, 0), 1);

        assert_eq!(MipLevels::Exact(0).resolve(64, 64), 7);
        assert_eq!(MipLevels::Exact(3).resolve(64, 64), 3);
        assert_eq!(MipLevels::Full.resolve(32, 32), 6);
    }

    #[test]
    fn test_min_filter_follows_level_count() {
        let mut device = RecordingDevice::new();
        let mut factory = ResourceFactory::new(&mut device);

        let mipmapped = factory
            .create_texture(TextureTarget::CubeMap, 64, 64, TextureFormat::Rgba16F, MipLevels::Full)
            .unwrap();
        let single = factory
            .create_texture(TextureTarget::Texture2D, 64, 64, TextureFormat::Rg16F, MipLevels::Exact(1))
            .unwrap();
        assert_eq!(mipmapped.levels(), 7);
        assert_eq!(single.levels(), 1);

        let filters: Vec<_> = device
            .calls()
            .iter()
            .filter_map(|call| match call {
                DeviceCall::TextureFilter { min, mag, .. } => Some((*min, *mag)),
                _ => None,
            })
            .collect();
        assert_eq!(
            filters,
            vec![
                (TextureFilter::LinearMipmapLinear, TextureFilter::Linear),
                (TextureFilter::Linear, TextureFilter::Linear),
            ]
        );
    }

    #[test]
    fn test_hdr_image_uploads_floats_without_mipmaps() {
        let mut device = RecordingDevice::new();
        let image = ImageData::hdr(4, 2, 3, vec![0.5; 24]).unwrap();

        let texture = ResourceFactory::new(&mut device)
            .create_texture_from_image(&image, PixelFormat::Rgb, TextureFormat::Rgb16F, MipLevels::Exact(1))
            .unwrap();

        assert_eq!((texture.width(), texture.height(), texture.levels()), (4, 2, 1));
        assert!(device.calls().contains(&DeviceCall::TextureSubImage {
            texture: texture.id().unwrap(),
            level: 0,
            width: 4,
            height: 2,
            format: PixelFormat::Rgb,
            kind: TexelKind::Float,
            len: 24,
        }));
        assert!(!device.calls().iter().any(|c| matches!(c, DeviceCall::GenerateMipmap(_))));
    }

    #[test]
    fn test_byte_image_generates_mip_chain() {
        let mut device = RecordingDevice::new();
        let image = ImageData::solid_color(4, 4, &[255, 0, 0]);

        let texture = ResourceFactory::new(&mut device)
            .create_texture_from_image(&image, PixelFormat::Rgb, TextureFormat::Srgb8, MipLevels::Full)
            .unwrap();
        let id = texture.id().unwrap();

        assert_eq!(texture.levels(), 3);
        let calls = device.calls();
        let upload = calls
            .iter()
            .position(|c| matches!(c, DeviceCall::TextureSubImage { kind: TexelKind::Byte, len: 48, .. }))
            .expect("byte upload");
        let mipmap = calls
            .iter()
            .position(|c| *c == DeviceCall::GenerateMipmap(id))
            .expect("mipmap generation");
        assert!(upload < mipmap);
    }

    #[test]
    fn test_channel_mismatch_is_rejected_before_allocation() {
        let mut device = RecordingDevice::new();
        let image = ImageData::solid_color(2, 2, &[128]);

        let result = ResourceFactory::new(&mut device).create_texture_from_image(
            &image,
            PixelFormat::Rgb,
            TextureFormat::Rgb8,
            MipLevels::Full,
        );
        assert!(matches!(result, Err(RenderError::InvalidImage(_))));
        assert!(device.calls().is_empty());
    }

    #[test]
    fn test_storage_failure_releases_texture() {
        let mut device = RecordingDevice::new().fail_storage();
        let result = ResourceFactory::new(&mut device).create_texture(
            TextureTarget::Texture2D,
            16,
            16,
            TextureFormat::Rgba8,
            MipLevels::Full,
        );
        assert!(matches!(result, Err(RenderError::ResourceAllocation(_))));
        assert_eq!(device.live_objects().total(), 0);
    }

    #[test]
    fn test_multisampled_framebuffer_uses_renderbuffers() {
        let mut device = RecordingDevice::new();
        let fb = ResourceFactory::new(&mut device)
            .create_framebuffer(
                640,
                480,
                4,
                Some(TextureFormat::Rgba16F),
                Some(TextureFormat::Depth24Stencil8),
            )
            .unwrap();

        assert!(matches!(fb.color_target(), Some(AttachmentTarget::Renderbuffer(_))));
        assert!(fb.color_texture().is_none());
        assert!(fb.depth_stencil_target().is_some());
        assert_eq!(fb.samples(), 4);

        let storage_samples: Vec<u32> = device
            .calls()
            .iter()
            .filter_map(|c| match c {
                DeviceCall::RenderbufferStorage { samples, .. } => Some(*samples),
                _ => None,
            })
            .collect();
        assert_eq!(storage_samples, vec![4, 4]);

        let live = device.live_objects();
        assert_eq!((live.framebuffers, live.renderbuffers, live.textures), (1, 2, 0));
    }

    #[test]
    fn test_single_sample_color_is_a_texture() {
        let mut device = RecordingDevice::new();
        let fb = ResourceFactory::new(&mut device)
            .create_framebuffer(256, 128, 0, Some(TextureFormat::Rgba16F), None)
            .unwrap();

        let color = fb.color_texture().expect("sampleable color attachment");
        assert!(fb.depth_stencil_target().is_none());
        assert!(device.calls().contains(&DeviceCall::TextureStorage {
            texture: color,
            levels: 1,
            format: TextureFormat::Rgba16F,
            width: 256,
            height: 128,
        }));
        assert!(device.calls().contains(&DeviceCall::FramebufferTexture {
            framebuffer: fb.id().unwrap(),
            attachment: Attachment::Color0,
            texture: color,
            level: 0,
        }));
    }

    #[test]
    fn test_framebuffer_without_attachments_is_incomplete() {
        let mut device = RecordingDevice::new();
        let result = ResourceFactory::new(&mut device).create_framebuffer(64, 64, 0, None, None);

        match result {
            Err(RenderError::FramebufferIncomplete { status }) => {
                assert_eq!(status, FramebufferStatus::INCOMPLETE_MISSING_ATTACHMENT.0);
                assert_eq!(status, 36055);
            }
            other => panic!("expected incomplete framebuffer, got {other:?}"),
        }
        assert_eq!(device.live_objects().total(), 0);
    }

    #[test]
    fn test_depth_only_framebuffer_is_complete() {
        let mut device = RecordingDevice::new();
        let fb = ResourceFactory::new(&mut device)
            .create_framebuffer(64, 64, 0, None, Some(TextureFormat::Depth24Stencil8))
            .unwrap();
        assert!(fb.color_target().is_none());
        assert!(fb.depth_stencil_target().is_some());
    }

    #[test]
    fn test_resolve_onto_itself_records_nothing() {
        let mut device = RecordingDevice::new();
        let fb = ResourceFactory::new(&mut device)
            .create_framebuffer(64, 64, 0, Some(TextureFormat::Rgba16F), None)
            .unwrap();
        device.take_calls();

        ResourceFactory::new(&mut device).resolve_framebuffer(&fb, &fb);
        assert!(device.calls().is_empty());
    }

    #[test]
    fn test_resolve_blits_color_and_invalidates_source() {
        let mut device = RecordingDevice::new();
        let mut factory = ResourceFactory::new(&mut device);
        let src = factory
            .create_framebuffer(
                800,
                600,
                8,
                Some(TextureFormat::Rgba16F),
                Some(TextureFormat::Depth24Stencil8),
            )
            .unwrap();
        let dst = factory
            .create_framebuffer(800, 600, 0, Some(TextureFormat::Rgba16F), None)
            .unwrap();
        device.take_calls();

        ResourceFactory::new(&mut device).resolve_framebuffer(&src, &dst);
        let src_id = src.id().unwrap();
        assert_eq!(
            device.calls(),
            &[
                DeviceCall::BlitFramebuffer {
                    src: src_id,
                    dst: dst.id().unwrap(),
                    src_rect: [0, 0, 799, 599],
                    dst_rect: [0, 0, 799, 599],
                    mask: BufferMask::COLOR,
                    filter: TextureFilter::Nearest,
                },
                DeviceCall::InvalidateFramebuffer {
                    framebuffer: src_id,
                    attachments: vec![Attachment::Color0, Attachment::DepthStencil],
                },
            ]
        );
    }

    #[test]
    fn test_delete_framebuffer_resets_handle() {
        let mut device = RecordingDevice::new();
        let mut factory = ResourceFactory::new(&mut device);
        let mut fb = factory
            .create_framebuffer(
                32,
                32,
                0,
                Some(TextureFormat::Rgba16F),
                Some(TextureFormat::Depth24Stencil8),
            )
            .unwrap();

        factory.delete_framebuffer(&mut fb);
        assert!(fb.is_empty());
        assert_eq!(fb.width(), 0);
        assert!(fb.color_target().is_none());
        assert_eq!(device.live_objects().total(), 0);

        device.take_calls();
        ResourceFactory::new(&mut device).delete_framebuffer(&mut fb);
        assert!(device.calls().is_empty());
    }

    #[test]
    fn test_vertex_buffer_layout_and_release() {
        let mut device = RecordingDevice::new();
        let mut buffer = ResourceFactory::new(&mut device)
            .create_vertex_buffer(&triangle())
            .unwrap();

        assert_eq!(buffer.num_elements(), 3);
        assert!(buffer.index_store().is_some());

        let attributes: Vec<_> = device
            .calls()
            .iter()
            .filter_map(|c| match c {
                DeviceCall::VertexArrayAttribute { attribute, .. } => Some(*attribute),
                _ => None,
            })
            .collect();
        assert_eq!(attributes.len(), 5);
        assert!(attributes.iter().all(|a| a.stride == 56));
        assert_eq!(attributes[4].components, 2);
        assert_eq!(attributes[4].offset, 48);

        ResourceFactory::new(&mut device).delete_vertex_buffer(&mut buffer);
        assert!(buffer.is_empty());
        assert_eq!(buffer.num_elements(), 0);
        assert_eq!(device.live_objects().total(), 0);
    }

    #[test]
    fn test_empty_mesh_is_rejected() {
        let mut device = RecordingDevice::new();
        let result = ResourceFactory::new(&mut device).create_vertex_buffer(&Mesh::new(Vec::new(), Vec::new()));
        assert!(matches!(result, Err(RenderError::ResourceAllocation(_))));
        assert!(device.calls().is_empty());
    }

    #[test]
    fn test_clip_space_quad_is_non_indexed() {
        let mut device = RecordingDevice::new();
        let quad = ResourceFactory::new(&mut device).create_clip_space_quad().unwrap();

        assert!(quad.index_store().is_none());
        assert!(quad.vertex_array().is_some());
        assert!(device.calls().contains(&DeviceCall::CreateBuffer {
            buffer: quad.vertex_store().unwrap(),
            size: 64,
        }));

        let layout: Vec<_> = device
            .calls()
            .iter()
            .filter_map(|c| match c {
                DeviceCall::VertexArrayAttribute { attribute, .. } => {
                    Some((attribute.index, attribute.components, attribute.offset, attribute.stride))
                }
                _ => None,
            })
            .collect();
        assert_eq!(layout, vec![(0, 2, 0, 16), (1, 2, 8, 16)]);
    }

    #[test]
    fn test_transient_texture_released_on_error() {
        let mut device = RecordingDevice::new();
        let texture = ResourceFactory::new(&mut device)
            .create_texture(TextureTarget::Texture2D, 8, 8, TextureFormat::Rgba8, MipLevels::Exact(1))
            .unwrap();
        let id = texture.id().unwrap();

        let result: Result<(), RenderError> = with_transient_texture(&mut device, texture, |device, texture| {
            device.bind_texture_unit(0, texture.id().unwrap());
            Err(RenderError::ResourceAllocation("scope failed".to_string()))
        });

        assert!(result.is_err());
        assert!(!device.is_texture_live(id));
        assert_eq!(device.calls().last(), Some(&DeviceCall::DeleteTexture(id)));
    }
}
