//! Image loading utilities for texture data
//!
//! Decodes PNG, JPEG and Radiance HDR files into tightly packed pixel rows
//! with a caller-chosen channel count. HDR sources keep their float texels.

use std::path::Path;

use image::DynamicImage;

use crate::assets::AssetError;

/// Texel storage of a decoded image
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    /// 32-bit float texels (HDR sources)
    Float(Vec<f32>),
    /// 8-bit normalized texels
    Byte(Vec<u8>),
}

impl PixelData {
    /// Number of scalar components stored
    pub fn len(&self) -> usize {
        match self {
            Self::Float(values) => values.len(),
            Self::Byte(values) => values.len(),
        }
    }

    /// True when no components are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Loaded image data ready for GPU upload
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Number of color channels per pixel (1 to 4)
    pub channels: u8,
    /// Row-major texels, `width * height * channels` components
    pub pixels: PixelData,
}

impl ImageData {
    /// Load an image from a file path, converted to `channels` components
    pub fn from_file<P: AsRef<Path>>(path: P, channels: u8) -> Result<Self, AssetError> {
        let path_ref = path.as_ref();

        log::debug!("Loading image from: {:?}", path_ref);

        let img = image::open(path_ref).map_err(|e| {
            AssetError::LoadFailed(format!("Failed to load image {}: {}", path_ref.display(), e))
        })?;

        let data = Self::from_dynamic(&img, channels)?;
        log::info!(
            "Loaded {} image {}x{} from {:?}",
            if data.is_hdr() { "HDR" } else { "LDR" },
            data.width,
            data.height,
            path_ref
        );
        Ok(data)
    }

    /// Load image from memory (useful for embedded resources)
    pub fn from_bytes(bytes: &[u8], channels: u8) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to load image from bytes: {e}")))?;
        Self::from_dynamic(&img, channels)
    }

    /// Convert a decoded image, keeping float precision for float sources
    pub fn from_dynamic(img: &DynamicImage, channels: u8) -> Result<Self, AssetError> {
        let (width, height) = (img.width(), img.height());
        let hdr = matches!(img, DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_));

        let pixels = if hdr {
            PixelData::Float(match channels {
                1 => img.to_luma32f().into_raw(),
                3 => img.to_rgb32f().into_raw(),
                4 => img.to_rgba32f().into_raw(),
                other => return Err(AssetError::UnsupportedChannels(other)),
            })
        } else {
            PixelData::Byte(match channels {
                1 => img.to_luma8().into_raw(),
                2 => img.to_luma_alpha8().into_raw(),
                3 => img.to_rgb8().into_raw(),
                4 => img.to_rgba8().into_raw(),
                other => return Err(AssetError::UnsupportedChannels(other)),
            })
        };

        Ok(Self { width, height, channels, pixels })
    }

    /// Wrap float texels
    pub fn hdr(width: u32, height: u32, channels: u8, texels: Vec<f32>) -> Result<Self, AssetError> {
        Self::checked(width, height, channels, PixelData::Float(texels))
    }

    /// Wrap 8-bit texels
    pub fn ldr(width: u32, height: u32, channels: u8, texels: Vec<u8>) -> Result<Self, AssetError> {
        Self::checked(width, height, channels, PixelData::Byte(texels))
    }

    fn checked(width: u32, height: u32, channels: u8, pixels: PixelData) -> Result<Self, AssetError> {
        if !(1..=4).contains(&channels) {
            return Err(AssetError::UnsupportedChannels(channels));
        }
        let expected = width as usize * height as usize * channels as usize;
        if pixels.len() != expected {
            return Err(AssetError::LoadFailed(format!(
                "Pixel buffer holds {} components, {}x{}x{} needs {}",
                pixels.len(),
                width,
                height,
                channels,
                expected
            )));
        }
        Ok(Self { width, height, channels, pixels })
    }

    /// Create a solid color image (useful for testing and defaults)
    pub fn solid_color(width: u32, height: u32, color: &[u8]) -> Self {
        let pixel_count = width as usize * height as usize;
        let data = color.repeat(pixel_count);

        Self {
            width,
            height,
            channels: color.len() as u8,
            pixels: PixelData::Byte(data),
        }
    }

    /// True when texels are stored as floats
    pub fn is_hdr(&self) -> bool {
        matches!(self.pixels, PixelData::Float(_))
    }

    /// Size of the pixel data in bytes
    pub fn size_bytes(&self) -> usize {
        match &self.pixels {
            PixelData::Float(values) => values.len() * std::mem::size_of::<f32>(),
            PixelData::Byte(values) => values.len(),
        }
    }

    /// Components of the pixel at `(x, y)`, converted to floats
    ///
    /// Byte texels are normalized to `[0, 1]`.
    pub fn texel(&self, x: u32, y: u32) -> Vec<f32> {
        let channels = self.channels as usize;
        let start = (y as usize * self.width as usize + x as usize) * channels;
        match &self.pixels {
            PixelData::Float(values) => values[start..start + channels].to_vec(),
            PixelData::Byte(values) => values[start..start + channels]
                .iter()
                .map(|&v| f32::from(v) / 255.0)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgb32FImage, RgbImage};

    #[test]
    fn test_solid_color_image() {
        let img = ImageData::solid_color(4, 4, &[255, 0, 0]);
        assert_eq!(img.channels, 3);
        assert_eq!(img.size_bytes(), 4 * 4 * 3);
        assert!(!img.is_hdr());
        assert_eq!(img.texel(3, 3), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_float_source_stays_hdr() {
        let source = Rgb32FImage::from_pixel(2, 1, Rgb([4.0, 0.5, 0.0]));
        let img = ImageData::from_dynamic(&DynamicImage::ImageRgb32F(source), 3).unwrap();

        assert!(img.is_hdr());
        assert_eq!(img.size_bytes(), 2 * 3 * 4);
        assert_eq!(img.texel(1, 0), vec![4.0, 0.5, 0.0]);
    }

    #[test]
    fn test_byte_source_channel_conversion() {
        let source = RgbImage::from_pixel(2, 2, Rgb([10, 20, 30]));
        let img = ImageData::from_dynamic(&DynamicImage::ImageRgb8(source), 1).unwrap();

        assert!(!img.is_hdr());
        assert_eq!(img.channels, 1);
        assert_eq!(img.pixels.len(), 4);
    }

    #[test]
    fn test_unsupported_channel_count() {
        let source = RgbImage::new(1, 1);
        let result = ImageData::from_dynamic(&DynamicImage::ImageRgb8(source), 5);
        assert!(matches!(result, Err(AssetError::UnsupportedChannels(5))));
    }

    #[test]
    fn test_checked_constructors_validate_length() {
        assert!(ImageData::hdr(2, 2, 3, vec![0.0; 12]).is_ok());
        assert!(ImageData::hdr(2, 2, 3, vec![0.0; 11]).is_err());
        assert!(ImageData::ldr(1, 1, 0, vec![]).is_err());
    }
}
