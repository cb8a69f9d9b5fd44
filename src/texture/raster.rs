//! CPU-side RGBA8 pixel buffers.

use bevy::asset::RenderAssetUsages;
use bevy::image::{Image, ImageSampler};
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use thiserror::Error;

/// Errors that can occur when building a [`Raster`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RasterError {
    #[error("Raster dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },

    #[error("Pixel buffer holds {found} pixels, expected {expected}")]
    SizeMismatch { expected: usize, found: usize },

    #[error("Image format {found:?} is not supported, expected an RGBA8 format")]
    UnsupportedFormat { found: TextureFormat },

    #[error("Image has {layers} layers, expected a single 2D layer")]
    NotSingleLayer { layers: u32 },

    #[error("Image data is not available on the CPU")]
    NoData,
}

/// An sRGB-encoded RGBA8 image, row-major from the top-left corner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
}

impl Raster {
    /// A fully transparent raster.
    pub fn new(width: u32, height: u32) -> Result<Self, RasterError> {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    pub fn filled(width: u32, height: u32, pixel: [u8; 4]) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::EmptyDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            pixels: vec![pixel; width as usize * height as usize],
        })
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<[u8; 4]>) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::EmptyDimensions { width, height });
        }
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(RasterError::SizeMismatch {
                expected,
                found: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Copy the pixels out of a CPU-resident RGBA8 [`Image`].
    pub fn from_image(image: &Image) -> Result<Self, RasterError> {
        let descriptor = &image.texture_descriptor;
        if !matches!(
            descriptor.format,
            TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb
        ) {
            return Err(RasterError::UnsupportedFormat {
                found: descriptor.format,
            });
        }
        if descriptor.size.depth_or_array_layers != 1 {
            return Err(RasterError::NotSingleLayer {
                layers: descriptor.size.depth_or_array_layers,
            });
        }

        let data = image.data.as_ref().ok_or(RasterError::NoData)?;
        let width = descriptor.size.width;
        let height = descriptor.size.height;
        let expected = width as usize * height as usize;
        // Only the first mip level is read.
        let level = data.get(..expected * 4).ok_or(RasterError::SizeMismatch {
            expected,
            found: data.len() / 4,
        })?;
        let pixels: Vec<[u8; 4]> = level.chunks_exact(4).map(|c| [c[0], c[1], c[2], c[3]]).collect();

        Self::from_pixels(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[[u8; 4]] {
        &self.pixels
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels[self.index(x, y)]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: [u8; 4]) {
        let i = self.index(x, y);
        self.pixels[i] = pixel;
    }

    /// Nearest-texel lookup with clamp-to-edge addressing.
    pub fn sample_clamped(&self, uv: Vec2) -> Srgba {
        let x = texel_coord(uv.x, self.width).clamp(0, self.width as i64 - 1);
        let y = texel_coord(uv.y, self.height).clamp(0, self.height as i64 - 1);
        to_srgba(self.pixel(x as u32, y as u32))
    }

    /// Nearest-texel lookup with repeat addressing.
    pub fn sample_repeat(&self, uv: Vec2) -> Srgba {
        let x = texel_coord(uv.x, self.width).rem_euclid(self.width as i64);
        let y = texel_coord(uv.y, self.height).rem_euclid(self.height as i64);
        to_srgba(self.pixel(x as u32, y as u32))
    }

    /// Upload-ready image with a single mip level.
    pub fn to_image(&self, sampler: ImageSampler) -> Image {
        let mut image = Image::new(
            Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
            TextureDimension::D2,
            bytemuck::cast_slice(&self.pixels).to_vec(),
            TextureFormat::Rgba8UnormSrgb,
            RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
        );
        image.texture_descriptor.mip_level_count = 1;
        image.sampler = sampler;
        image
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize
    }
}

#[inline]
fn texel_coord(u: f32, extent: u32) -> i64 {
    (u * extent as f32).floor() as i64
}

#[inline]
fn to_srgba(p: [u8; 4]) -> Srgba {
    Srgba::rgba_u8(p[0], p[1], p[2], p[3])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> Raster {
        Raster::from_pixels(
            2,
            2,
            vec![[0, 0, 0, 255], [255, 255, 255, 255], [255, 255, 255, 255], [0, 0, 0, 255]],
        )
        .unwrap()
    }

    #[test]
    fn test_empty_dimensions_rejected() {
        assert!(matches!(
            Raster::new(0, 4),
            Err(RasterError::EmptyDimensions { .. })
        ));
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let result = Raster::from_pixels(2, 2, vec![[0; 4]; 3]);
        assert_eq!(
            result,
            Err(RasterError::SizeMismatch {
                expected: 4,
                found: 3
            })
        );
    }

    #[test]
    fn test_repeat_sampling_wraps() {
        let raster = checker();
        assert_eq!(raster.sample_repeat(Vec2::new(0.25, 0.25)), Srgba::BLACK);
        assert_eq!(raster.sample_repeat(Vec2::new(1.25, 0.25)), Srgba::BLACK);
        assert_eq!(raster.sample_repeat(Vec2::new(-0.25, 0.25)), Srgba::WHITE);
    }

    #[test]
    fn test_clamped_sampling() {
        let raster = checker();
        assert_eq!(raster.sample_clamped(Vec2::new(5.0, 0.1)), Srgba::WHITE);
        assert_eq!(raster.sample_clamped(Vec2::new(-5.0, 0.1)), Srgba::BLACK);
    }

    #[test]
    fn test_image_conversion() {
        let raster = checker();
        let image = raster.to_image(ImageSampler::Default);

        assert_eq!(image.texture_descriptor.format, TextureFormat::Rgba8UnormSrgb);
        assert_eq!(image.texture_descriptor.mip_level_count, 1);
        assert_eq!(Raster::from_image(&image), Ok(raster));
    }
}
