use crate::device_camera::interface::{GrabResult, PixelType};
use crate::frame::{Frame, PixelFormat};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, RgbImage, RgbaImage};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("image has zero width or height")]
    EmptyImage,
    #[error("buffer too short: expected {expected} bytes, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },
    #[error("buffer layout does not fit {width}x{height} {pixel_type:?}")]
    InvalidLayout {
        width: u32,
        height: u32,
        pixel_type: PixelType,
    },
}

/// Converts raw grab results into frames of one fixed output format.
#[derive(Debug, Clone, Copy)]
pub struct PixelConverter {
    output_format: PixelFormat,
}

impl PixelConverter {
    pub fn new(output_format: PixelFormat) -> Self {
        Self { output_format }
    }

    pub fn convert(&self, result: &GrabResult) -> Result<Frame, ConversionError> {
        let rgba = to_rgba_image(result)?;
        let mut data = rgba.into_raw();

        if self.output_format == PixelFormat::Bgra8 {
            for pixel in data.chunks_exact_mut(PixelFormat::BYTES_PER_PIXEL) {
                pixel.swap(0, 2);
            }
        }

        Ok(Frame {
            width: result.width,
            height: result.height,
            pixel_format: self.output_format,
            image_number: result.image_number,
            data,
        })
    }
}

fn to_rgba_image(result: &GrabResult) -> Result<RgbaImage, ConversionError> {
    let (width, height) = (result.width, result.height);
    if width == 0 || height == 0 {
        return Err(ConversionError::EmptyImage);
    }

    let invalid_layout = || ConversionError::InvalidLayout {
        width,
        height,
        pixel_type: result.pixel_type,
    };

    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(result.pixel_type.bytes_per_pixel()))
        .ok_or_else(invalid_layout)?;
    if result.buffer.len() < expected {
        return Err(ConversionError::BufferTooShort {
            expected,
            actual: result.buffer.len(),
        });
    }

    // Trailing padding past the last row is ignored.
    let raw = &result.buffer[..expected];

    let image = match result.pixel_type {
        PixelType::Mono8 => DynamicImage::ImageLuma8(
            GrayImage::from_raw(width, height, raw.to_vec()).ok_or_else(invalid_layout)?,
        ),
        PixelType::Mono16 => {
            let samples: Vec<u16> = raw
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            DynamicImage::ImageLuma16(
                ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width, height, samples)
                    .ok_or_else(invalid_layout)?,
            )
        }
        PixelType::Rgb8 => DynamicImage::ImageRgb8(
            RgbImage::from_raw(width, height, raw.to_vec()).ok_or_else(invalid_layout)?,
        ),
        PixelType::Bgr8 => DynamicImage::ImageRgb8(
            RgbImage::from_raw(width, height, swap_red_blue(raw, 3))
                .ok_or_else(invalid_layout)?,
        ),
        PixelType::Rgba8 => {
            return RgbaImage::from_raw(width, height, raw.to_vec()).ok_or_else(invalid_layout)
        }
        PixelType::Bgra8 => {
            return RgbaImage::from_raw(width, height, swap_red_blue(raw, 4))
                .ok_or_else(invalid_layout)
        }
    };

    Ok(image.to_rgba8())
}

fn swap_red_blue(raw: &[u8], channels: usize) -> Vec<u8> {
    let mut swapped = raw.to_vec();
    for pixel in swapped.chunks_exact_mut(channels) {
        pixel.swap(0, 2);
    }
    swapped
}
