/// 32-bit packed output layouts a frame can be converted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Byte order B, G, R, A in memory.
    Bgra8,
    /// Byte order R, G, B, A in memory.
    Rgba8,
}

impl PixelFormat {
    pub const BYTES_PER_PIXEL: usize = 4;
}

/// A displayable bitmap produced from one grab result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub image_number: u64,
    pub data: Vec<u8>,
}

impl Frame {
    /// Pixels as RGBA regardless of the stored byte order.
    pub fn to_rgba(&self) -> Vec<u8> {
        match self.pixel_format {
            PixelFormat::Rgba8 => self.data.clone(),
            PixelFormat::Bgra8 => {
                let mut rgba = self.data.clone();
                for pixel in rgba.chunks_exact_mut(PixelFormat::BYTES_PER_PIXEL) {
                    pixel.swap(0, 2);
                }
                rgba
            }
        }
    }
}
