use std::fmt::{Debug, Formatter};

/// Canonical decode output: `height` rows of `width * 4` bytes, R,G,B,A.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl ImageBuffer {
    pub const CHANNELS: usize = 4;

    /// Allocates a zeroed buffer. Callers are expected to have bounded
    /// `width * height` already.
    pub fn new(width: u32, height: u32) -> ImageBuffer {
        let len = width as usize * height as usize * Self::CHANNELS;

        ImageBuffer {
            width,
            height,
            pixels: vec![0; len],
        }
    }

    /// Wraps existing RGBA8 data. Returns `None` if the length does not match.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Option<ImageBuffer> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(Self::CHANNELS)?;

        if pixels.len() != expected {
            return None;
        }

        Some(ImageBuffer { width, height, pixels })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn row_bytes(&self) -> usize {
        self.width as usize * Self::CHANNELS
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }

        let start = y as usize * self.row_bytes();
        self.pixels.get(start..start + self.row_bytes())
    }

    pub fn row_mut(&mut self, y: u32) -> Option<&mut [u8]> {
        if y >= self.height {
            return None;
        }

        let row_bytes = self.row_bytes();
        let start = y as usize * row_bytes;
        self.pixels.get_mut(start..start + row_bytes)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        // A zero-width image has no bytes; chunks_exact(0) would panic.
        self.pixels.chunks_exact(self.row_bytes().max(1))
    }

    /// RGBA value at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width {
            return None;
        }

        let offset = x as usize * Self::CHANNELS;
        let px = self.row(y)?.get(offset..offset + Self::CHANNELS)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn has_transparency(&self) -> bool {
        self.pixels.chunks_exact(Self::CHANNELS).any(|px| px[3] != 0xff)
    }
}

impl Debug for ImageBuffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}
