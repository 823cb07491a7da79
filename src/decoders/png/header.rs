use crate::utils::error::{PngError, PngResult};

pub const IHDR_LENGTH: usize = 13;

/// Largest width or height PNG allows (2^31 - 1).
pub const MAX_DIMENSION: u32 = 0x7fff_ffff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorType {
    Gray = 0,
    RGB = 2,
    Palette = 3,
    GrayAlpha = 4,
    RGBA = 6,
}

impl ColorType {
    pub fn from_u8(value: u8) -> Option<ColorType> {
        match value {
            0 => Some(ColorType::Gray),
            2 => Some(ColorType::RGB),
            3 => Some(ColorType::Palette),
            4 => Some(ColorType::GrayAlpha),
            6 => Some(ColorType::RGBA),
            _ => None,
        }
    }

    /// Samples per pixel as stored in the stream.
    pub fn channels(self) -> usize {
        match self {
            ColorType::Gray | ColorType::Palette => 1,
            ColorType::GrayAlpha => 2,
            ColorType::RGB => 3,
            ColorType::RGBA => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, ColorType::GrayAlpha | ColorType::RGBA)
    }

    pub fn is_gray(self) -> bool {
        matches!(self, ColorType::Gray | ColorType::GrayAlpha)
    }

    /// Bit depths PNG permits for this color type.
    pub fn allowed_bit_depths(self) -> &'static [u8] {
        match self {
            ColorType::Gray => &[1, 2, 4, 8, 16],
            ColorType::Palette => &[1, 2, 4, 8],
            ColorType::RGB | ColorType::GrayAlpha | ColorType::RGBA => &[8, 16],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interlace {
    None = 0,
    Adam7 = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: ColorType,
    pub interlace: Interlace,
}

impl ImageHeader {
    /// Header of the canonical RGBA8 output, as written by the encoder.
    pub fn rgba8(width: u32, height: u32) -> ImageHeader {
        ImageHeader {
            width,
            height,
            bit_depth: 8,
            color_type: ColorType::RGBA,
            interlace: Interlace::None,
        }
    }

    /// Parses and validates an IHDR payload.
    ///
    /// `max_pixels` bounds `width * height` before any image memory is sized
    /// from the header.
    pub fn parse(data: &[u8], max_pixels: u64) -> PngResult<ImageHeader> {
        if data.len() != IHDR_LENGTH {
            return Err(PngError::InvalidHeader(format!(
                "IHDR length is {}, expected {}",
                data.len(),
                IHDR_LENGTH
            )));
        }

        let width = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        let height = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        let bit_depth = data[8];
        let color_type = data[9];
        let compression_method = data[10];
        let filter_method = data[11];
        let interlace_method = data[12];

        if width == 0 || height == 0 {
            return Err(PngError::InvalidHeader(format!("zero dimension {}x{}", width, height)));
        }

        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(PngError::InvalidHeader(format!(
                "dimension {}x{} exceeds 2^31-1",
                width, height
            )));
        }

        let color_type = ColorType::from_u8(color_type)
            .ok_or_else(|| PngError::InvalidHeader(format!("invalid color type {}", color_type)))?;

        if !color_type.allowed_bit_depths().contains(&bit_depth) {
            return Err(PngError::InvalidHeader(format!(
                "bit depth {} is not allowed for color type {:?}",
                bit_depth, color_type
            )));
        }

        if compression_method != 0 {
            return Err(PngError::InvalidHeader(format!(
                "unknown compression method {}",
                compression_method
            )));
        }

        if filter_method != 0 {
            return Err(PngError::InvalidHeader(format!("unknown filter method {}", filter_method)));
        }

        let interlace = match interlace_method {
            0 => Interlace::None,
            1 => Interlace::Adam7,
            _ => {
                return Err(PngError::InvalidHeader(format!(
                    "unknown interlace method {}",
                    interlace_method
                )))
            }
        };

        if width as u64 * height as u64 > max_pixels {
            return Err(PngError::AllocationLimitExceeded { width, height, max_pixels });
        }

        Ok(ImageHeader {
            width,
            height,
            bit_depth,
            color_type,
            interlace,
        })
    }

    /// Serializes the header into an IHDR payload.
    pub fn to_bytes(&self) -> [u8; IHDR_LENGTH] {
        let mut bytes = [0u8; IHDR_LENGTH];
        bytes[0..4].copy_from_slice(&self.width.to_be_bytes());
        bytes[4..8].copy_from_slice(&self.height.to_be_bytes());
        bytes[8] = self.bit_depth;
        bytes[9] = self.color_type as u8;
        bytes[12] = self.interlace as u8;
        bytes
    }

    pub fn channels(&self) -> usize {
        self.color_type.channels()
    }

    pub fn bits_per_pixel(&self) -> usize {
        self.bit_depth as usize * self.channels()
    }

    /// Filter lookback distance, at least one byte.
    pub fn bytes_per_pixel(&self) -> usize {
        ((self.bits_per_pixel() + 7) / 8).max(1)
    }

    /// Bytes of one filtered row of `width` pixels, excluding the filter byte.
    pub fn row_bytes(&self, width: u32) -> usize {
        (width as usize * self.bits_per_pixel() + 7) / 8
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}
