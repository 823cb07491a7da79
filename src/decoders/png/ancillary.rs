use std::io::Read;
use flate2::read::ZlibDecoder;
use log::warn;
use crate::decoders::png::header::{ColorType, ImageHeader};
use crate::utils::traits::SafeAccess;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transparency {
    /// Alpha per palette index; indices past the end are opaque.
    Palette(Vec<u8>),
    Gray(u16),
    Rgb(u16, u16, u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Background {
    Gray(u16),
    Rgb(u16, u16, u16),
    PaletteIndex(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderingIntent {
    Perceptual = 0,
    RelativeColorimetric = 1,
    Saturation = 2,
    AbsoluteColorimetric = 3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chromaticities {
    pub white_point_x: f32,
    pub white_point_y: f32,
    pub red_x: f32,
    pub red_y: f32,
    pub green_x: f32,
    pub green_y: f32,
    pub blue_x: f32,
    pub blue_y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalUnit {
    Unknown,
    Meter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalDimensions {
    pub pixels_per_unit_x: u32,
    pub pixels_per_unit_y: u32,
    pub unit: PhysicalUnit,
}

impl PhysicalDimensions {
    /// Resolution in dots per inch, when the unit is known.
    pub fn dpi(&self) -> Option<(f32, f32)> {
        match self.unit {
            PhysicalUnit::Meter => Some((
                self.pixels_per_unit_x as f32 * 0.0254,
                self.pixels_per_unit_y as f32 * 0.0254,
            )),
            PhysicalUnit::Unknown => None,
        }
    }

    /// Pixel width over pixel height. Defined for either unit.
    pub fn aspect_ratio(&self) -> Option<f32> {
        match (self.pixels_per_unit_x, self.pixels_per_unit_y) {
            (0, _) | (_, 0) => None,
            (x, y) => Some(y as f32 / x as f32),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetUnit {
    Pixel,
    Micrometer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOffset {
    pub x: i32,
    pub y: i32,
    pub unit: OffsetUnit,
}

impl ImageOffset {
    /// Offset in inches, for micrometer offsets.
    pub fn inches(&self) -> Option<(f32, f32)> {
        match self.unit {
            OffsetUnit::Micrometer => Some((self.x as f32 / 25_400.0, self.y as f32 / 25_400.0)),
            OffsetUnit::Pixel => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignificantBits {
    Gray { gray: u8 },
    Rgb { red: u8, green: u8, blue: u8 },
    GrayAlpha { gray: u8, alpha: u8 },
    Rgba { red: u8, green: u8, blue: u8, alpha: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PngText {
    Basic { keyword: String, text: String },
    Compressed { keyword: String, text: String },
}

impl PngText {
    pub fn keyword(&self) -> &str {
        match self {
            PngText::Basic { keyword, .. } | PngText::Compressed { keyword, .. } => keyword,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            PngText::Basic { text, .. } | PngText::Compressed { text, .. } => text,
        }
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Splits `keyword\0rest`, enforcing the 1-79 byte keyword length.
fn split_keyword(data: &[u8]) -> Option<(String, &[u8])> {
    let nul = data.iter().position(|&b| b == 0)?;

    if nul == 0 || nul > 79 {
        return None;
    }

    Some((latin1(&data[..nul]), &data[nul + 1..]))
}

pub fn parse_palette(data: &[u8], header: &ImageHeader) -> Result<Vec<[u8; 3]>, String> {
    if data.is_empty() || data.len() % 3 != 0 {
        return Err(format!("length {} is not a positive multiple of 3", data.len()));
    }

    let entries = data.len() / 3;
    if entries > 256 {
        return Err(format!("{} entries, at most 256 allowed", entries));
    }

    let limit = match header.color_type {
        ColorType::Palette => 1 << header.bit_depth,
        _ => 256,
    };

    if entries > limit {
        warn!("PLTE has {} entries, keeping the first {} for bit depth {}", entries, limit, header.bit_depth);
    }

    Ok(data.chunks_exact(3).take(limit).map(|rgb| [rgb[0], rgb[1], rgb[2]]).collect())
}

pub fn parse_transparency(data: &[u8], header: &ImageHeader, palette_len: usize) -> Option<Transparency> {
    match header.color_type {
        ColorType::Gray if data.len() == 2 => Some(Transparency::Gray(data.u16_at(0)?)),
        ColorType::RGB if data.len() == 6 => Some(Transparency::Rgb(data.u16_at(0)?, data.u16_at(2)?, data.u16_at(4)?)),
        ColorType::Palette if !data.is_empty() && data.len() <= palette_len => {
            Some(Transparency::Palette(data.to_vec()))
        }
        _ => None,
    }
}

pub fn parse_background(data: &[u8], header: &ImageHeader, palette_len: usize) -> Option<Background> {
    match header.color_type {
        ColorType::Gray | ColorType::GrayAlpha if data.len() == 2 => Some(Background::Gray(data.u16_at(0)?)),
        ColorType::RGB | ColorType::RGBA if data.len() == 6 => {
            Some(Background::Rgb(data.u16_at(0)?, data.u16_at(2)?, data.u16_at(4)?))
        }
        ColorType::Palette if data.len() == 1 && (data[0] as usize) < palette_len => {
            Some(Background::PaletteIndex(data[0]))
        }
        _ => None,
    }
}

pub fn parse_significant_bits(data: &[u8], header: &ImageHeader) -> Option<SignificantBits> {
    // Palette entries are always 8 bits deep.
    let max = if header.color_type == ColorType::Palette { 8 } else { header.bit_depth };

    if data.is_empty() || data.iter().any(|&bits| bits == 0 || bits > max) {
        return None;
    }

    match (header.color_type, data.len()) {
        (ColorType::Gray, 1) => Some(SignificantBits::Gray { gray: data[0] }),
        (ColorType::RGB | ColorType::Palette, 3) => Some(SignificantBits::Rgb {
            red: data[0],
            green: data[1],
            blue: data[2],
        }),
        (ColorType::GrayAlpha, 2) => Some(SignificantBits::GrayAlpha { gray: data[0], alpha: data[1] }),
        (ColorType::RGBA, 4) => Some(SignificantBits::Rgba {
            red: data[0],
            green: data[1],
            blue: data[2],
            alpha: data[3],
        }),
        _ => None,
    }
}

/// gAMA stores gamma times 100000.
pub fn parse_gamma(data: &[u8]) -> Option<f32> {
    if data.len() != 4 {
        return None;
    }

    match data.u32_at(0)? {
        0 => None,
        value => Some(value as f32 / 100_000.0),
    }
}

pub fn parse_chromaticities(data: &[u8]) -> Option<Chromaticities> {
    if data.len() != 32 {
        return None;
    }

    let value = |index: usize| data.u32_at(index * 4).map(|v| v as f32 / 100_000.0);

    Some(Chromaticities {
        white_point_x: value(0)?,
        white_point_y: value(1)?,
        red_x: value(2)?,
        red_y: value(3)?,
        green_x: value(4)?,
        green_y: value(5)?,
        blue_x: value(6)?,
        blue_y: value(7)?,
    })
}

pub fn parse_rendering_intent(data: &[u8]) -> Option<RenderingIntent> {
    if data.len() != 1 {
        return None;
    }

    match data[0] {
        0 => Some(RenderingIntent::Perceptual),
        1 => Some(RenderingIntent::RelativeColorimetric),
        2 => Some(RenderingIntent::Saturation),
        3 => Some(RenderingIntent::AbsoluteColorimetric),
        _ => None,
    }
}

pub fn parse_physical_dimensions(data: &[u8]) -> Option<PhysicalDimensions> {
    if data.len() != 9 {
        return None;
    }

    let unit = match data.u8_at(8)? {
        0 => PhysicalUnit::Unknown,
        1 => PhysicalUnit::Meter,
        _ => return None,
    };

    Some(PhysicalDimensions {
        pixels_per_unit_x: data.u32_at(0)?,
        pixels_per_unit_y: data.u32_at(4)?,
        unit,
    })
}

pub fn parse_offset(data: &[u8]) -> Option<ImageOffset> {
    if data.len() != 9 {
        return None;
    }

    let unit = match data.u8_at(8)? {
        0 => OffsetUnit::Pixel,
        1 => OffsetUnit::Micrometer,
        _ => return None,
    };

    Some(ImageOffset {
        x: data.i32_at(0)?,
        y: data.i32_at(4)?,
        unit,
    })
}

pub fn parse_time(data: &[u8]) -> Option<ImageTime> {
    if data.len() != 7 {
        return None;
    }

    let time = ImageTime {
        year: data.u16_at(0)?,
        month: data[2],
        day: data[3],
        hour: data[4],
        minute: data[5],
        second: data[6],
    };

    // A leap second is allowed.
    let valid = (1..=12).contains(&time.month)
        && (1..=31).contains(&time.day)
        && time.hour <= 23
        && time.minute <= 59
        && time.second <= 60;

    valid.then_some(time)
}

pub fn parse_text(data: &[u8]) -> Option<PngText> {
    let (keyword, text) = split_keyword(data)?;

    Some(PngText::Basic {
        keyword,
        text: latin1(text),
    })
}

/// zTXt: keyword, compression method 0, then a zlib stream. The inflated
/// text is capped at `max_bytes`.
pub fn parse_compressed_text(data: &[u8], max_bytes: usize) -> Option<PngText> {
    let (keyword, rest) = split_keyword(data)?;
    let (&method, compressed) = rest.split_first()?;

    if method != 0 {
        warn!("Unknown zTXt compression method {}", method);
        return None;
    }

    let mut text = Vec::new();
    let decoder = ZlibDecoder::new(compressed);
    decoder.take(max_bytes as u64 + 1).read_to_end(&mut text).ok()?;

    if text.len() > max_bytes {
        warn!("zTXt chunk '{}' inflates past {} bytes", keyword, max_bytes);
        return None;
    }

    Some(PngText::Compressed {
        keyword,
        text: latin1(&text),
    })
}
