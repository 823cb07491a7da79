use crate::decoders::png::ancillary::{
    Background, Chromaticities, ImageOffset, ImageTime, PhysicalDimensions, PngText, RenderingIntent,
    SignificantBits, Transparency,
};
use crate::decoders::png::header::ImageHeader;

/// Everything the decoder learned about a PNG besides its pixels.
#[derive(Debug, Clone, Default)]
pub struct PngInfo {
    pub palette: Option<Vec<[u8; 3]>>,
    pub transparency: Option<Transparency>,
    pub gamma: Option<f32>,
    pub chromaticities: Option<Chromaticities>,
    pub rendering_intent: Option<RenderingIntent>,
    pub physical_dimensions: Option<PhysicalDimensions>,
    pub offset: Option<ImageOffset>,
    pub modification_time: Option<ImageTime>,
    pub background: Option<Background>,
    pub significant_bits: Option<SignificantBits>,
    pub text_chunks: Vec<PngText>,
    pub idat_chunks: usize,
    pub compressed_bytes: u64,
}

/// Header plus metadata, as printed by the CLI.
pub struct PngSummary<'a> {
    pub header: &'a ImageHeader,
    pub info: &'a PngInfo,
}
