mod utils;
mod decoders;
mod encoders;

pub use decoders::png::{ancillary, chunk, filter, header, inflate, interlace, normalize};
pub use decoders::png::{DecodedPng, PngDecoder};
pub use encoders::png::PngEncoder;
pub use utils::{bytereader, crc, logger};
pub use utils::error::{DecodeStage, PngError, PngResult};
pub use utils::image::ImageBuffer;
pub use utils::info::{PngInfo, PngSummary};
pub use utils::options::{CrcPolicy, DecodeOptions, EncodeOptions, FilterStrategy, Strip16};

use std::io::Cursor;

/// Decodes an in-memory PNG with default options.
pub fn decode_png(data: &[u8]) -> PngResult<DecodedPng> {
    decode_png_with(data, &DecodeOptions::default())
}

pub fn decode_png_with(data: &[u8], options: &DecodeOptions) -> PngResult<DecodedPng> {
    PngDecoder::with_options(Cursor::new(data), options.clone()).decode()
}

/// Encodes an RGBA8 buffer with default options.
pub fn encode_png(image: &ImageBuffer) -> PngResult<Vec<u8>> {
    let header = header::ImageHeader::rgba8(image.width(), image.height());
    PngEncoder::default().encode(image, &header)
}
