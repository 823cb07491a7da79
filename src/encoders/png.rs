use std::io::Write;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::debug;
use crate::decoders::png::chunk::{write_chunk, PNG_SIGNATURE};
use crate::decoders::png::filter::{filter_row, FilterType};
use crate::decoders::png::header::{ColorType, ImageHeader, Interlace, MAX_DIMENSION};
use crate::utils::error::{PngError, PngResult};
use crate::utils::image::ImageBuffer;
use crate::utils::options::{EncodeOptions, FilterStrategy};

/// Writes RGBA8 buffers as single-pass, non-interlaced PNGs.
pub struct PngEncoder {
    options: EncodeOptions,
}

impl Default for PngEncoder {
    fn default() -> Self {
        Self::new(EncodeOptions::default())
    }
}

impl PngEncoder {
    pub fn new(options: EncodeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Encodes `image` under `header`, which must describe 8-bit RGBA without
    /// interlacing and match the buffer's dimensions.
    pub fn encode(&self, image: &ImageBuffer, header: &ImageHeader) -> PngResult<Vec<u8>> {
        validate_target(image, header)?;

        let filtered = self.filter_image(image);

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(self.options.compression));
        encoder.write_all(&filtered)?;
        let compressed = encoder.finish()?;

        debug!(
            "Encoded {}x{}: {} filtered bytes, {} compressed",
            header.width,
            header.height,
            filtered.len(),
            compressed.len()
        );

        let chunk_size = self.options.idat_chunk_size.max(1);
        let mut out = Vec::with_capacity(compressed.len() + 64 + compressed.len() / chunk_size * 12);

        out.extend_from_slice(&PNG_SIGNATURE);
        write_chunk(&mut out, b"IHDR", &header.to_bytes());

        for idat in compressed.chunks(chunk_size) {
            write_chunk(&mut out, b"IDAT", idat);
        }

        write_chunk(&mut out, b"IEND", &[]);

        Ok(out)
    }

    fn filter_image(&self, image: &ImageBuffer) -> Vec<u8> {
        let row_bytes = image.row_bytes();
        let bpp = ImageBuffer::CHANNELS;

        let mut out = Vec::with_capacity((row_bytes + 1) * image.height() as usize);
        let mut prior = vec![0u8; row_bytes];
        let mut candidate = vec![0u8; row_bytes];
        let mut best = vec![0u8; row_bytes];

        for row in image.rows() {
            let filter = match self.options.filter {
                FilterStrategy::None => {
                    best.copy_from_slice(row);
                    FilterType::None
                }
                FilterStrategy::Fixed(filter) => {
                    filter_row(filter, row, &prior, bpp, &mut best);
                    filter
                }
                FilterStrategy::Adaptive => {
                    let mut best_filter = FilterType::None;
                    let mut best_score = u64::MAX;

                    for filter in FilterType::ALL {
                        filter_row(filter, row, &prior, bpp, &mut candidate);
                        let score = residual_score(&candidate);

                        if score < best_score {
                            best_score = score;
                            best_filter = filter;
                            std::mem::swap(&mut best, &mut candidate);
                        }
                    }

                    best_filter
                }
            };

            out.push(filter as u8);
            out.extend_from_slice(&best);
            prior.copy_from_slice(row);
        }

        out
    }
}

/// Sum of residuals read as signed bytes, the usual minimum-sum heuristic.
fn residual_score(residuals: &[u8]) -> u64 {
    residuals.iter().map(|&b| (b as i8).unsigned_abs() as u64).sum()
}

fn validate_target(image: &ImageBuffer, header: &ImageHeader) -> PngResult<()> {
    if header.bit_depth != 8 || header.color_type != ColorType::RGBA {
        return Err(PngError::InvalidHeader(format!(
            "can only encode 8-bit RGBA, got {:?} at {} bits",
            header.color_type, header.bit_depth
        )));
    }

    if header.interlace != Interlace::None {
        return Err(PngError::InvalidHeader("can only encode non-interlaced images".to_string()));
    }

    if header.width != image.width() || header.height != image.height() {
        return Err(PngError::InvalidHeader(format!(
            "header is {}x{} but the image is {}x{}",
            header.width,
            header.height,
            image.width(),
            image.height()
        )));
    }

    if header.width == 0 || header.height == 0 || header.width > MAX_DIMENSION || header.height > MAX_DIMENSION {
        return Err(PngError::InvalidHeader(format!(
            "dimension {}x{} out of range",
            header.width, header.height
        )));
    }

    Ok(())
}
