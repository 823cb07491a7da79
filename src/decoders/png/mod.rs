pub mod ancillary;
pub mod chunk;
pub mod filter;
pub mod header;
pub mod inflate;
pub mod interlace;
pub mod normalize;

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use log::{debug, warn};
use crate::decoders::png::ancillary::*;
use crate::decoders::png::chunk::{Chunk, ChunkReader, PngChunk};
use crate::decoders::png::filter::ScanlineBuffer;
use crate::decoders::png::header::{ColorType, ImageHeader};
use crate::decoders::png::inflate::InflateAdapter;
use crate::decoders::png::interlace::{filtered_stream_len, passes};
use crate::decoders::png::normalize::Normalizer;
use crate::utils::error::{PngError, PngResult};
use crate::utils::image::ImageBuffer;
use crate::utils::info::PngInfo;
use crate::utils::options::DecodeOptions;

/// A fully decoded PNG.
#[derive(Debug, Clone)]
pub struct DecodedPng {
    pub header: ImageHeader,
    pub info: PngInfo,
    pub image: ImageBuffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdatState {
    Before,
    Inside,
    After,
}

/// One decode of one PNG stream. All decoder state lives here, so separate
/// sessions can run on separate threads.
pub struct PngDecoder<R: Read + Seek> {
    reader: R,
    options: DecodeOptions,
}

impl PngDecoder<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> PngResult<Self> {
        let file = File::open(path)?;
        Ok(PngDecoder::new(BufReader::new(file)))
    }
}

impl<R: Read + Seek> PngDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, DecodeOptions::default())
    }

    pub fn with_options(reader: R, options: DecodeOptions) -> Self {
        Self { reader, options }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decodes the whole stream into RGBA8. Nothing is returned on failure.
    pub fn decode(self) -> PngResult<DecodedPng> {
        let options = self.options;
        let mut chunks = ChunkReader::new(self.reader, options.crc_policy)?;

        let first = chunks.next().transpose()?;
        let header = match (chunks.first_tag(), first) {
            (Some(tag), Some(chunk)) if &tag == b"IHDR" => ImageHeader::parse(&chunk.data, options.max_pixels)?,
            (Some(tag), _) => {
                return Err(PngError::InvalidHeader(format!(
                    "stream starts with {} instead of IHDR",
                    String::from_utf8_lossy(&tag)
                )))
            }
            (None, _) => return Err(PngError::MissingChunk("IHDR")),
        };

        debug!(
            "IHDR: {}x{}, {:?} at {} bits, {:?}",
            header.width, header.height, header.color_type, header.bit_depth, header.interlace
        );

        let expected = usize::try_from(filtered_stream_len(&header)).map_err(|_| PngError::AllocationLimitExceeded {
            width: header.width,
            height: header.height,
            max_pixels: options.max_pixels,
        })?;

        let mut info = PngInfo::default();
        let mut inflater: Option<InflateAdapter> = None;
        let mut state = IdatState::Before;

        for chunk in chunks {
            let chunk = chunk?;

            if state == IdatState::Inside && chunk.kind != PngChunk::IDAT {
                state = IdatState::After;
            }

            match chunk.kind {
                PngChunk::IHDR => return Err(PngError::InvalidHeader("duplicate IHDR".to_string())),
                PngChunk::PLTE => read_palette(&chunk, &header, state, &mut info)?,
                PngChunk::IDAT => {
                    if state == IdatState::After {
                        return Err(PngError::malformed(&chunk.tag, "IDAT chunks are not consecutive"));
                    }

                    if header.color_type == ColorType::Palette && info.palette.is_none() {
                        return Err(PngError::MissingChunk("PLTE"));
                    }

                    state = IdatState::Inside;
                    info.idat_chunks += 1;
                    info.compressed_bytes += chunk.data.len() as u64;

                    inflater
                        .get_or_insert_with(|| InflateAdapter::new(expected))
                        .feed(&chunk.data)?;
                }
                PngChunk::IEND => break,
                _ => read_ancillary(&chunk, &header, state, &options, &mut info),
            }
        }

        let inflater = inflater.ok_or(PngError::MissingChunk("IDAT"))?;
        debug!("Inflated {} bytes from {} IDAT chunks", inflater.inflated_len(), info.idat_chunks);
        let data = inflater.finish()?;

        let image = reconstruct(&header, &info, &options, &data)?;

        Ok(DecodedPng { header, info, image })
    }
}

/// Defilters and normalizes every pass of the filtered stream into a new
/// RGBA8 buffer.
fn reconstruct(header: &ImageHeader, info: &PngInfo, options: &DecodeOptions, data: &[u8]) -> PngResult<ImageBuffer> {
    let mut normalizer = Normalizer::new(
        *header,
        info.palette.as_deref(),
        info.transparency.as_ref(),
        options.strip_16,
    )?;

    let mut image = ImageBuffer::new(header.width, header.height);
    let mut scanlines = ScanlineBuffer::new(0, header.bytes_per_pixel());
    let mut rgba = Vec::new();
    let mut offset = 0;

    for pass in passes(header) {
        let row_bytes = header.row_bytes(pass.width);
        let stride = row_bytes + 1;

        scanlines.reset(row_bytes);
        rgba.resize(pass.width as usize * ImageBuffer::CHANNELS, 0);

        for row in 0..pass.height {
            let scanline = data
                .get(offset..offset + stride)
                .ok_or_else(|| PngError::DecompressionError(format!("image data ends at byte {}", offset)))?;
            offset += stride;

            let raw = scanlines.next_row(scanline)?;
            normalizer.normalize_row(raw, pass.width, &mut rgba)?;
            pass.scatter_row(row, &rgba, &mut image);
        }
    }

    Ok(image)
}

fn read_palette(chunk: &Chunk, header: &ImageHeader, state: IdatState, info: &mut PngInfo) -> PngResult<()> {
    if state != IdatState::Before {
        return Err(PngError::malformed(&chunk.tag, "PLTE after IDAT"));
    }

    if info.palette.is_some() {
        return Err(PngError::malformed(&chunk.tag, "duplicate PLTE"));
    }

    if header.color_type.is_gray() {
        warn!("Ignoring PLTE chunk in a grayscale image");
        return Ok(());
    }

    match parse_palette(&chunk.data, header) {
        Ok(palette) => {
            debug!("PLTE: {} entries", palette.len());
            info.palette = Some(palette);
        }
        Err(reason) if header.color_type != ColorType::Palette => warn!("Ignoring PLTE chunk: {}", reason),
        Err(reason) => return Err(PngError::malformed(&chunk.tag, reason)),
    }

    Ok(())
}

/// Stores a parsed ancillary value, keeping the first of any duplicates.
fn keep_first<T>(slot: &mut Option<T>, value: Option<T>, name: &str) {
    match value {
        None => warn!("Dropping malformed {} chunk", name),
        Some(_) if slot.is_some() => warn!("Ignoring duplicate {} chunk", name),
        value => *slot = value,
    }
}

/// Ancillary chunks never fail the decode: anything out of place or
/// malformed is logged and dropped.
fn read_ancillary(chunk: &Chunk, header: &ImageHeader, state: IdatState, options: &DecodeOptions, info: &mut PngInfo) {
    let name = String::from_utf8_lossy(&chunk.tag);
    let data = chunk.data.as_slice();
    let palette_len = info.palette.as_ref().map_or(0, |p| p.len());

    let before_idat_only = !matches!(chunk.kind, PngChunk::TIME | PngChunk::TEXT | PngChunk::ZTXT);
    if before_idat_only && state != IdatState::Before {
        warn!("Ignoring {} chunk after IDAT", name);
        return;
    }

    match chunk.kind {
        PngChunk::TRNS => {
            if header.color_type.has_alpha() {
                warn!("Ignoring tRNS chunk in an image with an alpha channel");
                return;
            }

            if header.color_type == ColorType::Palette && info.palette.is_none() {
                warn!("Ignoring tRNS chunk before PLTE");
                return;
            }

            keep_first(&mut info.transparency, parse_transparency(data, header, palette_len), &name);
        }
        PngChunk::BKGD => {
            if header.color_type == ColorType::Palette && info.palette.is_none() {
                warn!("Ignoring bKGD chunk before PLTE");
                return;
            }

            keep_first(&mut info.background, parse_background(data, header, palette_len), &name);
        }
        PngChunk::GAMA => keep_first(&mut info.gamma, parse_gamma(data), &name),
        PngChunk::CHRM => keep_first(&mut info.chromaticities, parse_chromaticities(data), &name),
        PngChunk::SRGB => keep_first(&mut info.rendering_intent, parse_rendering_intent(data), &name),
        PngChunk::PHYS => keep_first(&mut info.physical_dimensions, parse_physical_dimensions(data), &name),
        PngChunk::OFFS => keep_first(&mut info.offset, parse_offset(data), &name),
        PngChunk::SBIT => keep_first(&mut info.significant_bits, parse_significant_bits(data, header), &name),
        PngChunk::TIME => keep_first(&mut info.modification_time, parse_time(data), &name),
        PngChunk::TEXT => match parse_text(data) {
            Some(text) => info.text_chunks.push(text),
            None => warn!("Dropping malformed tEXt chunk"),
        },
        PngChunk::ZTXT => match parse_compressed_text(data, options.max_text_bytes) {
            Some(text) => info.text_chunks.push(text),
            None => warn!("Dropping malformed zTXt chunk"),
        },
        PngChunk::IHDR | PngChunk::PLTE | PngChunk::IDAT | PngChunk::IEND => {}
    }
}
