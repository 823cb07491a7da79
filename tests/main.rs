#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use image::ImageEncoder;
    use rayon::prelude::*;
    use pngharness::chunk::{write_chunk, PNG_SIGNATURE};
    use pngharness::header::{ColorType, ImageHeader, Interlace};
    use pngharness::interlace::passes;
    use pngharness::*;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn build_png(chunks: &[(&[u8; 4], Vec<u8>)]) -> Vec<u8> {
        let mut out = PNG_SIGNATURE.to_vec();
        for (tag, data) in chunks {
            write_chunk(&mut out, tag, data);
        }
        out
    }

    fn header(width: u32, height: u32, bit_depth: u8, color_type: ColorType, interlace: Interlace) -> ImageHeader {
        ImageHeader {
            width,
            height,
            bit_depth,
            color_type,
            interlace,
        }
    }

    fn pack(samples: &[u16], bit_depth: u8) -> Vec<u8> {
        match bit_depth {
            8 => samples.iter().map(|&s| s as u8).collect(),
            16 => samples.iter().flat_map(|&s| s.to_be_bytes()).collect(),
            _ => {
                let depth = bit_depth as usize;
                let mut out = vec![0u8; (samples.len() * depth + 7) / 8];
                for (i, &s) in samples.iter().enumerate() {
                    let bit = i * depth;
                    out[bit / 8] |= (s as u8) << (8 - depth - bit % 8);
                }
                out
            }
        }
    }

    /// Unfiltered scanline stream for `header`, with sample values from `sample`.
    fn scanlines(header: &ImageHeader, sample: impl Fn(u32, u32, usize) -> u16) -> Vec<u8> {
        let mut out = Vec::new();
        let mask = if header.bit_depth == 16 { 0xffff } else { (1u16 << header.bit_depth) - 1 };

        for pass in passes(header) {
            for row in 0..pass.height {
                let y = pass.y_start + row * pass.y_step;
                let mut samples = Vec::new();

                for col in 0..pass.width {
                    let x = pass.x_start + col * pass.x_step;
                    for c in 0..header.channels() {
                        samples.push(sample(x, y, c) & mask);
                    }
                }

                out.push(0);
                out.extend(pack(&samples, header.bit_depth));
            }
        }

        out
    }

    #[test]
    pub fn test_truncated_input() -> Result<(), Box<dyn std::error::Error>> {
        let result = decode_png(&[0x89, b'P', b'N', b'G']);

        assert!(matches!(result, Err(PngError::TruncatedInput { needed: 8, available: 4 })));
        assert_eq!(result.unwrap_err().stage(), DecodeStage::ChunkReader);

        Ok(())
    }

    #[test]
    pub fn test_flipped_ihdr_crc() -> Result<(), Box<dyn std::error::Error>> {
        let h = header(1, 1, 8, ColorType::Gray, Interlace::None);
        let mut bytes = build_png(&[
            (b"IHDR", h.to_bytes().to_vec()),
            (b"IDAT", zlib(&[0, 0])),
            (b"IEND", vec![]),
        ]);

        // First byte of the IHDR CRC.
        bytes[8 + 8 + 13] ^= 0xff;

        for policy in [CrcPolicy::Strict, CrcPolicy::DiscardAncillary] {
            let options = DecodeOptions::default().with_crc_policy(policy);
            let result = decode_png_with(&bytes, &options);
            assert!(matches!(result, Err(PngError::CrcMismatch { chunk, .. }) if &chunk == b"IHDR"));
        }

        let options = DecodeOptions::default().with_crc_policy(CrcPolicy::Warn);
        assert!(decode_png_with(&bytes, &options).is_ok());

        Ok(())
    }

    #[test]
    pub fn test_palette_index_out_of_range() -> Result<(), Box<dyn std::error::Error>> {
        let h = header(2, 1, 8, ColorType::Palette, Interlace::None);
        let bytes = build_png(&[
            (b"IHDR", h.to_bytes().to_vec()),
            (b"PLTE", vec![255, 0, 0, 0, 255, 0]),
            (b"IDAT", zlib(&[0, 1, 5])),
            (b"IEND", vec![]),
        ]);

        let result = decode_png(&bytes);
        assert!(matches!(result, Err(PngError::PaletteIndexOutOfRange { index: 5, palette_len: 2 })));

        Ok(())
    }

    #[test]
    pub fn test_rgb_transparency_key() -> Result<(), Box<dyn std::error::Error>> {
        let h = header(2, 1, 8, ColorType::RGB, Interlace::None);
        let bytes = build_png(&[
            (b"IHDR", h.to_bytes().to_vec()),
            (b"tRNS", vec![0, 10, 0, 20, 0, 30]),
            (b"IDAT", zlib(&[0, 10, 20, 30, 10, 20, 31])),
            (b"IEND", vec![]),
        ]);

        let decoded = decode_png(&bytes)?;
        assert_eq!(decoded.image.pixel(0, 0), Some([10, 20, 30, 0]));
        assert_eq!(decoded.image.pixel(1, 0), Some([10, 20, 31, 255]));
        assert_eq!(decoded.info.transparency, Some(ancillary::Transparency::Rgb(10, 20, 30)));

        Ok(())
    }

    #[test]
    pub fn test_round_trip_through_encoder() -> Result<(), Box<dyn std::error::Error>> {
        let h = header(7, 5, 4, ColorType::Palette, Interlace::None);
        let palette: Vec<u8> = (0..16u8).flat_map(|i| [i * 16, 255 - i * 16, i]).collect();
        let data = scanlines(&h, |x, y, _| ((x + y * 3) % 16) as u16);

        let bytes = build_png(&[
            (b"IHDR", h.to_bytes().to_vec()),
            (b"PLTE", palette),
            (b"tRNS", vec![0, 64, 128]),
            (b"IDAT", zlib(&data)),
            (b"IEND", vec![]),
        ]);

        let first = decode_png(&bytes)?;
        assert!(first.image.has_transparency());

        let encoded = encode_png(&first.image)?;
        let second = decode_png(&encoded)?;

        assert_eq!(second.header, ImageHeader::rgba8(7, 5));
        assert_eq!(second.image, first.image);

        Ok(())
    }

    #[test]
    pub fn test_adam7_matches_progressive() -> Result<(), Box<dyn std::error::Error>> {
        let cases = [
            (ColorType::RGB, 8),
            (ColorType::Gray, 2),
            (ColorType::Gray, 1),
            (ColorType::RGBA, 16),
            (ColorType::GrayAlpha, 8),
        ];

        for (color_type, bit_depth) in cases {
            for (width, height) in [(1, 1), (5, 3), (9, 11), (16, 16)] {
                let sample = |x: u32, y: u32, c: usize| (x * 37 + y * 101 + c as u32 * 59) as u16;

                let mut decoded = Vec::new();
                for interlace in [Interlace::None, Interlace::Adam7] {
                    let h = header(width, height, bit_depth, color_type, interlace);
                    let bytes = build_png(&[
                        (b"IHDR", h.to_bytes().to_vec()),
                        (b"IDAT", zlib(&scanlines(&h, sample))),
                        (b"IEND", vec![]),
                    ]);

                    decoded.push(decode_png(&bytes)?.image);
                }

                assert_eq!(decoded[0], decoded[1], "{:?}/{} {}x{}", color_type, bit_depth, width, height);
            }
        }

        Ok(())
    }

    #[test]
    pub fn test_sixteen_bit_scaling() -> Result<(), Box<dyn std::error::Error>> {
        let h = header(1, 1, 16, ColorType::Gray, Interlace::None);
        let bytes = build_png(&[
            (b"IHDR", h.to_bytes().to_vec()),
            (b"IDAT", zlib(&[0, 0x12, 0xff])),
            (b"IEND", vec![]),
        ]);

        let truncated = decode_png(&bytes)?;
        assert_eq!(truncated.image.pixel(0, 0), Some([0x12, 0x12, 0x12, 0xff]));

        // 0x12ff * 255 / 65535 = 18.92
        let options = DecodeOptions::default().with_strip_16(Strip16::Scale);
        let scaled = decode_png_with(&bytes, &options)?;
        assert_eq!(scaled.image.pixel(0, 0), Some([19, 19, 19, 0xff]));

        Ok(())
    }

    #[test]
    pub fn test_unknown_chunks() -> Result<(), Box<dyn std::error::Error>> {
        let h = header(1, 1, 8, ColorType::Gray, Interlace::None);

        let ancillary = build_png(&[
            (b"IHDR", h.to_bytes().to_vec()),
            (b"prVt", vec![1, 2, 3, 4]),
            (b"IDAT", zlib(&[0, 42])),
            (b"IEND", vec![]),
        ]);
        assert_eq!(decode_png(&ancillary)?.image.pixel(0, 0), Some([42, 42, 42, 255]));

        let critical = build_png(&[
            (b"IHDR", h.to_bytes().to_vec()),
            (b"PRVT", vec![1, 2, 3, 4]),
            (b"IDAT", zlib(&[0, 42])),
            (b"IEND", vec![]),
        ]);
        assert!(matches!(decode_png(&critical), Err(PngError::UnsupportedChunk(tag)) if &tag == b"PRVT"));

        Ok(())
    }

    #[test]
    pub fn test_ancillary_metadata() -> Result<(), Box<dyn std::error::Error>> {
        let h = header(1, 1, 8, ColorType::RGB, Interlace::None);

        let mut phys = Vec::new();
        phys.extend_from_slice(&2835u32.to_be_bytes());
        phys.extend_from_slice(&2835u32.to_be_bytes());
        phys.push(1);

        let mut ztxt = b"Comment\0\0".to_vec();
        ztxt.extend(zlib(b"compressed comment"));

        let bytes = build_png(&[
            (b"IHDR", h.to_bytes().to_vec()),
            (b"gAMA", 45455u32.to_be_bytes().to_vec()),
            (b"sRGB", vec![0]),
            (b"pHYs", phys),
            (b"bKGD", vec![0, 1, 0, 2, 0, 3]),
            (b"tIME", vec![0x07, 0xea, 10, 18, 12, 30, 0]),
            (b"tEXt", b"Title\0Harness".to_vec()),
            (b"IDAT", zlib(&[0, 1, 2, 3])),
            (b"zTXt", ztxt),
            (b"IEND", vec![]),
        ]);

        let info = decode_png(&bytes)?.info;

        assert_eq!(info.gamma, Some(0.45455));
        assert_eq!(info.rendering_intent, Some(ancillary::RenderingIntent::Perceptual));
        assert_eq!(info.physical_dimensions.map(|p| p.pixels_per_unit_x), Some(2835));
        assert_eq!(info.background, Some(ancillary::Background::Rgb(1, 2, 3)));
        assert_eq!(info.modification_time.map(|t| t.year), Some(2026));

        let texts: Vec<_> = info.text_chunks.iter().map(|t| (t.keyword(), t.text())).collect();
        assert_eq!(texts, vec![("Title", "Harness"), ("Comment", "compressed comment")]);

        Ok(())
    }

    #[test]
    pub fn test_image_crate_reads_encoder_output() -> Result<(), Box<dyn std::error::Error>> {
        let pixels: Vec<u8> = (0..20 * 10 * 4).map(|i| (i * 7 % 256) as u8).collect();
        let buffer = ImageBuffer::from_rgba8(20, 10, pixels.clone()).ok_or("bad buffer")?;

        let encoded = PngEncoder::new(EncodeOptions::default().with_idat_chunk_size(64))
            .encode(&buffer, &header::ImageHeader::rgba8(20, 10))?;

        let decoded = image::load_from_memory_with_format(&encoded, image::ImageFormat::Png)?.to_rgba8();
        assert_eq!(decoded.dimensions(), (20, 10));
        assert_eq!(decoded.into_raw(), pixels);

        Ok(())
    }

    #[test]
    pub fn test_decodes_image_crate_output() -> Result<(), Box<dyn std::error::Error>> {
        let (width, height) = (17, 9);
        let cases = [
            (image::ExtendedColorType::Rgb8, 3),
            (image::ExtendedColorType::La8, 2),
            (image::ExtendedColorType::L8, 1),
            (image::ExtendedColorType::Rgba8, 4),
        ];

        for (color, channels) in cases {
            let raw: Vec<u8> = (0..width * height * channels).map(|i| (i * 13 % 251) as u8).collect();

            let mut encoded = Vec::new();
            image::codecs::png::PngEncoder::new(&mut encoded).write_image(&raw, width, height, color)?;

            let reference = image::load_from_memory_with_format(&encoded, image::ImageFormat::Png)?.to_rgba8();
            let decoded = decode_png(&encoded)?;

            assert_eq!(decoded.image.pixels(), reference.as_raw().as_slice(), "{:?}", color);
        }

        Ok(())
    }

    #[test]
    pub fn test_benign_chunk_errors_match_image_crate() -> Result<(), Box<dyn std::error::Error>> {
        let gray = header(1, 1, 8, ColorType::Gray, Interlace::None).to_bytes().to_vec();
        let palette = header(1, 1, 8, ColorType::Palette, Interlace::None).to_bytes().to_vec();
        let one_bit = header(1, 1, 1, ColorType::Palette, Interlace::None).to_bytes().to_vec();

        let cases = [
            (
                build_png(&[
                    (b"IHDR", gray.clone()),
                    (b"IDAT", zlib(&[0, 7])),
                    (b"tRNS", vec![0, 7]),
                    (b"IEND", vec![]),
                ]),
                [7, 7, 7, 255],
            ),
            (
                build_png(&[
                    (b"IHDR", palette),
                    (b"PLTE", vec![1, 2, 3]),
                    (b"tRNS", vec![0, 0]),
                    (b"IDAT", zlib(&[0, 0])),
                    (b"IEND", vec![]),
                ]),
                [1, 2, 3, 255],
            ),
            (
                build_png(&[
                    (b"IHDR", gray),
                    (b"PLTE", vec![1, 2, 3]),
                    (b"IDAT", zlib(&[0, 7])),
                    (b"IEND", vec![]),
                ]),
                [7, 7, 7, 255],
            ),
            (
                build_png(&[
                    (b"IHDR", one_bit),
                    (b"PLTE", vec![1, 2, 3, 4, 5, 6, 7, 8, 9]),
                    (b"IDAT", zlib(&[0, 0x80])),
                    (b"IEND", vec![]),
                ]),
                [4, 5, 6, 255],
            ),
        ];

        for (bytes, expected) in cases {
            let reference = image::load_from_memory_with_format(&bytes, image::ImageFormat::Png)?.to_rgba8();
            let decoded = decode_png(&bytes)?;

            assert_eq!(decoded.image.pixels(), reference.as_raw().as_slice());
            assert_eq!(decoded.image.pixel(0, 0), Some(expected));
        }

        Ok(())
    }

    #[test]
    pub fn test_header_must_come_first() -> Result<(), Box<dyn std::error::Error>> {
        let h = header(1, 1, 8, ColorType::Gray, Interlace::None);
        let bytes = build_png(&[
            (b"vpAg", vec![0; 9]),
            (b"IHDR", h.to_bytes().to_vec()),
            (b"IDAT", zlib(&[0, 7])),
            (b"IEND", vec![]),
        ]);

        let result = decode_png(&bytes);
        assert!(matches!(result, Err(PngError::InvalidHeader(_))));
        assert_eq!(result.unwrap_err().stage(), DecodeStage::Header);

        Ok(())
    }

    #[test]
    pub fn test_parallel_decodes_are_independent() -> Result<(), Box<dyn std::error::Error>> {
        let inputs: Vec<Vec<u8>> = (1..=16u32)
            .map(|size| {
                let pixels: Vec<u8> = (0..size * size * 4).map(|i| (i + size) as u8).collect();
                let buffer = ImageBuffer::from_rgba8(size, size, pixels).unwrap();
                encode_png(&buffer).unwrap()
            })
            .collect();

        let sequential: Vec<ImageBuffer> = inputs.iter().map(|b| decode_png(b).unwrap().image).collect();
        let parallel: Vec<ImageBuffer> = inputs.par_iter().map(|b| decode_png(b).unwrap().image).collect();

        assert_eq!(sequential, parallel);

        let mut corrupt = inputs.clone();
        corrupt[3].truncate(20);
        let results: Vec<bool> = corrupt.par_iter().map(|b| decode_png(b).is_ok()).collect();
        assert_eq!(results.iter().filter(|ok| !**ok).count(), 1);
        assert!(!results[3]);

        Ok(())
    }

    #[test]
    pub fn test_open_from_file() -> Result<(), Box<dyn std::error::Error>> {
        let buffer = ImageBuffer::from_rgba8(2, 1, vec![1, 2, 3, 4, 5, 6, 7, 8]).ok_or("bad buffer")?;
        let path = std::env::temp_dir().join(format!("pngharness_open_{}.png", std::process::id()));
        std::fs::write(&path, encode_png(&buffer)?)?;

        let decoded = PngDecoder::open(&path)?.decode();
        std::fs::remove_file(&path)?;

        assert_eq!(decoded?.image, buffer);

        Ok(())
    }

    #[test]
    pub fn test_rejects_oversized_header() -> Result<(), Box<dyn std::error::Error>> {
        let h = header(0x7fff_ffff, 0x7fff_ffff, 8, ColorType::RGBA, Interlace::None);
        let bytes = build_png(&[(b"IHDR", h.to_bytes().to_vec()), (b"IEND", vec![])]);

        let result = PngDecoder::new(Cursor::new(bytes)).decode();
        assert!(matches!(result, Err(PngError::AllocationLimitExceeded { .. })));

        Ok(())
    }
}
