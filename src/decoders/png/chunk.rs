use std::io::{Read, Seek};
use log::{debug, warn};
use crate::utils::bytereader::ByteReader;
use crate::utils::crc::chunk_crc;
use crate::utils::error::{PngError, PngResult};
use crate::utils::options::CrcPolicy;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Largest chunk length PNG allows (2^31 - 1).
pub const MAX_CHUNK_LENGTH: u32 = 0x7fff_ffff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PngChunk {
    // Critical chunks
    IHDR,  // Image header
    PLTE,  // Palette
    IDAT,  // Image data
    IEND,  // End of image

    // Ancillary chunks
    TRNS,  // Transparency
    GAMA,  // Gamma
    CHRM,  // Chromaticity
    SRGB,  // Standard RGB
    PHYS,  // Physical dimensions
    OFFS,  // Image offset
    TIME,  // Last modification time
    BKGD,  // Background color
    SBIT,  // Significant bits
    TEXT,  // Text
    ZTXT,  // Compressed text
}

impl PngChunk {
    pub fn from_tag(tag: &[u8; 4]) -> Option<PngChunk> {
        match tag {
            b"IHDR" => Some(PngChunk::IHDR),
            b"PLTE" => Some(PngChunk::PLTE),
            b"IDAT" => Some(PngChunk::IDAT),
            b"IEND" => Some(PngChunk::IEND),
            b"tRNS" => Some(PngChunk::TRNS),
            b"gAMA" => Some(PngChunk::GAMA),
            b"cHRM" => Some(PngChunk::CHRM),
            b"sRGB" => Some(PngChunk::SRGB),
            b"pHYs" => Some(PngChunk::PHYS),
            b"oFFs" => Some(PngChunk::OFFS),
            b"tIME" => Some(PngChunk::TIME),
            b"bKGD" => Some(PngChunk::BKGD),
            b"sBIT" => Some(PngChunk::SBIT),
            b"tEXt" => Some(PngChunk::TEXT),
            b"zTXt" => Some(PngChunk::ZTXT),
            _ => None,
        }
    }
}

/// Critical chunks have bit 5 of the first tag byte clear (uppercase letter).
pub fn is_critical(tag: &[u8; 4]) -> bool {
    tag[0] & 0x20 == 0
}

fn is_valid_tag(tag: &[u8; 4]) -> bool {
    tag.iter().all(|b| b.is_ascii_alphabetic())
}

#[derive(Debug, Clone)]
pub struct Chunk {
    pub kind: PngChunk,
    pub tag: [u8; 4],
    pub data: Vec<u8>,
}

/// Lazily walks the chunk stream after checking the signature.
///
/// Yields every chunk the decoder understands, skips unknown ancillary chunks,
/// and stops after `IEND`. After the first error the iterator is exhausted.
pub struct ChunkReader<R: Read + Seek> {
    reader: ByteReader<R>,
    crc_policy: CrcPolicy,
    first_tag: Option<[u8; 4]>,
    finished: bool,
}

impl<R: Read + Seek> ChunkReader<R> {
    pub fn new(reader: R, crc_policy: CrcPolicy) -> PngResult<Self> {
        let mut reader = ByteReader::new(reader)?;

        let available = reader.bytes_left();
        if available < PNG_SIGNATURE.len() as u64 {
            return Err(PngError::TruncatedInput {
                needed: PNG_SIGNATURE.len() as u64,
                available,
            });
        }

        let signature = reader.read_array::<8>()?;
        if signature != PNG_SIGNATURE {
            return Err(PngError::InvalidSignature(signature));
        }

        Ok(ChunkReader {
            reader,
            crc_policy,
            first_tag: None,
            finished: false,
        })
    }

    /// Tag of the first chunk in the stream, including one that was skipped.
    pub fn first_tag(&self) -> Option<[u8; 4]> {
        self.first_tag
    }

    fn next_chunk(&mut self) -> PngResult<Option<Chunk>> {
        loop {
            if self.finished {
                return Ok(None);
            }

            let offset = self.reader.position();
            let length = self.reader.read_u32()?;
            let tag = self.reader.read_array::<4>()?;
            self.first_tag.get_or_insert(tag);

            if !is_valid_tag(&tag) {
                return Err(PngError::malformed(&tag, format!("invalid chunk type at offset {}", offset)));
            }

            let available = self.reader.bytes_left();
            if length as u64 + 4 > available {
                return Err(PngError::TruncatedInput {
                    needed: length as u64 + 4,
                    available,
                });
            }

            if length > MAX_CHUNK_LENGTH {
                return Err(PngError::malformed(&tag, format!("length {} exceeds 2^31-1", length)));
            }

            let data = self.reader.read_bytes(length as usize)?;
            let expected = self.reader.read_u32()?;
            let calculated = chunk_crc(&tag, &data);

            debug!(
                "Chunk {} at offset {}, {} bytes",
                String::from_utf8_lossy(&tag),
                offset,
                length
            );

            if calculated != expected && !self.accept_crc_mismatch(&tag, expected, calculated)? {
                continue;
            }

            match PngChunk::from_tag(&tag) {
                Some(kind) => {
                    if kind == PngChunk::IEND {
                        self.finished = true;

                        if self.reader.bytes_left() > 0 {
                            debug!("Ignoring {} bytes after IEND", self.reader.bytes_left());
                        }
                    }

                    return Ok(Some(Chunk { kind, tag, data }));
                }
                None if is_critical(&tag) => return Err(PngError::UnsupportedChunk(tag)),
                None => {
                    debug!("Skipping unknown ancillary chunk {}", String::from_utf8_lossy(&tag));
                }
            }
        }
    }

    /// Applies the CRC policy. `Ok(true)` keeps the chunk, `Ok(false)` drops it.
    fn accept_crc_mismatch(&self, tag: &[u8; 4], expected: u32, calculated: u32) -> PngResult<bool> {
        let fatal = match self.crc_policy {
            CrcPolicy::Strict => true,
            CrcPolicy::DiscardAncillary => is_critical(tag),
            CrcPolicy::Warn => false,
        };

        if fatal {
            return Err(PngError::CrcMismatch {
                chunk: *tag,
                expected,
                calculated,
            });
        }

        warn!(
            "CRC mismatch for chunk {}: expected 0x{:08x}, calculated 0x{:08x}",
            String::from_utf8_lossy(tag),
            expected,
            calculated
        );

        Ok(self.crc_policy == CrcPolicy::Warn)
    }
}

impl<R: Read + Seek> Iterator for ChunkReader<R> {
    type Item = PngResult<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Appends a complete chunk (length, tag, data, CRC) to `out`.
pub fn write_chunk(out: &mut Vec<u8>, tag: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(tag);
    out.extend_from_slice(data);
    out.extend_from_slice(&chunk_crc(tag, data).to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn stream(chunks: &[(&[u8; 4], &[u8])]) -> Vec<u8> {
        let mut out = PNG_SIGNATURE.to_vec();
        for (tag, data) in chunks {
            write_chunk(&mut out, tag, data);
        }
        out
    }

    fn collect(bytes: Vec<u8>, policy: CrcPolicy) -> PngResult<Vec<Chunk>> {
        ChunkReader::new(Cursor::new(bytes), policy)?.collect()
    }

    #[test]
    fn short_input_is_truncated() {
        let result = ChunkReader::new(Cursor::new(vec![0x89, b'P', b'N', b'G']), CrcPolicy::Strict);
        assert!(matches!(result, Err(PngError::TruncatedInput { needed: 8, available: 4 })));
    }

    #[test]
    fn wrong_signature_is_rejected() {
        let result = ChunkReader::new(Cursor::new(b"GIF89a\0\0\0\0".to_vec()), CrcPolicy::Strict);
        assert!(matches!(result, Err(PngError::InvalidSignature(_))));
    }

    #[test]
    fn stops_after_iend() {
        let mut bytes = stream(&[(b"IHDR", &[0; 13]), (b"IEND", &[])]);
        bytes.extend_from_slice(b"trailing garbage");

        let chunks = collect(bytes, CrcPolicy::Strict).unwrap();
        let kinds: Vec<_> = chunks.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![PngChunk::IHDR, PngChunk::IEND]);
    }

    #[test]
    fn missing_iend_is_truncated() {
        let bytes = stream(&[(b"IHDR", &[0; 13])]);
        let result = collect(bytes, CrcPolicy::Strict);
        assert!(matches!(result, Err(PngError::TruncatedInput { .. })));
    }

    #[test]
    fn oversized_length_is_truncated() {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(&1000u32.to_be_bytes());
        bytes.extend_from_slice(b"IDAT");
        bytes.extend_from_slice(&[0; 16]);

        let result = collect(bytes, CrcPolicy::Strict);
        assert!(matches!(result, Err(PngError::TruncatedInput { needed: 1004, available: 16 })));
    }

    #[test]
    fn huge_length_is_truncated() {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(&u32::MAX.to_be_bytes());
        bytes.extend_from_slice(b"IDAT");
        bytes.extend_from_slice(&[0; 8]);

        let result = collect(bytes, CrcPolicy::Strict);
        assert!(matches!(result, Err(PngError::TruncatedInput { needed: 0x1_0000_0003, available: 8 })));
    }

    #[test]
    fn unknown_chunks() {
        let bytes = stream(&[(b"vpAg", &[1, 2, 3]), (b"IEND", &[])]);
        let mut reader = ChunkReader::new(Cursor::new(bytes), CrcPolicy::Strict).unwrap();
        assert_eq!(reader.first_tag(), None);
        assert_eq!(reader.next().unwrap().unwrap().kind, PngChunk::IEND);
        assert_eq!(reader.first_tag(), Some(*b"vpAg"));
        assert!(reader.next().is_none());

        let bytes = stream(&[(b"CgBI", &[1, 2, 3]), (b"IEND", &[])]);
        let result = collect(bytes, CrcPolicy::Strict);
        assert!(matches!(result, Err(PngError::UnsupportedChunk(tag)) if &tag == b"CgBI"));
    }

    #[test]
    fn crc_policies() {
        let mut bytes = stream(&[(b"gAMA", &[0, 0, 0xb1, 0x8f]), (b"IEND", &[])]);
        // Last byte of the gAMA CRC.
        bytes[8 + 4 + 4 + 4 + 3] ^= 0x01;

        let result = collect(bytes.clone(), CrcPolicy::Strict);
        assert!(matches!(result, Err(PngError::CrcMismatch { chunk, .. }) if &chunk == b"gAMA"));

        let chunks = collect(bytes.clone(), CrcPolicy::DiscardAncillary).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, PngChunk::IEND);

        let chunks = collect(bytes, CrcPolicy::Warn).unwrap();
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn critical_crc_mismatch_is_fatal_by_default() {
        let mut bytes = stream(&[(b"IHDR", &[0; 13]), (b"IEND", &[])]);
        bytes[8 + 4 + 4 + 13] ^= 0x80;

        let result = collect(bytes, CrcPolicy::default());
        assert!(matches!(result, Err(PngError::CrcMismatch { chunk, .. }) if &chunk == b"IHDR"));
    }
}
