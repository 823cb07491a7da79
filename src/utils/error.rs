use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;

/// Pipeline stage a decode error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    Input,
    ChunkReader,
    Header,
    Inflate,
    Defilter,
    Normalize,
}

impl Display for DecodeStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecodeStage::Input => "input",
            DecodeStage::ChunkReader => "chunk reader",
            DecodeStage::Header => "header",
            DecodeStage::Inflate => "inflate",
            DecodeStage::Defilter => "defilter",
            DecodeStage::Normalize => "normalize",
        };

        write!(f, "{}", name)
    }
}

#[derive(Debug)]
pub enum PngError {
    IoError(io::Error),
    TruncatedInput { needed: u64, available: u64 },
    InvalidSignature([u8; 8]),
    CrcMismatch { chunk: [u8; 4], expected: u32, calculated: u32 },
    InvalidHeader(String),
    UnsupportedChunk([u8; 4]),
    MalformedChunk { chunk: [u8; 4], reason: String },
    MissingChunk(&'static str),
    InvalidFilterType(u8),
    PaletteIndexOutOfRange { index: u8, palette_len: usize },
    DecompressionError(String),
    AllocationLimitExceeded { width: u32, height: u32, max_pixels: u64 },
}

impl PngError {
    /// The stage that produced this error. The orchestrator passes errors through
    /// untouched, so the kind alone identifies where decoding stopped.
    pub fn stage(&self) -> DecodeStage {
        match self {
            PngError::IoError(_) => DecodeStage::Input,
            PngError::TruncatedInput { .. }
            | PngError::InvalidSignature(_)
            | PngError::CrcMismatch { .. }
            | PngError::UnsupportedChunk(_)
            | PngError::MalformedChunk { .. }
            | PngError::MissingChunk(_) => DecodeStage::ChunkReader,
            PngError::InvalidHeader(_) | PngError::AllocationLimitExceeded { .. } => DecodeStage::Header,
            PngError::DecompressionError(_) => DecodeStage::Inflate,
            PngError::InvalidFilterType(_) => DecodeStage::Defilter,
            PngError::PaletteIndexOutOfRange { .. } => DecodeStage::Normalize,
        }
    }

    pub(crate) fn malformed(chunk: &[u8; 4], reason: impl Into<String>) -> Self {
        PngError::MalformedChunk { chunk: *chunk, reason: reason.into() }
    }
}

impl Error for PngError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PngError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for PngError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PngError::IoError(err) => write!(f, "I/O error: {}", err),
            PngError::TruncatedInput { needed, available } => {
                write!(f, "Truncated input: needed {} bytes, {} available", needed, available)
            }
            PngError::InvalidSignature(bytes) => write!(f, "Invalid PNG signature: {:02x?}", bytes),
            PngError::CrcMismatch { chunk, expected, calculated } => write!(
                f,
                "CRC mismatch in {} chunk: expected 0x{:08x}, calculated 0x{:08x}",
                String::from_utf8_lossy(chunk),
                expected,
                calculated
            ),
            PngError::InvalidHeader(reason) => write!(f, "Invalid IHDR: {}", reason),
            PngError::UnsupportedChunk(chunk) => {
                write!(f, "Unsupported critical chunk: {}", String::from_utf8_lossy(chunk))
            }
            PngError::MalformedChunk { chunk, reason } => {
                write!(f, "Malformed {} chunk: {}", String::from_utf8_lossy(chunk), reason)
            }
            PngError::MissingChunk(name) => write!(f, "Missing required {} chunk", name),
            PngError::InvalidFilterType(filter) => write!(f, "Invalid filter type: {}", filter),
            PngError::PaletteIndexOutOfRange { index, palette_len } => {
                write!(f, "Palette index {} out of range (palette has {} entries)", index, palette_len)
            }
            PngError::DecompressionError(msg) => write!(f, "Decompression error: {}", msg),
            PngError::AllocationLimitExceeded { width, height, max_pixels } => write!(
                f,
                "Image {}x{} exceeds the limit of {} pixels",
                width, height, max_pixels
            ),
        }
    }
}

impl From<io::Error> for PngError {
    fn from(error: io::Error) -> Self {
        PngError::IoError(error)
    }
}

// Result type alias for decoder and encoder operations
pub type PngResult<T> = Result<T, PngError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_report_their_stage() {
        assert_eq!(PngError::TruncatedInput { needed: 8, available: 4 }.stage(), DecodeStage::ChunkReader);
        assert_eq!(PngError::InvalidHeader("zero width".to_string()).stage(), DecodeStage::Header);
        assert_eq!(PngError::InvalidFilterType(7).stage(), DecodeStage::Defilter);
        assert_eq!(
            PngError::PaletteIndexOutOfRange { index: 9, palette_len: 2 }.stage(),
            DecodeStage::Normalize
        );
        assert_eq!(PngError::from(io::Error::from(io::ErrorKind::NotFound)).stage(), DecodeStage::Input);
    }

    #[test]
    fn messages_name_the_chunk() {
        let error = PngError::malformed(b"PLTE", "duplicate PLTE");
        assert_eq!(error.to_string(), "Malformed PLTE chunk: duplicate PLTE");

        let error = PngError::CrcMismatch { chunk: *b"IHDR", expected: 1, calculated: 2 };
        assert_eq!(
            error.to_string(),
            "CRC mismatch in IHDR chunk: expected 0x00000001, calculated 0x00000002"
        );
    }
}
