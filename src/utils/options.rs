use crate::decoders::png::filter::FilterType;

/// Default bound on `width * height`.
pub const DEFAULT_MAX_PIXELS: u64 = 100_000_000;

/// libpng's default IDAT size when writing.
pub const DEFAULT_IDAT_CHUNK_SIZE: usize = 8192;

/// Cap on the inflated size of a single zTXt chunk.
pub const DEFAULT_MAX_TEXT_BYTES: usize = 1 << 20;

/// What to do when a chunk's stored CRC disagrees with its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrcPolicy {
    /// Every mismatch is fatal.
    Strict,
    /// Critical chunks are fatal, ancillary chunks are dropped with a warning.
    #[default]
    DiscardAncillary,
    /// Log a warning and use the chunk anyway.
    Warn,
}

/// How 16-bit samples are reduced to 8 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strip16 {
    /// Keep the high byte.
    #[default]
    Truncate,
    /// Rescale exactly: `round(v * 255 / 65535)`.
    Scale,
}

#[derive(Debug, Clone)]
pub struct DecodeOptions {
    pub max_pixels: u64,
    pub crc_policy: CrcPolicy,
    pub strip_16: Strip16,
    pub max_text_bytes: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_pixels: DEFAULT_MAX_PIXELS,
            crc_policy: CrcPolicy::default(),
            strip_16: Strip16::default(),
            max_text_bytes: DEFAULT_MAX_TEXT_BYTES,
        }
    }
}

impl DecodeOptions {
    pub fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    pub fn with_crc_policy(mut self, crc_policy: CrcPolicy) -> Self {
        self.crc_policy = crc_policy;
        self
    }

    pub fn with_strip_16(mut self, strip_16: Strip16) -> Self {
        self.strip_16 = strip_16;
        self
    }

    pub fn with_max_text_bytes(mut self, max_text_bytes: usize) -> Self {
        self.max_text_bytes = max_text_bytes;
        self
    }
}

/// Per-row filter selection used when encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterStrategy {
    None,
    Fixed(FilterType),
    /// Try all five filters and keep the one with the smallest sum of absolute
    /// (signed) residuals.
    #[default]
    Adaptive,
}

#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// zlib level, 0-9.
    pub compression: u32,
    pub filter: FilterStrategy,
    pub idat_chunk_size: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            compression: 6,
            filter: FilterStrategy::default(),
            idat_chunk_size: DEFAULT_IDAT_CHUNK_SIZE,
        }
    }
}

impl EncodeOptions {
    pub fn with_compression(mut self, level: u32) -> Self {
        self.compression = level.min(9);
        self
    }

    pub fn with_filter(mut self, filter: FilterStrategy) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_idat_chunk_size(mut self, size: usize) -> Self {
        self.idat_chunk_size = size.max(1);
        self
    }
}
