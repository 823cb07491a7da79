use crate::decoders::png::header::{ImageHeader, Interlace};
use crate::utils::image::ImageBuffer;

const ADAM7_COL_START: [u32; 7] = [0, 4, 0, 2, 0, 1, 0];
const ADAM7_ROW_START: [u32; 7] = [0, 0, 4, 0, 2, 0, 1];
const ADAM7_COL_DELTA: [u32; 7] = [8, 8, 4, 4, 2, 2, 1];
const ADAM7_ROW_DELTA: [u32; 7] = [8, 8, 8, 4, 4, 2, 2];

/// Geometry of one reduced image in the filtered stream. A non-interlaced
/// image is a single pass covering every pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassInfo {
    pub x_start: u32,
    pub y_start: u32,
    pub x_step: u32,
    pub y_step: u32,
    pub width: u32,
    pub height: u32,
}

impl PassInfo {
    fn adam7(pass: usize, width: u32, height: u32) -> PassInfo {
        let span = |size: u32, start: u32, delta: u32| {
            if size > start {
                (size - start + delta - 1) / delta
            } else {
                0
            }
        };

        PassInfo {
            x_start: ADAM7_COL_START[pass],
            y_start: ADAM7_ROW_START[pass],
            x_step: ADAM7_COL_DELTA[pass],
            y_step: ADAM7_ROW_DELTA[pass],
            width: span(width, ADAM7_COL_START[pass], ADAM7_COL_DELTA[pass]),
            height: span(height, ADAM7_ROW_START[pass], ADAM7_ROW_DELTA[pass]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Filtered bytes this pass occupies: one filter byte per row plus the
    /// packed row data.
    pub fn filtered_len(&self, header: &ImageHeader) -> u64 {
        if self.is_empty() {
            return 0;
        }

        (header.row_bytes(self.width) as u64 + 1) * self.height as u64
    }

    /// Copies a normalized RGBA8 row of this pass into its image positions.
    pub fn scatter_row(&self, row: u32, rgba: &[u8], image: &mut ImageBuffer) {
        let y = self.y_start + row * self.y_step;
        let Some(target) = image.row_mut(y) else {
            return;
        };

        if self.x_step == 1 {
            target.copy_from_slice(&rgba[..target.len()]);
            return;
        }

        for (i, pixel) in rgba.chunks_exact(ImageBuffer::CHANNELS).enumerate() {
            let x = (self.x_start + i as u32 * self.x_step) as usize * ImageBuffer::CHANNELS;

            if let Some(slot) = target.get_mut(x..x + ImageBuffer::CHANNELS) {
                slot.copy_from_slice(pixel);
            }
        }
    }
}

/// Non-empty passes in stream order.
pub fn passes(header: &ImageHeader) -> Vec<PassInfo> {
    match header.interlace {
        Interlace::None => vec![PassInfo {
            x_start: 0,
            y_start: 0,
            x_step: 1,
            y_step: 1,
            width: header.width,
            height: header.height,
        }],
        Interlace::Adam7 => (0..7)
            .map(|pass| PassInfo::adam7(pass, header.width, header.height))
            .filter(|pass| !pass.is_empty())
            .collect(),
    }
}

/// Exact size of the inflated IDAT stream the header describes.
pub fn filtered_stream_len(header: &ImageHeader) -> u64 {
    passes(header).iter().map(|pass| pass.filtered_len(header)).sum()
}
