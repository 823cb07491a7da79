use flate2::{Decompress, FlushDecompress, Status};
use log::{debug, warn};
use crate::utils::error::{PngError, PngResult};

const OUTPUT_STEP: usize = 256 * 1024;

/// Streaming zlib inflater for concatenated IDAT payloads.
///
/// Output is capped at `expected` bytes, the exact size of the filtered
/// scanline stream the header describes. Anything past that is discarded.
pub struct InflateAdapter {
    inflater: Decompress,
    output: Vec<u8>,
    expected: usize,
    stream_end: bool,
    overflow: bool,
}

impl InflateAdapter {
    pub fn new(expected: usize) -> Self {
        Self {
            inflater: Decompress::new(true),
            output: Vec::new(),
            expected,
            stream_end: false,
            overflow: false,
        }
    }

    /// Inflates `input`, buffering whatever it produces.
    pub fn feed(&mut self, mut input: &[u8]) -> PngResult<()> {
        // Set while the inflater may still hold output that did not fit.
        let mut pending = false;

        while (!input.is_empty() || pending) && !self.stream_end {
            if self.output.len() >= self.expected {
                if input.is_empty() {
                    break;
                }

                input = self.drain_excess(input)?;
                continue;
            }

            if self.output.len() == self.output.capacity() {
                let step = (self.expected - self.output.len()).min(OUTPUT_STEP);
                self.output.reserve_exact(step);
            }

            let before_in = self.inflater.total_in();
            let before_out = self.inflater.total_out();

            let status = self
                .inflater
                .decompress_vec(input, &mut self.output, FlushDecompress::None)
                .map_err(|e| PngError::DecompressionError(e.to_string()))?;

            let consumed = (self.inflater.total_in() - before_in) as usize;
            let produced = (self.inflater.total_out() - before_out) as usize;
            input = &input[consumed..];
            pending = produced > 0 && self.output.len() == self.output.capacity();

            if self.output.len() > self.expected {
                self.output.truncate(self.expected);
                self.note_overflow();
            }

            match status {
                Status::StreamEnd => self.stream_end = true,
                _ if consumed == 0 && produced == 0 => {
                    if input.is_empty() {
                        break;
                    }

                    return Err(PngError::DecompressionError("inflate made no progress".to_string()));
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Runs the decompressor past the cap so that malformed trailing data is
    /// still reported, but throws the output away.
    fn drain_excess<'a>(&mut self, input: &'a [u8]) -> PngResult<&'a [u8]> {
        let mut scratch = [0u8; 1024];
        let before_in = self.inflater.total_in();
        let before_out = self.inflater.total_out();

        let status = self
            .inflater
            .decompress(input, &mut scratch, FlushDecompress::None)
            .map_err(|e| PngError::DecompressionError(e.to_string()))?;

        let consumed = (self.inflater.total_in() - before_in) as usize;
        let produced = (self.inflater.total_out() - before_out) as usize;

        if produced > 0 {
            self.note_overflow();
        }

        match status {
            Status::StreamEnd => self.stream_end = true,
            _ if consumed == 0 && produced == 0 => {
                return Err(PngError::DecompressionError("inflate made no progress".to_string()));
            }
            _ => {}
        }

        Ok(&input[consumed..])
    }

    fn note_overflow(&mut self) {
        if !self.overflow {
            warn!("Too much image data, ignoring bytes past {}", self.expected);
            self.overflow = true;
        }
    }

    pub fn inflated_len(&self) -> usize {
        self.output.len()
    }

    /// Returns the filtered scanline stream, which is exactly `expected` bytes long.
    pub fn finish(self) -> PngResult<Vec<u8>> {
        if self.output.len() < self.expected {
            return Err(PngError::DecompressionError(format!(
                "image data ended after {} of {} bytes",
                self.output.len(),
                self.expected
            )));
        }

        if !self.stream_end {
            debug!("zlib stream not terminated after {} bytes", self.inflater.total_in());
        }

        Ok(self.output)
    }
}
