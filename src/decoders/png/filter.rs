use crate::utils::error::{PngError, PngResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    None = 0,
    Sub = 1,
    Up = 2,
    Average = 3,
    Paeth = 4,
}

impl FilterType {
    pub const ALL: [FilterType; 5] = [
        FilterType::None,
        FilterType::Sub,
        FilterType::Up,
        FilterType::Average,
        FilterType::Paeth,
    ];

    pub fn from_u8(value: u8) -> PngResult<FilterType> {
        match value {
            0 => Ok(FilterType::None),
            1 => Ok(FilterType::Sub),
            2 => Ok(FilterType::Up),
            3 => Ok(FilterType::Average),
            4 => Ok(FilterType::Paeth),
            _ => Err(PngError::InvalidFilterType(value)),
        }
    }
}

/// a = left, b = above, c = upper left. Ties go to a, then b, then c.
pub fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
    let a16 = a as i16;
    let b16 = b as i16;
    let c16 = c as i16;

    let p = a16 + b16 - c16;  // Initial estimate
    let pa = (p - a16).abs(); // Distance to a
    let pb = (p - b16).abs(); // Distance to b
    let pc = (p - c16).abs(); // Distance to c

    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Reverses `filter` on `row` in place. `prior` is the reconstructed previous
/// row (all zeros for the first row of a pass) and must be as long as `row`.
pub fn unfilter_row(filter: FilterType, row: &mut [u8], prior: &[u8], bytes_per_pixel: usize) {
    debug_assert_eq!(row.len(), prior.len());
    let bpp = bytes_per_pixel.min(row.len());

    match filter {
        FilterType::None => {}
        FilterType::Sub => {
            for i in bpp..row.len() {
                row[i] = row[i].wrapping_add(row[i - bpp]);
            }
        }
        FilterType::Up => {
            for (current, &above) in row.iter_mut().zip(prior) {
                *current = current.wrapping_add(above);
            }
        }
        FilterType::Average => {
            for i in 0..bpp {
                row[i] = row[i].wrapping_add(prior[i] >> 1);
            }

            for i in bpp..row.len() {
                let left = row[i - bpp] as u16;
                let above = prior[i] as u16;
                row[i] = row[i].wrapping_add(((left + above) >> 1) as u8);
            }
        }
        FilterType::Paeth => {
            // With a = c = 0 the predictor always picks b.
            for i in 0..bpp {
                row[i] = row[i].wrapping_add(prior[i]);
            }

            for i in bpp..row.len() {
                let predicted = paeth_predictor(row[i - bpp], prior[i], prior[i - bpp]);
                row[i] = row[i].wrapping_add(predicted);
            }
        }
    }
}

/// Applies `filter` to `row`, writing the residuals to `out`.
pub fn filter_row(filter: FilterType, row: &[u8], prior: &[u8], bytes_per_pixel: usize, out: &mut [u8]) {
    debug_assert_eq!(row.len(), prior.len());
    debug_assert_eq!(row.len(), out.len());

    for i in 0..row.len() {
        let left = if i >= bytes_per_pixel { row[i - bytes_per_pixel] } else { 0 };
        let upper_left = if i >= bytes_per_pixel { prior[i - bytes_per_pixel] } else { 0 };
        let above = prior[i];

        let predicted = match filter {
            FilterType::None => 0,
            FilterType::Sub => left,
            FilterType::Up => above,
            FilterType::Average => ((left as u16 + above as u16) >> 1) as u8,
            FilterType::Paeth => paeth_predictor(left, above, upper_left),
        };

        out[i] = row[i].wrapping_sub(predicted);
    }
}

/// Previous and current reconstructed rows for one pass.
pub struct ScanlineBuffer {
    previous: Vec<u8>,
    current: Vec<u8>,
    bytes_per_pixel: usize,
}

impl ScanlineBuffer {
    pub fn new(row_bytes: usize, bytes_per_pixel: usize) -> Self {
        Self {
            previous: vec![0; row_bytes],
            current: vec![0; row_bytes],
            bytes_per_pixel,
        }
    }

    /// Starts a new pass: resizes both rows and zeroes the previous row.
    pub fn reset(&mut self, row_bytes: usize) {
        self.previous.clear();
        self.previous.resize(row_bytes, 0);
        self.current.clear();
        self.current.resize(row_bytes, 0);
    }

    pub fn row_bytes(&self) -> usize {
        self.current.len()
    }

    /// Defilters one scanline (`filter byte + row_bytes` bytes) and returns the
    /// reconstructed row.
    pub fn next_row(&mut self, scanline: &[u8]) -> PngResult<&[u8]> {
        let row_bytes = self.current.len();

        let (&filter, data) = scanline
            .split_first()
            .ok_or_else(|| PngError::DecompressionError("missing scanline".to_string()))?;

        if data.len() != row_bytes {
            return Err(PngError::DecompressionError(format!(
                "scanline has {} bytes, expected {}",
                data.len(),
                row_bytes
            )));
        }

        let filter = FilterType::from_u8(filter)?;

        std::mem::swap(&mut self.previous, &mut self.current);
        self.current.copy_from_slice(data);
        unfilter_row(filter, &mut self.current, &self.previous, self.bytes_per_pixel);

        Ok(&self.current)
    }
}
