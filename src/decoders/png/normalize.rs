use crate::decoders::png::ancillary::Transparency;
use crate::decoders::png::header::{ColorType, ImageHeader};
use crate::utils::error::{PngError, PngResult};
use crate::utils::options::Strip16;

/// One step of the RGBA8 conversion. A plan always lists its steps in this
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Split packed samples into one value per sample at the native depth.
    Unpack,
    /// Scale 1/2/4/16-bit samples to 8 bits.
    ExpandDepth(Strip16),
    /// Replace palette indices with RGB triples.
    PaletteLookup,
    /// Replicate gray into R, G and B.
    GrayToRgb,
    /// Add the alpha channel from tRNS or as opaque fill.
    SynthesizeAlpha,
}

/// Builds the transform sequence for a header.
pub fn plan_for(header: &ImageHeader, strip_16: Strip16) -> Vec<Transform> {
    let mut plan = vec![Transform::Unpack];

    if header.color_type == ColorType::Palette {
        plan.push(Transform::PaletteLookup);
    } else {
        plan.push(Transform::ExpandDepth(strip_16));
    }

    if header.color_type.is_gray() {
        plan.push(Transform::GrayToRgb);
    }

    if !header.color_type.has_alpha() {
        plan.push(Transform::SynthesizeAlpha);
    }

    plan
}

fn expand_sample(value: u16, bit_depth: u8, strip_16: Strip16) -> u8 {
    match bit_depth {
        1 => (value * 0xff) as u8,
        2 => (value * 0x55) as u8,
        4 => (value * 0x11) as u8,
        16 => match strip_16 {
            Strip16::Truncate => (value >> 8) as u8,
            Strip16::Scale => ((value as u32 * 255 + 32767) / 65535) as u8,
        },
        _ => value as u8,
    }
}

/// Converts defiltered rows of any PNG pixel layout into RGBA8.
pub struct Normalizer<'a> {
    header: ImageHeader,
    palette: &'a [[u8; 3]],
    transparency: Option<&'a Transparency>,
    plan: Vec<Transform>,
    native: Vec<u16>,
    samples: Vec<u8>,
    scratch: Vec<u8>,
    channels: usize,
}

impl<'a> Normalizer<'a> {
    pub fn new(
        header: ImageHeader,
        palette: Option<&'a [[u8; 3]]>,
        transparency: Option<&'a Transparency>,
        strip_16: Strip16,
    ) -> PngResult<Self> {
        let palette = match (header.color_type, palette) {
            (ColorType::Palette, None) => return Err(PngError::MissingChunk("PLTE")),
            (ColorType::Palette, Some(palette)) => palette,
            _ => &[],
        };

        Ok(Self {
            header,
            palette,
            transparency,
            plan: plan_for(&header, strip_16),
            native: Vec::new(),
            samples: Vec::new(),
            scratch: Vec::new(),
            channels: 0,
        })
    }

    pub fn plan(&self) -> &[Transform] {
        &self.plan
    }

    /// Normalizes one defiltered row of `width` pixels into `out`
    /// (`width * 4` bytes).
    pub fn normalize_row(&mut self, raw: &[u8], width: u32, out: &mut [u8]) -> PngResult<()> {
        let width = width as usize;
        debug_assert_eq!(out.len(), width * 4);

        for index in 0..self.plan.len() {
            let step = self.plan[index];
            match step {
                Transform::Unpack => self.unpack(raw, width),
                Transform::ExpandDepth(strip_16) => self.expand_depth(strip_16),
                Transform::PaletteLookup => self.palette_lookup()?,
                Transform::GrayToRgb => self.gray_to_rgb(),
                Transform::SynthesizeAlpha => self.synthesize_alpha(),
            }
        }

        debug_assert_eq!(self.channels, 4);
        out.copy_from_slice(&self.samples[..width * 4]);

        Ok(())
    }

    fn unpack(&mut self, raw: &[u8], width: usize) {
        let channels = self.header.channels();
        let count = width * channels;
        let bit_depth = self.header.bit_depth as usize;

        self.native.clear();
        self.channels = channels;

        match bit_depth {
            8 => self.native.extend(raw[..count].iter().map(|&b| b as u16)),
            16 => self.native.extend(
                raw[..count * 2]
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]])),
            ),
            _ => {
                let mask = (1u16 << bit_depth) - 1;

                for i in 0..count {
                    let bit = i * bit_depth;
                    let shift = 8 - bit_depth - bit % 8;
                    self.native.push((raw[bit / 8] as u16 >> shift) & mask);
                }
            }
        }
    }

    fn expand_depth(&mut self, strip_16: Strip16) {
        let bit_depth = self.header.bit_depth;

        self.samples.clear();
        self.samples.extend(self.native.iter().map(|&v| expand_sample(v, bit_depth, strip_16)));
    }

    fn palette_lookup(&mut self) -> PngResult<()> {
        self.samples.clear();

        for &index in &self.native {
            let color = self.palette.get(index as usize).ok_or_else(|| PngError::PaletteIndexOutOfRange {
                index: index as u8,
                palette_len: self.palette.len(),
            })?;

            self.samples.extend_from_slice(color);
        }

        self.channels = 3;

        Ok(())
    }

    fn gray_to_rgb(&mut self) {
        self.scratch.clear();

        for pixel in self.samples.chunks_exact(self.channels) {
            self.scratch.extend_from_slice(&[pixel[0], pixel[0], pixel[0]]);
            if let Some(&alpha) = pixel.get(1) {
                self.scratch.push(alpha);
            }
        }

        std::mem::swap(&mut self.samples, &mut self.scratch);
        self.channels += 2;
    }

    /// Alpha comes from the tRNS table or key, compared against native-depth
    /// samples, and is 0xff otherwise.
    fn synthesize_alpha(&mut self) {
        let native_channels = self.header.channels();
        self.scratch.clear();

        for (x, rgb) in self.samples.chunks_exact(3).enumerate() {
            let native = &self.native[x * native_channels..(x + 1) * native_channels];

            let alpha = match self.transparency {
                Some(Transparency::Palette(table)) => table.get(native[0] as usize).copied().unwrap_or(0xff),
                Some(Transparency::Gray(key)) if native[0] == *key => 0,
                Some(Transparency::Rgb(r, g, b)) if *native == [*r, *g, *b] => 0,
                _ => 0xff,
            };

            self.scratch.extend_from_slice(rgb);
            self.scratch.push(alpha);
        }

        std::mem::swap(&mut self.samples, &mut self.scratch);
        self.channels = 4;
    }
}
