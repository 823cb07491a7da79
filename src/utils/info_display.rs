use std::fmt::{Debug, Display, Formatter};
use crate::decoders::png::ancillary::{Background, PngText, SignificantBits, Transparency};
use crate::decoders::png::header::Interlace;
use crate::utils::info::PngSummary;

fn print_matrix<T: Display + Debug>(f: &mut Formatter<'_>, values: &[T], width: usize) -> std::fmt::Result {
    if values.is_empty() {
        writeln!(f, "[]")?;
        return Ok(());
    }

    let str_values: Vec<String> = values
        .iter()
        .map(|x| format!("{}", x))
        .collect();

    let max_width = str_values
        .iter()
        .map(|s| s.len())
        .max()
        .unwrap_or(0);

    for chunk in str_values.chunks(width) {
        for (i, value) in chunk.iter().enumerate() {
            if i == 0 {
                write!(f, "  {:>width$}", value, width = max_width)?;
            } else {
                write!(f, " {:>width$}", value, width = max_width)?;
            }
        }

        writeln!(f)?;
    }

    Ok(())
}

impl Display for PngSummary<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let header = self.header;
        let info = self.info;

        writeln!(f, "Dimensions: {}x{}", header.width, header.height)?;
        writeln!(f, "Color type: {:?}, {} bits per sample", header.color_type, header.bit_depth)?;
        writeln!(
            f,
            "Interlace: {}",
            match header.interlace {
                Interlace::None => "none",
                Interlace::Adam7 => "Adam7",
            }
        )?;
        writeln!(f, "Image data: {} IDAT chunks, {} bytes", info.idat_chunks, info.compressed_bytes)?;

        if let Some(palette) = &info.palette {
            writeln!(f, "Palette: {} entries", palette.len())?;
            let colors: Vec<String> = palette
                .iter()
                .map(|[r, g, b]| format!("#{:02x}{:02x}{:02x}", r, g, b))
                .collect();
            print_matrix(f, &colors, 8)?;
        }

        match &info.transparency {
            Some(Transparency::Palette(alpha)) => {
                writeln!(f, "Transparency: {} palette alpha values", alpha.len())?;
                print_matrix(f, alpha, 16)?;
            }
            Some(Transparency::Gray(key)) => writeln!(f, "Transparency: gray key {}", key)?,
            Some(Transparency::Rgb(r, g, b)) => writeln!(f, "Transparency: RGB key ({}, {}, {})", r, g, b)?,
            None => {}
        }

        if let Some(gamma) = info.gamma {
            writeln!(f, "Gamma: {:.5}", gamma)?;
        }

        if let Some(c) = &info.chromaticities {
            writeln!(
                f,
                "Chromaticities: white ({:.4}, {:.4}), red ({:.4}, {:.4}), green ({:.4}, {:.4}), blue ({:.4}, {:.4})",
                c.white_point_x, c.white_point_y, c.red_x, c.red_y, c.green_x, c.green_y, c.blue_x, c.blue_y
            )?;
        }

        if let Some(intent) = info.rendering_intent {
            writeln!(f, "sRGB rendering intent: {:?}", intent)?;
        }

        if let Some(dims) = &info.physical_dimensions {
            if let Some((x, y)) = dims.dpi() {
                writeln!(f, "Resolution: {:.1}x{:.1} dpi", x, y)?;
            }

            if let Some(ratio) = dims.aspect_ratio() {
                writeln!(f, "Pixel aspect ratio: {:.3}", ratio)?;
            }
        }

        if let Some(offset) = &info.offset {
            writeln!(f, "Offset: {}, {} ({:?})", offset.x, offset.y, offset.unit)?;
        }

        if let Some(t) = &info.modification_time {
            writeln!(
                f,
                "Modified: {:04}-{:02}-{:02} {:02}:{:02}:{:02} UTC",
                t.year, t.month, t.day, t.hour, t.minute, t.second
            )?;
        }

        match &info.background {
            Some(Background::Gray(v)) => writeln!(f, "Background: gray {}", v)?,
            Some(Background::Rgb(r, g, b)) => writeln!(f, "Background: ({}, {}, {})", r, g, b)?,
            Some(Background::PaletteIndex(i)) => writeln!(f, "Background: palette index {}", i)?,
            None => {}
        }

        match &info.significant_bits {
            Some(SignificantBits::Gray { gray }) => writeln!(f, "Significant bits: {}", gray)?,
            Some(SignificantBits::Rgb { red, green, blue }) => {
                writeln!(f, "Significant bits: {} {} {}", red, green, blue)?
            }
            Some(SignificantBits::GrayAlpha { gray, alpha }) => {
                writeln!(f, "Significant bits: {} {}", gray, alpha)?
            }
            Some(SignificantBits::Rgba { red, green, blue, alpha }) => {
                writeln!(f, "Significant bits: {} {} {} {}", red, green, blue, alpha)?
            }
            None => {}
        }

        for text in &info.text_chunks {
            let kind = match text {
                PngText::Basic { .. } => "tEXt",
                PngText::Compressed { .. } => "zTXt",
            };
            writeln!(f, "{} {}: {}", kind, text.keyword(), text.text())?;
        }

        Ok(())
    }
}
