use clap::Parser;
use glob::glob;
use log::{error, info, LevelFilter};
use pngharness::logger::Logger;
use pngharness::{CrcPolicy, DecodeOptions, PngDecoder, PngSummary, Strip16};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[clap(name = "pngharness", about = "Decode PNG files to RGBA8, rejecting anything malformed")]
struct Cli {
    #[arg(required = true, help = "Files or glob patterns")]
    paths: Vec<String>,

    #[arg(short = 'o', long = "output-dir", help = "Re-encode decoded images as RGBA8 PNGs into this directory")]
    output_dir: Option<String>,

    #[arg(long, default_value_t = DecodeOptions::default().max_pixels, help = "Largest width * height accepted")]
    max_pixels: u64,

    #[arg(long, value_parser = ["strict", "discard", "warn"], default_value = "discard", help = "Policy for CRC mismatches")]
    crc: String,

    #[arg(long, help = "Rescale 16-bit samples instead of truncating them")]
    scale_16: bool,

    #[arg(long, help = "Print header and metadata of each decoded file")]
    info: bool,

    #[arg(short, long, help = "Log every chunk")]
    verbose: bool,
}

impl Cli {
    fn decode_options(&self) -> DecodeOptions {
        let crc_policy = match self.crc.as_str() {
            "strict" => CrcPolicy::Strict,
            "warn" => CrcPolicy::Warn,
            _ => CrcPolicy::DiscardAncillary,
        };

        let strip_16 = if self.scale_16 { Strip16::Scale } else { Strip16::Truncate };

        DecodeOptions::default()
            .with_max_pixels(self.max_pixels)
            .with_crc_policy(crc_policy)
            .with_strip_16(strip_16)
    }
}

fn get_files(pattern: &str) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let absolute_pattern = if Path::new(pattern).is_relative() {
        base_dir.join(pattern).to_string_lossy().into_owned()
    } else {
        pattern.to_string()
    };

    for entry in glob(&absolute_pattern)? {
        match entry {
            Ok(path) => {
                if !path.is_file() {
                    continue;
                }

                files.push(path);
            }
            Err(e) => error!("{}", e),
        }
    }

    Ok(files)
}

/// Maps every input to `<stem>.png` in `output_dir`, numbering repeated stems
/// so parallel writes never share a file.
fn get_output_paths(files: &[PathBuf], output_dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut taken = HashSet::new();
    let mut paths = Vec::with_capacity(files.len());

    for file in files {
        let file_stem = file
            .file_stem()
            .ok_or("Invalid file name")?
            .to_str()
            .ok_or("Invalid file stem")?;

        let mut name = format!("{}.png", file_stem);
        let mut index = 1;
        while !taken.insert(name.clone()) {
            name = format!("{}-{}.png", file_stem, index);
            index += 1;
        }

        paths.push(output_dir.join(name));
    }

    Ok(paths)
}

fn process_file(
    file: &Path,
    output_path: Option<&Path>,
    cli: &Cli,
    options: &DecodeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let reader = BufReader::new(File::open(file)?);
    let decoded = PngDecoder::with_options(reader, options.clone())
        .decode()
        .map_err(|e| format!("rejected in {} stage: {}", e.stage(), e))?;

    info!(
        "{}: {}x{} {:?}/{}",
        file.display(),
        decoded.header.width,
        decoded.header.height,
        decoded.header.color_type,
        decoded.header.bit_depth
    );

    if cli.info {
        let summary = PngSummary {
            header: &decoded.header,
            info: &decoded.info,
        };
        println!("File: {}\n{}", file.display(), summary);
    }

    if let Some(output_path) = output_path {
        let png = pngharness::encode_png(&decoded.image)?;

        fs::write(output_path, png)?;
        info!("Written to {}", output_path.display());
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    Logger::init(level).map_err(|e| e.to_string())?;

    let mut files = Vec::new();
    for pattern in &cli.paths {
        files.extend(get_files(pattern)?);
    }

    if files.is_empty() {
        error!("No files found matching: {}", cli.paths.join(" "));
        return Ok(());
    }

    let options = cli.decode_options();

    let output_paths: Vec<Option<PathBuf>> = match cli.output_dir.as_deref().map(Path::new) {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            get_output_paths(&files, dir)?.into_iter().map(Some).collect()
        }
        None => vec![None; files.len()],
    };

    let rejected = files
        .par_iter()
        .zip(output_paths.par_iter())
        .filter(|(file, output_path)| match process_file(file, output_path.as_deref(), &cli, &options) {
            Ok(()) => false,
            Err(e) => {
                error!("{}: {}", file.display(), e);
                true
            }
        })
        .count();

    info!("{} decoded, {} rejected", files.len() - rejected, rejected);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_paths_are_unique() {
        let files = [
            PathBuf::from("a/image.png"),
            PathBuf::from("b/image.png"),
            PathBuf::from("c/image-1.png"),
            PathBuf::from("d/image.gif"),
            PathBuf::from("other.png"),
        ];

        let paths = get_output_paths(&files, Path::new("out")).unwrap();
        let names: Vec<_> = paths.iter().map(|p| p.strip_prefix("out").unwrap().to_str().unwrap()).collect();

        assert_eq!(names, vec!["image.png", "image-1.png", "image-1-1.png", "image-2.png", "other.png"]);
    }
}
