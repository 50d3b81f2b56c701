//! Image file output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::renderer::ImageBuffer;

/// Pixels per output line in PPM files.
const PIXELS_PER_LINE: u32 = 5;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Image buffer does not match its {width}x{height} size")]
    SizeMismatch { width: u32, height: u32 },
}

pub type OutputResult<T> = Result<T, OutputError>;

/// Write `image` as an ASCII P3 PPM.
///
/// Pixels are tab separated, with a line break after every fifth pixel of
/// a row and at the end of each row.
pub fn write_ppm<W: Write>(image: &ImageBuffer, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "P3")?;
    writeln!(out, "{} {}", image.width, image.height)?;
    writeln!(out, "255")?;

    let rgb = image.to_rgb8();
    for (i, pixel) in rgb.chunks_exact(3).enumerate() {
        let x = i as u32 % image.width.max(1);
        let separator = if x % PIXELS_PER_LINE == PIXELS_PER_LINE - 1 || x + 1 == image.width {
            '\n'
        } else {
            '\t'
        };
        write!(out, "{} {} {}{}", pixel[0], pixel[1], pixel[2], separator)?;
    }
    out.flush()
}

/// Save `image` as a P3 PPM file.
pub fn save_ppm(image: &ImageBuffer, path: impl AsRef<Path>) -> OutputResult<()> {
    let path = path.as_ref();
    let io_error = |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_error)?;
    let mut out = BufWriter::new(file);
    write_ppm(image, &mut out).map_err(io_error)?;

    log::info!("Wrote {}", path.display());
    Ok(())
}

/// Save `image` as a PNG file.
pub fn save_png(image: &ImageBuffer, path: impl AsRef<Path>) -> OutputResult<()> {
    let path = path.as_ref();
    let rgb = image::RgbImage::from_raw(image.width, image.height, image.to_rgb8()).ok_or(
        OutputError::SizeMismatch {
            width: image.width,
            height: image.height,
        },
    )?;

    rgb.save(path).map_err(|source| OutputError::Encode {
        path: path.to_path_buf(),
        source,
    })?;

    log::info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_math::Color;

    fn ppm_text(image: &ImageBuffer) -> String {
        let mut out = Vec::new();
        write_ppm(image, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_ppm_header_and_pixels() {
        let mut image = ImageBuffer::new(2, 1);
        image.set(0, 0, Color::new(1.0, 0.0, 0.5));
        image.set(1, 0, Color::ONE);
        assert_eq!(ppm_text(&image), "P3\n2 1\n255\n255 0 127\t255 255 255\n");
    }

    #[test]
    fn test_ppm_line_wrapping() {
        let image = ImageBuffer::new(7, 2);
        let text = ppm_text(&image);
        let body: Vec<&str> = text.lines().skip(3).collect();

        // Each row of 7 splits into 5 + 2 pixels
        assert_eq!(body.len(), 4);
        assert_eq!(body[0].split('\t').count(), 5);
        assert_eq!(body[1].split('\t').count(), 2);
        assert_eq!(body[2].split('\t').count(), 5);
    }

    #[test]
    fn test_save_files() {
        let dir = std::env::temp_dir().join(format!("prism_output_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut image = ImageBuffer::new(3, 2);
        image.set(2, 1, Color::new(0.0, 1.0, 0.0));

        let ppm = dir.join("out.ppm");
        save_ppm(&image, &ppm).unwrap();
        assert!(std::fs::read_to_string(&ppm).unwrap().starts_with("P3\n3 2\n255\n"));

        let png = dir.join("out.png");
        save_png(&image, &png).unwrap();
        let decoded = image::open(&png).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(2, 1).0, [0, 255, 0]);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_save_to_missing_directory_fails() {
        let image = ImageBuffer::new(1, 1);
        let err = save_ppm(&image, "/nonexistent/prism/out.ppm").unwrap_err();
        assert!(matches!(err, OutputError::Io { .. }));
    }
}
