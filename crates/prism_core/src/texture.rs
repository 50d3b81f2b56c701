//! Texture and normal-map loading and caching.
//!
//! Textures keep their 8-bit RGB texels as stored on disk. The renderer
//! converts to float at lookup time, either as a color (`color_at`) or as a
//! tangent-space normal (`normal_at`).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use prism_math::{rgb8_to_color, rgb8_to_normal, Color, Vec3};
use thiserror::Error;

/// Errors that can occur during texture loading.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Failed to load texture {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image decoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid PPM data in {path}: {message}")]
    InvalidPpm { path: String, message: String },
}

pub type TextureResult<T> = Result<T, TextureError>;

/// The only channel depth the shading code samples.
pub const SUPPORTED_MAX_VALUE: u32 = 255;

/// A loaded texture with 8-bit RGB pixel data, row-major, top row first.
#[derive(Clone, Debug)]
pub struct Texture {
    /// Texture width in pixels
    pub width: u32,

    /// Texture height in pixels
    pub height: u32,

    /// Maximum channel value declared by the source file
    pub max_value: u32,

    pub pixels: Vec<[u8; 3]>,

    /// Original file path (for debugging)
    pub path: String,
}

impl Texture {
    /// Create a new texture from pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<[u8; 3]>, path: impl Into<String>) -> Self {
        Self {
            width,
            height,
            max_value: SUPPORTED_MAX_VALUE,
            pixels,
            path: path.into(),
        }
    }

    /// Create a solid color texture (1x1).
    pub fn solid_color(rgb: [u8; 3]) -> Self {
        Self::new(1, 1, vec![rgb], "<solid>")
    }

    /// Whether the renderer may sample this texture.
    ///
    /// Requires non-zero dimensions, 8-bit channels and a complete pixel buffer.
    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.max_value == SUPPORTED_MAX_VALUE
            && self.pixels.len() == self.width as usize * self.height as usize
    }

    /// Get the raw texel at integer coordinates, clamped to the image bounds.
    pub fn texel(&self, x: u32, y: u32) -> [u8; 3] {
        let x = x.min(self.width.saturating_sub(1));
        let y = y.min(self.height.saturating_sub(1));
        let idx = y as usize * self.width as usize + x as usize;
        self.pixels.get(idx).copied().unwrap_or([0, 0, 0])
    }

    /// Texel as a color in [0, 1].
    pub fn color_at(&self, x: u32, y: u32) -> Color {
        rgb8_to_color(self.texel(x, y))
    }

    /// Texel decoded as a tangent-space normal (not normalized).
    pub fn normal_at(&self, x: u32, y: u32) -> Vec3 {
        rgb8_to_normal(self.texel(x, y))
    }

    /// Get total size in bytes (approximate).
    pub fn size_bytes(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<[u8; 3]>()
    }
}

/// Parse an ASCII PPM (`P3`) image.
///
/// Accepts `#` comments and any whitespace layout between values. Channel
/// values above 255 are rejected since texels are stored as bytes.
pub fn parse_ppm(content: &str, path: &str) -> TextureResult<Texture> {
    let invalid = |message: String| TextureError::InvalidPpm {
        path: path.to_string(),
        message,
    };

    let mut tokens = content
        .lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .flat_map(str::split_whitespace);

    match tokens.next() {
        Some("P3") => {}
        Some(other) => return Err(invalid(format!("expected magic 'P3', found '{}'", other))),
        None => return Err(invalid("empty file".to_string())),
    }

    let mut header = [0u32; 3];
    for (slot, name) in header.iter_mut().zip(["width", "height", "max value"]) {
        let token = tokens
            .next()
            .ok_or_else(|| invalid(format!("missing {}", name)))?;
        *slot = token
            .parse()
            .map_err(|_| invalid(format!("invalid {} '{}'", name, token)))?;
    }
    let [width, height, max_value] = header;

    let expected = width as usize * height as usize;
    let mut pixels = Vec::with_capacity(expected);
    let mut channels = [0u8; 3];
    let mut filled = 0;
    for token in tokens {
        let value: u32 = token
            .parse()
            .map_err(|_| invalid(format!("invalid channel value '{}'", token)))?;
        channels[filled] = u8::try_from(value)
            .map_err(|_| invalid(format!("channel value {} exceeds 255", value)))?;
        filled += 1;
        if filled == 3 {
            pixels.push(channels);
            filled = 0;
        }
    }

    if pixels.len() != expected || filled != 0 {
        return Err(invalid(format!(
            "expected {} pixels, found {}",
            expected,
            pixels.len()
        )));
    }

    Ok(Texture {
        width,
        height,
        max_value,
        pixels,
        path: path.to_string(),
    })
}

/// Cache for loaded textures.
///
/// Each path is loaded once and shared between every primitive that uses it.
pub struct TextureCache {
    /// Cached textures by file path
    textures: HashMap<String, Arc<Texture>>,

    /// Base directory for resolving relative paths
    base_dir: Option<PathBuf>,
}

impl TextureCache {
    /// Create a new empty texture cache.
    pub fn new() -> Self {
        Self {
            textures: HashMap::new(),
            base_dir: None,
        }
    }

    /// Create a texture cache with a base directory for relative paths.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            textures: HashMap::new(),
            base_dir: Some(base_dir.into()),
        }
    }

    /// Load a texture from file, using cache if available.
    pub fn load(&mut self, path: &str) -> TextureResult<Arc<Texture>> {
        if let Some(texture) = self.textures.get(path) {
            return Ok(texture.clone());
        }

        let full_path = self.resolve_path(path);
        let texture = Arc::new(load_texture_file(&full_path)?);

        if !texture.is_valid() {
            log::warn!(
                "Texture {} is not 8-bit RGB ({}x{}, max {}), it will be ignored",
                path,
                texture.width,
                texture.height,
                texture.max_value
            );
        }

        self.textures.insert(path.to_string(), texture.clone());

        log::debug!(
            "Loaded texture: {} ({}x{}, {:.1} KB)",
            path,
            texture.width,
            texture.height,
            texture.size_bytes() as f32 / 1024.0
        );

        Ok(texture)
    }

    /// Register an already decoded texture under `path`.
    #[cfg(test)]
    pub(crate) fn insert(&mut self, path: impl Into<String>, texture: Texture) -> Arc<Texture> {
        let texture = Arc::new(texture);
        self.textures.insert(path.into(), texture.clone());
        texture
    }

    /// Resolve a path relative to the base directory.
    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);

        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(base) = &self.base_dir {
            base.join(path)
        } else {
            path.to_path_buf()
        }
    }
}

impl Default for TextureCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Load a texture from a file path.
///
/// `.ppm` files go through the ASCII reader; anything else is decoded by the
/// `image` crate and converted to 8-bit RGB.
fn load_texture_file(path: &Path) -> TextureResult<Texture> {
    let display = path.to_string_lossy().to_string();
    let is_ppm = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ppm"));

    if is_ppm {
        let content = fs::read_to_string(path).map_err(|source| TextureError::Io {
            path: display.clone(),
            source,
        })?;
        return parse_ppm(&content, &display);
    }

    let rgb = image::open(path)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    let pixels = rgb.pixels().map(|p| p.0).collect();

    Ok(Texture::new(width, height, pixels, display))
}
