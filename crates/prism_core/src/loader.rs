//! High-level scene loading.
//!
//! Reads a scene description from disk and resolves texture paths relative
//! to the directory containing the scene file.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::parser::{parse_scene, ParseError};
use crate::scene::Scene;
use crate::texture::TextureCache;

/// Errors that can occur during scene loading.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Load a scene description file.
///
/// The scene is named after the file stem. Relative texture paths are
/// resolved against the file's parent directory.
///
/// # Example
///
/// ```ignore
/// use prism_core::load_scene;
///
/// let scene = load_scene("scenes/spheres.txt")?;
/// println!("Loaded {} primitives", scene.primitive_count());
/// ```
pub fn load_scene<P: AsRef<Path>>(path: P) -> LoadResult<Scene> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed");

    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: display.clone(),
        source,
    })?;

    let mut textures = match path.parent() {
        Some(dir) => TextureCache::with_base_dir(dir),
        None => TextureCache::new(),
    };

    log::debug!("Parsing scene file {}", display);
    parse_scene(&content, name, &mut textures).map_err(|source| LoadError::Parse {
        path: display,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_dir(label: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("prism_loader_{}_{}", label, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_load_scene_with_relative_texture() {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();

        let dir = temp_dir("texture");
        fs::write(dir.join("tile.ppm"), "P3\n1 1\n255\n10 20 30\n").unwrap();

        let scene_path = dir.join("tiled.txt");
        let mut file = fs::File::create(&scene_path).unwrap();
        writeln!(file, "eye 0 0 0\nviewdir 0 0 -1\nupdir 0 1 0\nvfov 45\nimsize 8 8").unwrap();
        writeln!(file, "mtlcolor 1 1 1 1 1 1 0.2 0.6 0.2 10 1 1").unwrap();
        writeln!(file, "texture tile.ppm\nsphere 0 0 -4 1").unwrap();
        drop(file);

        let scene = load_scene(&scene_path).unwrap();
        assert_eq!(scene.name, "tiled");
        assert_eq!(scene.textures.len(), 1);
        assert_eq!(scene.textures[0].texel(0, 0), [10, 20, 30]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_scene("no/such/scene.txt").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = temp_dir("broken");
        let scene_path = dir.join("broken.txt");
        fs::write(&scene_path, "frobnicate 1 2 3\n").unwrap();

        let err = load_scene(&scene_path).unwrap_err();
        assert!(err.to_string().contains("broken.txt"));
        assert!(matches!(
            err,
            LoadError::Parse {
                source: ParseError::UnknownKeyword { line: 1, .. },
                ..
            }
        ));

        fs::remove_dir_all(&dir).ok();
    }
}
