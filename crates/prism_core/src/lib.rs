//! Prism Core - scene description types and loading.
//!
//! This crate provides:
//!
//! - **Scene types**: `Scene`, `Material`, `Light`, `Sphere`, `Ellipsoid`, `Mesh`
//! - **Scene files**: line-oriented text parsing and validation
//! - **Textures**: PPM and `image`-decoded rasters shared through a cache
//!
//! # Example
//!
//! ```ignore
//! use prism_core::load_scene;
//!
//! let scene = load_scene("scene.txt")?;
//! println!("Loaded {} spheres, {} faces",
//!     scene.spheres.len(),
//!     scene.mesh.faces.len());
//! ```

pub mod loader;
pub mod mesh;
pub mod parser;
pub mod scene;
pub mod texture;

// Re-export commonly used types
pub use loader::{load_scene, LoadError, LoadResult};
pub use mesh::{Face, FaceVertex, Mesh};
pub use parser::{parse_scene, ParseError, ParseResult, SceneParser};
pub use scene::{
    Attenuation, Background, BoundingSphere, DepthCueing, Ellipsoid, FieldOfView, Light,
    LightKind, Material, Projection, Scene, SceneError, SceneResult, Sphere, View,
};
pub use texture::{parse_ppm, Texture, TextureCache, TextureError, TextureResult};
