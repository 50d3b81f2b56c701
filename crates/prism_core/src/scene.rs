//! Scene description types.
//!
//! A `Scene` is built once by the parser and then shared read-only by every
//! render thread. Primitives refer to materials, textures and normal maps by
//! index; `Scene::validate` guarantees those indices resolve.

use std::sync::Arc;

use prism_math::{Color, Vec3};
use thiserror::Error;

use crate::mesh::Mesh;
use crate::texture::Texture;

/// Errors reported by `Scene::validate`.
#[derive(Error, Debug, PartialEq)]
pub enum SceneError {
    #[error("{owner} references {kind} {index}, but only {len} exist")]
    DanglingIndex {
        owner: String,
        kind: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Image size must be at least 1x1, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    #[error("{owner} has non-positive radius {radius}")]
    InvalidRadius { owner: String, radius: f32 },

    #[error("Material {index} has non-positive refraction index {value}")]
    InvalidRefractionIndex { index: usize, value: f32 },
}

pub type SceneResult<T> = Result<T, SceneError>;

/// Blinn-Phong material with transparency.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Diffuse color (Od)
    pub diffuse_color: Color,

    /// Specular color (Os)
    pub specular_color: Color,

    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,

    /// Shininess exponent
    pub specular_exponent: f32,

    /// Opacity in [0, 1]
    pub alpha: f32,

    pub refraction_index: f32,

    /// Beer's-law coefficient, only meaningful when `alpha < 1`
    pub attenuation: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse_color: Color::splat(0.5),
            specular_color: Color::ONE,
            ambient: 0.1,
            diffuse: 0.7,
            specular: 0.0,
            specular_exponent: 10.0,
            alpha: 1.0,
            refraction_index: 1.0,
            attenuation: 0.0,
        }
    }
}

impl Material {
    /// Create an opaque, non-reflective material with just a diffuse color.
    pub fn new(diffuse_color: Color) -> Self {
        Self {
            diffuse_color,
            ..Default::default()
        }
    }

    pub fn is_opaque(&self) -> bool {
        self.alpha >= 1.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
    /// Light located at `Light::position`
    Point,
    /// Light travelling along `Light::position`, from infinitely far away
    Directional,
}

/// Constant, linear and quadratic distance falloff.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Attenuation {
    pub fn new(constant: f32, linear: f32, quadratic: f32) -> Self {
        Self {
            constant,
            linear,
            quadratic,
        }
    }

    /// All-zero coefficients mean "no falloff".
    pub fn is_enabled(&self) -> bool {
        self.constant > 0.0 || self.linear > 0.0 || self.quadratic > 0.0
    }

    /// Falloff factor at `distance`, or 1 when disabled.
    pub fn factor(&self, distance: f32) -> f32 {
        if !self.is_enabled() {
            return 1.0;
        }
        1.0 / (self.constant + self.linear * distance + self.quadratic * distance * distance)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub position: Vec3,
    pub kind: LightKind,

    /// Intensity in [0, 1]
    pub intensity: f32,

    pub attenuation: Attenuation,
}

impl Light {
    pub fn point(position: Vec3, intensity: f32) -> Self {
        Self {
            position,
            kind: LightKind::Point,
            intensity: intensity.clamp(0.0, 1.0),
            attenuation: Attenuation::default(),
        }
    }

    /// Light travelling along `direction`.
    pub fn directional(direction: Vec3, intensity: f32) -> Self {
        Self {
            position: direction,
            kind: LightKind::Directional,
            intensity: intensity.clamp(0.0, 1.0),
            attenuation: Attenuation::default(),
        }
    }

    pub fn with_attenuation(mut self, attenuation: Attenuation) -> Self {
        self.attenuation = attenuation;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
    pub material: usize,
    pub texture: Option<usize>,
    pub normal_map: Option<usize>,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32, material: usize) -> Self {
        Self {
            center,
            radius,
            material,
            texture: None,
            normal_map: None,
        }
    }
}

/// Coarse culling volume tested before the full intersection pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

/// Axis-aligned ellipsoid with per-axis radii.
#[derive(Clone, Debug, PartialEq)]
pub struct Ellipsoid {
    pub center: Vec3,
    pub radii: Vec3,
    pub material: usize,
}

impl Ellipsoid {
    pub fn new(center: Vec3, radii: Vec3, material: usize) -> Self {
        Self {
            center,
            radii,
            material,
        }
    }
}

/// Background color and the refraction index of the surrounding medium.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Background {
    pub color: Color,
    pub refraction_index: f32,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            color: Color::ZERO,
            refraction_index: 1.0,
        }
    }
}

/// Distance fog parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthCueing {
    pub color: Color,
    pub alpha_min: f32,
    pub alpha_max: f32,
    pub dist_min: f32,
    pub dist_max: f32,
}

impl DepthCueing {
    pub fn is_enabled(&self) -> bool {
        self.dist_max > 0.0
    }

    /// Weight of the natural color at `distance`, between `alpha_max`
    /// (nearer than `dist_min`) and `alpha_min` (beyond `dist_max`).
    pub fn weight(&self, distance: f32) -> f32 {
        let span = self.dist_max - self.dist_min;
        let t = if span > 0.0 {
            ((distance - self.dist_min) / span).clamp(0.0, 1.0)
        } else if distance <= self.dist_min {
            0.0
        } else {
            1.0
        };
        self.alpha_max - t * (self.alpha_max - self.alpha_min)
    }
}

/// Which field of view drives a perspective camera. Angles are in radians.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldOfView {
    Horizontal(f32),
    Vertical(f32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    Perspective(FieldOfView),
    Parallel { frustum_width: f32 },
}

impl Projection {
    /// Pick the authoritative projection: parallel, then horizontal FOV,
    /// then vertical FOV.
    pub fn resolve(hfov: Option<f32>, vfov: Option<f32>, parallel: Option<f32>) -> Option<Self> {
        match (parallel, hfov, vfov) {
            (Some(frustum_width), _, _) => Some(Projection::Parallel { frustum_width }),
            (None, Some(h), _) => Some(Projection::Perspective(FieldOfView::Horizontal(h))),
            (None, None, Some(v)) => Some(Projection::Perspective(FieldOfView::Vertical(v))),
            (None, None, None) => None,
        }
    }
}

/// Camera placement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct View {
    pub eye: Vec3,
    pub view_dir: Vec3,
    pub up_dir: Vec3,
    pub projection: Projection,
}

impl Default for View {
    fn default() -> Self {
        Self {
            eye: Vec3::ZERO,
            view_dir: Vec3::NEG_Z,
            up_dir: Vec3::Y,
            projection: Projection::Perspective(FieldOfView::Horizontal(90f32.to_radians())),
        }
    }
}

/// A complete, immutable scene.
#[derive(Clone, Debug)]
pub struct Scene {
    /// Scene name (file stem)
    pub name: String,

    pub view: View,
    pub width: u32,
    pub height: u32,
    pub background: Background,

    pub materials: Vec<Material>,
    pub lights: Vec<Light>,
    pub spheres: Vec<Sphere>,
    pub ellipsoids: Vec<Ellipsoid>,
    pub mesh: Mesh,

    /// Occlusion pre-pass volumes; empty disables culling
    pub culling_spheres: Vec<BoundingSphere>,

    pub textures: Vec<Arc<Texture>>,
    pub normal_maps: Vec<Arc<Texture>>,

    pub depth_cueing: Option<DepthCueing>,

    /// Average jittered shadow rays instead of a single hard test
    pub soft_shadows: bool,
}

impl Scene {
    /// Create an empty scene with the given camera and image size.
    pub fn new(name: impl Into<String>, view: View, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            view,
            width,
            height,
            background: Background::default(),
            materials: Vec::new(),
            lights: Vec::new(),
            spheres: Vec::new(),
            ellipsoids: Vec::new(),
            mesh: Mesh::new(),
            culling_spheres: Vec::new(),
            textures: Vec::new(),
            normal_maps: Vec::new(),
            depth_cueing: None,
            soft_shadows: false,
        }
    }

    /// Add a material and return its index.
    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    pub fn with_soft_shadows(mut self, enabled: bool) -> Self {
        self.soft_shadows = enabled;
        self
    }

    /// Total number of renderable primitives.
    pub fn primitive_count(&self) -> usize {
        self.spheres.len() + self.ellipsoids.len() + self.mesh.faces.len()
    }

    /// Check every cross-reference and numeric precondition the renderer
    /// relies on. Returns the first problem found.
    pub fn validate(&self) -> SceneResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SceneError::EmptyImage {
                width: self.width,
                height: self.height,
            });
        }

        for (index, material) in self.materials.iter().enumerate() {
            if material.refraction_index <= 0.0 {
                return Err(SceneError::InvalidRefractionIndex {
                    index,
                    value: material.refraction_index,
                });
            }
        }

        for (i, sphere) in self.spheres.iter().enumerate() {
            let owner = || format!("sphere {}", i);
            if sphere.radius <= 0.0 {
                return Err(SceneError::InvalidRadius {
                    owner: owner(),
                    radius: sphere.radius,
                });
            }
            check_index(owner, "material", Some(sphere.material), self.materials.len())?;
            check_index(owner, "texture", sphere.texture, self.textures.len())?;
            check_index(owner, "normal map", sphere.normal_map, self.normal_maps.len())?;
        }

        for (i, sphere) in self.culling_spheres.iter().enumerate() {
            if sphere.radius <= 0.0 {
                return Err(SceneError::InvalidRadius {
                    owner: format!("culling sphere {}", i),
                    radius: sphere.radius,
                });
            }
        }

        for (i, ellipsoid) in self.ellipsoids.iter().enumerate() {
            let owner = || format!("ellipsoid {}", i);
            let min_radius = ellipsoid.radii.min_element();
            if min_radius <= 0.0 {
                return Err(SceneError::InvalidRadius {
                    owner: owner(),
                    radius: min_radius,
                });
            }
            check_index(owner, "material", Some(ellipsoid.material), self.materials.len())?;
        }

        let mesh = &self.mesh;
        for (i, face) in mesh.faces.iter().enumerate() {
            let owner = || format!("face {}", i);
            check_index(owner, "material", Some(face.material), self.materials.len())?;
            check_index(owner, "texture", face.texture, self.textures.len())?;
            check_index(owner, "normal map", face.normal_map, self.normal_maps.len())?;
            for corner in &face.vertices {
                check_index(owner, "vertex", Some(corner.position), mesh.positions.len())?;
                check_index(owner, "texture coordinate", corner.uv, mesh.uvs.len())?;
                check_index(owner, "vertex normal", corner.normal, mesh.normals.len())?;
            }
        }

        Ok(())
    }
}

fn check_index(
    owner: impl Fn() -> String,
    kind: &'static str,
    index: Option<usize>,
    len: usize,
) -> SceneResult<()> {
    match index {
        Some(index) if index >= len => Err(SceneError::DanglingIndex {
            owner: owner(),
            kind,
            index,
            len,
        }),
        _ => Ok(()),
    }
}
