//! Scene description parser.
//!
//! The format is line oriented: a keyword followed by whitespace separated
//! values. Blank lines and lines starting with `#` are skipped.
//!
//! # Supported keywords
//!
//! - `eye x y z`, `viewdir x y z`, `updir x y z`
//! - `hfov deg`, `vfov deg`, `parallel width`
//! - `imsize w h`
//! - `bkgcolor r g b [eta]`
//! - `light x y z kind i`, `attlight x y z kind i c1 c2 c3`
//! - `depthcueing r g b amin amax dmin dmax`
//! - `mtlcolor Odr Odg Odb Osr Osg Osb ka kd ks n alpha eta [attenuation]`
//! - `texture path`, `bump path`
//! - `sphere x y z r`, `bvhsphere x y z r`, `ellipse x y z rx ry rz`
//! - `v x y z`, `vn x y z`, `vt u v`
//! - `f a b c` with corners `v`, `v/vt`, `v//vn` or `v/vt/vn` (1-based)
//!
//! Primitives bind to the most recent `mtlcolor`, `texture` and `bump`
//! declared before them.

use std::sync::Arc;

use prism_math::{Vec2, Vec3};
use thiserror::Error;

use crate::mesh::{Face, FaceVertex};
use crate::scene::{
    Attenuation, Background, BoundingSphere, DepthCueing, Ellipsoid, Light, LightKind, Material,
    Projection, Scene, SceneError, Sphere, View,
};
use crate::texture::{Texture, TextureCache, TextureError};

/// Errors that can occur while parsing a scene description.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Parse error at line {line}: unknown keyword '{keyword}'")]
    UnknownKeyword { line: usize, keyword: String },

    #[error("Parse error at line {line}: '{keyword}' expects {expected} values, found {found}")]
    Arity {
        line: usize,
        keyword: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("Parse error at line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },

    #[error("Parse error at line {line}: invalid face index '{token}'")]
    InvalidIndex { line: usize, token: String },

    #[error("Parse error at line {line}: '{keyword}' declared before any mtlcolor")]
    MissingMaterial { line: usize, keyword: &'static str },

    #[error("Parse error at line {line}: light kind must be 0 or 1, found {value}")]
    InvalidLightKind { line: usize, value: f32 },

    #[error("Missing required setting '{0}'")]
    Missing(&'static str),

    #[error("Degenerate view: {0}")]
    DegenerateView(&'static str),

    #[error("Parse error at line {line}: {source}")]
    Texture {
        line: usize,
        #[source]
        source: TextureError,
    },

    #[error("Invalid scene: {0}")]
    Scene(#[from] SceneError),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// One tokenized input line.
struct Line<'a> {
    number: usize,
    keyword: &'a str,
    values: Vec<&'a str>,
}

impl<'a> Line<'a> {
    fn expect(&self, keyword: &'static str, counts: &[usize], expected: &'static str) -> ParseResult<()> {
        if counts.contains(&self.values.len()) {
            Ok(())
        } else {
            Err(ParseError::Arity {
                line: self.number,
                keyword,
                expected,
                found: self.values.len(),
            })
        }
    }

    fn float(&self, idx: usize) -> ParseResult<f32> {
        let token = self.values[idx];
        match token.parse::<f32>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(ParseError::InvalidNumber {
                line: self.number,
                token: token.to_string(),
            }),
        }
    }

    fn uint(&self, idx: usize) -> ParseResult<u32> {
        let token = self.values[idx];
        token.parse::<u32>().map_err(|_| ParseError::InvalidNumber {
            line: self.number,
            token: token.to_string(),
        })
    }

    fn vec3(&self, start: usize) -> ParseResult<Vec3> {
        Ok(Vec3::new(
            self.float(start)?,
            self.float(start + 1)?,
            self.float(start + 2)?,
        ))
    }
}

/// Scene description parser.
///
/// Accumulates settings and primitives line by line, then resolves the
/// camera and validates every cross-reference in `finish`.
pub struct SceneParser<'c> {
    textures: &'c mut TextureCache,

    eye: Option<Vec3>,
    view_dir: Option<Vec3>,
    up_dir: Option<Vec3>,
    hfov: Option<f32>,
    vfov: Option<f32>,
    parallel: Option<f32>,
    image_size: Option<(u32, u32)>,

    scene: Scene,

    current_texture: Option<usize>,
    current_normal_map: Option<usize>,
}

impl<'c> SceneParser<'c> {
    /// Create a parser that loads textures through `textures`.
    pub fn new(name: impl Into<String>, textures: &'c mut TextureCache) -> Self {
        Self {
            textures,
            eye: None,
            view_dir: None,
            up_dir: None,
            hfov: None,
            vfov: None,
            parallel: None,
            image_size: None,
            scene: Scene::new(name, View::default(), 0, 0),
            current_texture: None,
            current_normal_map: None,
        }
    }

    /// Parse a complete scene description.
    pub fn parse(mut self, content: &str) -> ParseResult<Scene> {
        for (idx, raw) in content.lines().enumerate() {
            let mut tokens = raw.split_whitespace();
            let Some(keyword) = tokens.next() else {
                continue;
            };
            if keyword.starts_with('#') {
                continue;
            }
            let line = Line {
                number: idx + 1,
                keyword,
                values: tokens.collect(),
            };
            self.parse_line(&line)?;
        }
        self.finish()
    }

    fn parse_line(&mut self, line: &Line) -> ParseResult<()> {
        match line.keyword {
            "eye" => {
                line.expect("eye", &[3], "3")?;
                self.eye = Some(line.vec3(0)?);
            }
            "viewdir" => {
                line.expect("viewdir", &[3], "3")?;
                self.view_dir = Some(line.vec3(0)?);
            }
            "updir" => {
                line.expect("updir", &[3], "3")?;
                self.up_dir = Some(line.vec3(0)?);
            }
            "hfov" => {
                line.expect("hfov", &[1], "1")?;
                self.hfov = Some(line.float(0)?.to_radians());
            }
            "vfov" => {
                line.expect("vfov", &[1], "1")?;
                self.vfov = Some(line.float(0)?.to_radians());
            }
            "parallel" => {
                line.expect("parallel", &[1], "1")?;
                self.parallel = Some(line.float(0)?);
            }
            "imsize" => {
                line.expect("imsize", &[2], "2")?;
                self.image_size = Some((line.uint(0)?, line.uint(1)?));
            }
            "bkgcolor" => {
                line.expect("bkgcolor", &[3, 4], "3 or 4")?;
                let refraction_index = if line.values.len() == 4 {
                    line.float(3)?
                } else {
                    1.0
                };
                self.scene.background = Background {
                    color: line.vec3(0)?,
                    refraction_index,
                };
            }
            "light" => {
                line.expect("light", &[5], "5")?;
                let light = self.parse_light(line)?;
                self.scene.lights.push(light);
            }
            "attlight" => {
                line.expect("attlight", &[8], "8")?;
                let attenuation = Attenuation::new(line.float(5)?, line.float(6)?, line.float(7)?);
                let light = self.parse_light(line)?.with_attenuation(attenuation);
                self.scene.lights.push(light);
            }
            "depthcueing" => {
                line.expect("depthcueing", &[7], "7")?;
                self.scene.depth_cueing = Some(DepthCueing {
                    color: line.vec3(0)?,
                    alpha_min: line.float(3)?,
                    alpha_max: line.float(4)?,
                    dist_min: line.float(5)?,
                    dist_max: line.float(6)?,
                });
            }
            "mtlcolor" => {
                line.expect("mtlcolor", &[12, 13], "12 or 13")?;
                let attenuation = if line.values.len() == 13 {
                    line.float(12)?
                } else {
                    0.0
                };
                self.scene.materials.push(Material {
                    diffuse_color: line.vec3(0)?,
                    specular_color: line.vec3(3)?,
                    ambient: line.float(6)?,
                    diffuse: line.float(7)?,
                    specular: line.float(8)?,
                    specular_exponent: line.float(9)?,
                    alpha: line.float(10)?,
                    refraction_index: line.float(11)?,
                    attenuation,
                });
            }
            "texture" => {
                line.expect("texture", &[1], "1")?;
                let texture = self.load_texture(line)?;
                self.scene.textures.push(texture);
                self.current_texture = Some(self.scene.textures.len() - 1);
            }
            "bump" => {
                line.expect("bump", &[1], "1")?;
                let normal_map = self.load_texture(line)?;
                self.scene.normal_maps.push(normal_map);
                self.current_normal_map = Some(self.scene.normal_maps.len() - 1);
            }
            "sphere" => {
                line.expect("sphere", &[4], "4")?;
                let material = self.current_material(line, "sphere")?;
                self.scene.spheres.push(Sphere {
                    center: line.vec3(0)?,
                    radius: line.float(3)?,
                    material,
                    texture: self.current_texture,
                    normal_map: self.current_normal_map,
                });
            }
            "bvhsphere" => {
                line.expect("bvhsphere", &[4], "4")?;
                self.scene.culling_spheres.push(BoundingSphere {
                    center: line.vec3(0)?,
                    radius: line.float(3)?,
                });
            }
            "ellipse" => {
                line.expect("ellipse", &[6], "6")?;
                let material = self.current_material(line, "ellipse")?;
                self.scene
                    .ellipsoids
                    .push(Ellipsoid::new(line.vec3(0)?, line.vec3(3)?, material));
            }
            "v" => {
                line.expect("v", &[3], "3")?;
                self.scene.mesh.positions.push(line.vec3(0)?);
            }
            "vn" => {
                line.expect("vn", &[3], "3")?;
                self.scene.mesh.normals.push(line.vec3(0)?);
            }
            "vt" => {
                line.expect("vt", &[2], "2")?;
                self.scene
                    .mesh
                    .uvs
                    .push(Vec2::new(line.float(0)?, line.float(1)?));
            }
            "f" => {
                line.expect("f", &[3], "3")?;
                let material = self.current_material(line, "f")?;
                let vertices = [
                    parse_corner(line, 0)?,
                    parse_corner(line, 1)?,
                    parse_corner(line, 2)?,
                ];
                self.scene.mesh.faces.push(Face {
                    vertices,
                    material,
                    texture: self.current_texture,
                    normal_map: self.current_normal_map,
                });
            }
            other => {
                return Err(ParseError::UnknownKeyword {
                    line: line.number,
                    keyword: other.to_string(),
                })
            }
        }
        Ok(())
    }

    /// Shared prefix of `light` and `attlight`: position, kind, intensity.
    fn parse_light(&self, line: &Line) -> ParseResult<Light> {
        let position = line.vec3(0)?;
        let kind_value = line.float(3)?;
        let kind = if kind_value == 1.0 {
            LightKind::Point
        } else if kind_value == 0.0 {
            LightKind::Directional
        } else {
            return Err(ParseError::InvalidLightKind {
                line: line.number,
                value: kind_value,
            });
        };
        Ok(Light {
            position,
            kind,
            intensity: line.float(4)?.clamp(0.0, 1.0),
            attenuation: Attenuation::default(),
        })
    }

    fn current_material(&self, line: &Line, keyword: &'static str) -> ParseResult<usize> {
        self.scene
            .materials
            .len()
            .checked_sub(1)
            .ok_or(ParseError::MissingMaterial {
                line: line.number,
                keyword,
            })
    }

    fn load_texture(&mut self, line: &Line) -> ParseResult<Arc<Texture>> {
        self.textures
            .load(line.values[0])
            .map_err(|source| ParseError::Texture {
                line: line.number,
                source,
            })
    }

    /// Resolve the camera and validate the assembled scene.
    fn finish(mut self) -> ParseResult<Scene> {
        let eye = self.eye.ok_or(ParseError::Missing("eye"))?;
        let view_dir = self.view_dir.ok_or(ParseError::Missing("viewdir"))?;
        let up_dir = self.up_dir.ok_or(ParseError::Missing("updir"))?;
        let (width, height) = self.image_size.ok_or(ParseError::Missing("imsize"))?;
        let projection = Projection::resolve(self.hfov, self.vfov, self.parallel)
            .ok_or(ParseError::Missing("hfov, vfov or parallel"))?;

        if view_dir.length_squared() == 0.0 {
            return Err(ParseError::DegenerateView("view direction is zero"));
        }
        if view_dir.cross(up_dir).length_squared() == 0.0 {
            return Err(ParseError::DegenerateView(
                "up direction is zero or parallel to the view direction",
            ));
        }

        self.scene.view = View {
            eye,
            view_dir,
            up_dir,
            projection,
        };
        self.scene.width = width;
        self.scene.height = height;
        self.scene.validate()?;

        log::info!(
            "Parsed scene '{}': {}x{}, {} spheres, {} ellipsoids, {} faces over {} vertices, {} lights, {} materials",
            self.scene.name,
            width,
            height,
            self.scene.spheres.len(),
            self.scene.ellipsoids.len(),
            self.scene.mesh.triangle_count(),
            self.scene.mesh.vertex_count(),
            self.scene.lights.len(),
            self.scene.materials.len()
        );

        Ok(self.scene)
    }
}

/// Parse one face corner (`v`, `v/vt`, `v//vn` or `v/vt/vn`) into 0-based indices.
fn parse_corner(line: &Line, idx: usize) -> ParseResult<FaceVertex> {
    let token = line.values[idx];
    let invalid = || ParseError::InvalidIndex {
        line: line.number,
        token: token.to_string(),
    };
    let index = |part: &str| -> ParseResult<usize> {
        match part.parse::<usize>() {
            Ok(value) if value >= 1 => Ok(value - 1),
            _ => Err(invalid()),
        }
    };

    let mut parts = token.split('/');
    let position = index(parts.next().unwrap_or(""))?;
    let uv = match parts.next() {
        None | Some("") => None,
        Some(part) => Some(index(part)?),
    };
    let normal = match parts.next() {
        None => None,
        Some(part) => Some(index(part)?),
    };
    if parts.next().is_some() {
        return Err(invalid());
    }

    Ok(FaceVertex {
        position,
        uv,
        normal,
    })
}

/// Parse a scene description from a string. Textures resolve through `textures`.
pub fn parse_scene(
    content: &str,
    name: impl Into<String>,
    textures: &mut TextureCache,
) -> ParseResult<Scene> {
    SceneParser::new(name, textures).parse(content)
}
