//! Intersection records shared by the intersection and shading passes.

use prism_core::Material;
use prism_math::Vec3;

/// Primitives a ray must ignore, at most one per primitive kind.
///
/// Secondary rays start exactly on a surface; excluding that surface keeps
/// them from immediately hitting it again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Exclusion {
    pub sphere: Option<usize>,
    pub ellipsoid: Option<usize>,
    pub face: Option<usize>,
}

impl Exclusion {
    pub const NONE: Exclusion = Exclusion {
        sphere: None,
        ellipsoid: None,
        face: None,
    };

    /// Exclude exactly the primitive that was hit.
    pub fn for_hit(kind: &HitKind) -> Self {
        match kind {
            HitKind::Sphere(idx) => Exclusion {
                sphere: Some(*idx),
                ..Self::NONE
            },
            HitKind::Ellipsoid(idx) => Exclusion {
                ellipsoid: Some(*idx),
                ..Self::NONE
            },
            HitKind::Triangle(face) => Exclusion {
                face: Some(face.face),
                ..Self::NONE
            },
        }
    }

    /// Drop the sphere and ellipsoid entries, keeping the face entry.
    ///
    /// Used for rays that must be able to reach the far side of the closed
    /// volume they start on.
    pub fn faces_only(self) -> Self {
        Exclusion {
            face: self.face,
            ..Self::NONE
        }
    }
}

/// Tangent frame derived from a face's texture coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TangentBasis {
    pub tangent: Vec3,
    pub bitangent: Vec3,
}

/// Triangle-specific hit data.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceHit {
    /// Index into `Mesh::faces`
    pub face: usize,

    /// Unit geometric normal, `normalize(e1 x e2)`
    pub normal: Vec3,

    /// Barycentric weights of the three corners, each strictly in (0, 1)
    pub alpha: f32,
    pub beta: f32,
    pub gamma: f32,

    /// Present when the face has usable texture coordinates
    pub tangent_basis: Option<TangentBasis>,
}

/// Which primitive a ray hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HitKind {
    Sphere(usize),
    Ellipsoid(usize),
    Triangle(FaceHit),
}

/// The nearest raw hit along a ray, before surface attributes are resolved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub distance: f32,
    pub kind: HitKind,
}

/// A fully resolved hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    pub distance: f32,
    pub kind: HitKind,

    /// World-space hit point
    pub point: Vec3,

    /// Unit surface normal after vertex-normal blending and normal mapping
    pub normal: Vec3,

    /// Copy of the primitive's material, with the diffuse color replaced
    /// by the texture lookup when the primitive is textured
    pub material: Material,

    /// Direction of the ray that produced this hit
    pub incident: Vec3,

    /// Exclusion for rays spawned from `point`
    pub exclusion: Exclusion,
}
