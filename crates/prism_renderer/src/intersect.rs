//! Ray-scene intersection.
//!
//! Every query tests spheres, then ellipsoids, then faces. A candidate only
//! replaces the current best when it is strictly nearer, so ties go to the
//! earlier primitive kind and index.

use prism_core::{Face, Material, Mesh, Scene};
use prism_math::{Interval, Ray, Vec2, Vec3};

use crate::hit::{Exclusion, FaceHit, Hit, HitKind, Intersection, TangentBasis};
use crate::surface;

/// Offset applied per axis when deciding whether a hit is a self-hit.
pub const SELF_HIT_EPSILON: f32 = 1e-2;

/// Hits nearer than `|(ε, ε, ε)|` are treated as the ray's own surface.
pub const MIN_HIT_DISTANCE: f32 = SELF_HIT_EPSILON * 1.732_050_8;

/// Tolerance for rays parallel to a face plane and singular barycentric
/// systems, relative to the unit normal and the squared edge lengths.
pub const GEOMETRY_EPSILON: f32 = 1e-6;

/// Parameter range a hit must fall strictly inside.
fn accept_range(closest: f32) -> Interval {
    Interval::new(MIN_HIT_DISTANCE, closest)
}

/// Nearest root of `|O + tD - C|^2 = r^2` inside `range`.
pub fn hit_sphere(ray: &Ray, center: Vec3, radius: f32, range: Interval) -> Option<f32> {
    let oc = center - ray.origin;
    let a = ray.direction.length_squared();
    let h = ray.direction.dot(oc);
    let c = oc.length_squared() - radius * radius;

    nearest_root(a, h, c, range)
}

/// Nearest root for an axis-aligned ellipsoid. Each axis is scaled by its
/// own radius, turning the ellipsoid into a unit sphere.
pub fn hit_ellipsoid(ray: &Ray, center: Vec3, radii: Vec3, range: Interval) -> Option<f32> {
    let inv = radii.recip();
    let d = ray.direction * inv;
    let oc = (center - ray.origin) * inv;

    let a = d.length_squared();
    let h = d.dot(oc);
    let c = oc.length_squared() - 1.0;

    nearest_root(a, h, c, range)
}

/// Solve `a t^2 - 2 h t + c = 0` and return the smaller root inside `range`.
/// A zero discriminant yields the single tangent root.
fn nearest_root(a: f32, h: f32, c: f32, range: Interval) -> Option<f32> {
    if a == 0.0 {
        return None;
    }

    let discriminant = h * h - a * c;
    if discriminant < 0.0 {
        return None;
    }

    let sqrtd = discriminant.sqrt();
    let near = (h - sqrtd) / a;
    if range.surrounds(near) {
        return Some(near);
    }
    let far = (h + sqrtd) / a;
    range.surrounds(far).then_some(far)
}

/// Plane intersection followed by a strictly-interior barycentric test.
pub fn hit_face(
    ray: &Ray,
    mesh: &Mesh,
    face_idx: usize,
    face: &Face,
    range: Interval,
) -> Option<(f32, FaceHit)> {
    let [p0, p1, p2] = mesh.face_positions(face);
    let e1 = p1 - p0;
    let e2 = p2 - p0;

    let normal = e1.cross(e2).normalize_or_zero();
    let denominator = normal.dot(ray.direction);
    if denominator.abs() < GEOMETRY_EPSILON {
        return None;
    }

    let t = normal.dot(p0 - ray.origin) / denominator;
    if !range.surrounds(t) {
        return None;
    }

    let ep = ray.at(t) - p0;
    let d11 = e1.dot(e1);
    let d12 = e1.dot(e2);
    let d22 = e2.dot(e2);
    let d1p = e1.dot(ep);
    let d2p = e2.dot(ep);

    let determinant = d11 * d22 - d12 * d12;
    if determinant.abs() <= GEOMETRY_EPSILON * d11 * d22 {
        return None;
    }

    let beta = (d22 * d1p - d12 * d2p) / determinant;
    let gamma = (d11 * d2p - d12 * d1p) / determinant;
    let alpha = 1.0 - beta - gamma;

    let interior = Interval::new(0.0, 1.0);
    if !(interior.surrounds(alpha) && interior.surrounds(beta) && interior.surrounds(gamma)) {
        return None;
    }

    let tangent_basis = mesh
        .face_uvs(face)
        .and_then(|uvs| tangent_basis(e1, e2, uvs));

    Some((
        t,
        FaceHit {
            face: face_idx,
            normal,
            alpha,
            beta,
            gamma,
            tangent_basis,
        },
    ))
}

/// Tangent and bitangent from the UV deltas along the two face edges.
/// Returns `None` when the UV mapping is degenerate.
fn tangent_basis(e1: Vec3, e2: Vec3, uvs: [Vec2; 3]) -> Option<TangentBasis> {
    let [uv0, uv1, uv2] = uvs;
    let du1 = uv1.x - uv0.x;
    let du2 = uv2.x - uv0.x;
    let dv1 = uv1.y - uv0.y;
    let dv2 = uv2.y - uv0.y;

    let denominator = -du1 * dv2 + du2 * dv1;
    if denominator.abs() < GEOMETRY_EPSILON {
        return None;
    }
    let d = 1.0 / denominator;

    let tangent = ((e1 * -dv2 + e2 * dv1) * d).try_normalize()?;
    let bitangent = ((e1 * -du2 + e2 * du1) * d).try_normalize()?;
    Some(TangentBasis { tangent, bitangent })
}

/// Find the nearest hit along `ray`, skipping excluded primitives.
pub fn nearest_hit(ray: &Ray, scene: &Scene, exclusion: Exclusion) -> Option<Hit> {
    let mut closest = f32::INFINITY;
    let mut kind = None;

    for (idx, sphere) in scene.spheres.iter().enumerate() {
        if exclusion.sphere == Some(idx) {
            continue;
        }
        if let Some(t) = hit_sphere(ray, sphere.center, sphere.radius, accept_range(closest)) {
            closest = t;
            kind = Some(HitKind::Sphere(idx));
        }
    }

    for (idx, ellipsoid) in scene.ellipsoids.iter().enumerate() {
        if exclusion.ellipsoid == Some(idx) {
            continue;
        }
        if let Some(t) = hit_ellipsoid(ray, ellipsoid.center, ellipsoid.radii, accept_range(closest)) {
            closest = t;
            kind = Some(HitKind::Ellipsoid(idx));
        }
    }

    for (idx, face) in scene.mesh.faces.iter().enumerate() {
        if exclusion.face == Some(idx) {
            continue;
        }
        if let Some((t, face_hit)) = hit_face(ray, &scene.mesh, idx, face, accept_range(closest)) {
            closest = t;
            kind = Some(HitKind::Triangle(face_hit));
        }
    }

    kind.map(|kind| Hit {
        distance: closest,
        kind,
    })
}

/// Material bound to the primitive behind `kind`, without texture lookups.
pub fn material_of<'a>(scene: &'a Scene, kind: &HitKind) -> &'a Material {
    let idx = match kind {
        HitKind::Sphere(idx) => scene.spheres[*idx].material,
        HitKind::Ellipsoid(idx) => scene.ellipsoids[*idx].material,
        HitKind::Triangle(face) => scene.mesh.faces[face.face].material,
    };
    &scene.materials[idx]
}

/// Find and resolve the nearest hit along `ray`.
///
/// Returns `None` when nothing is hit. Geometric degeneracies (parallel
/// rays, singular barycentric systems, negative discriminants) only
/// disqualify the primitive concerned.
pub fn intersect(ray: &Ray, scene: &Scene, exclusion: Exclusion) -> Option<Intersection> {
    nearest_hit(ray, scene, exclusion).map(|hit| surface::resolve(scene, ray, hit))
}

/// Coarse rejection test against the scene's culling spheres.
///
/// Returns true when the full intersection pass is needed: either no
/// culling spheres are defined or at least one of them is hit.
pub fn passes_occlusion_prepass(ray: &Ray, scene: &Scene) -> bool {
    scene.culling_spheres.is_empty()
        || scene
            .culling_spheres
            .iter()
            .any(|s| hit_sphere(ray, s.center, s.radius, accept_range(f32::INFINITY)).is_some())
}
