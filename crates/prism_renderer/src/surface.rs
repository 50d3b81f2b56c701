//! Surface attribute resolution.
//!
//! Turns a raw `Hit` into an `Intersection`: the shading normal (vertex
//! normal blending, normal mapping) and the material copy with its diffuse
//! color replaced by the texture lookup.

use std::f32::consts::PI;
use std::sync::Arc;

use prism_core::{Ellipsoid, Material, Scene, Sphere, Texture};
use prism_math::{normalize_or_self, tangent_to_world, Color, Ray, Vec2, Vec3};

use crate::hit::{Exclusion, FaceHit, Hit, HitKind, Intersection};
use crate::intersect::GEOMETRY_EPSILON;

/// Resolve normal and material for the nearest hit along `ray`.
pub fn resolve(scene: &Scene, ray: &Ray, hit: Hit) -> Intersection {
    let point = ray.at(hit.distance);
    let (normal, material) = match &hit.kind {
        HitKind::Sphere(idx) => sphere_surface(scene, &scene.spheres[*idx], point),
        HitKind::Ellipsoid(idx) => {
            let ellipsoid = &scene.ellipsoids[*idx];
            (
                ellipsoid_normal(ellipsoid, point),
                scene.materials[ellipsoid.material],
            )
        }
        HitKind::Triangle(face_hit) => face_surface(scene, face_hit),
    };

    Intersection {
        distance: hit.distance,
        kind: hit.kind,
        point,
        normal,
        material,
        incident: ray.direction,
        exclusion: Exclusion::for_hit(&hit.kind),
    }
}

/// Look up a texture that is safe to sample. Invalid textures are skipped.
fn usable(maps: &[Arc<Texture>], idx: Option<usize>) -> Option<&Texture> {
    idx.and_then(|i| maps.get(i))
        .map(|texture| &**texture)
        .filter(|texture| texture.is_valid())
}

fn sphere_surface(scene: &Scene, sphere: &Sphere, point: Vec3) -> (Vec3, Material) {
    let mut material = scene.materials[sphere.material];
    let mut normal = normalize_or_self((point - sphere.center) / sphere.radius);

    if let Some(texture) = usable(&scene.textures, sphere.texture) {
        let uv = sphere_uv(normal);

        if let Some(normal_map) = usable(&scene.normal_maps, sphere.normal_map) {
            let (x, y) = nearest_texel(normal_map, uv);
            let (tangent, bitangent) = sphere_tangent_basis(normal);
            normal = perturb_normal(normal_map.normal_at(x, y), tangent, bitangent, normal);
        }

        let (x, y) = nearest_texel(texture, uv);
        material.diffuse_color = texture.color_at(x, y);
    }

    (normal, material)
}

/// Spherical texture coordinates for a unit normal.
///
/// `u` follows the azimuth `atan2(n.y, n.x)` wrapped to [0, 1) and `v` the
/// polar angle `acos(n.z)` scaled to [0, 1].
pub fn sphere_uv(normal: Vec3) -> Vec2 {
    let phi = normal.z.clamp(-1.0, 1.0).acos();
    let theta = normal.y.atan2(normal.x);
    Vec2::new((theta / (2.0 * PI)).rem_euclid(1.0), phi / PI)
}

/// Analytic tangent frame of a sphere at unit normal `n`.
///
/// At the poles the azimuth is undefined and the tangent falls back to +X.
pub fn sphere_tangent_basis(n: Vec3) -> (Vec3, Vec3) {
    let rho = (n.x * n.x + n.y * n.y).sqrt();
    let tangent = if rho < GEOMETRY_EPSILON {
        Vec3::X
    } else {
        normalize_or_self(Vec3::new(-n.y / rho, n.x / rho, 0.0))
    };
    let bitangent = Vec3::new(-n.z * tangent.y, n.z * tangent.x, rho);
    (tangent, bitangent)
}

/// Gradient of the implicit ellipsoid surface at `point`.
pub fn ellipsoid_normal(ellipsoid: &Ellipsoid, point: Vec3) -> Vec3 {
    let radii_sq = ellipsoid.radii * ellipsoid.radii;
    normalize_or_self((point - ellipsoid.center) / radii_sq)
}

fn face_surface(scene: &Scene, hit: &FaceHit) -> (Vec3, Material) {
    let mesh = &scene.mesh;
    let face = &mesh.faces[hit.face];
    let mut material = scene.materials[face.material];

    let mut normal = match mesh.face_normals(face) {
        Some([n0, n1, n2]) => normalize_or_self(
            normalize_or_self(n0) * hit.alpha
                + normalize_or_self(n1) * hit.beta
                + normalize_or_self(n2) * hit.gamma,
        ),
        None => hit.normal,
    };

    let texture = usable(&scene.textures, face.texture);
    if let (Some(texture), Some([uv0, uv1, uv2])) = (texture, mesh.face_uvs(face)) {
        let blended = uv0 * hit.alpha + uv1 * hit.beta + uv2 * hit.gamma;
        let uv = Vec2::new(blended.x.rem_euclid(1.0), blended.y.rem_euclid(1.0));

        if let (Some(normal_map), Some(basis)) = (
            usable(&scene.normal_maps, face.normal_map),
            hit.tangent_basis,
        ) {
            let (x, y) = nearest_texel(normal_map, uv);
            normal = perturb_normal(normal_map.normal_at(x, y), basis.tangent, basis.bitangent, normal);
        }

        material.diffuse_color = sample_bilinear(texture, uv);
    }

    (normal, material)
}

/// Replace `normal` with the normal-map texel expressed in the tangent frame.
fn perturb_normal(texel: Vec3, tangent: Vec3, bitangent: Vec3, normal: Vec3) -> Vec3 {
    let m = normalize_or_self(texel);
    normalize_or_self(tangent_to_world(m, tangent, bitangent, normal))
}

/// Nearest texel for `uv`: `round(c * (size - 1))` wrapped modulo `size - 1`.
pub fn nearest_texel(texture: &Texture, uv: Vec2) -> (u32, u32) {
    (
        wrap_index(uv.x, texture.width),
        wrap_index(uv.y, texture.height),
    )
}

fn wrap_index(coord: f32, size: u32) -> u32 {
    let last = size.saturating_sub(1);
    let span = last.max(1) as i64;
    let idx = (coord * last as f32).round() as i64;
    idx.rem_euclid(span) as u32
}

/// Bilinear filter of the 2x2 texel neighborhood around `uv` in [0, 1).
pub fn sample_bilinear(texture: &Texture, uv: Vec2) -> Color {
    let last_x = texture.width.saturating_sub(1);
    let last_y = texture.height.saturating_sub(1);
    let fx = uv.x * last_x as f32;
    let fy = uv.y * last_y as f32;

    let x0 = (fx.floor() as u32).min(last_x);
    let y0 = (fy.floor() as u32).min(last_y);
    let x1 = (x0 + 1).min(last_x);
    let y1 = (y0 + 1).min(last_y);

    let tx = fx - x0 as f32;
    let ty = fy - y0 as f32;

    let top = texture.color_at(x0, y0) * (1.0 - tx) + texture.color_at(x1, y0) * tx;
    let bottom = texture.color_at(x0, y1) * (1.0 - tx) + texture.color_at(x1, y1) * tx;
    top * (1.0 - ty) + bottom * ty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intersect::intersect;
    use prism_core::{Face, FaceVertex, View};

    fn assert_close(a: Vec3, b: Vec3, tolerance: f32) {
        assert!((a - b).length() < tolerance, "{:?} != {:?}", a, b);
    }

    fn scene_with_sphere() -> Scene {
        let mut scene = Scene::new("surface", View::default(), 4, 4);
        let white = scene.add_material(Material::new(Color::ONE));
        scene
            .spheres
            .push(Sphere::new(Vec3::new(0.0, 0.0, -10.0), 1.0, white));
        scene
    }

    fn forward_ray() -> Ray {
        Ray::new(Vec3::ZERO, Vec3::NEG_Z)
    }

    /// 3x3 texture whose texel (x, y) has red = 10x and green = 10y.
    fn gradient_texture() -> Texture {
        let mut pixels = Vec::new();
        for y in 0..3u8 {
            for x in 0..3u8 {
                pixels.push([x * 10, y * 10, 0]);
            }
        }
        Texture::new(3, 3, pixels, "gradient")
    }

    #[test]
    fn test_sphere_normal() {
        let scene = scene_with_sphere();
        let hit = intersect(&forward_ray(), &scene, Exclusion::NONE).unwrap();
        assert!((hit.distance - 9.0).abs() < 1e-5);
        assert_close(hit.normal, Vec3::Z, 1e-5);
    }

    #[test]
    fn test_sphere_uv() {
        let pole = sphere_uv(Vec3::Z);
        assert_eq!(pole, Vec2::new(0.0, 0.0));

        let side = sphere_uv(Vec3::NEG_X);
        assert!((side.x - 0.5).abs() < 1e-5);
        assert!((side.y - 0.5).abs() < 1e-5);

        // Negative azimuths wrap into [0, 1)
        let below = sphere_uv(Vec3::NEG_Y);
        assert!((below.x - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_wrap_index() {
        assert_eq!(wrap_index(0.0, 5), 0);
        assert_eq!(wrap_index(0.5, 5), 2);
        assert_eq!(wrap_index(1.0, 5), 0);
        assert_eq!(wrap_index(-0.25, 5), 3);
        assert_eq!(wrap_index(0.7, 1), 0);
    }

    #[test]
    fn test_sphere_texture_overrides_diffuse() {
        let mut scene = scene_with_sphere();
        scene.textures.push(Arc::new(gradient_texture()));
        scene.spheres[0].texture = Some(0);

        // The hit point is the sphere's +Z pole: u = 0, v = 0
        let hit = intersect(&forward_ray(), &scene, Exclusion::NONE).unwrap();
        assert_eq!(hit.material.diffuse_color, Color::ZERO);
        // The scene's material itself is untouched
        assert_eq!(scene.materials[0].diffuse_color, Color::ONE);
    }

    #[test]
    fn test_invalid_texture_is_ignored() {
        let mut scene = scene_with_sphere();
        let mut texture = gradient_texture();
        texture.max_value = 15;
        scene.textures.push(Arc::new(texture));
        scene.spheres[0].texture = Some(0);

        let hit = intersect(&forward_ray(), &scene, Exclusion::NONE).unwrap();
        assert_eq!(hit.material.diffuse_color, Color::ONE);
    }

    #[test]
    fn test_flat_normal_map_keeps_normal() {
        let mut scene = scene_with_sphere();
        scene.textures.push(Arc::new(Texture::solid_color([255, 255, 255])));
        scene
            .normal_maps
            .push(Arc::new(Texture::solid_color([128, 128, 255])));
        scene.spheres[0].texture = Some(0);
        scene.spheres[0].normal_map = Some(0);

        let hit = intersect(&forward_ray(), &scene, Exclusion::NONE).unwrap();
        assert_close(hit.normal, Vec3::Z, 1e-2);
        assert!((hit.normal.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_sphere_normal_map_tilts_toward_tangent() {
        let mut scene = scene_with_sphere();
        scene.textures.push(Arc::new(Texture::solid_color([255, 255, 255])));
        scene
            .normal_maps
            .push(Arc::new(Texture::solid_color([255, 128, 128])));
        scene.spheres[0].texture = Some(0);
        scene.spheres[0].normal_map = Some(0);

        // At the +Z pole the tangent frame is (X, Y, Z)
        let hit = intersect(&forward_ray(), &scene, Exclusion::NONE).unwrap();
        assert_close(hit.normal, Vec3::X, 1e-2);
        assert!((hit.normal.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_sphere_tangent_basis() {
        let n = Vec3::new(1.0, 1.0, 1.0).normalize();
        let (t, b) = sphere_tangent_basis(n);
        assert!(t.dot(n).abs() < 1e-5);
        assert!(b.dot(n).abs() < 1e-5);
        assert!(t.dot(b).abs() < 1e-5);

        let (pole_t, pole_b) = sphere_tangent_basis(Vec3::Z);
        assert_eq!(pole_t, Vec3::X);
        assert_eq!(pole_b, Vec3::Y);
    }

    #[test]
    fn test_ellipsoid_normal_is_gradient() {
        let ellipsoid = Ellipsoid::new(Vec3::ZERO, Vec3::new(2.0, 1.0, 1.0), 0);
        assert_close(ellipsoid_normal(&ellipsoid, Vec3::new(2.0, 0.0, 0.0)), Vec3::X, 1e-6);
        assert_close(ellipsoid_normal(&ellipsoid, Vec3::new(0.0, 1.0, 0.0)), Vec3::Y, 1e-6);

        let p = Vec3::new(2f32.sqrt(), 0.5f32.sqrt(), 0.0);
        let expected = Vec3::new(p.x / 4.0, p.y, 0.0).normalize();
        assert_close(ellipsoid_normal(&ellipsoid, p), expected, 1e-5);
    }

    #[test]
    fn test_bilinear_sampling() {
        let texture = Texture::new(2, 1, vec![[0, 0, 0], [255, 255, 255]], "ramp");
        let mid = sample_bilinear(&texture, Vec2::new(0.5, 0.0));
        assert_close(mid, Color::splat(0.5), 1e-5);

        let start = sample_bilinear(&texture, Vec2::new(0.0, 0.0));
        assert_close(start, Color::ZERO, 1e-6);
    }

    fn textured_face_scene() -> Scene {
        let mut scene = Scene::new("face", View::default(), 4, 4);
        scene.add_material(Material::new(Color::ONE));
        let mesh = &mut scene.mesh;
        mesh.positions = vec![
            Vec3::new(-1.0, -1.0, -2.0),
            Vec3::new(1.0, -1.0, -2.0),
            Vec3::new(0.0, 1.0, -2.0),
        ];
        mesh.uvs = vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.5, 1.0)];
        mesh.normals = vec![Vec3::new(0.0, 0.0, 2.0)];
        let corner = |i| FaceVertex::new(i).with_uv(i).with_normal(0);
        mesh.faces.push(Face::new([corner(0), corner(1), corner(2)], 0));
        scene
    }

    #[test]
    fn test_face_vertex_normals_are_blended() {
        let scene = textured_face_scene();
        let hit = intersect(&forward_ray(), &scene, Exclusion::NONE).unwrap();
        assert_close(hit.normal, Vec3::Z, 1e-5);
        assert_eq!(hit.exclusion.face, Some(0));
    }

    #[test]
    fn test_face_texture_is_filtered() {
        let mut scene = textured_face_scene();
        scene
            .textures
            .push(Arc::new(Texture::solid_color([51, 102, 204])));
        scene.mesh.faces[0].texture = Some(0);

        let hit = intersect(&forward_ray(), &scene, Exclusion::NONE).unwrap();
        assert_close(hit.material.diffuse_color, Color::new(0.2, 0.4, 0.8), 1e-5);
    }

    #[test]
    fn test_face_normal_map_uses_uv_tangent() {
        let mut scene = textured_face_scene();
        scene.textures.push(Arc::new(Texture::solid_color([255, 255, 255])));
        scene
            .normal_maps
            .push(Arc::new(Texture::solid_color([255, 128, 128])));
        scene.mesh.faces[0].texture = Some(0);
        scene.mesh.faces[0].normal_map = Some(0);

        let hit = intersect(&forward_ray(), &scene, Exclusion::NONE).unwrap();
        // u grows along +X on this face, so the tilted texel points there
        assert_close(hit.normal, Vec3::X, 1e-2);

        // Without a texture the normal map is not applied
        scene.mesh.faces[0].texture = None;
        let hit = intersect(&forward_ray(), &scene, Exclusion::NONE).unwrap();
        assert_close(hit.normal, Vec3::Z, 1e-5);
    }
}
