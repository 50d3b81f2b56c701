//! Recursive Whitted shading.
//!
//! `shade` traces one ray and returns its color: Blinn-Phong local
//! illumination with shadows and depth cueing, then a Fresnel-weighted
//! reflection, then refraction through transparent surfaces.

use std::f32::consts::PI;

use prism_core::{Light, LightKind, Scene};
use prism_math::{clamp_color, normalize_or_self, Color, Ray, Vec3};
use rand::{Rng, RngCore};

use crate::hit::{Exclusion, Intersection};
use crate::intersect::{intersect, material_of, nearest_hit, passes_occlusion_prepass};

/// Maximum reflection depth. Refraction does not count against it.
pub const MAX_DEPTH: u32 = 3;

/// Jittered shadow rays per light in soft-shadow mode, on top of the
/// central ray.
pub const SOFT_SHADOW_SAMPLES: usize = 50;

/// Scale of the random offset added to jittered shadow directions.
pub const SHADOW_JITTER: f32 = 0.005;

/// Bound on chained refractions, which would otherwise recurse without
/// limit between facing transparent surfaces.
pub const MAX_TRANSMISSIONS: u32 = 16;

/// Per-ray recursion state, passed by value down each branch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayState {
    pub exclusion: Exclusion,

    /// Reflection depth
    pub depth: u32,

    /// Multiplier applied to every light's shadow factor
    pub shadow: f32,

    /// Refraction index of the medium the ray travels through
    pub refraction_index: f32,

    /// Camera rays run the occlusion pre-pass, secondary rays do not
    pub primary: bool,

    /// Number of refractions along this path
    pub transmissions: u32,
}

impl RayState {
    /// State of a camera ray starting in the scene's background medium.
    pub fn primary(scene: &Scene) -> Self {
        Self {
            exclusion: Exclusion::NONE,
            depth: 0,
            shadow: 1.0,
            refraction_index: scene.background.refraction_index,
            primary: true,
            transmissions: 0,
        }
    }

    fn reflected(self, exclusion: Exclusion) -> Self {
        Self {
            exclusion,
            depth: self.depth + 1,
            primary: false,
            ..self
        }
    }

    fn refracted(self, exclusion: Exclusion, refraction_index: f32) -> Self {
        Self {
            exclusion,
            refraction_index,
            transmissions: self.transmissions + 1,
            primary: false,
            ..self
        }
    }
}

/// Orientation of the hit surface relative to the incoming ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interface {
    /// Surface normal facing the incoming ray
    pub normal: Vec3,

    /// The ray is leaving the primitive's volume
    pub exiting: bool,

    /// Refraction index on the incoming side
    pub n_cur: f32,

    /// Refraction index on the far side
    pub n_next: f32,
}

impl Interface {
    pub fn new(hit: &Intersection, scene: &Scene, state: &RayState) -> Self {
        let exiting = hit.normal.dot(hit.incident) >= 0.0;
        if exiting {
            Self {
                normal: -hit.normal,
                exiting,
                n_cur: hit.material.refraction_index,
                n_next: scene.background.refraction_index,
            }
        } else {
            Self {
                normal: hit.normal,
                exiting,
                n_cur: state.refraction_index,
                n_next: hit.material.refraction_index,
            }
        }
    }

    /// Schlick's approximation of the Fresnel reflectance.
    pub fn fresnel(&self, incident: Vec3) -> f32 {
        let f0 = ((self.n_next - self.n_cur) / (self.n_next + self.n_cur)).powi(2);
        let cos = self.normal.dot(-incident).clamp(0.0, 1.0);
        f0 + (1.0 - f0) * (1.0 - cos).powi(5)
    }
}

/// Color seen along `ray`.
pub fn shade(ray: &Ray, scene: &Scene, state: RayState, rng: &mut dyn RngCore) -> Color {
    trace(ray, scene, state, rng).0
}

/// Color seen along `ray` and the distance to the surface it hit
/// (infinite on a miss).
fn trace(ray: &Ray, scene: &Scene, state: RayState, rng: &mut dyn RngCore) -> (Color, f32) {
    let background = (scene.background.color, f32::INFINITY);

    if state.depth > MAX_DEPTH || state.transmissions > MAX_TRANSMISSIONS {
        return background;
    }
    if state.primary && !passes_occlusion_prepass(ray, scene) {
        return background;
    }

    match intersect(ray, scene, state.exclusion) {
        Some(hit) => (shade_hit(&hit, scene, state, rng), hit.distance),
        None => background,
    }
}

fn shade_hit(hit: &Intersection, scene: &Scene, state: RayState, rng: &mut dyn RngCore) -> Color {
    let local = illuminate(hit, scene, state.shadow, rng);
    let interface = Interface::new(hit, scene, &state);
    let fresnel = interface.fresnel(hit.incident);

    let reflection = apply_reflection(hit, scene, state, &interface, local, fresnel, rng);
    apply_transparency(hit, scene, state, &interface, reflection, fresnel, rng)
}

/// Blinn-Phong illumination from every light, clamped to [0, 1].
pub fn illuminate(hit: &Intersection, scene: &Scene, shadow: f32, rng: &mut dyn RngCore) -> Color {
    let material = &hit.material;

    let (diffuse_color, specular_color) = match scene.depth_cueing.filter(|cue| cue.is_enabled()) {
        Some(cue) => {
            let weight = cue.weight(scene.view.eye.distance(hit.point));
            let fog = cue.color * (1.0 - weight);
            (
                material.diffuse_color * weight + fog,
                material.specular_color * weight + fog,
            )
        }
        None => (material.diffuse_color, material.specular_color),
    };

    let mut color = diffuse_color * material.ambient;

    for light in &scene.lights {
        let to_light = light_direction(light, hit.point);
        let halfway = normalize_or_self(to_light - hit.incident);

        let n_dot_l = hit.normal.dot(to_light).max(0.0);
        let n_dot_h = hit.normal.dot(halfway).max(0.0);

        let diffuse = diffuse_color * material.diffuse * n_dot_l;
        let specular = specular_color * material.specular * n_dot_h.powf(material.specular_exponent);

        let falloff = match light.kind {
            LightKind::Point => light.attenuation.factor(hit.point.distance(light.position)),
            LightKind::Directional => 1.0,
        };
        let visibility = shadow * shadow_factor(hit, scene, light, rng);

        color += (diffuse + specular) * light.intensity * falloff * visibility;
    }

    clamp_color(color)
}

/// Unit vector from `point` toward `light`.
pub fn light_direction(light: &Light, point: Vec3) -> Vec3 {
    match light.kind {
        LightKind::Point => normalize_or_self(light.position - point),
        LightKind::Directional => normalize_or_self(-light.position),
    }
}

/// Fraction of `light` reaching the hit point, in [0, 1].
///
/// Hard shadows cast one ray and pass `1 - alpha` of the nearest occluder.
/// Soft shadows count how many of `SOFT_SHADOW_SAMPLES` jittered rays are
/// blocked; when the central ray meets a translucent occluder that blocked
/// fraction is scaled by `1 - alpha`.
pub fn shadow_factor(hit: &Intersection, scene: &Scene, light: &Light, rng: &mut dyn RngCore) -> f32 {
    let direction = light_direction(light, hit.point);
    let max_distance = match light.kind {
        LightKind::Point => hit.point.distance(light.position),
        LightKind::Directional => f32::INFINITY,
    };

    let central = occluder_alpha(&Ray::new(hit.point, direction), scene, hit.exclusion, max_distance);
    if !scene.soft_shadows {
        return central.map_or(1.0, |alpha| (1.0 - alpha).clamp(0.0, 1.0));
    }

    let blocked = (0..SOFT_SHADOW_SAMPLES)
        .filter(|_| {
            let jitter = random_unit_vector(rng) * SHADOW_JITTER;
            let ray = Ray::new(hit.point, direction + jitter);
            occluder_alpha(&ray, scene, hit.exclusion, max_distance).is_some()
        })
        .count();

    let mut fraction = blocked as f32 / SOFT_SHADOW_SAMPLES as f32;
    if let Some(alpha) = central.filter(|&alpha| alpha < 1.0) {
        fraction *= 1.0 - alpha;
    }
    (1.0 - fraction).clamp(0.0, 1.0)
}

/// Opacity of the nearest occluder along a shadow ray closer than
/// `max_distance`, or `None` when nothing blocks.
fn occluder_alpha(ray: &Ray, scene: &Scene, exclusion: Exclusion, max_distance: f32) -> Option<f32> {
    nearest_hit(ray, scene, exclusion)
        .filter(|hit| hit.distance < max_distance)
        .map(|hit| material_of(scene, &hit.kind).alpha)
}

/// Uniformly distributed direction on the unit sphere.
pub fn random_unit_vector(rng: &mut dyn RngCore) -> Vec3 {
    let z = 1.0 - 2.0 * rng.gen::<f32>();
    let phi = 2.0 * PI * rng.gen::<f32>();
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Mirror `incident` about `normal`.
pub fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - normal * 2.0 * incident.dot(normal)
}

/// Blend the local color with a recursive mirror reflection.
///
/// Only surfaces with a specular coefficient reflect. The local color is
/// weighted by `1 - fresnel` and the reflection by `fresnel`; a base that
/// ends up exactly black gets no reflection either.
pub fn apply_reflection(
    hit: &Intersection,
    scene: &Scene,
    state: RayState,
    interface: &Interface,
    local: Color,
    fresnel: f32,
    rng: &mut dyn RngCore,
) -> Color {
    if hit.material.specular <= 0.0 {
        return local;
    }

    let base = clamp_color(local * (1.0 - fresnel));
    if base == Color::ZERO {
        return base;
    }

    let exclusion = if interface.exiting {
        hit.exclusion.faces_only()
    } else {
        hit.exclusion
    };
    let ray = Ray::new(hit.point, reflect(hit.incident, interface.normal));
    let reflected = shade(&ray, scene, state.reflected(exclusion), rng);

    clamp_color(base + reflected * fresnel)
}

/// Add light refracted through a transparent surface.
///
/// Opaque surfaces and total internal reflection return `reflection`
/// unchanged.
pub fn apply_transparency(
    hit: &Intersection,
    scene: &Scene,
    state: RayState,
    interface: &Interface,
    reflection: Color,
    fresnel: f32,
    rng: &mut dyn RngCore,
) -> Color {
    let material = &hit.material;
    if material.is_opaque() {
        return reflection;
    }

    let normal = interface.normal;
    let toward_eye = -hit.incident;
    let cos_i = normal.dot(toward_eye);
    let eta = interface.n_cur / interface.n_next;
    let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if k < 0.0 {
        return reflection;
    }

    let direction = -normal * k.sqrt() + (normal * cos_i - toward_eye) * eta;
    let ray = Ray::new(hit.point, direction);
    let next = state.refracted(hit.exclusion.faces_only(), interface.n_next);
    let (transmitted, distance) = trace(&ray, scene, next, rng);

    // Beer's law over the path inside the volume
    let absorption = if !interface.exiting && material.attenuation > 0.0 && distance.is_finite() {
        (-material.attenuation * distance).exp()
    } else {
        1.0
    };

    clamp_color(reflection + transmitted * absorption * (1.0 - fresnel) * (1.0 - material.alpha))
}
