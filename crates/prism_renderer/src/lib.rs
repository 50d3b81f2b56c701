//! Prism Renderer - CPU Whitted ray tracing
//!
//! Traces one primary ray per pixel and shades it recursively:
//! Blinn-Phong lighting with hard or soft shadows, Fresnel-weighted
//! mirror reflection and refraction through transparent surfaces.
//! Buckets of pixels are rendered in parallel with rayon.

mod bucket;
mod camera;
mod hit;
mod intersect;
mod output;
mod renderer;
mod shading;
mod surface;

pub use bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use camera::Camera;
pub use hit::{Exclusion, FaceHit, Hit, HitKind, Intersection, TangentBasis};
pub use intersect::{
    hit_ellipsoid, hit_face, hit_sphere, intersect, material_of, nearest_hit,
    passes_occlusion_prepass, GEOMETRY_EPSILON, MIN_HIT_DISTANCE, SELF_HIT_EPSILON,
};
pub use output::{save_png, save_ppm, write_ppm, OutputError, OutputResult};
pub use renderer::{render, render_pixel, render_with_progress, ImageBuffer, RenderConfig};
pub use shading::{
    apply_reflection, apply_transparency, illuminate, light_direction, random_unit_vector,
    reflect, shade, shadow_factor, Interface, RayState, MAX_DEPTH, MAX_TRANSMISSIONS,
    SHADOW_JITTER, SOFT_SHADOW_SAMPLES,
};
pub use surface::{ellipsoid_normal, nearest_texel, resolve, sample_bilinear, sphere_tangent_basis, sphere_uv};

/// Re-export common math types from prism_math
pub use prism_math::{Color, Interval, Ray, Vec3};
