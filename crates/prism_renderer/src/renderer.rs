//! Render driver.
//!
//! Buckets are rendered in parallel with rayon. Each bucket seeds its own
//! generator from the render seed and its index, so a fixed seed gives the
//! same image on any number of threads.

use std::time::Instant;

use prism_core::Scene;
use prism_math::{color_to_rgb8, Color};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;

use crate::bucket::{generate_buckets, render_bucket, BucketResult, DEFAULT_BUCKET_SIZE};
use crate::camera::Camera;
use crate::shading::{shade, RayState};

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Bucket edge length in pixels
    pub bucket_size: u32,

    /// Base seed for the soft-shadow jitter
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            bucket_size: DEFAULT_BUCKET_SIZE,
            seed: 0,
        }
    }
}

/// Shade the primary ray through pixel (x, y).
pub fn render_pixel(camera: &Camera, scene: &Scene, x: u32, y: u32, rng: &mut dyn RngCore) -> Color {
    let ray = camera.get_ray(x, y);
    shade(&ray, scene, RayState::primary(scene), rng)
}

/// Linear RGB image, row-major, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; width as usize * height as usize],
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let idx = self.index(x, y);
        self.pixels[idx] = color;
    }

    /// Copy a rendered bucket into place.
    pub fn write_bucket(&mut self, result: &BucketResult) {
        let bucket = &result.bucket;
        let rows = result.pixels.chunks(bucket.width.max(1) as usize);
        for (dy, row) in (0..bucket.height).zip(rows) {
            let start = self.index(bucket.x, bucket.y + dy);
            self.pixels[start..start + row.len()].copy_from_slice(row);
        }
    }

    /// Convert to packed 8-bit RGB.
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|color| color_to_rgb8(*color))
            .collect()
    }
}

/// Render the whole scene.
pub fn render(scene: &Scene, config: &RenderConfig) -> ImageBuffer {
    render_with_progress(scene, config, |_| {})
}

/// Render the whole scene, calling `on_bucket` from the worker thread as
/// each bucket finishes.
pub fn render_with_progress<F>(scene: &Scene, config: &RenderConfig, on_bucket: F) -> ImageBuffer
where
    F: Fn(&BucketResult) + Sync,
{
    let start = Instant::now();
    let camera = Camera::from_scene(scene);
    let buckets = generate_buckets(scene.width, scene.height, config.bucket_size);

    log::info!(
        "Rendering '{}' at {}x{}: {} primitives, {} lights, {} buckets",
        scene.name,
        scene.width,
        scene.height,
        scene.primitive_count(),
        scene.lights.len(),
        buckets.len()
    );

    let results: Vec<BucketResult> = buckets
        .par_iter()
        .map(|bucket| {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(bucket.index as u64));
            let pixels = render_bucket(bucket, &camera, scene, &mut rng);
            let result = BucketResult::new(*bucket, pixels);
            on_bucket(&result);
            result
        })
        .collect();

    let mut image = ImageBuffer::new(scene.width, scene.height);
    for result in &results {
        image.write_bucket(result);
    }

    log::info!("Render finished in {:.2?}", start.elapsed());
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use prism_core::{Light, Material, Sphere, View};
    use prism_math::Vec3;

    fn init_logger() {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    }

    /// Sphere at (0, 0, -10) seen head-on by a 3x3, 90 degree camera.
    fn single_sphere_scene() -> Scene {
        let mut scene = Scene::new("single", View::default(), 3, 3);
        scene.background.color = Color::new(0.0, 0.0, 0.25);
        let material = scene.add_material(Material {
            diffuse_color: Color::new(1.0, 0.5, 0.0),
            ambient: 0.2,
            diffuse: 0.8,
            ..Material::default()
        });
        scene
            .spheres
            .push(Sphere::new(Vec3::new(0.0, 0.0, -10.0), 1.0, material));
        scene.lights.push(Light::point(Vec3::new(0.0, 0.0, -10.0), 1.0));
        scene
    }

    #[test]
    fn test_render_single_sphere() {
        init_logger();
        let scene = single_sphere_scene();
        let image = render(&scene, &RenderConfig::default());

        assert_eq!((image.width, image.height), (3, 3));
        let center = image.get(1, 1);
        assert!((center - Color::new(0.2, 0.1, 0.0)).length() < 1e-6);
        assert_eq!(image.get(0, 0), scene.background.color);
        assert_eq!(image.get(2, 2), scene.background.color);
    }

    #[test]
    fn test_small_buckets_match_single_bucket() {
        let scene = single_sphere_scene();
        let whole = render(&scene, &RenderConfig::default());
        let tiled = render(
            &scene,
            &RenderConfig {
                bucket_size: 2,
                seed: 0,
            },
        );
        assert_eq!(whole, tiled);
    }

    #[test]
    fn test_soft_shadow_render_is_deterministic() {
        let mut scene = Scene::new("soft", View::default(), 8, 8).with_soft_shadows(true);
        let floor = scene.add_material(Material::new(Color::ONE));
        scene
            .spheres
            .push(Sphere::new(Vec3::new(0.0, -101.0, -5.0), 100.0, floor));
        scene
            .spheres
            .push(Sphere::new(Vec3::new(0.0, 0.0, -5.0), 0.5, floor));
        scene.lights.push(Light::point(Vec3::new(0.0, 5.0, -5.0), 1.0));

        let config = RenderConfig {
            bucket_size: 4,
            seed: 7,
        };
        let first = render(&scene, &config);
        let second = render(&scene, &config);
        assert_eq!(first, second);
        assert!(first
            .pixels
            .iter()
            .all(|c| c.min_element() >= 0.0 && c.max_element() <= 1.0));
    }

    #[test]
    fn test_progress_called_per_bucket() {
        let scene = Scene::new("progress", View::default(), 10, 7);
        let calls = AtomicUsize::new(0);
        let config = RenderConfig {
            bucket_size: 4,
            seed: 0,
        };
        render_with_progress(&scene, &config, |_| {
            calls.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(calls.load(Ordering::Relaxed), 3 * 2);
    }

    #[test]
    fn test_image_buffer() {
        let mut image = ImageBuffer::new(2, 2);
        image.set(1, 0, Color::new(1.0, 0.5, 2.0));
        image.set(0, 1, Color::new(-1.0, 0.0, 0.25));

        assert_eq!(image.get(1, 0), Color::new(1.0, 0.5, 2.0));
        assert_eq!(
            image.to_rgb8(),
            vec![0, 0, 0, 255, 127, 255, 0, 0, 63, 0, 0, 0]
        );
    }

    #[test]
    fn test_write_bucket() {
        use crate::bucket::Bucket;

        let mut image = ImageBuffer::new(3, 3);
        let red = Color::new(1.0, 0.0, 0.0);
        image.write_bucket(&BucketResult::new(Bucket::new(1, 1, 2, 2, 0), vec![red; 4]));

        assert_eq!(image.get(0, 0), Color::ZERO);
        assert_eq!(image.get(1, 1), red);
        assert_eq!(image.get(2, 2), red);
        assert_eq!(image.get(0, 2), Color::ZERO);
    }
}
