//! Bucket-based tile rendering.
//!
//! The image is cut into square tiles that render independently, so rayon
//! can hand them to worker threads without any shared mutable state.

use prism_core::Scene;
use prism_math::Color;
use rand::RngCore;

use crate::camera::Camera;
use crate::renderer::render_pixel;

/// A rectangular region of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// Top-left corner in pixels
    pub x: u32,
    pub y: u32,

    pub width: u32,
    pub height: u32,

    /// Position in the render order, also used to seed the bucket's RNG
    pub index: usize,
}

impl Bucket {
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Squared distance from the bucket's center to `(cx, cy)`.
    fn distance_sq_to(&self, cx: f32, cy: f32) -> f32 {
        let bx = self.x as f32 + self.width as f32 / 2.0;
        let by = self.y as f32 + self.height as f32 / 2.0;
        (bx - cx).powi(2) + (by - cy).powi(2)
    }
}

/// Default bucket edge length in pixels.
pub const DEFAULT_BUCKET_SIZE: u32 = 64;

/// Cover a `width` x `height` image with buckets, center-most first.
///
/// Edge buckets are cropped to the image. Indices follow the sorted order.
pub fn generate_buckets(width: u32, height: u32, bucket_size: u32) -> Vec<Bucket> {
    let size = bucket_size.max(1);

    let mut buckets: Vec<Bucket> = (0..height)
        .step_by(size as usize)
        .flat_map(|y| {
            (0..width).step_by(size as usize).map(move |x| {
                Bucket::new(x, y, size.min(width - x), size.min(height - y), 0)
            })
        })
        .collect();

    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    buckets.sort_by(|a, b| a.distance_sq_to(cx, cy).total_cmp(&b.distance_sq_to(cx, cy)));

    for (i, bucket) in buckets.iter_mut().enumerate() {
        bucket.index = i;
    }
    buckets
}

/// Render every pixel of `bucket`, row-major within the bucket.
pub fn render_bucket(
    bucket: &Bucket,
    camera: &Camera,
    scene: &Scene,
    rng: &mut dyn RngCore,
) -> Vec<Color> {
    let mut pixels = Vec::with_capacity(bucket.pixel_count() as usize);
    for y in bucket.y..bucket.y + bucket.height {
        for x in bucket.x..bucket.x + bucket.width {
            pixels.push(render_pixel(camera, scene, x, y, rng));
        }
    }
    pixels
}

/// A rendered bucket.
#[derive(Debug, Clone)]
pub struct BucketResult {
    pub bucket: Bucket,

    /// Pixel colors, row-major within the bucket
    pub pixels: Vec<Color>,
}

impl BucketResult {
    pub fn new(bucket: Bucket, pixels: Vec<Color>) -> Self {
        Self { bucket, pixels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::View;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_buckets_exact_fit() {
        let buckets = generate_buckets(128, 128, 64);
        assert_eq!(buckets.len(), 4);

        let total_pixels: u32 = buckets.iter().map(|b| b.pixel_count()).sum();
        assert_eq!(total_pixels, 128 * 128);
    }

    #[test]
    fn test_generate_buckets_partial_fit() {
        let buckets = generate_buckets(100, 30, 64);
        assert_eq!(buckets.len(), 2);

        let total_pixels: u32 = buckets.iter().map(|b| b.pixel_count()).sum();
        assert_eq!(total_pixels, 100 * 30);
        assert!(buckets.iter().all(|b| b.height == 30));
    }

    #[test]
    fn test_center_bucket_first() {
        let buckets = generate_buckets(192, 192, 64);
        assert_eq!(buckets.len(), 9);
        assert_eq!((buckets[0].x, buckets[0].y), (64, 64));

        let indices: Vec<usize> = buckets.iter().map(|b| b.index).collect();
        assert_eq!(indices, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn test_zero_bucket_size_is_clamped() {
        let buckets = generate_buckets(3, 2, 0);
        assert_eq!(buckets.len(), 6);
        assert!(buckets.iter().all(|b| b.pixel_count() == 1));
    }

    #[test]
    fn test_render_bucket_pixel_order() {
        let mut scene = Scene::new("bucket", View::default(), 4, 4);
        scene.background.color = Color::new(0.2, 0.3, 0.4);
        let camera = Camera::from_scene(&scene);

        let bucket = Bucket::new(2, 1, 2, 3, 0);
        let mut rng = StdRng::seed_from_u64(42);
        let pixels = render_bucket(&bucket, &camera, &scene, &mut rng);

        assert_eq!(pixels.len(), 6);
        assert!(pixels.iter().all(|c| *c == Color::new(0.2, 0.3, 0.4)));
    }
}
