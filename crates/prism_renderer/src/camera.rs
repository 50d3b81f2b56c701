//! Camera for primary ray generation.
//!
//! The viewing window sits at distance 1 along the view direction. Pixel
//! (0, 0) maps to the window's upper-left corner and pixel
//! (width-1, height-1) to its lower-right corner.

use prism_core::{FieldOfView, Projection, Scene, View};
use prism_math::{Ray, Vec3};

/// Distance from the eye to the viewing window.
const WINDOW_DISTANCE: f32 = 1.0;

/// Camera for generating primary rays into the scene.
#[derive(Clone, Debug)]
pub struct Camera {
    pub image_width: u32,
    pub image_height: u32,

    eye: Vec3,
    view_dir: Vec3,
    parallel: bool,

    // Orthonormal basis: u points right, v up, n along the view direction
    u: Vec3,
    v: Vec3,
    n: Vec3,

    window_width: f32,
    window_height: f32,

    /// World position of pixel (0, 0)
    upper_left: Vec3,
    pixel_delta_h: Vec3,
    pixel_delta_v: Vec3,
}

impl Camera {
    /// Build a camera for an image of `width` x `height` pixels.
    ///
    /// `view` must have a non-zero view direction not parallel to the up
    /// direction; the scene parser rejects anything else.
    pub fn new(view: &View, width: u32, height: u32) -> Self {
        let n = view.view_dir.normalize();
        let u = view.view_dir.cross(view.up_dir).normalize();
        let v = u.cross(n);

        let aspect = width as f32 / height as f32;
        let (window_width, window_height) = match view.projection {
            Projection::Parallel { frustum_width } => (frustum_width, frustum_width / aspect),
            Projection::Perspective(FieldOfView::Horizontal(hfov)) => {
                let w = 2.0 * WINDOW_DISTANCE * (hfov / 2.0).tan();
                (w, w / aspect)
            }
            Projection::Perspective(FieldOfView::Vertical(vfov)) => {
                let h = 2.0 * WINDOW_DISTANCE * (vfov / 2.0).tan();
                (h * aspect, h)
            }
        };

        let center = view.eye + n * WINDOW_DISTANCE;
        let half_w = window_width / 2.0;
        let half_h = window_height / 2.0;
        let ul = center - u * half_w + v * half_h;
        let ur = center + u * half_w + v * half_h;
        let ll = center - u * half_w - v * half_h;

        // A one-pixel wide (or tall) image samples the window's center line
        let (upper_left_h, pixel_delta_h) = if width > 1 {
            (Vec3::ZERO, (ur - ul) / (width - 1) as f32)
        } else {
            (u * half_w, Vec3::ZERO)
        };
        let (upper_left_v, pixel_delta_v) = if height > 1 {
            (Vec3::ZERO, (ll - ul) / (height - 1) as f32)
        } else {
            (-v * half_h, Vec3::ZERO)
        };

        log::debug!(
            "Camera basis u={:?} v={:?} n={:?}, window {:.4}x{:.4}",
            u,
            v,
            n,
            window_width,
            window_height
        );

        Self {
            image_width: width,
            image_height: height,
            eye: view.eye,
            view_dir: n,
            parallel: matches!(view.projection, Projection::Parallel { .. }),
            u,
            v,
            n,
            window_width,
            window_height,
            upper_left: ul + upper_left_h + upper_left_v,
            pixel_delta_h,
            pixel_delta_v,
        }
    }

    /// Build the camera described by a scene.
    pub fn from_scene(scene: &Scene) -> Self {
        Self::new(&scene.view, scene.width, scene.height)
    }

    /// The camera basis `(u, v, n)`.
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        (self.u, self.v, self.n)
    }

    /// Viewing window size in world units.
    pub fn window_size(&self) -> (f32, f32) {
        (self.window_width, self.window_height)
    }

    /// World-space point on the viewing window for pixel (x, y).
    pub fn window_location(&self, x: u32, y: u32) -> Vec3 {
        self.upper_left + self.pixel_delta_h * x as f32 + self.pixel_delta_v * y as f32
    }

    /// Generate the primary ray for pixel (x, y).
    pub fn get_ray(&self, x: u32, y: u32) -> Ray {
        let location = self.window_location(x, y);
        if self.parallel {
            Ray::new(location, self.view_dir)
        } else {
            Ray::towards(self.eye, location)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(projection: Projection) -> View {
        View {
            eye: Vec3::ZERO,
            view_dir: Vec3::NEG_Z,
            up_dir: Vec3::Y,
            projection,
        }
    }

    fn assert_close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-5, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_camera_basis() {
        let camera = Camera::new(
            &view(Projection::Perspective(FieldOfView::Horizontal(90f32.to_radians()))),
            8,
            8,
        );
        let (u, v, n) = camera.basis();
        assert_close(u, Vec3::X);
        assert_close(v, Vec3::Y);
        assert_close(n, Vec3::NEG_Z);
    }

    #[test]
    fn test_center_pixel_hits_window_center() {
        let camera = Camera::new(
            &view(Projection::Perspective(FieldOfView::Horizontal(90f32.to_radians()))),
            3,
            3,
        );
        assert_close(camera.window_location(1, 1), Vec3::new(0.0, 0.0, -1.0));
        assert_close(camera.window_location(0, 0), Vec3::new(-1.0, 1.0, -1.0));
        assert_close(camera.window_location(2, 2), Vec3::new(1.0, -1.0, -1.0));

        let ray = camera.get_ray(1, 1);
        assert_close(ray.origin, Vec3::ZERO);
        assert_close(ray.direction, Vec3::NEG_Z);
    }

    #[test]
    fn test_vertical_fov_window() {
        let camera = Camera::new(
            &view(Projection::Perspective(FieldOfView::Vertical(90f32.to_radians()))),
            200,
            100,
        );
        let (w, h) = camera.window_size();
        assert!((h - 2.0).abs() < 1e-5);
        assert!((w - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_parallel_rays_share_direction() {
        let camera = Camera::new(&view(Projection::Parallel { frustum_width: 4.0 }), 5, 5);
        let (w, h) = camera.window_size();
        assert!((w - 4.0).abs() < 1e-6);
        assert!((h - 4.0).abs() < 1e-6);

        let corner = camera.get_ray(0, 0);
        assert_close(corner.origin, Vec3::new(-2.0, 2.0, -1.0));
        assert_close(corner.direction, Vec3::NEG_Z);

        let other = camera.get_ray(4, 2);
        assert_close(other.origin, Vec3::new(2.0, 0.0, -1.0));
        assert_close(other.direction, Vec3::NEG_Z);
    }

    #[test]
    fn test_single_pixel_image_looks_forward() {
        let camera = Camera::new(
            &view(Projection::Perspective(FieldOfView::Horizontal(60f32.to_radians()))),
            1,
            1,
        );
        assert_close(camera.get_ray(0, 0).direction, Vec3::NEG_Z);
    }
}
