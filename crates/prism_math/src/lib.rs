// Re-export glam for convenience
pub use glam::*;

// Prism math types
mod color;
mod interval;
mod ray;
mod vector;

pub use color::{clamp_color, color_to_rgb8, rgb8_to_color, rgb8_to_normal, Color};
pub use interval::Interval;
pub use ray::Ray;
pub use vector::{normalize_or_self, tangent_to_world};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_creation() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(v.x, 1.0);
        assert_eq!(v.y, 2.0);
        assert_eq!(v.z, 3.0);
    }

    #[test]
    fn test_vec3_cross_is_right_handed() {
        assert_eq!(Vec3::X.cross(Vec3::Y), Vec3::Z);
        assert_eq!(Vec3::Y.cross(Vec3::Z), Vec3::X);
    }
}
