//! Color conversions between linear float triples and 8-bit channels.

use crate::{Interval, Vec3};

/// Color type alias (linear RGB, channels nominally in [0, 1]).
pub type Color = Vec3;

/// Clamp every channel to [0, 1].
#[inline]
pub fn clamp_color(color: Color) -> Color {
    color.clamp(Vec3::ZERO, Vec3::ONE)
}

/// Convert a float channel to a byte. Values are clamped first and then
/// truncated, never rounded: 0.999 maps to 254.
#[inline]
fn channel_to_u8(value: f32) -> u8 {
    (Interval::UNIT.clamp(value) * 255.0) as u8
}

/// Convert a linear color to 8-bit RGB.
pub fn color_to_rgb8(color: Color) -> [u8; 3] {
    [
        channel_to_u8(color.x),
        channel_to_u8(color.y),
        channel_to_u8(color.z),
    ]
}

/// Convert an 8-bit RGB triple to a linear color in [0, 1].
pub fn rgb8_to_color(rgb: [u8; 3]) -> Color {
    Vec3::new(rgb[0] as f32, rgb[1] as f32, rgb[2] as f32) / 255.0
}

/// Decode a normal-map texel into a tangent-space vector in [-1, 1]^3.
///
/// The result is not normalized.
pub fn rgb8_to_normal(rgb: [u8; 3]) -> Vec3 {
    (Vec3::new(rgb[0] as f32, rgb[1] as f32, rgb[2] as f32) - 127.5) / 127.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_to_rgb8_truncates() {
        assert_eq!(color_to_rgb8(Vec3::new(0.0, 0.5, 1.0)), [0, 127, 255]);
        assert_eq!(color_to_rgb8(Vec3::splat(0.999)), [254, 254, 254]);
    }

    #[test]
    fn test_color_to_rgb8_clamps() {
        assert_eq!(color_to_rgb8(Vec3::new(-0.5, 1.5, 7.0)), [0, 255, 255]);
    }

    #[test]
    fn test_byte_roundtrip_within_truncation() {
        for value in 0..=255u8 {
            let back = color_to_rgb8(rgb8_to_color([value, value, value]));
            let diff = (back[0] as i16 - value as i16).abs();
            assert!(diff <= 1, "byte {} came back as {}", value, back[0]);
        }
    }

    #[test]
    fn test_clamp_color() {
        let c = clamp_color(Vec3::new(-1.0, 0.3, 2.0));
        assert_eq!(c, Vec3::new(0.0, 0.3, 1.0));
    }

    #[test]
    fn test_flat_normal_texel() {
        // (128, 128, 255) is the conventional "straight up" texel
        let n = rgb8_to_normal([128, 128, 255]);
        assert!(n.x.abs() < 0.01);
        assert!(n.y.abs() < 0.01);
        assert!((n.z - 1.0).abs() < 1e-6);
        assert_eq!(rgb8_to_normal([0, 0, 0]), Vec3::splat(-1.0));
    }
}
