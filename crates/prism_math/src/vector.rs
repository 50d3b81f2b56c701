use crate::Vec3;

/// Normalize `v`, or return it unchanged when its length is zero.
///
/// Unlike `Vec3::normalize_or_zero` this never replaces a tiny vector with
/// zero, and unlike `Vec3::normalize` it never produces NaN.
#[inline]
pub fn normalize_or_self(v: Vec3) -> Vec3 {
    let len = v.length();
    if len == 0.0 {
        v
    } else {
        v / len
    }
}

/// Transform a tangent-space vector `m` into world space using the
/// tangent `t`, bitangent `b` and normal `n`.
#[inline]
pub fn tangent_to_world(m: Vec3, t: Vec3, b: Vec3, n: Vec3) -> Vec3 {
    t * m.x + b * m.y + n * m.z
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_or_self() {
        let n = normalize_or_self(Vec3::new(3.0, 0.0, 4.0));
        assert!((n.length() - 1.0).abs() < 1e-6);
        assert!((n - Vec3::new(0.6, 0.0, 0.8)).length() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_returns_input() {
        assert_eq!(normalize_or_self(Vec3::ZERO), Vec3::ZERO);
    }

    #[test]
    fn test_tangent_to_world_identity_basis() {
        let m = Vec3::new(0.2, -0.3, 0.9);
        assert_eq!(tangent_to_world(m, Vec3::X, Vec3::Y, Vec3::Z), m);
    }

    #[test]
    fn test_tangent_to_world_rotated_basis() {
        // Tangent frame whose normal points along +X
        let world = tangent_to_world(Vec3::Z, Vec3::Y, Vec3::Z, Vec3::X);
        assert_eq!(world, Vec3::X);
    }
}
