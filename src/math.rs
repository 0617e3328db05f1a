use glam::{Quat, Vec3};

/// Above this cosine the two rotations are close enough that the sine-based weights lose precision.
const SLERP_LINEAR_THRESHOLD: f32 = 0.9995;

pub fn lerp_scalar(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn lerp_point(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    Vec3::new(lerp_scalar(a.x, b.x, t), lerp_scalar(a.y, b.y, t), lerp_scalar(a.z, b.z, t))
}

/// Shortest-path spherical interpolation. The result is always renormalized.
pub fn slerp_quaternion(a: Quat, b: Quat, t: f32) -> Quat {
    let mut cos_half = a.dot(b);
    let mut b = b;
    if cos_half < 0.0 {
        cos_half = -cos_half;
        b = -b;
    }

    let blended = if cos_half > SLERP_LINEAR_THRESHOLD {
        Quat::from_xyzw(
            lerp_scalar(a.x, b.x, t),
            lerp_scalar(a.y, b.y, t),
            lerp_scalar(a.z, b.z, t),
            lerp_scalar(a.w, b.w, t),
        )
    } else {
        let half_theta = cos_half.acos();
        let sin_half = (1.0 - cos_half * cos_half).sqrt();
        let wa = ((1.0 - t) * half_theta).sin() / sin_half;
        let wb = (t * half_theta).sin() / sin_half;
        Quat::from_xyzw(
            a.x * wa + b.x * wb,
            a.y * wa + b.y * wb,
            a.z * wa + b.z * wb,
            a.w * wa + b.w * wb,
        )
    };

    let length_squared = blended.length_squared();
    if length_squared <= f32::EPSILON {
        return a;
    }
    blended * length_squared.sqrt().recip()
}

/// Uniform Catmull-Rom segment between `p1` (t = 0) and `p2` (t = 1).
pub fn catmull_rom_point(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}

pub fn squared_distance(a: Vec3, b: Vec3) -> f32 {
    squared_magnitude(a - b)
}

pub fn squared_magnitude(v: Vec3) -> f32 {
    v.x * v.x + v.y * v.y + v.z * v.z
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn assert_quat_near(a: Quat, b: Quat, epsilon: f32) {
        let same = (a - b).length() <= epsilon;
        let flipped = (a + b).length() <= epsilon;
        assert!(same || flipped, "quaternions differed: left={a:?}, right={b:?}, epsilon={epsilon}");
    }

    #[test]
    fn lerp_point_hits_endpoints_and_midpoint() {
        let a = Vec3::new(0.0, 2.0, -4.0);
        let b = Vec3::new(1.0, 4.0, 4.0);
        assert_eq!(lerp_point(a, b, 0.0), a);
        assert_eq!(lerp_point(a, b, 1.0), b);
        assert_eq!(lerp_point(a, b, 0.5), Vec3::new(0.5, 3.0, 0.0));
    }

    #[test]
    fn lerp_does_not_clamp() {
        assert_eq!(lerp_scalar(0.0, 2.0, 1.5), 3.0);
        assert_eq!(lerp_scalar(0.0, 2.0, -0.5), -1.0);
    }

    #[test]
    fn slerp_of_identical_rotations_is_identity() {
        let q = Quat::from_rotation_y(0.7);
        for step in 0..=10 {
            let t = step as f32 / 10.0;
            assert_quat_near(slerp_quaternion(q, q, t), q, 1e-5);
        }
    }

    #[test]
    fn slerp_endpoints_match_inputs() {
        let a = Quat::from_rotation_x(0.2);
        let b = Quat::from_rotation_z(1.9);
        assert_quat_near(slerp_quaternion(a, b, 0.0), a, 1e-5);
        assert_quat_near(slerp_quaternion(a, b, 1.0), b, 1e-5);
    }

    #[test]
    fn slerp_takes_shortest_path() {
        let a = Quat::IDENTITY;
        let b = -Quat::from_rotation_y(FRAC_PI_2);
        let mid = slerp_quaternion(a, b, 0.5);
        assert_quat_near(mid, Quat::from_rotation_y(FRAC_PI_2 * 0.5), 1e-5);
    }

    #[test]
    fn slerp_is_unit_length_on_both_branches() {
        let near_a = Quat::from_rotation_x(0.010);
        let near_b = Quat::from_rotation_x(0.011);
        let far_b = Quat::from_rotation_y(2.5);
        for step in 0..=20 {
            let t = step as f32 / 20.0;
            assert!((slerp_quaternion(near_a, near_b, t).length() - 1.0).abs() < 1e-5);
            assert!((slerp_quaternion(near_a, far_b, t).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn catmull_rom_passes_through_inner_points() {
        let p0 = Vec3::new(-1.0, 0.0, 0.0);
        let p1 = Vec3::ZERO;
        let p2 = Vec3::new(1.0, 1.0, 0.0);
        let p3 = Vec3::new(2.0, 1.0, 0.0);
        assert!(catmull_rom_point(p0, p1, p2, p3, 0.0).distance(p1) < 1e-6);
        assert!(catmull_rom_point(p0, p1, p2, p3, 1.0).distance(p2) < 1e-6);
    }

    #[test]
    fn catmull_rom_on_evenly_spaced_line_is_linear() {
        let points = [0.0, 1.0, 2.0, 3.0].map(|x| Vec3::new(x, 0.0, 0.0));
        let mid = catmull_rom_point(points[0], points[1], points[2], points[3], 0.25);
        assert!(mid.distance(Vec3::new(1.25, 0.0, 0.0)) < 1e-6);
    }

    #[test]
    fn squared_helpers_are_exact() {
        assert_eq!(squared_distance(Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 6.0, 3.0)), 25.0);
        assert_eq!(squared_magnitude(Vec3::new(2.0, -3.0, 6.0)), 49.0);
        assert_eq!(squared_distance(Vec3::ONE, Vec3::ONE), 0.0);
    }
}
