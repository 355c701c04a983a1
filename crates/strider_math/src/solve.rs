//! Three-plane intersection
//!
//! Cramer's-rule solve of the 3x3 linear system formed by three plane
//! equations. Slower than an LU solve but exact enough for the edge
//! detector, which feeds it nearly-orthogonal planes.

use crate::{Plane, Vec3};

/// Intersect three planes, returning the single common point.
///
/// Returns `None` when the system is degenerate (two planes nearly
/// parallel, or all three meeting in a line): `|det| < eps`. Callers pick
/// the epsilon; the climb detector uses 0.005, tuned to its geometry
/// scale.
pub fn intersect_three_planes(p0: &Plane, p1: &Plane, p2: &Plane, eps: f32) -> Option<Vec3> {
    let n0 = p0.normal;
    let n1 = p1.normal;
    let n2 = p2.normal;

    let det = n0.dot(n1.cross(n2));
    if det.abs() < eps {
        return None;
    }

    let point = (n1.cross(n2) * -p0.d + n2.cross(n0) * -p1.d + n0.cross(n1) * -p2.d) / det;
    Some(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_planes_intersect_at_origin() {
        let px = Plane::from_point_normal(Vec3::ZERO, Vec3::X);
        let py = Plane::from_point_normal(Vec3::ZERO, Vec3::Y);
        let pz = Plane::from_point_normal(Vec3::ZERO, Vec3::Z);

        let p = intersect_three_planes(&px, &py, &pz, 0.005).unwrap();
        assert!((p - Vec3::ZERO).length() < 0.0001);
    }

    #[test]
    fn test_recovers_known_point() {
        // Three non-parallel planes all passing through (3, -2, 7)
        let target = Vec3::new(3.0, -2.0, 7.0);
        let p0 = Plane::from_point_normal(target, Vec3::new(1.0, 0.2, 0.1).normalized());
        let p1 = Plane::from_point_normal(target, Vec3::new(-0.3, 1.0, 0.0).normalized());
        let p2 = Plane::from_point_normal(target, Vec3::new(0.1, -0.1, 1.0).normalized());

        let p = intersect_three_planes(&p0, &p1, &p2, 0.005).unwrap();
        assert!((p - target).length() < 0.001, "got {:?}", p);
    }

    #[test]
    fn test_parallel_planes_reject() {
        let p0 = Plane::from_point_normal(Vec3::ZERO, Vec3::Z);
        let p1 = Plane::from_point_normal(Vec3::new(0.0, 0.0, 1.0), Vec3::Z);
        let p2 = Plane::from_point_normal(Vec3::ZERO, Vec3::X);

        assert!(intersect_three_planes(&p0, &p1, &p2, 0.005).is_none());
    }

    #[test]
    fn test_near_degenerate_reject() {
        // Two planes tilted only slightly apart: the determinant falls
        // under the caller's epsilon and the solve must refuse rather
        // than return a wild point.
        let p0 = Plane::from_point_normal(Vec3::ZERO, Vec3::Z);
        let p1 = Plane::from_point_normal(Vec3::ZERO, Vec3::new(0.001, 0.0, 1.0).normalized());
        let p2 = Plane::from_point_normal(Vec3::ZERO, Vec3::X);

        assert!(intersect_three_planes(&p0, &p1, &p2, 0.005).is_none());
    }
}
