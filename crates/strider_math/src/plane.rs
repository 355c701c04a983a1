//! Planes in 3D space
//!
//! A plane is stored as `normal . p + d = 0`, the convention the climb
//! detector's plane captures and the three-plane solve both use.

use crate::Vec3;
use serde::{Deserialize, Serialize};

/// An infinite plane: all points `p` with `normal.dot(p) + d == 0`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    /// Plane normal (not required to be unit length for the solve)
    pub normal: Vec3,
    /// Plane offset
    pub d: f32,
}

impl Plane {
    /// Create a plane from a raw normal and offset
    pub const fn new(normal: Vec3, d: f32) -> Self {
        Self { normal, d }
    }

    /// Create a plane passing through `point` with the given normal
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        Self {
            normal,
            d: -normal.dot(point),
        }
    }

    /// A horizontal floor plane at the given height, normal pointing up
    pub fn floor(z: f32) -> Self {
        Self::from_point_normal(Vec3::new(0.0, 0.0, z), Vec3::Z)
    }

    /// Signed distance from a point to the plane (scaled by |normal|)
    ///
    /// Positive on the side the normal points toward.
    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}
