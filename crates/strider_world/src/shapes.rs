//! Axis-aligned collision volumes

use strider_math::Vec3;

/// An axis-aligned bounding box
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create an AABB from explicit min/max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB from a center point and half-extents
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Center of the box
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half-extents of the box
    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Translate the box by an offset
    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Grow the box by `r` on every side
    pub fn inflated(&self, r: f32) -> Self {
        let v = Vec3::new(r, r, r);
        Self {
            min: self.min - v,
            max: self.max + v,
        }
    }

    /// Closest point on (or in) the box to `point`
    #[inline]
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        point.clamp_components(self.min, self.max)
    }

    /// Whether `point` lies inside the box (inclusive)
    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Whether two boxes overlap
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Slab-test a segment `from -> to` against the box.
    ///
    /// Returns the entry fraction and the face normal at entry. Segments
    /// starting inside the box report no hit (the convex cast convention
    /// the probe relies on when a ray origin ends up inside geometry).
    pub fn ray_intersect(&self, from: Vec3, to: Vec3) -> Option<(f32, Vec3)> {
        let dir = to - from;
        let mut t_min = 0.0_f32;
        let mut t_max = 1.0_f32;
        let mut normal = Vec3::ZERO;

        let axes = [
            (dir.x, from.x, self.min.x, self.max.x, Vec3::X),
            (dir.y, from.y, self.min.y, self.max.y, Vec3::Y),
            (dir.z, from.z, self.min.z, self.max.z, Vec3::Z),
        ];

        for (d, o, lo, hi, axis) in axes {
            if d.abs() < 1e-8 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let (mut t0, mut t1) = ((lo - o) * inv, (hi - o) * inv);
            let mut axis_normal = -axis;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
                axis_normal = axis;
            }
            if t0 > t_min {
                t_min = t0;
                normal = axis_normal;
            }
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        if t_min <= 0.0 {
            // started inside (or touching) the box
            return None;
        }
        Some((t_min, normal))
    }
}
