//! Collision space: ray casts, convex sweeps and overlap manifolds
//!
//! Obstacles are axis-aligned boxes with traverse flags. The query surface
//! mirrors what the movement core needs: closest-hit ray casts for the
//! height probe, sphere sweeps for the climb sensors and traverse checks,
//! and contact-manifold collection for the ghost penetration resolver.

use crate::shapes::Aabb;
use bitflags::bitflags;
use slotmap::{new_key_type, SlotMap};
use strider_math::Vec3;

new_key_type! {
    /// Key to an obstacle body in the collision space
    pub struct ColliderKey;
}

bitflags! {
    /// Obstacle capabilities relevant to the movement core
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ColliderFlags: u8 {
        /// Body can be pushed/pulled one sector at a time
        const TRAVERSE = 1 << 0;
        /// Body's top surface can be walked (and traversed) upon
        const TRAVERSE_FLOOR = 1 << 1;
    }
}

/// One obstacle in the space
#[derive(Clone, Debug)]
pub struct ColliderBody {
    pub aabb: Aabb,
    pub flags: ColliderFlags,
}

/// Result of a ray cast or convex sweep
#[derive(Clone, Copy, Debug)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub fraction: f32,
    pub body: ColliderKey,
}

/// One contact of an overlap manifold
///
/// `normal` points from the obstacle toward the proxy (the escape
/// direction); `separation` is negative while the shapes interpenetrate.
#[derive(Clone, Copy, Debug)]
pub struct ManifoldPoint {
    pub point: Vec3,
    pub normal: Vec3,
    pub separation: f32,
}

/// Contacts between the ghost proxy and one obstacle for one query
#[derive(Clone, Debug)]
pub struct ContactManifold {
    pub body: ColliderKey,
    /// Body-order convention: whether the proxy is the first body of the
    /// pair. Correction sign in the resolver depends on it.
    pub proxy_is_first: bool,
    pub points: Vec<ManifoldPoint>,
}

/// Capsule orientation for the character proxy shapes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// Lying along world Y (the "depth capsule")
    Y,
    /// Standing along world Z (the "vertical capsule")
    Z,
}

/// An axis-aligned capsule: a segment of `2 * half_length` plus a radius.
///
/// `half_length == 0` degenerates to a sphere, which is how the probe and
/// climb-sensor shapes are expressed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CapsuleShape {
    pub axis: Axis,
    pub radius: f32,
    pub half_length: f32,
}

impl CapsuleShape {
    pub fn sphere(radius: f32) -> Self {
        Self {
            axis: Axis::Z,
            radius,
            half_length: 0.0,
        }
    }

    /// Segment endpoints when the capsule is centred at `at`
    pub fn segment(&self, at: Vec3) -> (Vec3, Vec3) {
        let half = match self.axis {
            Axis::Y => Vec3::new(0.0, self.half_length, 0.0),
            Axis::Z => Vec3::new(0.0, 0.0, self.half_length),
        };
        (at - half, at + half)
    }

    /// World bounds when centred at `at`
    pub fn aabb(&self, at: Vec3) -> Aabb {
        let (a, b) = self.segment(at);
        Aabb::new(a.min_components(b), a.max_components(b)).inflated(self.radius)
    }
}

/// The static/kinematic obstacle world
#[derive(Default)]
pub struct CollisionSpace {
    bodies: SlotMap<ColliderKey, ColliderBody>,
}

impl CollisionSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a box obstacle
    pub fn add_box(&mut self, aabb: Aabb, flags: ColliderFlags) -> ColliderKey {
        self.bodies.insert(ColliderBody { aabb, flags })
    }

    pub fn remove(&mut self, key: ColliderKey) -> Option<ColliderBody> {
        self.bodies.remove(key)
    }

    pub fn body(&self, key: ColliderKey) -> Option<&ColliderBody> {
        self.bodies.get(key)
    }

    pub fn body_mut(&mut self, key: ColliderKey) -> Option<&mut ColliderBody> {
        self.bodies.get_mut(key)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColliderKey, &ColliderBody)> {
        self.bodies.iter()
    }

    /// Closest-hit ray cast
    pub fn ray_cast(&self, from: Vec3, to: Vec3) -> Option<RayHit> {
        self.ray_cast_excluding(from, to, None)
    }

    /// Closest-hit ray cast ignoring one body
    pub fn ray_cast_excluding(
        &self,
        from: Vec3,
        to: Vec3,
        exclude: Option<ColliderKey>,
    ) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for (key, body) in &self.bodies {
            if Some(key) == exclude {
                continue;
            }
            if let Some((t, normal)) = body.aabb.ray_intersect(from, to) {
                if best.as_ref().map_or(true, |b| t < b.fraction) {
                    best = Some(RayHit {
                        point: from.lerp(to, t),
                        normal,
                        fraction: t,
                        body: key,
                    });
                }
            }
        }
        best
    }

    /// Closest-hit sphere sweep from `from` to `to`.
    ///
    /// Implemented as a ray test against radius-inflated boxes; the
    /// reported normal is the face normal, which is exact everywhere but
    /// within a radius of an edge.
    pub fn sweep_sphere(&self, from: Vec3, to: Vec3, radius: f32) -> Option<RayHit> {
        self.sweep_sphere_excluding(from, to, radius, None)
    }

    /// Sphere sweep ignoring one body
    pub fn sweep_sphere_excluding(
        &self,
        from: Vec3,
        to: Vec3,
        radius: f32,
        exclude: Option<ColliderKey>,
    ) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for (key, body) in &self.bodies {
            if Some(key) == exclude {
                continue;
            }
            if let Some((t, normal)) = body.aabb.inflated(radius).ray_intersect(from, to) {
                if best.as_ref().map_or(true, |b| t < b.fraction) {
                    let center = from.lerp(to, t);
                    best = Some(RayHit {
                        point: center - normal * radius,
                        normal,
                        fraction: t,
                        body: key,
                    });
                }
            }
        }
        best
    }

    /// Collect overlap manifolds between a capsule proxy at `at` and every
    /// obstacle whose bounds it touches.
    ///
    /// The candidate pair set is recomputed from the proxy's current pose
    /// on every call; a proxy moved since the previous query never yields
    /// stale pairs.
    pub fn collect_manifolds(
        &self,
        shape: &CapsuleShape,
        at: Vec3,
        exclude: Option<ColliderKey>,
    ) -> Vec<ContactManifold> {
        let proxy_bounds = shape.aabb(at);
        let mut manifolds = Vec::new();

        for (key, body) in &self.bodies {
            if Some(key) == exclude {
                continue;
            }
            if !proxy_bounds.intersects(&body.aabb) {
                continue;
            }
            let center = capsule_reference_sphere(shape, at, &body.aabb);
            if let Some(point) = sphere_box_contact(center, shape.radius, &body.aabb) {
                manifolds.push(ContactManifold {
                    body: key,
                    proxy_is_first: true,
                    points: vec![point],
                });
            }
        }
        manifolds
    }
}

/// Center of the capsule's sphere slice nearest to the box along the
/// capsule axis.
fn capsule_reference_sphere(shape: &CapsuleShape, at: Vec3, aabb: &Aabb) -> Vec3 {
    let (seg_min, seg_max) = shape.segment(at);
    match shape.axis {
        Axis::Y => {
            let y = at.y.clamp(aabb.min.y, aabb.max.y).clamp(seg_min.y, seg_max.y);
            Vec3::new(at.x, y, at.z)
        }
        Axis::Z => {
            let z = at.z.clamp(aabb.min.z, aabb.max.z).clamp(seg_min.z, seg_max.z);
            Vec3::new(at.x, at.y, z)
        }
    }
}

/// Sphere-vs-box narrow phase.
///
/// Returns a penetrating contact (`separation < 0`) or `None`. The normal
/// points from the box toward the sphere; when the center sits inside the
/// box, the shortest escape axis is chosen.
fn sphere_box_contact(center: Vec3, radius: f32, aabb: &Aabb) -> Option<ManifoldPoint> {
    let closest = aabb.closest_point(center);
    let delta = center - closest;
    let dist_squared = delta.length_squared();

    if dist_squared >= radius * radius {
        return None;
    }

    let (normal, dist) = if dist_squared > 0.0001 {
        let dist = dist_squared.sqrt();
        (delta * (1.0 / dist), dist)
    } else {
        // center inside the box: escape along the axis with the least
        // distance to a face
        let to_min = center - aabb.min;
        let to_max = aabb.max - center;

        let mut min_dist = to_min.x;
        let mut normal = -Vec3::X;
        if to_max.x < min_dist {
            min_dist = to_max.x;
            normal = Vec3::X;
        }
        if to_min.y < min_dist {
            min_dist = to_min.y;
            normal = -Vec3::Y;
        }
        if to_max.y < min_dist {
            min_dist = to_max.y;
            normal = Vec3::Y;
        }
        if to_min.z < min_dist {
            min_dist = to_min.z;
            normal = -Vec3::Z;
        }
        if to_max.z < min_dist {
            min_dist = to_max.z;
            normal = Vec3::Z;
        }
        (normal, -min_dist)
    };

    Some(ManifoldPoint {
        point: closest,
        normal,
        separation: dist - radius,
    })
}
