//! Penetration resolver
//!
//! The character's ghost proxy is a pure intersection detector: it is
//! never subject to dynamics response. Each fix pass collects the overlap
//! manifolds at the proxy's current pose and accumulates a damped
//! correction away from every penetrating contact; applying the correction
//! and re-collecting is a fixed-point iteration with a hard cap. The
//! resolver then classifies the dominant correction against the requested
//! move and hard-clamps the final position to the probe's floor and
//! ceiling.

use crate::character::{Character, VerticalCollide};
use crate::context::WorldContext;
use strider_math::Vec3;
use strider_world::{CapsuleShape, CollisionSpace, ContactManifold};

/// Damping coefficient applied to every contact correction. Below 1.0 to
/// prevent overshoot and oscillation between opposing contacts.
pub const PENETRATION_PART_COEF: f32 = 0.2;
/// Hard cap on fix-point iterations; exhaustion is accepted as a partial
/// fix, not an error.
pub const PENETRATION_LOOP_CAP: usize = 4;

/// The ghost collision proxy: shape plus its center offset from the
/// character origin (local frame).
#[derive(Clone, Copy, Debug)]
pub struct GhostProxy {
    pub shape: CapsuleShape,
    pub offset: Vec3,
}

/// Accumulate the correction vector for one set of manifolds.
///
/// For every contact with negative separation the push is
/// `normal * separation * sign * PENETRATION_PART_COEF`, where the sign
/// keeps the correction pointed away from the obstacle regardless of the
/// body order in the pair. Returns the number of penetrating contacts.
pub fn manifold_fix_vector(manifolds: &[ContactManifold]) -> (Vec3, usize) {
    let mut correction = Vec3::ZERO;
    let mut count = 0;
    for manifold in manifolds {
        let sign = if manifold.proxy_is_first { -1.0 } else { 1.0 };
        for pt in &manifold.points {
            if pt.separation < 0.0 {
                correction += pt.normal * (pt.separation * sign * PENETRATION_PART_COEF);
                count += 1;
            }
        }
    }
    (correction, count)
}

/// One manifold collection + accumulation at a given proxy pose.
///
/// The collision space recomputes the overlapping pair set from the
/// proxy's current bounds on every call, so a proxy moved by a previous
/// iteration never produces stale contacts.
pub fn ghost_fix_vector(
    space: &CollisionSpace,
    shape: &CapsuleShape,
    at: Vec3,
) -> (Vec3, usize) {
    let manifolds = space.collect_manifolds(shape, at, None);
    manifold_fix_vector(&manifolds)
}

/// Run the fixed-point loop at one pose, returning the total correction
/// and the number of iterations actually run (0 at the fixed point).
fn fix_point_loop(space: &CollisionSpace, shape: &CapsuleShape, start: Vec3) -> (Vec3, usize) {
    let mut at = start;
    let mut total = Vec3::ZERO;
    let mut loops = 0;
    loop {
        let (correction, count) = ghost_fix_vector(space, shape, at);
        if count == 0 {
            break;
        }
        loops += 1;
        at += correction;
        total += correction;
        if loops > PENETRATION_LOOP_CAP {
            break;
        }
    }
    (total, loops)
}

/// Compute (without applying) the full penetration correction for the
/// character at its current pose. Resolves per body part in complex mode,
/// else the whole-body proxy. Returns the accumulated reaction and the
/// iteration count.
pub fn penetration_fix_vector(ch: &Character, space: &CollisionSpace) -> (Vec3, usize) {
    if ch.no_fix {
        return (Vec3::ZERO, 0);
    }

    if ch.complex_collision && !ch.body_parts.is_empty() {
        // complex mode: fix each sub-shape in collision-map order
        let mut reaction = Vec3::ZERO;
        let mut total_loops = 0;
        for part in &ch.body_parts {
            let at = ch.transform.position
                + ch.transform.right() * part.offset.x
                + ch.transform.forward() * part.offset.y
                + Vec3::new(0.0, 0.0, part.offset.z)
                + reaction;
            let (correction, loops) = fix_point_loop(space, &part.shape, at);
            reaction += correction;
            total_loops += loops;
        }
        (reaction, total_loops)
    } else {
        fix_point_loop(space, &ch.ghost.shape, ch.ghost_center())
    }
}

/// Resolve penetrations at the character's current pose and commit the
/// corrected position.
///
/// `movement` is the sub-step move that led here; it drives the
/// horizontal/vertical collide classification. `step_up_check`, when
/// non-zero, retries the fix with the proxy lifted by that height and
/// accepts a clean result as a step-up instead of a wall hit.
pub fn fix_penetrations(
    ch: &mut Character,
    ctx: &WorldContext,
    movement: Option<Vec3>,
    step_up_check: f32,
) {
    if ch.no_fix {
        return;
    }

    ch.resp.horizontal_collide = false;
    ch.resp.vertical_collide = VerticalCollide::empty();
    ch.resp.step_up = false;

    let (mut reaction, mut loops) = penetration_fix_vector(ch, ctx.space);

    if loops > 0 && step_up_check != 0.0 {
        // retry with the whole proxy lifted: a clean result means the
        // obstacle is low enough to step onto rather than a wall
        ch.transform.position.z += step_up_check;
        let (_, lifted_loops) = penetration_fix_vector(ch, ctx.space);
        ch.transform.position.z -= step_up_check;
        if lifted_loops == 0 {
            loops = 0;
            reaction = Vec3::ZERO;
            ch.resp.step_up = true;
        }
    }

    let mut pos = ch.transform.position + reaction;

    if let (Some(mv), true) = (movement, loops > 0) {
        let r_planar = reaction.horizontal_length_squared();
        let m_planar = mv.horizontal_length_squared();
        if reaction.z * reaction.z < r_planar && mv.z * mv.z < m_planar {
            // horizontal move against horizontal correction: a wall hit
            // only when the correction opposes the move strongly enough
            let denom = (m_planar * r_planar).sqrt();
            if denom > 0.0 {
                let cos = (reaction.x * mv.x + reaction.y * mv.y) / denom;
                if cos < -ch.critical_wall_component {
                    ch.resp.horizontal_collide = true;
                }
            }
        } else if reaction.z * reaction.z > r_planar && mv.z * mv.z > m_planar {
            if reaction.z > 0.0 && mv.z < 0.0 {
                ch.resp.vertical_collide |= VerticalCollide::FLOOR;
            } else if reaction.z < 0.0 && mv.z > 0.0 {
                ch.resp.vertical_collide |= VerticalCollide::CEILING;
            }
        }
    }

    // hard clamps against the probe, independent of the contact loop
    if let Some(ceiling) = ch.height_info.ceiling {
        if pos.z > ceiling.point.z {
            pos.z = ceiling.point.z - ch.ry;
            ch.resp.vertical_collide |= VerticalCollide::CEILING;
        }
    }
    if let Some(floor) = ch.height_info.floor {
        if pos.z < floor.point.z {
            pos.z = floor.point.z;
            ch.resp.vertical_collide |= VerticalCollide::FLOOR;
        }
    }

    ch.transform.position = pos;
}

/// Answer, without moving the character, whether the proposed move would
/// produce a wall-class penetration. Used by integrators to stop
/// sub-stepping early.
pub fn check_next_penetration(ch: &mut Character, ctx: &WorldContext, movement: Vec3) {
    let at = ch.ghost_center() + movement;
    ch.resp.horizontal_collide = false;

    let (reaction, count) = ghost_fix_vector(ctx.space, &ch.ghost.shape, at);
    if count == 0 {
        return;
    }
    let r_planar = reaction.horizontal_length_squared();
    let m_planar = movement.horizontal_length_squared();
    if reaction.z * reaction.z < r_planar && movement.z * movement.z < m_planar {
        let dot = reaction.x * movement.x + reaction.y * movement.y;
        let cos_sq = dot * dot / (r_planar * m_planar);
        if cos_sq > ch.critical_wall_component * ch.critical_wall_component {
            ch.resp.horizontal_collide = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strider_world::{Aabb, ColliderFlags, ManifoldPoint, Room, RoomWorld};

    fn floor_space() -> CollisionSpace {
        let mut space = CollisionSpace::new();
        space.add_box(
            Aabb::new(Vec3::new(-8192.0, -8192.0, -256.0), Vec3::new(8192.0, 8192.0, 0.0)),
            ColliderFlags::empty(),
        );
        space
    }

    #[test]
    fn test_synthetic_manifold_correction() {
        // one contact at depth -10 along (0, 0, 1), proxy as second body:
        // correction accumulates to (0, 0, -2) with the 0.2 coefficient
        let manifold = ContactManifold {
            body: Default::default(),
            proxy_is_first: false,
            points: vec![ManifoldPoint {
                point: Vec3::ZERO,
                normal: Vec3::Z,
                separation: -10.0,
            }],
        };
        let (correction, count) = manifold_fix_vector(&[manifold]);
        assert_eq!(count, 1);
        assert!((correction - Vec3::new(0.0, 0.0, -2.0)).length() < 0.0001);
    }

    #[test]
    fn test_correction_pushes_proxy_away() {
        // same contact, proxy as first body: the push flips sign
        let manifold = ContactManifold {
            body: Default::default(),
            proxy_is_first: true,
            points: vec![ManifoldPoint {
                point: Vec3::ZERO,
                normal: Vec3::Z,
                separation: -10.0,
            }],
        };
        let (correction, _) = manifold_fix_vector(&[manifold]);
        assert!((correction - Vec3::new(0.0, 0.0, 2.0)).length() < 0.0001);
    }

    #[test]
    fn test_resolver_idempotent_at_fixed_point() {
        let space = floor_space();
        let shape = CapsuleShape::sphere(64.0);
        // well clear of the floor: zero correction, zero iterations
        let (total, loops) = fix_point_loop(&space, &shape, Vec3::new(0.0, 0.0, 500.0));
        assert_eq!(total, Vec3::ZERO);
        assert_eq!(loops, 0);
    }

    #[test]
    fn test_fix_point_converges_upward() {
        let space = floor_space();
        let shape = CapsuleShape::sphere(64.0);
        // start 54 deep in the floor slab
        let (total, loops) = fix_point_loop(&space, &shape, Vec3::new(0.0, 0.0, 10.0));
        assert!(loops >= 1);
        assert!(total.z > 0.0, "correction must push up, got {:?}", total);
        // each pass removes 20% of the remaining depth; after the capped
        // loop most of the penetration is resolved
        let remaining = 54.0 * (1.0 - PENETRATION_PART_COEF).powi(loops as i32);
        assert!((total.z - (54.0 - remaining)).abs() < 0.5);
    }

    #[test]
    fn test_iteration_budget_enforced() {
        let space = floor_space();
        let shape = CapsuleShape::sphere(64.0);
        // extremely deep: the loop must stop at the cap, not run forever
        let (_, loops) = fix_point_loop(&space, &shape, Vec3::new(0.0, 0.0, -190.0));
        assert!(loops <= PENETRATION_LOOP_CAP + 1);
    }

    #[test]
    fn test_fix_penetrations_floor_clamp() {
        let rooms = {
            let mut r = RoomWorld::new();
            r.add_room(Room::new(Vec3::new(-8192.0, -8192.0, 0.0), 16, 16, 0.0, 4096.0));
            r
        };
        let space = floor_space();
        let ctx = WorldContext::new(&rooms, &space, Vec3::ZERO);

        let mut ch = Character::new(Vec3::new(0.0, 0.0, -20.0), 128.0, 128.0, 512.0);
        // the probe center sits above the floor, so the clamp has a floor
        // point even though the feet are sunk in
        ch.update_current_height(&ctx);
        fix_penetrations(&mut ch, &ctx, Some(Vec3::new(0.0, 0.0, -10.0)), 0.0);

        // hard floor clamp lifted the character out
        assert!(ch.transform.position.z >= -0.001);
        assert!(ch.resp.vertical_collide.contains(VerticalCollide::FLOOR));
    }

    #[test]
    fn test_wall_classification_opposing_move() {
        let mut space = floor_space();
        // wall ahead on +Y
        space.add_box(
            Aabb::new(Vec3::new(-8192.0, 400.0, 0.0), Vec3::new(8192.0, 1024.0, 4096.0)),
            ColliderFlags::empty(),
        );
        let rooms = {
            let mut r = RoomWorld::new();
            r.add_room(Room::new(Vec3::new(-8192.0, -8192.0, 0.0), 16, 16, 0.0, 4096.0));
            r
        };
        let ctx = WorldContext::new(&rooms, &space, Vec3::ZERO);

        // ghost center at z=256, radius 128: overlaps the wall when the
        // body center is within 128 + half-length of y=400
        let mut ch = Character::new(Vec3::new(0.0, 300.0, 0.0), 128.0, 128.0, 512.0);
        ch.update_current_height(&ctx);
        fix_penetrations(&mut ch, &ctx, Some(Vec3::new(0.0, 30.0, 0.0)), 0.0);

        assert!(ch.resp.horizontal_collide, "head-on wall contact must flag");
        // pushed back out of the wall
        assert!(ch.transform.position.y < 300.0);
    }

    #[test]
    fn test_check_next_penetration_is_non_mutating() {
        let mut space = floor_space();
        space.add_box(
            Aabb::new(Vec3::new(-8192.0, 400.0, 0.0), Vec3::new(8192.0, 1024.0, 4096.0)),
            ColliderFlags::empty(),
        );
        let rooms = RoomWorld::new();
        let ctx = WorldContext::new(&rooms, &space, Vec3::ZERO);

        let mut ch = Character::new(Vec3::new(0.0, 100.0, 0.0), 128.0, 128.0, 512.0);
        let before = ch.transform.position;
        check_next_penetration(&mut ch, &ctx, Vec3::new(0.0, 250.0, 0.0));
        assert_eq!(ch.transform.position, before);
        assert!(ch.resp.horizontal_collide, "move into the wall must flag");
    }

    #[test]
    fn test_no_fix_skips_everything() {
        let space = floor_space();
        let rooms = RoomWorld::new();
        let ctx = WorldContext::new(&rooms, &space, Vec3::ZERO);

        let mut ch = Character::new(Vec3::new(0.0, 0.0, -100.0), 128.0, 128.0, 512.0);
        ch.no_fix = true;
        let before = ch.transform.position;
        fix_penetrations(&mut ch, &ctx, None, 0.0);
        assert_eq!(ch.transform.position, before);
    }

    #[test]
    fn test_step_up_retry_absorbs_small_ledge() {
        let mut space = floor_space();
        // a knee-high step ahead
        space.add_box(
            Aabb::new(Vec3::new(-8192.0, 300.0, 0.0), Vec3::new(8192.0, 8192.0, 128.0)),
            ColliderFlags::empty(),
        );
        let rooms = {
            let mut r = RoomWorld::new();
            r.add_room(Room::new(Vec3::new(-8192.0, -8192.0, 0.0), 16, 16, 0.0, 4096.0));
            r
        };
        let ctx = WorldContext::new(&rooms, &space, Vec3::ZERO);

        let mut ch = Character::new(Vec3::new(0.0, 250.0, 0.0), 128.0, 128.0, 512.0);
        // the probe column is still over the lower floor
        ch.update_current_height(&ctx);
        let step_up = ch.max_step_up_height;
        fix_penetrations(&mut ch, &ctx, Some(Vec3::new(0.0, 30.0, 0.0)), step_up);

        assert!(ch.resp.step_up, "small ledge should classify as a step-up");
        assert!(!ch.resp.horizontal_collide);
    }
}
