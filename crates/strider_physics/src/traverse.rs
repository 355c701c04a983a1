//! Traverse checker: pushing and pulling block objects one sector at a time
//!
//! A traversable block and the character must occupy axis-aligned
//! adjacent cells on the same flat floor. The destination cell needs a
//! level floor, a full sector of headroom, no other traversable stacked
//! or parked there, and an obstruction-free sweep along the move path.

use crate::character::Character;
use crate::context::WorldContext;
use bitflags::bitflags;
use strider_math::Vec3;
use strider_world::{ColliderFlags, ColliderKey, Sector, SECTOR_SIZE};

/// Height tolerance for "same floor" checks
const FLOOR_TOLERANCE: f32 = 1.1;
/// Sweep-sphere radius as a fraction of the sector size: slightly under a
/// half cell so grazing contact with cell walls does not block the move
const TRAVERSE_SWEEP_FRACTION: f32 = 0.48;

bitflags! {
    /// Allowed traverse directions for a (character, object) pair
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct TraverseDirs: u8 {
        /// The object can be pushed one cell forward
        const PUSH = 1 << 0;
        /// The object can be pulled one cell backward
        const PULL = 1 << 1;
    }
}

/// One-cell offset along the character's facing axis, or `None` when the
/// facing is not axis-aligned within the threshold.
fn facing_axis_offset(fwd: Vec3, threshold: f32) -> Option<Vec3> {
    if fwd.x > threshold {
        Some(Vec3::new(SECTOR_SIZE, 0.0, 0.0))
    } else if fwd.x < -threshold {
        Some(Vec3::new(-SECTOR_SIZE, 0.0, 0.0))
    } else if fwd.y > threshold {
        Some(Vec3::new(0.0, SECTOR_SIZE, 0.0))
    } else if fwd.y < -threshold {
        Some(Vec3::new(0.0, -SECTOR_SIZE, 0.0))
    } else {
        None
    }
}

/// Find a traversable object in the cell the character faces. On success
/// the character's yaw snaps to the nearest axis and the object is
/// recorded as the traversed object.
pub fn find_traverse(ch: &mut Character, ctx: &WorldContext) -> Option<ColliderKey> {
    let room = ch.room?;
    let ch_sector = ctx.rooms.room(room)?.sector_raw(ch.transform.position)?;

    ch.traversed_object = None;

    let dir = facing_axis_offset(ch.transform.forward(), 0.9)?;
    let obj_pos = ch_sector.pos + dir;
    let obj_sector = ctx.rooms.room(ch_sector.owner)?.sector_raw(obj_pos)?;
    let obj_sector = ctx.rooms.resolve_portal(obj_sector)?;

    let ch_bounds = strider_world::Aabb::new(
        ch.transform.position + ch.bbox.min,
        ch.transform.position + ch.bbox.max,
    );

    for (key, body) in ctx.space.iter() {
        if !body.flags.contains(ColliderFlags::TRAVERSE) {
            continue;
        }
        let center = body.aabb.center();
        let in_cell = (center.x - obj_sector.pos.x).abs() < SECTOR_SIZE * 0.5
            && (center.y - obj_sector.pos.y).abs() < SECTOR_SIZE * 0.5;
        let level = (body.aabb.min.z - ch.transform.position.z).abs() < FLOOR_TOLERANCE;
        if in_cell && level && body.aabb.intersects(&ch_bounds) {
            // snap the facing to the move axis
            let quarter = ((ch.transform.angles[0] + 45.0) / 90.0).floor();
            ch.transform.angles[0] = quarter * 90.0;
            ch.transform.update_rotation();
            ch.traversed_object = Some(key);
            return Some(key);
        }
    }

    None
}

/// Whether a sector can receive a traversed object at `floor` height:
/// level floor corners, matching height with headroom, or a
/// traverse-floor body forming the surface at that height.
pub fn sector_allow_traverse(
    ctx: &WorldContext,
    sector: &Sector,
    floor: f32,
    exclude: Option<ColliderKey>,
) -> bool {
    if !sector.has_flat_floor() {
        return false;
    }

    if (floor - sector.floor_corners[0]).abs() < FLOOR_TOLERANCE
        && sector.ceiling - sector.floor >= SECTOR_SIZE
    {
        return true;
    }

    // the cell floor is elsewhere; accept only a traversable-floor body
    // surface at exactly this height
    let from = Vec3::new(sector.pos.x, sector.pos.y, floor + 0.5 * SECTOR_SIZE);
    let to = Vec3::new(sector.pos.x, sector.pos.y, floor - 0.5 * SECTOR_SIZE);
    if let Some(hit) = ctx.space.ray_cast_excluding(from, to, exclude) {
        if (hit.point.z - floor).abs() < FLOOR_TOLERANCE {
            return ctx
                .space
                .body(hit.body)
                .map(|b| b.flags.contains(ColliderFlags::TRAVERSE_FLOOR))
                .unwrap_or(false);
        }
    }

    false
}

/// Check whether `obj` can be pushed forward and/or pulled backward one
/// cell by the character.
pub fn check_traverse(ch: &Character, ctx: &WorldContext, obj: ColliderKey) -> TraverseDirs {
    let none = TraverseDirs::empty();

    let Some(body) = ctx.space.body(obj) else {
        return none;
    };
    let Some(room) = ch.room else {
        return none;
    };
    let Some(dir) = facing_axis_offset(ch.transform.forward(), 0.8) else {
        return none;
    };

    let Some(mut ch_sector) = ctx
        .rooms
        .room(room)
        .and_then(|r| r.sector_raw(ch.transform.position))
    else {
        return none;
    };

    let obj_center = body.aabb.center();
    let obj_probe = Vec3::new(obj_center.x, obj_center.y, body.aabb.min.z + 0.5);
    let Some(obj_room) = ctx.rooms.find_room_containing(obj_probe, Some(room)) else {
        return none;
    };
    let Some(obj_sector) = ctx
        .rooms
        .room(obj_room)
        .and_then(|r| r.sector_raw(obj_probe))
    else {
        return none;
    };

    if ch_sector.owner == obj_sector.owner
        && ch_sector.index_x == obj_sector.index_x
        && ch_sector.index_y == obj_sector.index_y
    {
        // standing inside the object's cell: derive the character cell by
        // backing off along the facing axis
        let back_pos = obj_sector.pos - dir;
        let Some(s) = ctx
            .rooms
            .room(obj_sector.owner)
            .and_then(|r| r.sector_raw(back_pos))
            .and_then(|s| ctx.rooms.resolve_portal(s))
        else {
            return none;
        };
        ch_sector = s;
    }

    let floor = ch.transform.position.z;
    if ch_sector.floor != obj_sector.floor
        || !sector_allow_traverse(ctx, ch_sector, floor, None)
        || !sector_allow_traverse(ctx, obj_sector, floor, Some(obj))
    {
        return none;
    }

    // reject when another traversable is stacked on the object
    let above_from = Vec3::new(obj_sector.pos.x, obj_sector.pos.y, floor + 0.5 * SECTOR_SIZE);
    let above_to = Vec3::new(obj_sector.pos.x, obj_sector.pos.y, floor + 2.5 * SECTOR_SIZE);
    if let Some(hit) = ctx.space.ray_cast_excluding(above_from, above_to, Some(obj)) {
        let stacked = ctx
            .space
            .body(hit.body)
            .map(|b| b.flags.contains(ColliderFlags::TRAVERSE))
            .unwrap_or(false);
        if stacked {
            return none;
        }
    }

    let mut ret = none;
    let sweep_r = TRAVERSE_SWEEP_FRACTION * SECTOR_SIZE;

    // push: the cell beyond the object must be free along the push path
    let push_pos = obj_sector.pos + dir;
    let push_sector = ctx
        .rooms
        .room(obj_sector.owner)
        .and_then(|r| r.sector_raw(push_pos))
        .and_then(|s| ctx.rooms.resolve_portal(s));
    if let Some(next) = push_sector {
        if sector_allow_traverse(ctx, next, floor, None) {
            let from = Vec3::new(obj_sector.pos.x, obj_sector.pos.y, floor + 0.5 * SECTOR_SIZE);
            let to = Vec3::new(next.pos.x, next.pos.y, floor + 0.5 * SECTOR_SIZE);
            if ctx
                .space
                .sweep_sphere_excluding(from, to, sweep_r, Some(obj))
                .is_none()
            {
                ret |= TraverseDirs::PUSH;
            }
        }
    }

    // pull: the cell behind the character must be free along the pull path
    let pull_pos = ch_sector.pos - dir;
    let pull_sector = ctx
        .rooms
        .room(ch_sector.owner)
        .and_then(|r| r.sector_raw(pull_pos))
        .and_then(|s| ctx.rooms.resolve_portal(s));
    if let Some(next) = pull_sector {
        if sector_allow_traverse(ctx, next, floor, None) {
            let from = Vec3::new(ch_sector.pos.x, ch_sector.pos.y, floor + 0.5 * SECTOR_SIZE);
            let to = Vec3::new(next.pos.x, next.pos.y, floor + 0.5 * SECTOR_SIZE);
            if ctx
                .space
                .sweep_sphere_excluding(from, to, sweep_r, None)
                .is_none()
            {
                ret |= TraverseDirs::PULL;
            }
        }
    }

    ret
}
