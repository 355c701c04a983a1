//! Step classifier
//!
//! Classifies the floor-height delta between the character's current
//! probe and a probe at a horizontal offset into step bands, then vetoes
//! the result with a wall ray: a wall at climb-sensor height makes the
//! step impossible no matter what the floor delta said.

use crate::character::Character;
use crate::context::WorldContext;
use crate::probe::{get_height_info, HeightInfo};
use strider_math::Vec3;

/// Floor-height deltas below this are level ground
pub const STEP_SPLIT_EPSILON: f32 = 0.02;

/// Classification of the next step, ordered from the deepest drop to the
/// steepest rise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum StepKind {
    /// Drop deeper than the body height: a hang-down candidate
    DownCanHang,
    /// Drop up to the body height
    DownDrop,
    /// Drop between the min and max step heights
    DownBig,
    /// Drop within the min step height
    DownLittle,
    Horizontal,
    /// Rise within the min step height
    UpLittle,
    /// Rise between the min and max step heights
    UpBig,
    /// Rise between the max step and max climb heights
    UpClimb,
    /// Rise beyond the climb height, or a wall in the way
    UpImpossible,
}

/// Probe the floor at `position + offset` and classify the step.
///
/// The current probe (`ch.height_info`) must be fresh; this computes and
/// returns the *next* probe alongside the classification. Band boundaries
/// are inclusive to the lower band.
pub fn check_next_step(
    ch: &Character,
    ctx: &WorldContext,
    offset: Vec3,
) -> (StepKind, HeightInfo) {
    let pos = ch.transform.position + offset;
    let center_lift = Vec3::new(0.0, 0.0, ch.bbox_center_z());
    let next = get_height_info(ctx, pos + center_lift, ch.height, ch.room);
    let current = &ch.height_info;

    let mut kind;
    let wall_test_z;

    match (current.floor, next.floor) {
        (Some(cur), Some(nxt)) => {
            let delta = nxt.point.z - cur.point.z;
            if delta.abs() < STEP_SPLIT_EPSILON {
                wall_test_z = cur.point.z;
                kind = StepKind::Horizontal;
            } else if delta < 0.0 {
                let delta = -delta;
                wall_test_z = cur.point.z;
                kind = if delta <= ch.min_step_up_height {
                    StepKind::DownLittle
                } else if delta <= ch.max_step_up_height {
                    StepKind::DownBig
                } else if delta <= ch.height {
                    StepKind::DownDrop
                } else {
                    StepKind::DownCanHang
                };
            } else {
                wall_test_z = nxt.point.z;
                kind = if delta <= ch.min_step_up_height {
                    StepKind::UpLittle
                } else if delta <= ch.max_step_up_height {
                    StepKind::UpBig
                } else if delta <= ch.max_climb_height {
                    StepKind::UpClimb
                } else {
                    StepKind::UpImpossible
                };
            }
        }
        (None, None) => {
            // open air on both columns
            wall_test_z = pos.z;
            kind = StepKind::Horizontal;
        }
        (None, Some(nxt)) => {
            // floor appears where none existed; treated as level ground
            wall_test_z = nxt.point.z;
            kind = StepKind::Horizontal;
        }
        (Some(cur), None) => {
            // bottomless ahead
            wall_test_z = cur.point.z;
            kind = StepKind::DownCanHang;
        }
    }

    // Wall test: a hit at climb-sensor height between here and the target
    // column means the step cannot be taken regardless of the delta.
    let z = wall_test_z + ch.climb_r;
    let from = Vec3::new(ch.transform.position.x, ch.transform.position.y, z);
    let to = Vec3::new(pos.x, pos.y, z);
    if ctx.space.ray_cast(from, to).is_some() {
        kind = StepKind::UpImpossible;
    }

    (kind, next)
}

/// Whether the slope ahead is too steep to keep running into: the next
/// floor is higher, its normal is past the critical slant, and the
/// character faces into the slope.
pub fn has_stop_slant(ch: &Character, next: &HeightInfo) -> bool {
    let Some(floor) = next.floor else {
        return false;
    };
    let fwd = ch.transform.forward();
    floor.point.z > ch.transform.position.z
        && floor.normal.z < ch.critical_slant_z_component
        && fwd.x * floor.normal.x + fwd.y * floor.normal.y < 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use strider_math::Vec3;
    use strider_world::{Aabb, ColliderFlags, CollisionSpace, Room, RoomWorld};

    /// A world with the floor at `left_z` for x < 1024 and `right_z` beyond
    fn split_floor(left_z: f32, right_z: f32) -> (RoomWorld, CollisionSpace) {
        let mut rooms = RoomWorld::new();
        rooms.add_room(Room::new(
            Vec3::new(0.0, 0.0, 0.0),
            8,
            8,
            left_z.min(right_z) - 512.0,
            4096.0,
        ));
        let mut space = CollisionSpace::new();
        space.add_box(
            Aabb::new(
                Vec3::new(0.0, 0.0, left_z - 512.0),
                Vec3::new(1024.0, 8192.0, left_z),
            ),
            ColliderFlags::empty(),
        );
        space.add_box(
            Aabb::new(
                Vec3::new(1024.0, 0.0, right_z - 512.0),
                Vec3::new(8192.0, 8192.0, right_z),
            ),
            ColliderFlags::empty(),
        );
        (rooms, space)
    }

    fn character_at(x: f32, z: f32) -> Character {
        // min_step 128, max_step 256, climb 1920, height 512
        Character::new(Vec3::new(x, 512.0, z), 128.0, 128.0, 512.0)
    }

    fn classify(delta: f32) -> StepKind {
        let (rooms, space) = split_floor(512.0, 512.0 + delta);
        let ctx = WorldContext::new(&rooms, &space, Vec3::ZERO);
        let mut ch = character_at(512.0, 512.0);
        ch.update_current_height(&ctx);
        // callers lift the probe by the expected rise so the downward ray
        // can see an elevated floor
        let (kind, _) = check_next_step(&ch, &ctx, Vec3::new(1024.0, 0.0, delta.max(0.0)));
        kind
    }

    #[test]
    fn test_horizontal() {
        assert_eq!(classify(0.0), StepKind::Horizontal);
    }

    #[test]
    fn test_up_bands_inclusive_lower() {
        assert_eq!(classify(128.0), StepKind::UpLittle);
        assert_eq!(classify(129.0), StepKind::UpBig);
        assert_eq!(classify(256.0), StepKind::UpBig);
        assert_eq!(classify(257.0), StepKind::UpClimb);
        assert_eq!(classify(1920.0), StepKind::UpClimb);
    }

    #[test]
    fn test_down_bands_inclusive_lower() {
        assert_eq!(classify(-100.0), StepKind::DownLittle);
        assert_eq!(classify(-128.0), StepKind::DownLittle);
        assert_eq!(classify(-129.0), StepKind::DownBig);
        assert_eq!(classify(-256.0), StepKind::DownBig);
        assert_eq!(classify(-257.0), StepKind::DownDrop);
        assert_eq!(classify(-512.0), StepKind::DownDrop);
    }

    #[test]
    fn test_deep_drop_allows_hang() {
        // 600-unit drop exceeds min step, max step and body height
        assert_eq!(classify(-600.0), StepKind::DownCanHang);
    }

    #[test]
    fn test_tall_rise_impossible() {
        // beyond the 1920 climb limit; also vetoed by the wall ray
        assert_eq!(classify(2000.0), StepKind::UpImpossible);
    }

    #[test]
    fn test_wall_ray_vetoes_valid_delta() {
        // level floors but a thin wall between the two columns
        let (rooms, mut space) = split_floor(512.0, 512.0);
        space.add_box(
            Aabb::new(Vec3::new(1000.0, 0.0, 512.0), Vec3::new(1024.0, 8192.0, 1536.0)),
            ColliderFlags::empty(),
        );
        let ctx = WorldContext::new(&rooms, &space, Vec3::ZERO);
        let mut ch = character_at(512.0, 512.0);
        ch.update_current_height(&ctx);
        let (kind, _) = check_next_step(&ch, &ctx, Vec3::new(1024.0, 0.0, 0.0));
        assert_eq!(kind, StepKind::UpImpossible);
    }

    #[test]
    fn test_stop_slant() {
        let (rooms, space) = split_floor(512.0, 512.0);
        let ctx = WorldContext::new(&rooms, &space, Vec3::ZERO);
        let mut ch = character_at(512.0, 512.0);
        ch.update_current_height(&ctx);
        // facing +Y by default; synthesize a next probe with a steep
        // higher floor whose normal opposes the facing
        let mut next = ch.height_info;
        let mut floor = next.floor.unwrap();
        floor.point.z = ch.transform.position.z + 200.0;
        floor.normal = Vec3::new(0.0, -0.8, 0.6).normalized();
        next.floor = Some(floor);
        assert!(has_stop_slant(&ch, &next));

        // a walkable normal does not stop the run
        let mut floor = next.floor.unwrap();
        floor.normal = Vec3::new(0.0, -0.1, 0.99).normalized();
        next.floor = Some(floor);
        assert!(!has_stop_slant(&ch, &next));
    }

    #[test]
    fn test_bottomless_ahead_can_hang() {
        let mut rooms = RoomWorld::new();
        rooms.add_room(Room::new(Vec3::ZERO, 8, 8, -4096.0, 4096.0));
        let mut space = CollisionSpace::new();
        space.add_box(
            Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1024.0, 8192.0, 512.0)),
            ColliderFlags::empty(),
        );
        let ctx = WorldContext::new(&rooms, &space, Vec3::ZERO);
        let mut ch = character_at(512.0, 512.0);
        ch.update_current_height(&ctx);
        let (kind, next) = check_next_step(&ch, &ctx, Vec3::new(1024.0, 0.0, 0.0));
        assert_eq!(kind, StepKind::DownCanHang);
        assert!(!next.has_floor());
    }
}
