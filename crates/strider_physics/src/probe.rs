//! Height/environment probe
//!
//! One probe answers, for a world-space position: where are the first
//! floor and ceiling surfaces, what medium is the position in, and where
//! does that medium change. Results are transient — every classification
//! or resolution step recomputes its probe first, never reuses one from an
//! unrelated query.

use crate::character::Character;
use crate::context::WorldContext;
use strider_math::Vec3;
use strider_world::{ColliderKey, RoomFlags, RoomKey, WallDirs};

/// Vertical ray length for the floor/ceiling casts
pub const HEIGHT_TEST_RANGE: f32 = 4096.0;

/// A floor or ceiling surface found by the probe
#[derive(Clone, Copy, Debug)]
pub struct SurfaceHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub body: ColliderKey,
}

/// Quicksand state at the probed position
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Quicksand {
    #[default]
    None,
    /// Quicksand shallower than the test offset: wading, not sinking
    Shallow,
    /// Quicksand deep enough to submerge the body
    Submerging,
}

/// Transient result of one environment probe
#[derive(Clone, Copy, Debug, Default)]
pub struct HeightInfo {
    pub floor: Option<SurfaceHit>,
    pub ceiling: Option<SurfaceHit>,
    pub water: bool,
    pub quicksand: Quicksand,
    /// Height at which the medium changes (meaningful only when `water`
    /// or `quicksand` is set)
    pub transition_level: f32,
    /// Climbable-wall mask of the resolved sector
    pub walls_climb: WallDirs,
}

impl HeightInfo {
    #[inline]
    pub fn has_floor(&self) -> bool {
        self.floor.is_some()
    }

    #[inline]
    pub fn has_ceiling(&self) -> bool {
        self.ceiling.is_some()
    }
}

/// Probe the environment at `pos`.
///
/// Casts a long ray straight down and straight up, resolves the owning
/// room by positional coherence (hint first) and its active flip twin,
/// and, when the room is water or quicksand flagged, walks the vertical
/// sector stack away from the medium to find the transition level.
/// Quicksand distinguishes shallow from submerging by comparing the
/// transition-to-floor gap against `v_offset`.
///
/// No hit on either cast is a valid outcome, not an error.
pub fn get_height_info(
    ctx: &WorldContext,
    pos: Vec3,
    v_offset: f32,
    hint: Option<RoomKey>,
) -> HeightInfo {
    let mut info = HeightInfo::default();

    let down = pos - Vec3::new(0.0, 0.0, HEIGHT_TEST_RANGE);
    info.floor = ctx.space.ray_cast(pos, down).map(|h| SurfaceHit {
        point: h.point,
        normal: h.normal,
        body: h.body,
    });

    let up = pos + Vec3::new(0.0, 0.0, HEIGHT_TEST_RANGE);
    info.ceiling = ctx.space.ray_cast(pos, up).map(|h| SurfaceHit {
        point: h.point,
        normal: h.normal,
        body: h.body,
    });

    let room = match ctx.rooms.find_room_containing(pos, hint) {
        Some(r) => ctx.rooms.check_flip(r),
        None => return info,
    };
    let room_flags = match ctx.rooms.room(room) {
        Some(r) => r.flags,
        None => return info,
    };
    let sector = match ctx.rooms.sector_at(room, pos) {
        Some(s) => s,
        None => return info,
    };
    info.walls_climb = sector.climbable_walls;

    let floor_z = info.floor.map(|f| f.point.z);
    let quicksand_state = |transition: f32| match floor_z {
        Some(fz) if transition - fz <= v_offset => Quicksand::Shallow,
        _ => Quicksand::Submerging,
    };

    if room_flags.contains(RoomFlags::WATER) {
        // in water: walk up the stack until air
        let mut rs = sector;
        while let Some(above) = rs.above {
            rs = match ctx.rooms.sector_ref(above) {
                Some(s) => s,
                None => break,
            };
            let flags = ctx.rooms.room(rs.owner).map(|r| r.flags).unwrap_or_default();
            if !flags.contains(RoomFlags::WATER) {
                info.transition_level = rs.floor;
                info.water = true;
                break;
            }
        }
    } else if room_flags.contains(RoomFlags::QUICKSAND) {
        let mut rs = sector;
        while let Some(above) = rs.above {
            rs = match ctx.rooms.sector_ref(above) {
                Some(s) => s,
                None => break,
            };
            let flags = ctx.rooms.room(rs.owner).map(|r| r.flags).unwrap_or_default();
            if !flags.contains(RoomFlags::QUICKSAND) {
                info.transition_level = rs.floor;
                info.quicksand = quicksand_state(info.transition_level);
                break;
            }
        }
    } else {
        // in air: walk down the stack until water or quicksand
        let mut rs = sector;
        while let Some(below) = rs.below {
            rs = match ctx.rooms.sector_ref(below) {
                Some(s) => s,
                None => break,
            };
            let flags = ctx.rooms.room(rs.owner).map(|r| r.flags).unwrap_or_default();
            if flags.contains(RoomFlags::WATER) {
                info.transition_level = rs.ceiling;
                info.water = true;
                break;
            } else if flags.contains(RoomFlags::QUICKSAND) {
                info.transition_level = rs.ceiling;
                info.quicksand = quicksand_state(info.transition_level);
                break;
            }
        }
    }

    info
}

impl Character {
    /// Refresh this character's environment probe at the body-box center
    pub fn update_current_height(&mut self, ctx: &WorldContext) {
        let pos = self.transform.position + Vec3::new(0.0, 0.0, self.bbox_center_z());
        self.height_info = get_height_info(ctx, pos, self.height, self.room);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strider_world::{
        Aabb, ColliderFlags, CollisionSpace, Room, RoomWorld,
    };

    fn dry_world() -> (RoomWorld, CollisionSpace, RoomKey) {
        let mut rooms = RoomWorld::new();
        let key = rooms.add_room(Room::new(Vec3::ZERO, 4, 4, 0.0, 4096.0));
        let mut space = CollisionSpace::new();
        space.add_box(
            Aabb::new(Vec3::new(0.0, 0.0, -256.0), Vec3::new(4096.0, 4096.0, 0.0)),
            ColliderFlags::empty(),
        );
        (rooms, space, key)
    }

    fn pool_world() -> (RoomWorld, CollisionSpace, RoomKey, RoomKey) {
        let mut rooms = RoomWorld::new();
        let water =
            rooms.add_room(Room::new(Vec3::ZERO, 4, 4, -2048.0, 0.0).with_flags(RoomFlags::WATER));
        let air = rooms.add_room(Room::new(Vec3::ZERO, 4, 4, 0.0, 4096.0));
        rooms.link_vertical(water, air);
        rooms.link_near(water, air);
        let mut space = CollisionSpace::new();
        space.add_box(
            Aabb::new(Vec3::new(0.0, 0.0, -2304.0), Vec3::new(4096.0, 4096.0, -2048.0)),
            ColliderFlags::empty(),
        );
        (rooms, space, water, air)
    }

    #[test]
    fn test_floor_and_ceiling_hits() {
        let (rooms, mut space, _key) = dry_world();
        space.add_box(
            Aabb::new(Vec3::new(0.0, 0.0, 3072.0), Vec3::new(4096.0, 4096.0, 3328.0)),
            ColliderFlags::empty(),
        );
        let ctx = WorldContext::new(&rooms, &space, Vec3::ZERO);

        let info = get_height_info(&ctx, Vec3::new(512.0, 512.0, 256.0), 512.0, None);
        let floor = info.floor.expect("floor below");
        assert!((floor.point.z - 0.0).abs() < 0.001);
        assert_eq!(floor.normal, Vec3::Z);
        let ceiling = info.ceiling.expect("ceiling above");
        assert!((ceiling.point.z - 3072.0).abs() < 0.001);
        assert!(!info.water);
        assert_eq!(info.quicksand, Quicksand::None);
    }

    #[test]
    fn test_no_hit_is_valid() {
        let rooms = RoomWorld::new();
        let space = CollisionSpace::new();
        let ctx = WorldContext::new(&rooms, &space, Vec3::ZERO);

        let info = get_height_info(&ctx, Vec3::ZERO, 512.0, None);
        assert!(!info.has_floor());
        assert!(!info.has_ceiling());
        assert!(!info.water);
    }

    #[test]
    fn test_air_above_water_finds_transition() {
        let (rooms, space, _water, air) = pool_world();
        let ctx = WorldContext::new(&rooms, &space, Vec3::ZERO);

        // probing from the air room above the pool
        let info = get_height_info(&ctx, Vec3::new(512.0, 512.0, 512.0), 512.0, Some(air));
        assert!(info.water);
        // the water surface is the water room's ceiling
        assert!((info.transition_level - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_submerged_finds_transition_above() {
        let (rooms, space, water, _air) = pool_world();
        let ctx = WorldContext::new(&rooms, &space, Vec3::ZERO);

        let info = get_height_info(&ctx, Vec3::new(512.0, 512.0, -1024.0), 512.0, Some(water));
        assert!(info.water);
        assert!((info.transition_level - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_quicksand_shallow_vs_submerging() {
        let mut rooms = RoomWorld::new();
        let sand = rooms
            .add_room(Room::new(Vec3::ZERO, 4, 4, -2048.0, 0.0).with_flags(RoomFlags::QUICKSAND));
        let air = rooms.add_room(Room::new(Vec3::ZERO, 4, 4, 0.0, 4096.0));
        rooms.link_vertical(sand, air);
        let mut space = CollisionSpace::new();
        // sand floor only 100 units below the surface
        space.add_box(
            Aabb::new(Vec3::new(0.0, 0.0, -356.0), Vec3::new(4096.0, 4096.0, -100.0)),
            ColliderFlags::empty(),
        );
        let ctx = WorldContext::new(&rooms, &space, Vec3::ZERO);

        let at = Vec3::new(512.0, 512.0, -50.0);
        // gap (100) below the offset: shallow
        let info = get_height_info(&ctx, at, 512.0, Some(sand));
        assert_eq!(info.quicksand, Quicksand::Shallow);

        // gap above the offset: submerging
        let info = get_height_info(&ctx, at, 50.0, Some(sand));
        assert_eq!(info.quicksand, Quicksand::Submerging);
    }
}
