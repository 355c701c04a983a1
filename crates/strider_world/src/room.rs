//! Rooms and the spatial lookup service
//!
//! Rooms partition the world into boxes carrying a sector grid and medium
//! flags. A room can have a flip twin (base/alternate) representing the
//! same physical space in a mutually-exclusive state; exactly one of the
//! pair is active at a time, and every lookup resolves to the active twin.

use crate::sector::{Sector, SectorRef, WallDirs};
use crate::SECTOR_SIZE;
use bitflags::bitflags;
use slotmap::{new_key_type, SlotMap};
use strider_math::Vec3;

new_key_type! {
    /// Key to a room in the room world
    pub struct RoomKey;
}

bitflags! {
    /// Medium flags of a room
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct RoomFlags: u8 {
        /// Room volume is filled with water
        const WATER = 1 << 0;
        /// Room volume is quicksand
        const QUICKSAND = 1 << 1;
    }
}

/// A spatial region: box bounds, sector grid, medium flags, flip links
#[derive(Clone, Debug)]
pub struct Room {
    pub bb_min: Vec3,
    pub bb_max: Vec3,
    /// World position of the sector grid's (0, 0) corner
    pub origin: Vec3,
    pub sectors_x: usize,
    pub sectors_y: usize,
    /// Column-major sector grid: index = x * sectors_y + y
    pub sectors: Vec<Sector>,
    pub flags: RoomFlags,
    /// Exactly one of a flip pair is active
    pub active: bool,
    /// Flip twin links (a room never links to itself)
    pub base_room: Option<RoomKey>,
    pub alternate_room: Option<RoomKey>,
    /// Cached neighbour list for coherent position lookup
    pub near_rooms: Vec<RoomKey>,
}

impl Room {
    /// Create a room with a uniform flat sector grid.
    ///
    /// Sector owner keys are patched by [`RoomWorld::add_room`].
    pub fn new(origin: Vec3, sectors_x: usize, sectors_y: usize, floor: f32, ceiling: f32) -> Self {
        let mut sectors = Vec::with_capacity(sectors_x * sectors_y);
        for x in 0..sectors_x {
            for y in 0..sectors_y {
                sectors.push(Sector {
                    owner: RoomKey::default(),
                    index_x: x,
                    index_y: y,
                    pos: Vec3::new(
                        origin.x + (x as f32 + 0.5) * SECTOR_SIZE,
                        origin.y + (y as f32 + 0.5) * SECTOR_SIZE,
                        0.0,
                    ),
                    floor,
                    ceiling,
                    floor_corners: [floor; 4],
                    above: None,
                    below: None,
                    portal_to: None,
                    climbable_walls: WallDirs::empty(),
                });
            }
        }
        Self {
            bb_min: Vec3::new(origin.x, origin.y, floor),
            bb_max: Vec3::new(
                origin.x + sectors_x as f32 * SECTOR_SIZE,
                origin.y + sectors_y as f32 * SECTOR_SIZE,
                ceiling,
            ),
            origin,
            sectors_x,
            sectors_y,
            sectors,
            flags: RoomFlags::empty(),
            active: true,
            base_room: None,
            alternate_room: None,
            near_rooms: Vec::new(),
        }
    }

    /// Set the medium flags (builder style)
    pub fn with_flags(mut self, flags: RoomFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Whether a point lies inside the room bounds (upper bound exclusive)
    pub fn contains(&self, pos: Vec3) -> bool {
        pos.x >= self.bb_min.x
            && pos.x < self.bb_max.x
            && pos.y >= self.bb_min.y
            && pos.y < self.bb_max.y
            && pos.z >= self.bb_min.z
            && pos.z < self.bb_max.z
    }

    fn sector_index(&self, pos: Vec3) -> Option<usize> {
        let x = ((pos.x - self.origin.x) / SECTOR_SIZE).floor() as isize;
        let y = ((pos.y - self.origin.y) / SECTOR_SIZE).floor() as isize;
        if x < 0 || x >= self.sectors_x as isize || y < 0 || y >= self.sectors_y as isize {
            return None;
        }
        Some(x as usize * self.sectors_y + y as usize)
    }

    /// Sector lookup by world XY, no flip or stack resolution
    pub fn sector_raw(&self, pos: Vec3) -> Option<&Sector> {
        if !self.active {
            return None;
        }
        self.sector_index(pos).map(|i| &self.sectors[i])
    }

    /// Mutable sector lookup by world XY
    pub fn sector_raw_mut(&mut self, pos: Vec3) -> Option<&mut Sector> {
        self.sector_index(pos).map(move |i| &mut self.sectors[i])
    }

    /// Sector by grid index
    pub fn sector(&self, index_x: usize, index_y: usize) -> Option<&Sector> {
        if index_x >= self.sectors_x || index_y >= self.sectors_y {
            return None;
        }
        Some(&self.sectors[index_x * self.sectors_y + index_y])
    }
}

/// Owner of all rooms, providing the spatial query service
#[derive(Default)]
pub struct RoomWorld {
    rooms: SlotMap<RoomKey, Room>,
}

impl RoomWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a room, patching its sectors' owner keys
    pub fn add_room(&mut self, room: Room) -> RoomKey {
        self.rooms.insert_with_key(|key| {
            let mut room = room;
            for s in &mut room.sectors {
                s.owner = key;
            }
            room
        })
    }

    pub fn room(&self, key: RoomKey) -> Option<&Room> {
        self.rooms.get(key)
    }

    pub fn room_mut(&mut self, key: RoomKey) -> Option<&mut Room> {
        self.rooms.get_mut(key)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Pair two rooms as flip twins; `base` starts active
    pub fn set_flip_pair(&mut self, base: RoomKey, alternate: RoomKey) {
        if let Some(r) = self.rooms.get_mut(base) {
            r.alternate_room = Some(alternate);
            r.active = true;
        }
        if let Some(r) = self.rooms.get_mut(alternate) {
            r.base_room = Some(base);
            r.active = false;
        }
    }

    /// Toggle which twin of a flip pair is active
    pub fn swap_flip(&mut self, room: RoomKey) {
        let twin = self.rooms.get(room).and_then(|r| r.alternate_room.or(r.base_room));
        if let Some(twin) = twin {
            let was_active = self.rooms[room].active;
            self.rooms[room].active = !was_active;
            self.rooms[twin].active = was_active;
        }
    }

    /// Record mutual neighbourhood between two rooms (coherence cache)
    pub fn link_near(&mut self, a: RoomKey, b: RoomKey) {
        if let Some(r) = self.rooms.get_mut(a) {
            if !r.near_rooms.contains(&b) {
                r.near_rooms.push(b);
            }
        }
        if let Some(r) = self.rooms.get_mut(b) {
            if !r.near_rooms.contains(&a) {
                r.near_rooms.push(a);
            }
        }
    }

    /// Link the vertical sector stacks of two overlapping rooms.
    ///
    /// For every cell of `lower` whose column continues into `upper`, sets
    /// the above/below references both ways.
    pub fn link_vertical(&mut self, lower: RoomKey, upper: RoomKey) {
        let pairs: Vec<(usize, usize, usize, usize)> = {
            let (lo, up) = match (self.rooms.get(lower), self.rooms.get(upper)) {
                (Some(lo), Some(up)) => (lo, up),
                _ => return,
            };
            lo.sectors
                .iter()
                .filter_map(|s| {
                    up.sector_index(s.pos)
                        .map(|ui| (s.index_x, s.index_y, ui / up.sectors_y, ui % up.sectors_y))
                })
                .collect()
        };
        for (lx, ly, ux, uy) in pairs {
            let li = lx * self.rooms[lower].sectors_y + ly;
            let ui = ux * self.rooms[upper].sectors_y + uy;
            self.rooms[lower].sectors[li].above = Some(SectorRef {
                room: upper,
                index_x: ux,
                index_y: uy,
            });
            self.rooms[upper].sectors[ui].below = Some(SectorRef {
                room: lower,
                index_x: lx,
                index_y: ly,
            });
        }
    }

    /// Full scan for the active room containing a point
    pub fn find_room_at(&self, pos: Vec3) -> Option<RoomKey> {
        self.rooms
            .iter()
            .find(|(_, r)| r.active && r.contains(pos))
            .map(|(k, _)| k)
    }

    /// Positional-coherence room lookup: the hint room first, then its
    /// cached neighbour list, then a full spatial search.
    pub fn find_room_containing(&self, pos: Vec3, hint: Option<RoomKey>) -> Option<RoomKey> {
        let hint_room = hint.and_then(|k| self.rooms.get(k).map(|r| (k, r)));
        if let Some((key, room)) = hint_room {
            if room.active && room.contains(pos) {
                return Some(key);
            }
            for &near in &room.near_rooms {
                if let Some(r) = self.rooms.get(near) {
                    if r.active && r.contains(pos) {
                        return Some(near);
                    }
                }
            }
        }
        log::trace!("room coherence miss at {:?}, full scan", pos);
        self.find_room_at(pos)
    }

    /// Resolve a room to the active twin of its flip pair
    pub fn check_flip(&self, key: RoomKey) -> RoomKey {
        let room = match self.rooms.get(key) {
            Some(r) => r,
            None => return key,
        };
        if room.active {
            return key;
        }
        if let Some(base) = room.base_room {
            if self.rooms.get(base).is_some_and(|r| r.active) {
                return base;
            }
        }
        if let Some(alt) = room.alternate_room {
            if self.rooms.get(alt).is_some_and(|r| r.active) {
                return alt;
            }
        }
        key
    }

    /// Resolve a sector reference to the active flip twin's sector
    pub fn sector_check_flip<'a>(&'a self, sector: &'a Sector) -> &'a Sector {
        let owner = match self.rooms.get(sector.owner) {
            Some(r) => r,
            None => return sector,
        };
        if owner.active {
            return sector;
        }
        let twin_key = self.check_flip(sector.owner);
        if twin_key == sector.owner {
            return sector;
        }
        self.rooms[twin_key]
            .sector(sector.index_x, sector.index_y)
            .unwrap_or(sector)
    }

    /// Follow a sector reference (above/below stack link), flip-resolved
    pub fn sector_ref<'a>(&'a self, sref: SectorRef) -> Option<&'a Sector> {
        let room = self.rooms.get(sref.room)?;
        let sector = room.sector(sref.index_x, sref.index_y)?;
        Some(self.sector_check_flip(sector))
    }

    /// Full sector lookup: flip-resolve the room, then resolve vertical
    /// room overlap (the sector below wins when the point is under its
    /// ceiling, then the sector above when the point is over its floor).
    pub fn sector_at(&self, room: RoomKey, pos: Vec3) -> Option<&Sector> {
        let room = self.check_flip(room);
        let sector = self.rooms.get(room)?.sector_raw(pos)?;

        if let Some(below) = sector.below {
            if let Some(bs) = self.sector_ref(below) {
                if bs.ceiling >= pos.z {
                    return Some(bs);
                }
            }
        }
        if let Some(above) = sector.above {
            if let Some(asec) = self.sector_ref(above) {
                if asec.floor <= pos.z {
                    return Some(asec);
                }
            }
        }
        Some(sector)
    }

    /// Resolve a portal cell to the sector it actually belongs to
    pub fn resolve_portal<'a>(&'a self, sector: &'a Sector) -> Option<&'a Sector> {
        match sector.portal_to {
            Some(dest) => {
                let dest = self.check_flip(dest);
                self.rooms.get(dest)?.sector_raw(sector.pos)
            }
            None => Some(sector),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_stacked_rooms() -> (RoomWorld, RoomKey, RoomKey) {
        let mut world = RoomWorld::new();
        // water room below, air room above
        let lower = world.add_room(
            Room::new(Vec3::ZERO, 4, 4, -2048.0, 0.0).with_flags(RoomFlags::WATER),
        );
        let upper = world.add_room(Room::new(Vec3::ZERO, 4, 4, 0.0, 2048.0));
        world.link_vertical(lower, upper);
        world.link_near(lower, upper);
        (world, lower, upper)
    }

    #[test]
    fn test_find_room_coherence() {
        let (world, lower, upper) = two_stacked_rooms();
        let in_upper = Vec3::new(512.0, 512.0, 100.0);

        // correct hint
        assert_eq!(world.find_room_containing(in_upper, Some(upper)), Some(upper));
        // stale hint resolves through the near list
        assert_eq!(world.find_room_containing(in_upper, Some(lower)), Some(upper));
        // no hint falls back to the full scan
        assert_eq!(world.find_room_containing(in_upper, None), Some(upper));
    }

    #[test]
    fn test_sector_lookup() {
        let (world, _, upper) = two_stacked_rooms();
        let s = world
            .sector_at(upper, Vec3::new(1500.0, 700.0, 100.0))
            .unwrap();
        assert_eq!((s.index_x, s.index_y), (1, 0));
        assert_eq!(s.floor, 0.0);
        assert_eq!(s.ceiling, 2048.0);
    }

    #[test]
    fn test_vertical_stack_links() {
        let (world, lower, upper) = two_stacked_rooms();
        let below = world.room(upper).unwrap().sector(2, 2).unwrap().below.unwrap();
        assert_eq!(below.room, lower);
        let above = world.room(lower).unwrap().sector(2, 2).unwrap().above.unwrap();
        assert_eq!(above.room, upper);
    }

    #[test]
    fn test_sector_below_priority() {
        let (world, lower, upper) = two_stacked_rooms();
        // a point inside the lower room's column resolves to the lower sector
        let s = world.sector_at(upper, Vec3::new(512.0, 512.0, -100.0)).unwrap();
        assert_eq!(s.owner, lower);
    }

    #[test]
    fn test_flip_resolution() {
        let mut world = RoomWorld::new();
        let base = world.add_room(Room::new(Vec3::ZERO, 2, 2, 0.0, 1024.0));
        let alt = world.add_room(
            Room::new(Vec3::ZERO, 2, 2, 0.0, 1024.0).with_flags(RoomFlags::WATER),
        );
        world.set_flip_pair(base, alt);

        assert_eq!(world.check_flip(alt), base);
        world.swap_flip(base);
        assert_eq!(world.check_flip(base), alt);
        assert!(world.room(alt).unwrap().active);
    }
}
