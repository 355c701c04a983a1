//! Sectors: the smallest addressable cells of a room's horizontal grid
//!
//! Each sector carries its own floor/ceiling heights, optional vertical
//! links to sectors of overlapping rooms above/below, and an optional
//! portal link to a neighbouring room.

use crate::room::RoomKey;
use bitflags::bitflags;
use strider_math::Vec3;

bitflags! {
    /// Which wall-normal directions a climbable wall in this sector accepts
    ///
    /// A wall is climbable from the character's approach side when the hit
    /// normal matches one of these directions (0.7 cosine tolerance).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct WallDirs: u8 {
        /// Wall normal pointing -Y
        const NEG_Y = 1 << 0;
        /// Wall normal pointing -X
        const NEG_X = 1 << 1;
        /// Wall normal pointing +Y
        const POS_Y = 1 << 2;
        /// Wall normal pointing +X
        const POS_X = 1 << 3;
    }
}

/// Address of a sector in another room (vertical stack links)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SectorRef {
    pub room: RoomKey,
    pub index_x: usize,
    pub index_y: usize,
}

/// One grid cell of a room
#[derive(Clone, Debug)]
pub struct Sector {
    /// Room this sector belongs to
    pub owner: RoomKey,
    pub index_x: usize,
    pub index_y: usize,
    /// Cell center in world XY (z is unused)
    pub pos: Vec3,
    /// Floor height of the cell
    pub floor: f32,
    /// Ceiling height of the cell
    pub ceiling: f32,
    /// Per-corner floor heights; all equal on a flat cell
    pub floor_corners: [f32; 4],
    /// Sector of an overlapping room above, if any
    pub above: Option<SectorRef>,
    /// Sector of an overlapping room below, if any
    pub below: Option<SectorRef>,
    /// Horizontal portal: this cell belongs logically to another room
    pub portal_to: Option<RoomKey>,
    /// Climbable-wall direction mask for this cell
    pub climbable_walls: WallDirs,
}

impl Sector {
    /// Whether the four floor corners are level
    pub fn has_flat_floor(&self) -> bool {
        let f0 = self.floor_corners[0];
        self.floor_corners.iter().all(|&f| f == f0)
    }
}
