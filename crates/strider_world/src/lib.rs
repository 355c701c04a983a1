//! World services for the Strider character-movement core
//!
//! Two halves:
//! - the spatial structure (rooms, sectors, flip twins) answering
//!   "what region/medium is at this point", and
//! - the collision space answering ray, sweep and overlap queries
//!   against static/kinematic obstacle geometry.

pub mod collision;
pub mod room;
pub mod sector;
pub mod shapes;

pub use collision::{
    Axis, CapsuleShape, ColliderBody, ColliderFlags, ColliderKey, CollisionSpace,
    ContactManifold, ManifoldPoint, RayHit,
};
pub use room::{Room, RoomFlags, RoomKey, RoomWorld};
pub use sector::{Sector, SectorRef, WallDirs};
pub use shapes::Aabb;

/// Edge length of one horizontal sector cell, in world units
pub const SECTOR_SIZE: f32 = 1024.0;
