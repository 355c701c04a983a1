//! World context passed into every core operation
//!
//! The movement core never reaches for globals: the simulation driver owns
//! the spatial structure and collision space, and lends this bundle to the
//! probe, climb detector, penetration resolver and integrators each frame.

use strider_math::Vec3;
use strider_world::{CollisionSpace, RoomWorld};

/// Borrowed view of the world for one character update
#[derive(Clone, Copy)]
pub struct WorldContext<'a> {
    pub rooms: &'a RoomWorld,
    pub space: &'a CollisionSpace,
    /// Gravity acceleration vector (units per second squared, -Z down)
    pub gravity: Vec3,
}

impl<'a> WorldContext<'a> {
    pub fn new(rooms: &'a RoomWorld, space: &'a CollisionSpace, gravity: Vec3) -> Self {
        Self {
            rooms,
            space,
            gravity,
        }
    }
}
