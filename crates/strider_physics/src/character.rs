//! Character state: transform, tunables, per-frame command and response
//!
//! A `Character` fuses the entity fields the movement core needs (position,
//! facing, velocity, motion mode) with the controller's own tunables and
//! transient probe results. It holds non-owning keys into the room world
//! and collision space; the simulation driver owns those.

use crate::climb::ClimbInfo;
use crate::params::CharacterParams;
use crate::penetration::GhostProxy;
use crate::probe::HeightInfo;
use crate::shape::select_shape;
use bitflags::bitflags;
use strider_math::{wrap_deg, Vec3};
use strider_world::{Axis, CapsuleShape, ColliderKey, RoomKey, RoomWorld};

pub const DEFAULT_SPEED_MULT: f32 = 31.5;
/// Multiplier applied on top of `speed_mult` while slope-sliding
pub const SLIDE_SPEED_MULT: f32 = 75.0;
pub const DEFAULT_CLIMB_RADIUS: f32 = 32.0;
pub const DEFAULT_WADE_DEPTH: f32 = 256.0;
pub const DEFAULT_MIN_STEP_UP_HEIGHT: f32 = 128.0;
pub const DEFAULT_MAX_STEP_UP_HEIGHT: f32 = 256.0;
pub const DEFAULT_MAX_CLIMB_HEIGHT: f32 = 1920.0;
pub const DEFAULT_FALL_DOWN_HEIGHT: f32 = 320.0;
/// Floor normals with a smaller vertical component force sliding
pub const DEFAULT_CRITICAL_SLANT_Z: f32 = 0.810;
/// Cosine bound deciding when a correction counts as a wall hit
pub const DEFAULT_CRITICAL_WALL_COMPONENT: f32 = 0.707;
pub const DEFAULT_MAX_MOVE_ITERATIONS: usize = 3;
/// Terminal fall speed
pub const FREE_FALL_SPEED_MAX: f32 = 7500.0;

/// The seven motion modes. Exactly one is active per character per frame;
/// transitions happen only at integrator return points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MoveType {
    #[default]
    OnFloor,
    FreeFalling,
    Climbing,
    MonkeySwing,
    WallsClimb,
    UnderWater,
    OnWater,
}

/// Current movement direction relative to facing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DirFlag {
    #[default]
    Stay,
    Forward,
    Backward,
    Left,
    Right,
}

/// Forced-slide state reported back to the animation layer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SlideKind {
    #[default]
    None,
    Back,
    Front,
}

/// Ambient substance around the body, derived from the probe and the wade
/// depth. Read by the animation layer to pick wade/swim/sink states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Substance {
    None,
    WaterShallow,
    WaterWade,
    WaterSwim,
    QuicksandShallow,
    QuicksandConsumed,
}

bitflags! {
    /// Vertical contact bits of the frame response
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct VerticalCollide: u8 {
        const FLOOR = 1 << 0;
        const CEILING = 1 << 1;
    }
}

/// Per-frame input intent, produced by the external script/animation layer
#[derive(Clone, Copy, Debug, Default)]
pub struct Command {
    /// Movement axes in {-1, 0, 1}: [forward/back, right/left, up/down]
    pub move_axis: [i8; 3],
    /// Rotation deltas in degrees: [yaw, pitch, roll]
    pub rot: Vec3,
    pub jump: bool,
    pub crouch: bool,
    pub roll: bool,
    pub shift: bool,
    pub action: bool,
}

/// Per-frame collision response, read by the external layer after a step
#[derive(Clone, Copy, Debug, Default)]
pub struct Response {
    pub vertical_collide: VerticalCollide,
    pub horizontal_collide: bool,
    pub slide: SlideKind,
    /// Set when the resolver absorbed a penetration as a step-up
    pub step_up: bool,
    pub kill: bool,
}

/// Local-space body bounds, driven by the animation layer
#[derive(Clone, Copy, Debug)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

/// Position plus yaw/pitch/roll (degrees) with a cached basis.
///
/// Basis convention: `right` is local +X, `forward` local +Y, `up`
/// local +Z.
#[derive(Clone, Copy, Debug)]
pub struct Transform {
    pub position: Vec3,
    /// [yaw, pitch, roll] in degrees
    pub angles: [f32; 3],
    right: Vec3,
    forward: Vec3,
    up: Vec3,
}

impl Transform {
    pub fn new(position: Vec3) -> Self {
        let mut tr = Self {
            position,
            angles: [0.0; 3],
            right: Vec3::X,
            forward: Vec3::Y,
            up: Vec3::Z,
        };
        tr.update_rotation();
        tr
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        self.right
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    #[inline]
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Recompute the basis from the current angles (yaw about Z, then
    /// pitch about local X, then roll about local Y).
    pub fn update_rotation(&mut self) {
        self.angles[0] = wrap_deg(self.angles[0]);
        self.angles[1] = wrap_deg(self.angles[1]);
        self.angles[2] = wrap_deg(self.angles[2]);

        let (sy, cy) = self.angles[0].to_radians().sin_cos();
        let (sp, cp) = self.angles[1].to_radians().sin_cos();
        let (sr, cr) = self.angles[2].to_radians().sin_cos();

        // M = Rz(yaw) * Rx(pitch) * Ry(roll), columns are the basis
        self.right = Vec3::new(
            cy * cr - sy * sp * sr,
            sy * cr + cy * sp * sr,
            -cp * sr,
        );
        self.forward = Vec3::new(-sy * cp, cy * cp, sp);
        self.up = Vec3::new(
            cy * sr + sy * sp * cr,
            sy * sr - cy * sp * cr,
            cp * cr,
        );
    }
}

/// One sub-shape of the complex (per-part) collision proxy
#[derive(Clone, Copy, Debug)]
pub struct BodyPart {
    /// Offset from the character origin, in the local frame
    pub offset: Vec3,
    pub shape: CapsuleShape,
}

/// A kinematic character
pub struct Character {
    pub transform: Transform,
    pub bbox: BoundingBox,
    /// World-space velocity
    pub speed: Vec3,
    /// Requested scalar speed from the animation layer
    pub current_speed: f32,
    /// Ramped speed value used by the swim modes
    pub inertia: f32,
    pub dir_flag: DirFlag,
    pub move_type: MoveType,
    pub cmd: Command,
    pub resp: Response,
    pub height_info: HeightInfo,
    pub climb: ClimbInfo,
    pub params: CharacterParams,

    // tunables
    pub rx: f32,
    pub ry: f32,
    pub height: f32,
    pub speed_mult: f32,
    pub min_step_up_height: f32,
    pub max_step_up_height: f32,
    pub max_climb_height: f32,
    pub fall_down_height: f32,
    pub critical_slant_z_component: f32,
    pub critical_wall_component: f32,
    pub climb_r: f32,
    pub wade_depth: f32,
    pub max_move_iterations: usize,

    // collision proxy
    pub ghost: GhostProxy,
    /// Per-part shapes for the complex proxy mode, in collision-map order
    pub body_parts: Vec<BodyPart>,
    pub complex_collision: bool,
    /// Disables penetration fixing and the hard floor clamp
    pub no_fix: bool,

    // non-owning world attachment
    pub room: Option<RoomKey>,
    pub platform: Option<ColliderKey>,
    pub traversed_object: Option<ColliderKey>,

    /// Set by the animation layer while sprinting (stamina drain)
    pub sprinting: bool,
}

impl Character {
    /// Create a character with the default tunables for the given body
    /// half-radii and height.
    pub fn new(position: Vec3, rx: f32, ry: f32, height: f32) -> Self {
        let bbox = BoundingBox {
            min: Vec3::new(-rx, -ry, 0.0),
            max: Vec3::new(rx, ry, height),
        };
        let climb_r = if DEFAULT_CLIMB_RADIUS <= 0.8 * ry {
            DEFAULT_CLIMB_RADIUS
        } else {
            0.8 * ry
        };
        let mut ch = Self {
            transform: Transform::new(position),
            bbox,
            speed: Vec3::ZERO,
            current_speed: 0.0,
            inertia: 0.0,
            dir_flag: DirFlag::Stay,
            move_type: MoveType::OnFloor,
            cmd: Command::default(),
            resp: Response::default(),
            height_info: HeightInfo::default(),
            climb: ClimbInfo::default(),
            params: CharacterParams::default(),
            rx,
            ry,
            height,
            speed_mult: DEFAULT_SPEED_MULT,
            min_step_up_height: DEFAULT_MIN_STEP_UP_HEIGHT,
            max_step_up_height: DEFAULT_MAX_STEP_UP_HEIGHT,
            max_climb_height: DEFAULT_MAX_CLIMB_HEIGHT,
            fall_down_height: DEFAULT_FALL_DOWN_HEIGHT,
            critical_slant_z_component: DEFAULT_CRITICAL_SLANT_Z,
            critical_wall_component: DEFAULT_CRITICAL_WALL_COMPONENT,
            climb_r,
            wade_depth: DEFAULT_WADE_DEPTH,
            max_move_iterations: DEFAULT_MAX_MOVE_ITERATIONS,
            ghost: GhostProxy {
                shape: CapsuleShape {
                    axis: Axis::Z,
                    radius: ry,
                    half_length: (height * 0.5 - ry).max(0.0),
                },
                offset: Vec3::new(0.0, 0.0, height * 0.5),
            },
            body_parts: Vec::new(),
            complex_collision: false,
            no_fix: false,
            room: None,
            platform: None,
            traversed_object: None,
            sprinting: false,
        };
        ch.update_collision_shape(0.0, false);
        ch
    }

    /// Height of the body-box center above the character origin
    #[inline]
    pub fn bbox_center_z(&self) -> f32 {
        0.5 * (self.bbox.min.z + self.bbox.max.z)
    }

    /// Re-select the collision proxy shape for the current pose.
    ///
    /// `z_factor` lifts the capsule bottom to let small steps pass under
    /// it; `alt_pose` selects the animation-driven alternate placement.
    pub fn update_collision_shape(&mut self, z_factor: f32, alt_pose: bool) {
        let desc = select_shape(&self.bbox, self.rx, self.ry, self.move_type, z_factor, alt_pose);
        self.ghost.shape = desc.shape;
        self.ghost.offset = desc.offset;
    }

    /// World-space center of the ghost proxy
    pub fn ghost_center(&self) -> Vec3 {
        let o = self.ghost.offset;
        self.transform.position
            + self.transform.right() * o.x
            + self.transform.forward() * o.y
            + Vec3::new(0.0, 0.0, o.z)
    }

    /// Re-derive the owning room from the current position (positional
    /// coherence against the previous attachment).
    pub fn update_room_position(&mut self, rooms: &RoomWorld) {
        let probe = self.transform.position + Vec3::new(0.0, 0.0, self.bbox_center_z());
        if let Some(room) = rooms.find_room_containing(probe, self.room) {
            if self.room != Some(room) {
                log::trace!("character moved to room {:?}", room);
            }
            self.room = Some(room);
        }
    }

    /// Classify the ambient substance from the current probe and the wade
    /// depth
    pub fn substance_state(&self) -> Substance {
        let z = self.transform.position.z;
        let info = &self.height_info;
        match info.quicksand {
            crate::probe::Quicksand::Submerging => return Substance::QuicksandConsumed,
            crate::probe::Quicksand::Shallow => return Substance::QuicksandShallow,
            crate::probe::Quicksand::None => {}
        }
        if !info.water {
            Substance::None
        } else if info.transition_level > z && info.transition_level < z + self.wade_depth {
            Substance::WaterShallow
        } else if info.transition_level > z + self.wade_depth
            && info.transition_level < z + self.height
        {
            Substance::WaterWade
        } else if info.transition_level >= z + self.height {
            Substance::WaterSwim
        } else {
            Substance::None
        }
    }

    /// Whether the character currently stands in a water-flagged room
    pub fn in_water_room(&self, rooms: &RoomWorld) -> bool {
        self.room
            .and_then(|k| rooms.room(k))
            .map(|r| r.flags.contains(strider_world::RoomFlags::WATER))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_character_defaults() {
        let ch = Character::new(Vec3::ZERO, 128.0, 128.0, 512.0);
        assert_eq!(ch.move_type, MoveType::OnFloor);
        assert_eq!(ch.dir_flag, DirFlag::Stay);
        assert_eq!(ch.speed, Vec3::ZERO);
        assert_eq!(ch.min_step_up_height, DEFAULT_MIN_STEP_UP_HEIGHT);
        assert_eq!(ch.climb_r, DEFAULT_CLIMB_RADIUS);
        assert!(!ch.no_fix);
    }

    #[test]
    fn test_climb_radius_shrinks_with_thin_body() {
        // climb sensor never exceeds 0.8x the body depth radius
        let ch = Character::new(Vec3::ZERO, 20.0, 20.0, 512.0);
        assert_eq!(ch.climb_r, 16.0);
    }

    #[test]
    fn test_transform_basis_yaw() {
        let mut tr = Transform::new(Vec3::ZERO);
        assert_eq!(tr.forward(), Vec3::Y);

        tr.angles[0] = 90.0;
        tr.update_rotation();
        // yaw 90 turns +Y toward -X
        assert!((tr.forward().x - (-1.0)).abs() < 0.0001);
        assert!(tr.forward().y.abs() < 0.0001);
        assert!((tr.right().y - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_transform_basis_pitch() {
        let mut tr = Transform::new(Vec3::ZERO);
        tr.angles[1] = 70.0;
        tr.update_rotation();
        // pitching up raises the forward vector
        assert!((tr.forward().z - 70.0_f32.to_radians().sin()).abs() < 0.0001);
        assert!((tr.up().z - 70.0_f32.to_radians().cos()).abs() < 0.0001);
    }

    #[test]
    fn test_angles_wrap() {
        let mut tr = Transform::new(Vec3::ZERO);
        tr.angles[0] = 450.0;
        tr.update_rotation();
        assert_eq!(tr.angles[0], 90.0);
    }

    #[test]
    fn test_substance_state_bands() {
        let mut ch = Character::new(Vec3::ZERO, 128.0, 128.0, 512.0);
        assert_eq!(ch.substance_state(), Substance::None);

        ch.height_info.water = true;
        // surface just above the feet: shallow
        ch.height_info.transition_level = 100.0;
        assert_eq!(ch.substance_state(), Substance::WaterShallow);
        // past the wade depth but under the head: wading
        ch.height_info.transition_level = 400.0;
        assert_eq!(ch.substance_state(), Substance::WaterWade);
        // over the head: swimming
        ch.height_info.transition_level = 600.0;
        assert_eq!(ch.substance_state(), Substance::WaterSwim);

        ch.height_info.quicksand = crate::probe::Quicksand::Submerging;
        assert_eq!(ch.substance_state(), Substance::QuicksandConsumed);
    }
}
