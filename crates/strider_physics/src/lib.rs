//! Kinematic character movement for Strider
//!
//! This crate is the movement core of the engine: it advances a character's
//! transform against a static/kinematic collision world while enforcing
//! floor/ceiling/wall contact, water and quicksand transitions, stepping,
//! climbing and penetration-free placement.
//!
//! The pieces, in dependency order:
//! - environment probe ([`probe`])
//! - step classifier ([`step`])
//! - climb detector ([`climb`])
//! - penetration resolver ([`penetration`])
//! - motion-mode integrators and the per-frame driver ([`modes`])
//! - traverse (pushable block) checker ([`traverse`])

pub mod character;
pub mod climb;
pub mod context;
pub mod modes;
pub mod params;
pub mod penetration;
pub mod probe;
pub mod shape;
pub mod step;
pub mod traverse;

pub use character::{
    BoundingBox, Character, Command, DirFlag, MoveType, Response, SlideKind, Substance,
    Transform, VerticalCollide,
};
pub use climb::{check_climbability, check_walls_climbability, ClimbInfo, WallHit};
pub use context::WorldContext;
pub use modes::{apply_commands, inertia, lean, set_to_jump};
pub use params::{update_params, CharacterParams, Param};
pub use penetration::{check_next_penetration, fix_penetrations, GhostProxy};
pub use probe::{get_height_info, HeightInfo, Quicksand, SurfaceHit};
pub use shape::{select_shape, ShapeDescriptor};
pub use step::{check_next_step, has_stop_slant, StepKind};
pub use traverse::{check_traverse, find_traverse, sector_allow_traverse, TraverseDirs};
