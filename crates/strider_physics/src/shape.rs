//! Collision-proxy shape selection
//!
//! The character alternates between two proxy capsules: a vertical one
//! for upright modes and a depth (Y-axis) one when the body box is wider
//! than tall (crawling, swimming). Selection is a pure function returning
//! an immutable descriptor; nothing mutates shared proxy state between
//! calls.

use crate::character::{BoundingBox, MoveType};
use strider_math::Vec3;
use strider_world::{Axis, CapsuleShape};

/// Extra pull-back applied to the climbing pose, matching the grab reach
const CLIMB_POSE_BACKOFF: f32 = 8.0;

/// An immutable proxy-shape choice: the capsule plus its center offset
/// from the character origin, in the local frame (x right, y forward,
/// z up).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeDescriptor {
    pub shape: CapsuleShape,
    pub offset: Vec3,
}

/// Select the collision proxy for the current body box and motion mode.
///
/// `z_factor` lifts the capsule bottom off the floor so small steps pass
/// under it; `alt_pose` selects the animation-driven alternate placement
/// used while airborne and swimming.
pub fn select_shape(
    bbox: &BoundingBox,
    rx: f32,
    ry: f32,
    move_type: MoveType,
    z_factor: f32,
    alt_pose: bool,
) -> ShapeDescriptor {
    let size_y = bbox.max.y - bbox.min.y;
    let size_z = bbox.max.z - bbox.min.z;
    let aspect = size_z / size_y;

    if aspect < 1.0 && move_type != MoveType::Climbing && !alt_pose {
        // depth capsule: the body is longer than tall
        let radius = ry;
        return ShapeDescriptor {
            shape: CapsuleShape {
                axis: Axis::Y,
                radius,
                half_length: (size_y * 0.5 - radius).max(0.0),
            },
            offset: Vec3::new(0.0, 0.0, 0.5 * (bbox.max.z + bbox.min.z)),
        };
    }

    // vertical capsule
    let radius = rx.max(ry);
    let mut offset = Vec3::ZERO;

    let height = if alt_pose {
        size_z.max(size_y)
    } else {
        size_z - z_factor
    };

    if alt_pose {
        offset.z = 0.5 * (bbox.max.z + bbox.min.z);
    } else {
        offset.z = 0.5 * (bbox.max.z + bbox.min.z - z_factor) + z_factor;
    }

    if move_type == MoveType::Climbing {
        // hug the climbed face: pull the capsule back by the body depth
        let t = (ry - bbox.max.y).max(ry + bbox.min.y) + CLIMB_POSE_BACKOFF;
        offset.y = -t;
    }

    ShapeDescriptor {
        shape: CapsuleShape {
            axis: Axis::Z,
            radius,
            half_length: (height * 0.5 - radius).max(0.0),
        },
        offset,
    }
}
