//! Motion-mode integrators and the per-frame driver
//!
//! One integrator per motion mode, all sharing the sub-stepping pattern:
//! derive an iteration count from the frame move length against the body
//! radius, divide the move evenly, and resolve penetrations after every
//! sub-step. A horizontal collide stops the remaining sub-steps; they are
//! skipped, never rolled back. Mode transitions happen only at integrator
//! return points.

use crate::character::{
    Character, DirFlag, MoveType, SlideKind, VerticalCollide, FREE_FALL_SPEED_MAX,
    SLIDE_SPEED_MULT,
};
use crate::climb::{check_walls_climbability, WallHit};
use crate::context::WorldContext;
use crate::penetration::fix_penetrations;
use strider_math::Vec3;

/// Downhill snap speed applied while walking above a reachable floor
const FLOOR_SNAP_SPEED: f32 = 2400.0;
/// Fixed swim speed on the water surface
const ON_WATER_SWIM_SPEED: f32 = 24.0;
/// Inertia ceiling and ramp rate for underwater movement
const UNDER_WATER_INERTIA: f32 = 64.0;
/// Minimum upward facing (forward z) required to surface
const SURFACE_FACING_MIN: f32 = 0.67;
/// Ceiling-grip tolerance while monkeyswinging, as a fraction of the
/// minimum step height
const MONKEY_GRIP_TOLERANCE: f32 = 0.33;
/// Fraction of the commanded yaw applied per airborne frame
const FREE_FALL_YAW_FRACTION: f32 = 0.5;

/// Sub-step count for a frame move: finer steps for faster motion so each
/// penetration test stays local. At least one, and never more than the
/// character's iteration cap.
#[inline]
fn substep_count(move_len: f32, radius: f32, max_iterations: usize) -> usize {
    ((move_len / radius).ceil() as usize).clamp(1, max_iterations.max(1))
}

/// Facing-relative velocity for the current direction flag
fn directional_speed(ch: &Character, scalar: f32) -> Vec3 {
    match ch.dir_flag {
        DirFlag::Forward => ch.transform.forward() * scalar,
        DirFlag::Backward => ch.transform.forward() * -scalar,
        DirFlag::Left => ch.transform.right() * -scalar,
        DirFlag::Right => ch.transform.right() * scalar,
        DirFlag::Stay => Vec3::ZERO,
    }
}

/// Ramp the inertia value toward `max_speed` while `engaged`, back toward
/// zero otherwise. Gives the swim modes their buoyant lag.
pub fn inertia(ch: &mut Character, max_speed: f32, in_rate: f32, out_rate: f32, engaged: bool, dt: f32) {
    if engaged {
        if ch.inertia < max_speed {
            ch.inertia = (ch.inertia + in_rate * dt).min(max_speed);
        }
    } else if ch.inertia > 0.0 {
        ch.inertia = (ch.inertia - out_rate * dt).max(0.0);
    }
}

/// Replace the character's velocity with a jump along the current
/// direction flag and switch to free fall.
pub fn set_to_jump(ch: &mut Character, v_vertical: f32, v_horizontal: f32) {
    let t = v_horizontal * ch.speed_mult;
    let mut spd = directional_speed(ch, t);
    if ch.dir_flag == DirFlag::Stay {
        ch.dir_flag = DirFlag::Forward;
        spd = ch.transform.forward() * t;
    }

    ch.resp.vertical_collide = VerticalCollide::empty();
    ch.resp.slide = SlideKind::None;

    // jump speed replaces the current speed outright
    ch.speed = spd;
    ch.speed.z = v_vertical * ch.speed_mult;
    ch.move_type = MoveType::FreeFalling;
}

/// Continuously lean the character toward `max_lean` degrees of roll in
/// the commanded sideways direction, back upright with no input.
pub fn lean(ch: &mut Character, max_lean: f32, dt: f32) {
    let neg_lean = 360.0 - max_lean;
    let lean_coeff = if max_lean == 0.0 { 48.0 } else { max_lean * 3.0 };
    let roll = ch.transform.angles[2];

    if ch.cmd.move_axis[1] == 0 || max_lean == 0.0 {
        // no direction: settle back to vertical
        if roll != 0.0 {
            if roll < 180.0 {
                ch.transform.angles[2] -= (roll.abs() + lean_coeff) * 0.5 * dt;
                if ch.transform.angles[2] < 0.0 {
                    ch.transform.angles[2] = 0.0;
                }
            } else {
                ch.transform.angles[2] += (360.0 - roll.abs() + lean_coeff) * 0.5 * dt;
                if ch.transform.angles[2] < 180.0 {
                    ch.transform.angles[2] = 0.0;
                }
            }
        }
    } else if ch.cmd.move_axis[1] == 1 {
        // leaning right
        if roll != max_lean {
            if roll < max_lean {
                ch.transform.angles[2] += (roll.abs() + lean_coeff) * 0.5 * dt;
                if ch.transform.angles[2] > max_lean {
                    ch.transform.angles[2] = max_lean;
                }
            } else if roll > 180.0 {
                ch.transform.angles[2] += (360.0 - roll.abs() + lean_coeff * 2.0) * 0.5 * dt;
                if ch.transform.angles[2] < 180.0 {
                    ch.transform.angles[2] = 0.0;
                }
            } else {
                ch.transform.angles[2] -= (roll.abs() + lean_coeff) * 0.5 * dt;
                if ch.transform.angles[2] < 0.0 {
                    ch.transform.angles[2] = 0.0;
                }
            }
        }
    } else if ch.cmd.move_axis[1] == -1 {
        // leaning left
        if roll != neg_lean {
            if roll > neg_lean {
                ch.transform.angles[2] -= (360.0 - roll.abs() + lean_coeff) * 0.5 * dt;
                if ch.transform.angles[2] < neg_lean {
                    ch.transform.angles[2] = neg_lean;
                }
            } else if roll < 180.0 {
                ch.transform.angles[2] -= (roll.abs() + lean_coeff * 2.0) * 0.5 * dt;
                if ch.transform.angles[2] < 0.0 {
                    ch.transform.angles[2] += 360.0;
                }
            } else {
                ch.transform.angles[2] += (360.0 - roll.abs() + lean_coeff) * 0.5 * dt;
                if ch.transform.angles[2] > 360.0 {
                    ch.transform.angles[2] -= 360.0;
                }
            }
        }
    }
}

/// ON_FLOOR: facing-relative walking with slope sliding, downhill snap,
/// step-up absorption and fall-off detection.
///
/// Returns the number of sub-steps run (0 when the mode exits before
/// stepping).
pub fn move_on_floor(ch: &mut Character, ctx: &WorldContext, dt: f32) -> usize {
    ch.update_collision_shape(0.5 * ch.min_step_up_height, false);

    ch.resp.horizontal_collide = false;
    ch.resp.vertical_collide = VerticalCollide::empty();
    ch.update_current_height(ctx);

    if let Some(floor) = ch.height_info.floor {
        // stand notification boundary for scripted floor objects
        if floor.point.z + 1.0 >= ch.transform.position.z + ch.bbox.min.z {
            log::trace!("standing on {:?}", floor.body);
        }
    }

    let mut spd = Vec3::ZERO;
    if ch.height_info.has_floor() || ch.resp.vertical_collide.contains(VerticalCollide::FLOOR) {
        let floor = match ch.height_info.floor {
            Some(f) => f,
            None => {
                // vertical collide without a probe floor: stand in place
                ch.resp.slide = SlideKind::None;
                return 0;
            }
        };
        if floor.point.z + ch.fall_down_height < ch.transform.position.z {
            ch.move_type = MoveType::FreeFalling;
            ch.speed.z = 0.0;
            return 0;
        }
        ch.resp.vertical_collide |= VerticalCollide::FLOOR;

        let normal = floor.normal;
        if normal.z > 0.02 && normal.z < ch.critical_slant_z_component {
            // too steep to stand: forced slide down the descent direction
            let mut tv = normal;
            tv.z = -tv.z;
            spd = tv * (ch.speed_mult * SLIDE_SPEED_MULT);
            let ang = tv.x.atan2(-tv.y).to_degrees();
            let facing = tv.x * ch.transform.forward().x + tv.y * ch.transform.forward().y;
            if facing >= 0.0 {
                ch.resp.slide = SlideKind::Front;
                ch.transform.angles[0] = ang + 180.0;
            } else {
                ch.resp.slide = SlideKind::Back;
                ch.transform.angles[0] = ang;
            }
            ch.transform.update_rotation();
            ch.resp.vertical_collide |= VerticalCollide::FLOOR;
        } else {
            // free to walk
            let t = (ch.current_speed * ch.speed_mult).max(0.0);
            ch.resp.vertical_collide |= VerticalCollide::FLOOR;
            ch.transform.angles[0] += ch.cmd.rot.x;
            ch.transform.update_rotation();
            spd = directional_speed(ch, t);
            ch.resp.slide = SlideKind::None;
        }
    } else {
        ch.resp.slide = SlideKind::None;
        ch.resp.vertical_collide = VerticalCollide::empty();
        ch.move_type = MoveType::FreeFalling;
        ch.speed.z = 0.0;
        return 0;
    }

    ch.speed = spd;
    let mut mv = spd * dt;
    let total_len = mv.length();
    let iterations = substep_count(total_len, ch.ry, ch.max_move_iterations);
    mv = mv / iterations as f32;

    // normalize the horizontal part only when it dominates the step; a
    // primarily vertical sub-step must not trigger the step-up retry
    let horizontal_len = mv.horizontal().length();
    let step_up_height = if horizontal_len * iterations as f32 > 0.2 * total_len {
        ch.max_step_up_height
    } else {
        0.0
    };

    let mut steps = 0;
    while steps < iterations && !ch.resp.horizontal_collide {
        ch.update_current_height(ctx);
        ch.transform.position += mv;
        fix_penetrations(ch, ctx, Some(mv), step_up_height);
        steps += 1;

        if let Some(floor) = ch.height_info.floor {
            if floor.point.z + ch.fall_down_height > ch.transform.position.z {
                // close enough above the floor: snap down gradually
                if ch.transform.position.z > floor.point.z {
                    ch.transform.position.z -= FLOOR_SNAP_SPEED * dt;
                }
            } else {
                ch.move_type = MoveType::FreeFalling;
                ch.speed.z = 0.0;
                ch.update_room_position(ctx.rooms);
                return steps;
            }
            if ch.transform.position.z <= floor.point.z && !ch.no_fix {
                ch.transform.position.z = floor.point.z;
                ch.resp.vertical_collide |= VerticalCollide::FLOOR;
            }
        } else if !ch.resp.vertical_collide.contains(VerticalCollide::FLOOR) {
            ch.move_type = MoveType::FreeFalling;
            ch.speed.z = 0.0;
            ch.update_room_position(ctx.rooms);
            return steps;
        }

        ch.update_room_position(ctx.rooms);
    }

    steps
}

/// FREE_FALLING: semi-implicit gravity integration with terminal speed,
/// water entry, ceiling bump and landing.
pub fn free_falling(ch: &mut Character, ctx: &WorldContext, dt: f32) -> usize {
    ch.update_collision_shape(0.0, true);

    ch.resp.slide = SlideKind::None;
    ch.resp.horizontal_collide = false;
    ch.resp.vertical_collide = VerticalCollide::empty();

    ch.transform.angles[0] += ch.cmd.rot.x * FREE_FALL_YAW_FRACTION;
    ch.transform.angles[1] = 0.0;
    ch.transform.update_rotation();

    // semi-implicit: average of pre/post gravity velocity over the frame
    let mut mv = (ch.speed + ctx.gravity * (dt * 0.5)) * dt;
    ch.speed += ctx.gravity * dt;
    ch.speed.z = ch.speed.z.max(-FREE_FALL_SPEED_MAX);
    ch.speed = ch.speed.rotated_z(ch.cmd.rot.x * FREE_FALL_YAW_FRACTION);

    let total_len = mv.length();
    let iterations = substep_count(total_len, ch.ry, ch.max_move_iterations);
    mv = mv / iterations as f32;

    ch.update_current_height(ctx);

    if ch.in_water_room(ctx.rooms) {
        if ch.speed.z < 0.0 {
            ch.current_speed = 0.0;
            ch.speed.x = 0.0;
            ch.speed.y = 0.0;
        }
        if !ch.height_info.water
            || ch.transform.position.z + ch.height < ch.height_info.transition_level
        {
            ch.move_type = MoveType::UnderWater;
            return 0;
        }
    }

    if let Some(ceiling) = ch.height_info.ceiling {
        if ch.speed.z > 0.0 && ceiling.point.z < ch.bbox.max.z + ch.transform.position.z {
            ch.transform.position.z = ceiling.point.z - ch.bbox.max.z;
            ch.speed.z = 0.0;
            ch.resp.vertical_collide |= VerticalCollide::CEILING;
            ch.update_current_height(ctx);
            fix_penetrations(ch, ctx, Some(mv), 0.0);
            ch.resp.vertical_collide |= VerticalCollide::CEILING;
            ch.update_room_position(ctx.rooms);
        }
    }
    if let Some(floor) = ch.height_info.floor {
        if ch.speed.z < 0.0
            && floor.point.z >= ch.transform.position.z + ch.bbox.min.z + mv.z
        {
            ch.transform.position.z = floor.point.z;
            ch.move_type = MoveType::OnFloor;
            ch.resp.vertical_collide |= VerticalCollide::FLOOR;
            ch.update_room_position(ctx.rooms);
            ch.update_current_height(ctx);
            fix_penetrations(ch, ctx, Some(mv), 0.0);
            ch.resp.vertical_collide |= VerticalCollide::FLOOR;
            ch.update_room_position(ctx.rooms);
            return 0;
        }
    }

    let mut steps = 0;
    while steps < iterations && !ch.resp.horizontal_collide {
        ch.update_current_height(ctx);
        ch.transform.position += mv;
        fix_penetrations(ch, ctx, Some(mv), 0.0);
        steps += 1;

        if let Some(ceiling) = ch.height_info.ceiling {
            if ch.speed.z > 0.0 && ceiling.point.z < ch.bbox.max.z + ch.transform.position.z {
                ch.transform.position.z = ceiling.point.z - ch.bbox.max.z;
                ch.speed.z = 0.0;
                ch.resp.vertical_collide |= VerticalCollide::CEILING;
            }
        }
        if let Some(floor) = ch.height_info.floor {
            if ch.speed.z < 0.0 {
                if floor.point.z >= ch.transform.position.z + ch.bbox.min.z + mv.z {
                    ch.transform.position.z = floor.point.z;
                    ch.move_type = MoveType::OnFloor;
                    ch.resp.vertical_collide |= VerticalCollide::FLOOR;
                    ch.update_room_position(ctx.rooms);
                    ch.update_current_height(ctx);
                    fix_penetrations(ch, ctx, Some(mv), 0.0);
                    ch.resp.vertical_collide |= VerticalCollide::FLOOR;
                    ch.update_room_position(ctx.rooms);
                    return steps;
                }
                if ch.resp.vertical_collide.contains(VerticalCollide::FLOOR) {
                    ch.speed.z = 0.0;
                    ch.move_type = MoveType::OnFloor;
                    ch.update_room_position(ctx.rooms);
                    return steps;
                }
            }
        }

        ch.update_room_position(ctx.rooms);
    }

    steps
}

/// MONKEYSWING: lateral movement pinned under a ceiling grip; losing the
/// grip drops to free fall.
pub fn monkey_swing(ch: &mut Character, ctx: &WorldContext, dt: f32) -> usize {
    ch.update_collision_shape(0.0, false);
    ch.speed.z = 0.0;

    ch.resp.slide = SlideKind::None;
    ch.resp.horizontal_collide = false;
    ch.resp.vertical_collide = VerticalCollide::FLOOR;

    let t = ch.current_speed * ch.speed_mult;
    ch.transform.angles[0] += ch.cmd.rot.x;
    ch.transform.angles[1] = 0.0;
    ch.transform.angles[2] = 0.0;
    ch.transform.update_rotation();

    let spd = directional_speed(ch, t);
    ch.speed = spd;
    let mut mv = spd * dt;
    mv.z = 0.0;

    let iterations = substep_count(mv.length(), ch.ry, ch.max_move_iterations);
    mv = mv / iterations as f32;

    let mut steps = 0;
    while steps < iterations && !ch.resp.horizontal_collide {
        ch.update_current_height(ctx);
        ch.transform.position += mv;
        fix_penetrations(ch, ctx, Some(mv), 0.0);
        ch.update_current_height(ctx);
        steps += 1;

        // the grip holds only while the ceiling stays within tolerance of
        // the hands
        let grip = ch.height_info.ceiling.map(|c| {
            ch.transform.position.z + ch.bbox.max.z - c.point.z
                > -MONKEY_GRIP_TOLERANCE * ch.min_step_up_height
        });
        match (grip, ch.height_info.ceiling) {
            (Some(true), Some(ceiling)) => {
                ch.transform.position.z = ceiling.point.z - ch.bbox.max.z;
            }
            _ => {
                ch.move_type = MoveType::FreeFalling;
                ch.update_room_position(ctx.rooms);
                return steps;
            }
        }

        ch.update_room_position(ctx.rooms);
    }

    steps
}

/// WALLS_CLIMB: re-probe the wall each frame, orient to it, move along
/// its up/tangent frame, clamp under the climb ceiling.
pub fn walls_climbing(ch: &mut Character, ctx: &WorldContext, dt: f32) -> usize {
    ch.update_collision_shape(0.0, false);
    ch.resp.slide = SlideKind::None;
    ch.resp.horizontal_collide = false;
    ch.resp.vertical_collide = VerticalCollide::empty();

    let climb = check_walls_climbability(ch, ctx);
    ch.climb = climb;
    if climb.wall_hit == WallHit::None {
        // wall lost
        ch.height_info.walls_climb = strider_world::WallDirs::empty();
        ch.move_type = MoveType::FreeFalling;
        return 0;
    }

    ch.transform.angles[0] = climb.normal.x.atan2(-climb.normal.y).to_degrees();
    ch.transform.update_rotation();
    // pin the body against the wall contact
    ch.transform.position.x =
        climb.point.x - ch.transform.forward().x * ch.bbox.max.y;
    ch.transform.position.y =
        climb.point.y - ch.transform.forward().y * ch.bbox.max.y;

    let mut spd = match ch.dir_flag {
        DirFlag::Forward => climb.up,
        DirFlag::Backward => -climb.up,
        DirFlag::Right => climb.tangent,
        DirFlag::Left => -climb.tangent,
        DirFlag::Stay => Vec3::ZERO,
    };
    let len = spd.length();
    if len > 0.01 {
        spd = spd / len;
    }
    ch.speed = spd * (ch.current_speed * ch.speed_mult);
    let mut mv = ch.speed * dt;

    let iterations = substep_count(mv.length(), ch.ry, ch.max_move_iterations);
    mv = mv / iterations as f32;

    let mut steps = 0;
    while steps < iterations && !ch.resp.horizontal_collide {
        ch.update_current_height(ctx);
        ch.transform.position += mv;
        fix_penetrations(ch, ctx, Some(mv), 0.0);
        ch.update_current_height(ctx);
        ch.update_room_position(ctx.rooms);
        steps += 1;
    }

    let climb = check_walls_climbability(ch, ctx);
    ch.climb = climb;
    if ch.transform.position.z + ch.bbox.max.z > climb.ceiling_limit {
        ch.transform.position.z = climb.ceiling_limit - ch.bbox.max.z;
    }

    steps
}

/// CLIMBING: purely lateral movement along a fixed vertical face; the
/// original height is restored after sub-stepping.
pub fn climbing(ch: &mut Character, ctx: &WorldContext, dt: f32) -> usize {
    let saved_z = ch.transform.position.z;

    ch.update_collision_shape(0.0, false);
    ch.resp.slide = SlideKind::None;
    ch.resp.horizontal_collide = false;
    ch.resp.vertical_collide = VerticalCollide::FLOOR;

    let t = ch.current_speed * ch.speed_mult;
    ch.transform.angles[0] += ch.cmd.rot.x;
    ch.transform.angles[1] = 0.0;
    ch.transform.angles[2] = 0.0;
    ch.transform.update_rotation();

    if ch.dir_flag == DirFlag::Stay {
        // no directional input: just resolve penetrations and stay put
        fix_penetrations(ch, ctx, None, 0.0);
        return 0;
    }

    let spd = directional_speed(ch, t);
    ch.speed = spd;
    let mut mv = spd * dt;

    let iterations = substep_count(mv.length(), ch.ry, ch.max_move_iterations);
    mv = mv / iterations as f32;

    let mut steps = 0;
    while steps < iterations && !ch.resp.horizontal_collide {
        ch.update_current_height(ctx);
        ch.transform.position += mv;
        fix_penetrations(ch, ctx, Some(mv), 0.0);
        ch.update_room_position(ctx.rooms);
        steps += 1;
    }

    ch.transform.position.z = saved_z;
    steps
}

/// UNDER_WATER: inertia-ramped motion along the pitched forward vector,
/// with the pitch clamped to the forward hemisphere and surfacing into
/// ON_WATER.
pub fn move_under_water(ch: &mut Character, ctx: &WorldContext, dt: f32) -> usize {
    // the room may have stopped being water (flip or surfacing elsewhere)
    if ch.room.is_some() && !ch.in_water_room(ctx.rooms) {
        ch.move_type = MoveType::FreeFalling;
        return 0;
    }

    ch.update_collision_shape(0.0, true);
    ch.resp.slide = SlideKind::None;
    ch.resp.horizontal_collide = false;
    ch.resp.vertical_collide = VerticalCollide::empty();

    let swim_engaged = ch.cmd.jump;
    inertia(ch, UNDER_WATER_INERTIA, UNDER_WATER_INERTIA, UNDER_WATER_INERTIA, swim_engaged, dt);
    let t = ch.inertia * ch.speed_mult;

    let mut spd = Vec3::ZERO;
    if !ch.resp.kill {
        // controls are blocked once dead
        ch.transform.angles[0] += ch.cmd.rot.x;
        ch.transform.angles[1] -= ch.cmd.rot.y;
        ch.transform.angles[2] = 0.0;
        let pitch = ch.transform.angles[1];
        if pitch > 70.0 && pitch < 180.0 {
            // pitch limiter: no full vertical flip
            ch.transform.angles[1] = 70.0;
        } else if pitch > 180.0 && pitch < 270.0 {
            ch.transform.angles[1] = 270.0;
        }
        ch.transform.update_rotation();

        spd = ch.transform.forward() * t;
        ch.speed = spd;
    }

    let mut mv = spd * dt;
    let iterations = substep_count(mv.length(), ch.ry, ch.max_move_iterations);
    mv = mv / iterations as f32;

    let mut steps = 0;
    while steps < iterations && !ch.resp.horizontal_collide {
        ch.update_current_height(ctx);
        ch.transform.position += mv;
        fix_penetrations(ch, ctx, Some(mv), 0.0);
        ch.update_room_position(ctx.rooms);
        steps += 1;

        if ch.height_info.water
            && ch.transform.position.z + ch.bbox.max.z >= ch.height_info.transition_level
        {
            if ch.transform.forward().z > SURFACE_FACING_MIN {
                ch.move_type = MoveType::OnWater;
                return steps;
            }
            let deep_enough = match ch.height_info.floor {
                None => true,
                Some(floor) => {
                    ch.height_info.transition_level - floor.point.z >= ch.height
                }
            };
            if deep_enough {
                // keep the body under the surface
                ch.transform.position.z =
                    ch.height_info.transition_level - ch.bbox.max.z;
            }
        }
    }

    steps
}

/// ON_WATER: horizontal-only surface swimming with the height pinned to
/// the transition level; losing the water flag grounds the character.
pub fn move_on_water(ch: &mut Character, ctx: &WorldContext, dt: f32) -> usize {
    ch.update_collision_shape(0.0, false);

    ch.resp.slide = SlideKind::None;
    ch.resp.horizontal_collide = false;
    ch.resp.vertical_collide = VerticalCollide::empty();

    ch.transform.angles[0] += ch.cmd.rot.x;
    ch.transform.angles[1] = 0.0;
    ch.transform.angles[2] = 0.0;
    ch.transform.update_rotation();

    let t = (ON_WATER_SWIM_SPEED * ch.speed_mult).max(0.0);
    let (move_fwd, move_side) = (ch.cmd.move_axis[0], ch.cmd.move_axis[1]);
    let spd = match ch.dir_flag {
        DirFlag::Forward if move_fwd == 1 => ch.transform.forward() * t,
        DirFlag::Backward if move_fwd == -1 => ch.transform.forward() * -t,
        DirFlag::Left if move_side == -1 => ch.transform.right() * -t,
        DirFlag::Right if move_side == 1 => ch.transform.right() * t,
        _ => {
            // idle: keep the body pinned to the surface
            ch.update_current_height(ctx);
            fix_penetrations(ch, ctx, None, 0.0);
            ch.update_room_position(ctx.rooms);
            if ch.height_info.water {
                ch.transform.position.z = ch.height_info.transition_level;
            } else {
                ch.move_type = MoveType::OnFloor;
            }
            return 0;
        }
    };

    ch.speed = spd;
    let mut mv = spd * dt;
    let iterations = substep_count(mv.length(), ch.ry, ch.max_move_iterations);
    mv = mv / iterations as f32;

    let mut steps = 0;
    while steps < iterations && !ch.resp.horizontal_collide {
        ch.update_current_height(ctx);
        ch.transform.position += mv;
        fix_penetrations(ch, ctx, Some(mv), 0.0);
        ch.update_room_position(ctx.rooms);
        steps += 1;

        if ch.height_info.water {
            ch.transform.position.z = ch.height_info.transition_level;
        } else {
            ch.move_type = MoveType::OnFloor;
            return steps;
        }
    }

    steps
}

/// Per-frame driver: dispatch to the active mode's integrator, then
/// re-derive the room attachment and the platform reference.
///
/// The animation/script layer runs before this call (it may change the
/// mode and command) and reads the response afterwards.
pub fn apply_commands(ch: &mut Character, ctx: &WorldContext, dt: f32) {
    let mode = ch.move_type;
    match mode {
        MoveType::OnFloor => {
            move_on_floor(ch, ctx, dt);
        }
        MoveType::FreeFalling => {
            free_falling(ch, ctx, dt);
        }
        MoveType::Climbing => {
            climbing(ch, ctx, dt);
        }
        MoveType::MonkeySwing => {
            monkey_swing(ch, ctx, dt);
        }
        MoveType::WallsClimb => {
            walls_climbing(ch, ctx, dt);
        }
        MoveType::UnderWater => {
            move_under_water(ch, ctx, dt);
        }
        MoveType::OnWater => {
            move_on_water(ch, ctx, dt);
        }
    }
    if mode != ch.move_type {
        log::debug!("move type {:?} -> {:?}", mode, ch.move_type);
    }

    ch.update_room_position(ctx.rooms);

    // platform re-derivation
    ch.platform = match ch.move_type {
        MoveType::OnFloor => ch.height_info.floor.map(|f| f.body),
        MoveType::Climbing => ch.climb.edge_obj,
        _ => None,
    };
}
