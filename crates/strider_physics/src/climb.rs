//! Climb detector: ledge edges and climbable walls
//!
//! Two independent probes. The edge probe sweeps the climb-sensor sphere
//! down a column in front of the character until the hit normal flips
//! from upward-facing to near-vertical, then intersects the captured
//! ledge-top and ledge-face planes with the character's own facing plane
//! to recover the exact edge point. The wall probe sweeps outward from
//! the head and confirms lower on the body.
//!
//! Both probes inherit floor/ceiling limits from the *current* environment
//! probe; callers refresh it first.

use crate::character::Character;
use crate::context::WorldContext;
use crate::probe::HeightInfo;
use crate::step::{check_next_step, StepKind};
use strider_math::{intersect_three_planes, Plane, Vec3};
use strider_world::{ColliderKey, WallDirs};

/// Extra probe lift compensating for steep slants under the ledge
const CLIMB_PROBE_LIFT: f32 = 128.0;
/// Downward sweep step as a fraction of the climb-sensor radius.
/// Below 1.0; smaller is more precise and slower, 0.66 balances both.
const CLIMB_SWEEP_STEP_FRACTION: f32 = 0.66;
/// Determinant bound for the three-plane edge solve
const EDGE_SOLVE_EPSILON: f32 = 0.005;
/// Minimum vertical normal component of a "ledge top" hit
const UPWARD_NORMAL_MIN: f32 = 0.1;
/// Maximum vertical normal component of a "ledge face" hit
const VERTICAL_NORMAL_MAX: f32 = 0.001;
/// Cosine tolerance when matching a wall normal against the direction mask
const WALL_DIR_COSINE: f32 = 0.7;
/// Fraction of the body height the confirmation sweep drops by
const WALL_CONFIRM_FRACTION: f32 = 0.67;

/// Wall-probe outcome strength
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WallHit {
    #[default]
    None,
    /// Wall found at head height with an accepted direction
    Found,
    /// Wall persists across the character's full height
    Confirmed,
}

/// Transient result of a climb probe; only meaningful for the motion mode
/// that produced it.
#[derive(Clone, Copy, Debug)]
pub struct ClimbInfo {
    /// Step classification of the probed column
    pub height_info: StepKind,
    pub can_hang: bool,
    /// Edge point, or wall contact point for the wall probe
    pub point: Vec3,
    /// Edge/wall normal (horizontal)
    pub normal: Vec3,
    /// In-plane tangent along the edge/wall
    pub tangent: Vec3,
    /// Climb-frame up reference
    pub up: Vec3,
    /// Yaw angle facing the edge, degrees
    pub edge_z_angle: f32,
    pub floor_limit: f32,
    pub ceiling_limit: f32,
    /// Usable floor-to-ceiling gap at the target column
    pub next_z_space: f32,
    pub edge_hit: bool,
    pub wall_hit: WallHit,
    pub edge_obj: Option<ColliderKey>,
}

impl Default for ClimbInfo {
    fn default() -> Self {
        Self {
            height_info: StepKind::Horizontal,
            can_hang: false,
            point: Vec3::ZERO,
            normal: Vec3::ZERO,
            tangent: Vec3::ZERO,
            up: Vec3::Z,
            edge_z_angle: 0.0,
            floor_limit: -9e10,
            ceiling_limit: 9e10,
            next_z_space: 0.0,
            edge_hit: false,
            wall_hit: WallHit::None,
            edge_obj: None,
        }
    }
}

fn base_limits(ch: &Character, ret: &mut ClimbInfo) {
    ret.floor_limit = ch
        .height_info
        .floor
        .map(|f| f.point.z)
        .unwrap_or(-9e10);
    ret.ceiling_limit = ch
        .height_info
        .ceiling
        .map(|c| c.point.z)
        .unwrap_or(9e10);
}

/// Probe for a grabbable ledge edge ahead of the character.
///
/// `offset` points ahead of (and usually above) the character at the
/// column to test; `test_height` bounds how far below the head the sweep
/// may search (clamped up to the max step height).
pub fn check_climbability(
    ch: &Character,
    ctx: &WorldContext,
    offset: Vec3,
    test_height: f32,
) -> (ClimbInfo, HeightInfo) {
    let pos = ch.transform.position;
    let fwd = ch.transform.forward();

    let mut ret = ClimbInfo {
        point: ch.climb.point,
        ..ClimbInfo::default()
    };

    let mut probe_offset = offset;
    probe_offset.z += CLIMB_PROBE_LIFT;
    let (step, nfc) = check_next_step(ch, ctx, probe_offset);
    ret.height_info = step;

    base_limits(ch, &mut ret);
    if let Some(ceiling) = nfc.ceiling {
        if ceiling.point.z < ret.ceiling_limit {
            ret.ceiling_limit = ceiling.point.z;
        }
    }

    // outer sample column, clamped under the current ceiling
    let mut tmp = pos + offset;
    if let Some(ceiling) = ch.height_info.ceiling {
        let max_z = ceiling.point.z - ch.climb_r - 1.0;
        if tmp.z > max_z {
            tmp.z = max_z;
        }
    }

    // inner sample column starts behind the character's face
    let mut from = Vec3::new(
        pos.x - fwd.x * ch.climb_r * 2.0,
        pos.y - fwd.y * ch.climb_r * 2.0,
        tmp.z,
    );
    let mut to = tmp;

    // lowest height the sweep may reach: we can't climb under the floor
    let test_height = test_height.max(ch.max_step_up_height);
    let lowest = pos.z + ch.bbox.max.z - test_height;

    let mut ledge_top: Option<Plane> = None;
    let mut ledge_face: Option<Plane> = None;
    let mut edge_obj = None;
    let step_down = CLIMB_SWEEP_STEP_FRACTION * ch.climb_r;

    loop {
        if let Some(hit) = ctx.space.sweep_sphere(from, to, ch.climb_r) {
            if hit.normal.z >= UPWARD_NORMAL_MIN {
                ledge_top = Some(Plane::from_point_normal(hit.point, hit.normal));
            }
            if ledge_top.is_some() && hit.normal.z < VERTICAL_NORMAL_MAX {
                ledge_face = Some(Plane::from_point_normal(hit.point, hit.normal));
                edge_obj = Some(hit.body);
                break;
            }
        } else {
            // nothing across the column; try straight down from the outer
            // sample to keep tracking a receding ledge top
            let down_to = Vec3::new(to.x, to.y, lowest);
            match ctx.space.sweep_sphere(to, down_to, ch.climb_r) {
                Some(hit) => {
                    ledge_top = Some(Plane::from_point_normal(hit.point, hit.normal));
                }
                None => return (ret, nfc),
            }
        }

        from.z -= step_down;
        to.z -= step_down;
        if to.z < lowest {
            // ran out of column without a face hit
            return (ret, nfc);
        }
    }

    let (Some(top), Some(face)) = (ledge_top, ledge_face) else {
        return (ret, nfc);
    };

    // the character's own facing plane closes the system
    let side = Plane::from_point_normal(pos, ch.transform.right());
    let Some(edge) = intersect_three_planes(&top, &face, &side, EDGE_SOLVE_EPSILON) else {
        log::debug!("edge solve degenerate, climb candidate rejected");
        return (ret, nfc);
    };
    ret.point = edge;

    // reject edges slanted too far from horizontal, via the squared cross
    // product so no square root is needed
    let edge_dir = top.normal.cross(face.normal);
    let limit = ch.critical_slant_z_component * ch.critical_slant_z_component
        * edge_dir.length_squared();
    if edge_dir.z * edge_dir.z > limit {
        return (ret, nfc);
    }

    ret.edge_hit = true;
    ret.edge_obj = edge_obj;

    // horizontal edge normal, oriented against the facing direction
    let mut n = Vec3::new(edge_dir.y, -edge_dir.x, 0.0);
    if n.x * fwd.x + n.y * fwd.y > 0.0 {
        n = -n;
    }
    ret.normal = n;
    ret.up = Vec3::Z;
    ret.edge_z_angle = n.x.atan2(-n.y).to_degrees();
    ret.tangent = Vec3::new(-n.y, n.x, 0.0).normalized();

    ret.can_hang = match ch.height_info.floor {
        None => true,
        Some(floor) => edge.z - floor.point.z >= ch.height,
    };

    ret.next_z_space = 2.0 * ch.height;
    if let (Some(floor), Some(ceiling)) = (nfc.floor, nfc.ceiling) {
        ret.next_z_space = ceiling.point.z - floor.point.z;
    }

    (ret, nfc)
}

/// Probe for a climbable wall ahead, gated on the current sector's
/// wall-climb direction mask.
pub fn check_walls_climbability(ch: &Character, ctx: &WorldContext) -> ClimbInfo {
    let pos = ch.transform.position;
    let fwd = ch.transform.forward();
    let up = ch.transform.up();

    let mut ret = ClimbInfo {
        point: ch.climb.point,
        ..ClimbInfo::default()
    };
    base_limits(ch, &mut ret);

    let dirs = ch.height_info.walls_climb;
    if dirs.is_empty() {
        return ret;
    }

    ret.up = Vec3::Z;

    // sweep outward from the top of the body box
    let mut from = pos + up * ch.bbox.max.z - fwd * ch.climb_r;
    let reach = ch.ry + ch.bbox.max.y;
    let to = from + fwd * reach;

    let Some(hit) = ctx.space.sweep_sphere(from, to, ch.climb_r) else {
        return ret;
    };

    ret.point = hit.point;
    ret.normal = hit.normal;
    let wn = hit.normal.horizontal();
    let len = wn.length();
    if len < 1e-6 {
        return ret;
    }
    let wn = wn * (1.0 / len);
    ret.tangent = Vec3::new(-wn.y, wn.x, 0.0);

    // match the wall normal against the allowed climb directions
    let accepted = (dirs.contains(WallDirs::NEG_Y) && wn.y < -WALL_DIR_COSINE)
        || (dirs.contains(WallDirs::NEG_X) && wn.x < -WALL_DIR_COSINE)
        || (dirs.contains(WallDirs::POS_Y) && wn.y > WALL_DIR_COSINE)
        || (dirs.contains(WallDirs::POS_X) && wn.x > WALL_DIR_COSINE);
    if !accepted {
        return ret;
    }
    ret.wall_hit = WallHit::Found;

    // confirm the wall persists lower on the body
    from -= up * (WALL_CONFIRM_FRACTION * ch.height);
    let to = from + fwd * reach;
    if ctx.space.sweep_sphere(from, to, ch.climb_r).is_some() {
        ret.wall_hit = WallHit::Confirmed;
    }

    ret
}
