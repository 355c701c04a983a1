//! Integration tests for the movement pipeline
//!
//! These drive the full simulation: room attachment, mode dispatch,
//! sub-stepping, penetration resolution and parameter bookkeeping over
//! many frames.

use strider::sim::Simulation;
use strider_math::Vec3;
use strider_physics::{Character, DirFlag, MoveType, Param, VerticalCollide};
use strider_world::{Aabb, ColliderFlags, Room, RoomFlags};

const DT: f32 = 1.0 / 60.0;
const GRAVITY: Vec3 = Vec3 {
    x: 0.0,
    y: 0.0,
    z: -6000.0,
};

fn flat_sim() -> Simulation {
    let mut sim = Simulation::new(GRAVITY);
    sim.rooms
        .add_room(Room::new(Vec3::new(-8192.0, -8192.0, 0.0), 16, 16, 0.0, 8192.0));
    sim.space.add_box(
        Aabb::new(Vec3::new(-8192.0, -8192.0, -256.0), Vec3::new(8192.0, 8192.0, 0.0)),
        ColliderFlags::empty(),
    );
    sim
}

/// Ledge over a water pool: dry floor ends at y = 1024, water below
fn ledge_pool_sim() -> Simulation {
    let mut sim = Simulation::new(GRAVITY);
    let dry = sim
        .rooms
        .add_room(Room::new(Vec3::new(-8192.0, -8192.0, 0.0), 16, 16, 0.0, 8192.0));
    let pool = sim.rooms.add_room(
        Room::new(Vec3::new(-8192.0, -8192.0, -4096.0), 16, 16, -4096.0, 0.0)
            .with_flags(RoomFlags::WATER),
    );
    sim.rooms.link_vertical(pool, dry);
    sim.rooms.link_near(pool, dry);

    sim.space.add_box(
        Aabb::new(Vec3::new(-8192.0, -8192.0, -256.0), Vec3::new(8192.0, 1024.0, 0.0)),
        ColliderFlags::empty(),
    );
    sim.space.add_box(
        Aabb::new(
            Vec3::new(-8192.0, 1024.0, -4352.0),
            Vec3::new(8192.0, 8192.0, -4096.0),
        ),
        ColliderFlags::empty(),
    );
    sim
}

fn walker(position: Vec3, speed: f32) -> Character {
    let mut ch = Character::new(position, 128.0, 128.0, 512.0);
    ch.speed_mult = 1.0;
    ch.current_speed = speed;
    ch.dir_flag = DirFlag::Forward;
    ch
}

#[test]
fn test_walk_across_flat_ground() {
    let mut sim = flat_sim();
    let key = sim.add_character(walker(Vec3::ZERO, 120.0));

    for _ in 0..60 {
        sim.step(DT);
    }

    let ch = sim.character(key).unwrap();
    assert_eq!(ch.move_type, MoveType::OnFloor);
    assert!((ch.transform.position.y - 120.0).abs() < 1.0);
    assert!(ch.transform.position.z.abs() < 1.0);
    assert!(ch.resp.vertical_collide.contains(VerticalCollide::FLOOR));
    assert!(!ch.resp.horizontal_collide);
}

#[test]
fn test_walk_off_ledge_into_pool() {
    let mut sim = ledge_pool_sim();
    let key = sim.add_character(walker(Vec3::new(0.0, 600.0, 0.0), 600.0));

    let mut seen = vec![MoveType::OnFloor];
    for _ in 0..600 {
        sim.step(DT);
        let mode = sim.character(key).unwrap().move_type;
        if *seen.last().unwrap() != mode {
            seen.push(mode);
        }
    }

    // the full arc: walking, falling off the ledge, submerging
    assert_eq!(
        seen,
        vec![MoveType::OnFloor, MoveType::FreeFalling, MoveType::UnderWater]
    );
    let ch = sim.character(key).unwrap();
    assert!(ch.transform.position.z < 0.0);
}

#[test]
fn test_small_step_absorbed() {
    let mut sim = flat_sim();
    // a 100-unit step, below the 256 max step height
    sim.space.add_box(
        Aabb::new(Vec3::new(-8192.0, 512.0, 0.0), Vec3::new(8192.0, 8192.0, 100.0)),
        ColliderFlags::empty(),
    );
    let key = sim.add_character(walker(Vec3::ZERO, 240.0));

    let mut stepped_up = false;
    for _ in 0..180 {
        sim.step(DT);
        stepped_up |= sim.character(key).unwrap().resp.step_up;
    }

    let ch = sim.character(key).unwrap();
    assert_eq!(ch.move_type, MoveType::OnFloor);
    // carried up onto the step and kept walking
    assert!(ch.transform.position.y > 600.0, "y = {}", ch.transform.position.y);
    assert!(ch.transform.position.z >= 99.0, "z = {}", ch.transform.position.z);
    assert!(stepped_up, "the resolver should have reported a step-up");
    assert!(!ch.resp.horizontal_collide);
}

#[test]
fn test_tall_wall_blocks() {
    let mut sim = flat_sim();
    sim.space.add_box(
        Aabb::new(Vec3::new(-8192.0, 512.0, 0.0), Vec3::new(8192.0, 8192.0, 4096.0)),
        ColliderFlags::empty(),
    );
    let key = sim.add_character(walker(Vec3::ZERO, 240.0));

    for _ in 0..180 {
        sim.step(DT);
    }

    let ch = sim.character(key).unwrap();
    // held out of the wall the whole time
    assert!(ch.transform.position.y < 512.0 - 100.0);
    assert_eq!(ch.move_type, MoveType::OnFloor);
}

#[test]
fn test_drowning_drains_air_then_health() {
    let mut sim = ledge_pool_sim();
    let mut ch = Character::new(Vec3::new(0.0, 4096.0, -2048.0), 128.0, 128.0, 512.0);
    ch.move_type = MoveType::UnderWater;
    ch.params.set_maximum(Param::Air, 10.0);
    ch.params.set_maximum(Param::Health, 30.0);
    ch.params.fill(Param::Air);
    ch.params.fill(Param::Health);
    let key = sim.add_character(ch);

    for _ in 0..30 {
        sim.step(DT);
    }

    let ch = sim.character(key).unwrap();
    assert_eq!(ch.params.get(Param::Air), 0.0);
    assert_eq!(ch.params.get(Param::Health), 0.0);
    assert!(ch.resp.kill, "drowning must raise the kill response");
}

#[test]
fn test_hook_drives_mode_change() {
    let mut sim = flat_sim();
    let key = sim.add_character(walker(Vec3::ZERO, 0.0));

    // script layer launches a jump on the first frame
    let mut jumped = false;
    sim.set_state_hook(
        key,
        Box::new(move |ch| {
            if !jumped {
                strider_physics::set_to_jump(ch, 300.0, 0.0);
                jumped = true;
            }
        }),
    );

    sim.step(DT);
    let rising = sim.character(key).unwrap();
    assert_eq!(rising.move_type, MoveType::FreeFalling);
    assert!(rising.transform.position.z > 0.0);

    for _ in 0..300 {
        sim.step(DT);
    }
    assert_eq!(sim.character(key).unwrap().move_type, MoveType::OnFloor);
}
