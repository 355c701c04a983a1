//! Strider - headless movement demo
//!
//! Builds a small two-room test level (a dry ledge over a pool), spawns a
//! character walking forward, and steps the simulation while logging the
//! motion-mode transitions.

use strider::config::SimConfig;
use strider::sim::Simulation;
use strider_math::Vec3;
use strider_physics::{Character, DirFlag, MoveType};
use strider_world::{Aabb, ColliderFlags, Room, RoomFlags};

fn build_demo_level(sim: &mut Simulation) {
    // dry room with a walkable ledge from y = -8192 to y = 1024
    let dry = sim
        .rooms
        .add_room(Room::new(Vec3::new(-8192.0, -8192.0, 0.0), 16, 16, 0.0, 8192.0));
    // pool under the far half of the level
    let pool = sim.rooms.add_room(
        Room::new(Vec3::new(-8192.0, -8192.0, -4096.0), 16, 16, -4096.0, 0.0)
            .with_flags(RoomFlags::WATER),
    );
    sim.rooms.link_vertical(pool, dry);
    sim.rooms.link_near(pool, dry);

    // ledge floor, ending at y = 1024
    sim.space.add_box(
        Aabb::new(Vec3::new(-8192.0, -8192.0, -256.0), Vec3::new(8192.0, 1024.0, 0.0)),
        ColliderFlags::empty(),
    );
    // pool bottom
    sim.space.add_box(
        Aabb::new(
            Vec3::new(-8192.0, 1024.0, -4352.0),
            Vec3::new(8192.0, 8192.0, -4096.0),
        ),
        ColliderFlags::empty(),
    );
}

fn main() {
    env_logger::init();
    log::info!("Starting Strider movement demo");

    let config = SimConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config: {}. Using defaults.", e);
        SimConfig::default()
    });

    let mut sim = Simulation::new(Vec3::new(0.0, 0.0, config.physics.gravity));
    build_demo_level(&mut sim);

    let mut character = Character::new(
        Vec3::new(0.0, -2048.0, 0.0),
        config.character.radius_x,
        config.character.radius_y,
        config.character.height,
    );
    config.character.configure(&mut character);
    character.speed_mult = config.physics.speed_mult;
    character.dir_flag = DirFlag::Forward;
    character.current_speed = 4.0;
    let key = sim.add_character(character);

    let dt = 1.0 / 60.0;
    let mut last_mode = MoveType::OnFloor;
    for frame in 0..600 {
        sim.step(dt);

        let ch = sim.character(key).expect("character exists");
        if ch.move_type != last_mode {
            log::info!(
                "frame {:3}: {:?} -> {:?} at z = {:.1}",
                frame,
                last_mode,
                ch.move_type,
                ch.transform.position.z
            );
            last_mode = ch.move_type;
        }
    }

    let ch = sim.character(key).expect("character exists");
    log::info!(
        "demo finished in {:?} at {:.1}, {:.1}, {:.1}",
        ch.move_type,
        ch.transform.position.x,
        ch.transform.position.y,
        ch.transform.position.z
    );
}
