//! Simulation driver
//!
//! Owns the spatial structure, the collision space and the character
//! registry, and runs each character's full command -> integrate ->
//! resolve -> commit sequence to completion per frame. Single-threaded
//! and frame-stepped: no operation suspends mid-frame.

use slotmap::{new_key_type, SecondaryMap, SlotMap};
use strider_math::Vec3;
use strider_physics::{apply_commands, update_params, Character, WorldContext};
use strider_world::{CollisionSpace, RoomWorld};

new_key_type! {
    /// Key to a character in the simulation
    pub struct CharacterKey;
}

/// Per-character state hook, standing in for the external animation and
/// script layer: runs right before dispatch and may change the mode and
/// command.
pub type StateHook = Box<dyn FnMut(&mut Character)>;

/// The frame-stepped simulation
pub struct Simulation {
    pub rooms: RoomWorld,
    pub space: CollisionSpace,
    pub gravity: Vec3,
    characters: SlotMap<CharacterKey, Character>,
    hooks: SecondaryMap<CharacterKey, StateHook>,
}

impl Simulation {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            rooms: RoomWorld::new(),
            space: CollisionSpace::new(),
            gravity,
            characters: SlotMap::with_key(),
            hooks: SecondaryMap::new(),
        }
    }

    /// Add a character, attaching it to its containing room
    pub fn add_character(&mut self, mut character: Character) -> CharacterKey {
        character.update_room_position(&self.rooms);
        self.characters.insert(character)
    }

    /// Remove a character together with its hook
    pub fn remove_character(&mut self, key: CharacterKey) -> Option<Character> {
        self.hooks.remove(key);
        self.characters.remove(key)
    }

    /// Install the state hook invoked before each frame dispatch
    pub fn set_state_hook(&mut self, key: CharacterKey, hook: StateHook) {
        self.hooks.insert(key, hook);
    }

    pub fn character(&self, key: CharacterKey) -> Option<&Character> {
        self.characters.get(key)
    }

    pub fn character_mut(&mut self, key: CharacterKey) -> Option<&mut Character> {
        self.characters.get_mut(key)
    }

    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    /// Advance every character by one frame of `dt` seconds.
    ///
    /// Each character's sequence runs to completion before the next one
    /// starts; the world context is read-only for the whole frame.
    pub fn step(&mut self, dt: f32) {
        let ctx = WorldContext::new(&self.rooms, &self.space, self.gravity);
        for (key, ch) in self.characters.iter_mut() {
            if let Some(hook) = self.hooks.get_mut(key) {
                hook(ch);
            }
            apply_commands(ch, &ctx, dt);
            update_params(ch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strider_physics::{DirFlag, MoveType};
    use strider_world::{Aabb, ColliderFlags, Room};

    fn flat_sim() -> Simulation {
        let mut sim = Simulation::new(Vec3::new(0.0, 0.0, -6000.0));
        sim.rooms
            .add_room(Room::new(Vec3::new(-8192.0, -8192.0, 0.0), 16, 16, 0.0, 8192.0));
        sim.space.add_box(
            Aabb::new(Vec3::new(-8192.0, -8192.0, -256.0), Vec3::new(8192.0, 8192.0, 0.0)),
            ColliderFlags::empty(),
        );
        sim
    }

    #[test]
    fn test_add_character_attaches_room() {
        let mut sim = flat_sim();
        let key = sim.add_character(Character::new(Vec3::ZERO, 128.0, 128.0, 512.0));
        assert!(sim.character(key).unwrap().room.is_some());
    }

    #[test]
    fn test_step_runs_hook_before_dispatch() {
        let mut sim = flat_sim();
        let key = sim.add_character(Character::new(Vec3::ZERO, 128.0, 128.0, 512.0));
        sim.set_state_hook(
            key,
            Box::new(|ch| {
                ch.dir_flag = DirFlag::Forward;
                ch.current_speed = 2.0;
            }),
        );

        for _ in 0..60 {
            sim.step(1.0 / 60.0);
        }

        let ch = sim.character(key).unwrap();
        assert_eq!(ch.move_type, MoveType::OnFloor);
        // one second of walking at 2 * speed_mult units per second
        assert!(ch.transform.position.y > 50.0);
    }

    #[test]
    fn test_remove_character() {
        let mut sim = flat_sim();
        let key = sim.add_character(Character::new(Vec3::ZERO, 128.0, 128.0, 512.0));
        assert_eq!(sim.character_count(), 1);
        assert!(sim.remove_character(key).is_some());
        assert_eq!(sim.character_count(), 0);
        assert!(sim.character(key).is_none());
    }
}
