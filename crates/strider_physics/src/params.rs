//! Numeric character parameters: health, air, stamina
//!
//! The movement core drives these for drowning and quicksand damage; the
//! wider parameter bookkeeping (pickups, scripted changes) lives outside.
//! `change` reports whether the delta applied fully, which is the whole
//! contract the drowning chain relies on.

use crate::character::{Character, MoveType};
use crate::probe::Quicksand;

/// Parameter kinds, indexing into the value/maximum arrays
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Param {
    Health = 0,
    Air = 1,
    Stamina = 2,
}

pub const PARAM_COUNT: usize = 3;

/// Submerging quicksand drains air (and then health) by this much per frame
const QUICKSAND_DRAIN: f32 = 3.0;
/// Shallow quicksand and surface swimming restore air by this much
const AIR_RESTORE: f32 = 3.0;
/// Air burned per underwater frame
const UNDERWATER_AIR_DRAIN: f32 = 1.0;
/// Health lost per frame once the air is gone
const DROWNING_DAMAGE: f32 = 3.0;
/// Stamina drain/regen per frame
const STAMINA_RATE: f32 = 0.5;

/// Bounded parameter storage
#[derive(Clone, Copy, Debug, Default)]
pub struct CharacterParams {
    value: [f32; PARAM_COUNT],
    maximum: [f32; PARAM_COUNT],
}

impl CharacterParams {
    pub fn get(&self, param: Param) -> f32 {
        self.value[param as usize]
    }

    pub fn maximum(&self, param: Param) -> f32 {
        self.maximum[param as usize]
    }

    /// Set a parameter's maximum (clamped to at least zero)
    pub fn set_maximum(&mut self, param: Param, max_value: f32) {
        self.maximum[param as usize] = max_value.max(0.0);
    }

    /// Set a parameter, clamped into `[0, maximum]`
    pub fn set(&mut self, param: Param, value: f32) {
        let max = self.maximum[param as usize];
        self.value[param as usize] = value.clamp(0.0, max);
    }

    /// Refill a parameter to its maximum
    pub fn fill(&mut self, param: Param) {
        self.value[param as usize] = self.maximum[param as usize];
    }

    /// Apply a delta. Returns whether it applied fully: draining below
    /// zero clamps and reports `false`, as does topping up an already-full
    /// parameter.
    pub fn change(&mut self, param: Param, delta: f32) -> bool {
        let i = param as usize;
        let maximum = self.maximum[i];
        let current = self.value[i];

        if current == maximum && delta > 0.0 {
            return false;
        }

        let next = current + delta;
        if next < 0.0 {
            self.value[i] = 0.0;
            return false;
        }
        self.value[i] = next.min(maximum);
        true
    }
}

/// Per-frame parameter bookkeeping driven by the motion mode and the
/// probe's medium flags. Thresholds are engine-scale tuned; do not smooth
/// them.
pub fn update_params(ch: &mut Character) {
    match ch.move_type {
        MoveType::OnFloor
        | MoveType::FreeFalling
        | MoveType::Climbing
        | MoveType::MonkeySwing
        | MoveType::WallsClimb => {
            if ch.height_info.quicksand == Quicksand::Submerging
                && ch.move_type == MoveType::OnFloor
            {
                if !ch.params.change(Param::Air, -QUICKSAND_DRAIN) {
                    ch.params.change(Param::Health, -QUICKSAND_DRAIN);
                }
            } else if ch.height_info.quicksand == Quicksand::Shallow {
                ch.params.change(Param::Air, AIR_RESTORE);
            } else {
                ch.params.fill(Param::Air);
            }

            if ch.sprinting {
                ch.params.change(Param::Stamina, -STAMINA_RATE);
            } else {
                ch.params.change(Param::Stamina, STAMINA_RATE);
            }
        }

        MoveType::OnWater => {
            ch.params.change(Param::Air, AIR_RESTORE);
        }

        MoveType::UnderWater => {
            if !ch.params.change(Param::Air, -UNDERWATER_AIR_DRAIN)
                && !ch.params.change(Param::Health, -DROWNING_DAMAGE)
            {
                ch.resp.kill = true;
            }
        }
    }
}
