//! Health and weapon-upgrade pickups

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::level::LevelDef;
use crate::tuning::PickupTuning;
use crate::xz_distance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupKind {
    Health,
    WeaponUpgrade,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pickup {
    pub kind: PickupKind,
    pub pos: Vec3,
}

/// Chance that `level_index` offers the weapon upgrade, capped at 100%
pub fn upgrade_chance(level_index: usize, per_level: f32) -> f32 {
    ((level_index + 1) as f32 * per_level).clamp(0.0, 1.0)
}

/// Roll this level's pickups. The upgrade is only offered while `upgrade_available`.
pub fn roll_pickups(
    level_index: usize,
    level: &LevelDef,
    upgrade_available: bool,
    tuning: &PickupTuning,
    rng: &mut impl Rng,
) -> Vec<Pickup> {
    let mut pickups = Vec::new();

    if rng.random_bool(tuning.health_chance.clamp(0.0, 1.0) as f64) {
        pickups.push(Pickup {
            kind: PickupKind::Health,
            pos: random_spot(level, rng),
        });
    }

    let chance = upgrade_chance(level_index, tuning.upgrade_chance_per_level);
    if upgrade_available && rng.random_bool(chance as f64) {
        pickups.push(Pickup {
            kind: PickupKind::WeaponUpgrade,
            pos: random_spot(level, rng),
        });
    }

    pickups
}

/// Somewhere in the inner 70% of the arena
fn random_spot(level: &LevelDef, rng: &mut impl Rng) -> Vec3 {
    let hx = level.bounds.half_x * 0.7;
    let hz = level.bounds.half_z * 0.7;
    Vec3::new(
        rng.random_range(-hx..=hx),
        0.5,
        rng.random_range(-hz..=hz),
    )
}

/// Index of the first pickup within reach of `pos`
pub fn find_collected(pickups: &[Pickup], pos: Vec3, radius: f32) -> Option<usize> {
    pickups.iter().position(|p| xz_distance(p.pos, pos) <= radius)
}
