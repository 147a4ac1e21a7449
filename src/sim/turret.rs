//! Stationary turret

use glam::Vec3;

use super::physics::BodyHandle;
use super::projectile::{Faction, ShotRequest};
use crate::consts::SHOT_HEIGHT;
use crate::facing_angle;
use crate::tuning::Tuning;

pub struct Turret {
    pub id: u32,
    pub body: BodyHandle,
    pub position: Vec3,
    /// Always tracks the player
    pub facing: f32,
    health: i32,
    max_health: i32,
    cooldown: f32,
    fire_interval: f32,
    muzzle: f32,
    damage: i32,
}

impl Turret {
    pub fn new(id: u32, body: BodyHandle, position: Vec3, tuning: &Tuning) -> Self {
        Self {
            id,
            body,
            position,
            facing: 0.0,
            health: tuning.turret.max_health,
            max_health: tuning.turret.max_health,
            cooldown: tuning.turret.fire_interval,
            fire_interval: tuning.turret.fire_interval,
            muzzle: tuning.turret.radius + tuning.projectile.radius + tuning.projectile.muzzle_offset,
            damage: tuning.projectile.hostile_damage,
        }
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn max_health(&self) -> i32 {
        self.max_health
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Aim at the player and fire when the cooldown runs out
    pub fn update(&mut self, dt: f32, player_pos: Vec3) -> Option<ShotRequest> {
        if !self.is_alive() {
            return None;
        }

        let to_player = Vec3::new(player_pos.x - self.position.x, 0.0, player_pos.z - self.position.z);
        let dir = to_player.try_normalize()?;
        self.facing = facing_angle(dir.x, dir.z);

        self.cooldown -= dt;
        if self.cooldown > 0.0 {
            return None;
        }
        self.cooldown = self.fire_interval;

        let mut origin = self.position + dir * self.muzzle;
        origin.y = SHOT_HEIGHT;
        Some(ShotRequest {
            origin,
            dir,
            faction: Faction::Hostile,
            damage: self.damage,
        })
    }

    /// Returns the new health, clamped at 0
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        self.health = (self.health - amount.max(0)).max(0);
        self.health
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::physics::PhysicsWorld;

    fn turret() -> Turret {
        let tuning = Tuning::default();
        let mut physics = PhysicsWorld::new();
        let pos = Vec3::new(0.0, 0.7, 0.0);
        let body = physics.add_turret(pos, tuning.turret.radius, 1);
        Turret::new(1, body, pos, &tuning)
    }

    #[test]
    fn test_fires_on_interval_at_player() {
        let mut t = turret();
        let player = Vec3::new(0.0, 0.5, 10.0);
        assert!(t.update(1.0, player).is_none());
        let shot = t.update(0.7, player).expect("cooldown expired");
        assert_eq!(shot.faction, Faction::Hostile);
        assert!(shot.dir.z > 0.99);
        assert!(t.facing.abs() < 1e-5);
        // Timer resets after a shot
        assert!(t.update(0.1, player).is_none());
    }

    #[test]
    fn test_damage_clamps_and_silences() {
        let mut t = turret();
        assert_eq!(t.take_damage(2), 1);
        assert_eq!(t.take_damage(5), 0);
        assert!(!t.is_alive());
        assert!(t.update(10.0, Vec3::new(5.0, 0.0, 0.0)).is_none());
    }
}
