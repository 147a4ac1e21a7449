//! Projectile registry
//!
//! Every live bullet is tracked here with its faction, spawn time and the
//! position it had before the current physics step (for the sweep test).

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::level::ArenaBounds;
use super::physics::{BodyHandle, BodyTag, PhysicsWorld};
use crate::consts::WALL_HEIGHT;
use crate::tuning::ProjectileTuning;

/// Allegiance of a projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Faction {
    Player,
    Hostile,
}

impl Faction {
    /// Whether a projectile of this faction may damage the body it touched
    pub fn can_damage(self, target: BodyTag) -> bool {
        matches!(
            (self, target),
            (Faction::Player, BodyTag::Turret(_) | BodyTag::Rolie(_))
                | (Faction::Hostile, BodyTag::Player)
        )
    }
}

/// Produced by an actor that fired; the engine turns it into a projectile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotRequest {
    pub origin: Vec3,
    /// Unit XZ direction
    pub dir: Vec3,
    pub faction: Faction,
    pub damage: i32,
}

#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: u32,
    pub body: BodyHandle,
    /// Simulation seconds at spawn
    pub created_at: f64,
    pub faction: Faction,
    pub damage: i32,
    /// Position before the most recent physics step
    pub prev_pos: Vec3,
}

impl Projectile {
    pub fn from_player(&self) -> bool {
        self.faction == Faction::Player
    }
}

/// Why a projectile was culled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Lifetime,
    OutOfBounds,
}

pub struct ProjectileRegistry {
    items: Vec<Projectile>,
    next_id: u32,
    tuning: ProjectileTuning,
}

impl ProjectileRegistry {
    pub fn new(tuning: &ProjectileTuning) -> Self {
        Self {
            items: Vec::new(),
            next_id: 1,
            tuning: tuning.clone(),
        }
    }

    /// Create the physics body for a shot and start tracking it
    pub fn spawn(&mut self, shot: &ShotRequest, now: f64, physics: &mut PhysicsWorld) -> u32 {
        let id = self.next_id;
        self.next_id += 1;

        let body = physics.add_projectile(
            shot.origin,
            shot.dir * self.tuning.speed,
            self.tuning.radius,
            id,
        );
        self.items.push(Projectile {
            id,
            body,
            created_at: now,
            faction: shot.faction,
            damage: shot.damage,
            prev_pos: shot.origin,
        });
        log::trace!("projectile {id} spawned ({:?})", shot.faction);
        id
    }

    pub fn get(&self, id: u32) -> Option<&Projectile> {
        self.items.iter().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn radius(&self) -> f32 {
        self.tuning.radius
    }

    /// Snapshot hostile projectile positions before a physics step
    pub fn record_previous_positions(&mut self, physics: &PhysicsWorld) {
        for p in self.items.iter_mut().filter(|p| !p.from_player()) {
            p.prev_pos = physics.position(p.body);
        }
    }

    /// Projectiles past their lifetime or outside the arena (plus margin)
    pub fn expired(
        &self,
        now: f64,
        bounds: &ArenaBounds,
        physics: &PhysicsWorld,
    ) -> Vec<(u32, Expiry)> {
        let margin = self.tuning.bounds_margin;
        self.items
            .iter()
            .filter_map(|p| {
                if now - p.created_at >= self.tuning.lifetime as f64 {
                    return Some((p.id, Expiry::Lifetime));
                }
                let pos = physics.position(p.body);
                let outside = !bounds.contains_xz(pos, margin)
                    || pos.y < -margin
                    || pos.y > WALL_HEIGHT + margin;
                outside.then_some((p.id, Expiry::OutOfBounds))
            })
            .collect()
    }

    /// Stop tracking a projectile and drop its body
    pub fn remove(&mut self, id: u32, physics: &mut PhysicsWorld) -> Option<Projectile> {
        let idx = self.items.iter().position(|p| p.id == id)?;
        let projectile = self.items.swap_remove(idx);
        physics.remove(projectile.body);
        Some(projectile)
    }

    pub fn clear(&mut self, physics: &mut PhysicsWorld) {
        for p in self.items.drain(..) {
            physics.remove(p.body);
        }
    }
}
