//! Explosion effects
//!
//! Purely timed; gameplay consequences (damage, impulses) are applied once
//! when the explosion is spawned. Level clear waits for these to finish.

use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExplosionKind {
    Turret,
    Rolie,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Explosion {
    pub pos: Vec3,
    pub kind: ExplosionKind,
    pub elapsed: f32,
    pub duration: f32,
}

impl Explosion {
    /// Animation progress in [0, 1]
    pub fn progress(&self) -> f32 {
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    pub fn is_active(&self) -> bool {
        self.elapsed < self.duration
    }
}

#[derive(Debug, Default)]
pub struct Effects {
    explosions: Vec<Explosion>,
}

impl Effects {
    pub fn spawn(&mut self, pos: Vec3, kind: ExplosionKind, duration: f32) {
        self.explosions.push(Explosion {
            pos,
            kind,
            elapsed: 0.0,
            duration,
        });
    }

    /// Advance timers and drop finished effects
    pub fn update(&mut self, dt: f32) {
        for e in &mut self.explosions {
            e.elapsed += dt;
        }
        self.explosions.retain(Explosion::is_active);
    }

    pub fn any_active(&self) -> bool {
        self.explosions.iter().any(Explosion::is_active)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Explosion> {
        self.explosions.iter()
    }

    pub fn len(&self) -> usize {
        self.explosions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.explosions.is_empty()
    }

    pub fn clear(&mut self) {
        self.explosions.clear();
    }
}
