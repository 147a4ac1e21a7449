//! Collision helpers that run outside the physics step
//!
//! Physics contact events miss bullets that cross a thin target within one
//! step, so player hits are also checked with a swept sphere. Damage and
//! removals discovered here are never applied mid-iteration: they go into
//! `PendingRemovals` and are flushed once per frame.

use std::collections::{BTreeSet, HashSet};

use glam::Vec3;

/// Closest point to `p` on the segment `a..b`
pub fn closest_point_on_segment(a: Vec3, b: Vec3, p: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-8 {
        // Degenerate segment
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Did a point moving from `start` to `end` pass within `radius` of `center`?
pub fn segment_hits_sphere(start: Vec3, end: Vec3, center: Vec3, radius: f32) -> bool {
    let closest = closest_point_on_segment(start, end, center);
    closest.distance_squared(center) <= radius * radius
}

#[inline]
pub fn spheres_overlap(a: Vec3, ra: f32, b: Vec3, rb: f32) -> bool {
    let r = ra + rb;
    a.distance_squared(b) <= r * r
}

/// Linear falloff from `max_damage` at the center to `min_damage` at the edge,
/// zero beyond `radius`
pub fn explosion_damage(distance: f32, radius: f32, max_damage: f32, min_damage: f32) -> f32 {
    if distance > radius || radius <= 0.0 {
        return 0.0;
    }
    let t = (distance / radius).clamp(0.0, 1.0);
    max_damage + (min_damage - max_damage) * t
}

/// Outward push for a body caught in a blast, scaled by `1 - distance/radius`
pub fn explosion_impulse(
    center: Vec3,
    target: Vec3,
    radius: f32,
    strength: f32,
    upward: f32,
) -> Option<Vec3> {
    let offset = target - center;
    let distance = offset.length();
    if distance > radius {
        return None;
    }
    let outward = Vec3::new(offset.x, 0.0, offset.z)
        .try_normalize()
        .unwrap_or(Vec3::ZERO);
    let falloff = 1.0 - distance / radius;
    Some((outward + Vec3::Y * upward) * strength * falloff)
}

/// Entity whose removal waits until the end of the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityRef {
    Projectile(u32),
    Turret(u32),
    Rolie(u32),
}

/// One deferred-removal queue for every entity category
#[derive(Debug, Default)]
pub struct PendingRemovals {
    set: BTreeSet<EntityRef>,
}

impl PendingRemovals {
    /// Returns false if it was already queued
    pub fn mark(&mut self, entity: EntityRef) -> bool {
        self.set.insert(entity)
    }

    pub fn contains(&self, entity: EntityRef) -> bool {
        self.set.contains(&entity)
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Take everything queued, in stable order
    pub fn drain(&mut self) -> Vec<EntityRef> {
        std::mem::take(&mut self.set).into_iter().collect()
    }
}

/// Projectiles that already hurt the player this rendered frame
#[derive(Debug, Default)]
pub struct FrameHits {
    player: HashSet<u32>,
}

impl FrameHits {
    /// Returns false if this projectile already hit the player this frame
    pub fn record_player_hit(&mut self, projectile: u32) -> bool {
        self.player.insert(projectile)
    }

    /// Called once per rendered frame, not per physics substep
    pub fn clear(&mut self) {
        self.player.clear();
    }
}
