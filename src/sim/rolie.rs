//! Rolie, the roaming living mine
//!
//! ```text
//! Wandering --(player within trigger)--> Charging --(armed && within explode)--> Detonated
//!     \__________________ lethal bullet damage __________________/ --> Destroyed
//! ```
//!
//! Position is driven here, not by physics; the engine mirrors it into the
//! kinematic body each frame.

use glam::Vec3;
use rand::Rng;

use super::level::ArenaBounds;
use super::physics::BodyHandle;
use crate::facing_dir;
use crate::tuning::RolieTuning;
use crate::xz_distance;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolieState {
    Wandering,
    Charging,
    /// Reached the player while armed
    Detonated,
    /// Shot down; no explosion
    Destroyed,
}

/// Transition worth reacting to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolieEvent {
    StartedCharging,
    Detonate,
}

pub struct Rolie {
    pub id: u32,
    pub body: BodyHandle,
    pub position: Vec3,
    state: RolieState,
    health: i32,
    wander_dir: Vec3,
    wander_timer: f32,
    /// Seconds since spawn
    age: f32,
    tuning: RolieTuning,
}

impl Rolie {
    pub fn new(
        id: u32,
        body: BodyHandle,
        position: Vec3,
        tuning: &RolieTuning,
        rng: &mut impl Rng,
    ) -> Self {
        let mut rolie = Self {
            id,
            body,
            position,
            state: RolieState::Wandering,
            health: tuning.max_health,
            wander_dir: Vec3::Z,
            wander_timer: 0.0,
            age: 0.0,
            tuning: tuning.clone(),
        };
        rolie.pick_wander_dir(rng);
        rolie
    }

    pub fn state(&self) -> RolieState {
        self.state
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn is_alive(&self) -> bool {
        matches!(self.state, RolieState::Wandering | RolieState::Charging)
    }

    /// Old enough to detonate
    pub fn is_armed(&self) -> bool {
        self.age >= self.tuning.arming_delay
    }

    pub fn is_charging(&self) -> bool {
        self.state == RolieState::Charging
    }

    /// Count time toward arming without moving, as during the level intro
    pub fn age_by(&mut self, dt: f32) {
        if self.is_alive() {
            self.age += dt;
        }
    }

    fn pick_wander_dir(&mut self, rng: &mut impl Rng) {
        let angle = rng.random_range(0.0..std::f32::consts::TAU);
        self.wander_dir = facing_dir(angle);
        let jitter = self.tuning.wander_jitter;
        self.wander_timer = self.tuning.wander_interval + rng.random_range(-jitter..=jitter);
    }

    pub fn update(
        &mut self,
        dt: f32,
        player_pos: Vec3,
        bounds: &ArenaBounds,
        rng: &mut impl Rng,
    ) -> Option<RolieEvent> {
        if !self.is_alive() {
            return None;
        }
        self.age_by(dt);

        let dist = xz_distance(self.position, player_pos);
        let mut event = None;

        if self.state == RolieState::Wandering && dist <= self.tuning.trigger_distance {
            self.state = RolieState::Charging;
            event = Some(RolieEvent::StartedCharging);
        }

        match self.state {
            RolieState::Charging => {
                if dist <= self.tuning.explode_distance && self.is_armed() {
                    self.state = RolieState::Detonated;
                    return Some(RolieEvent::Detonate);
                }
                // Home on the live position every tick
                let to_player = Vec3::new(
                    player_pos.x - self.position.x,
                    0.0,
                    player_pos.z - self.position.z,
                );
                if let Some(dir) = to_player.try_normalize() {
                    let step = (self.tuning.charge_speed * dt).min(dist);
                    self.position += dir * step;
                }
                self.position = bounds.clamp_xz(self.position, self.tuning.radius);
            }
            RolieState::Wandering => {
                self.wander_timer -= dt;
                if self.wander_timer <= 0.0 {
                    self.pick_wander_dir(rng);
                }
                let next = self.position + self.wander_dir * self.tuning.wander_speed * dt;
                let clamped = bounds.clamp_xz(next, self.tuning.radius);
                if clamped != next {
                    // Bounced off the arena edge
                    self.pick_wander_dir(rng);
                }
                self.position = clamped;
            }
            RolieState::Detonated | RolieState::Destroyed => {}
        }

        event
    }

    /// Returns the new health. Lethal damage destroys without detonation.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        if !self.is_alive() {
            return self.health;
        }
        self.health = (self.health - amount.max(0)).max(0);
        if self.health == 0 {
            self.state = RolieState::Destroyed;
        }
        self.health
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::physics::PhysicsWorld;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn spawn(pos: Vec3) -> (Rolie, Pcg32) {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut physics = PhysicsWorld::new();
        let tuning = RolieTuning::default();
        let body = physics.add_rolie(pos, tuning.radius, 1);
        (Rolie::new(1, body, pos, &tuning, &mut rng), rng)
    }

    fn bounds() -> ArenaBounds {
        ArenaBounds::new(30.0, 30.0)
    }

    #[test]
    fn test_wander_to_charge_transition() {
        let (mut rolie, mut rng) = spawn(Vec3::new(0.0, 0.6, 0.0));
        let far = Vec3::new(20.0, 0.5, 0.0);
        assert_eq!(rolie.update(0.016, far, &bounds(), &mut rng), None);
        assert!(!rolie.is_charging());

        let near = Vec3::new(rolie.position.x + 7.5, 0.5, rolie.position.z);
        assert_eq!(
            rolie.update(0.016, near, &bounds(), &mut rng),
            Some(RolieEvent::StartedCharging)
        );
        assert!(rolie.is_charging());
    }

    #[test]
    fn test_charging_homes_on_live_position() {
        let (mut rolie, mut rng) = spawn(Vec3::ZERO);
        let target = Vec3::new(5.0, 0.0, 0.0);
        rolie.update(0.1, target, &bounds(), &mut rng);
        assert!(rolie.position.x > 0.0);
        // Player moves; rolie follows the new position
        let moved = Vec3::new(rolie.position.x, 0.0, 5.0);
        let before = rolie.position;
        rolie.update(0.1, moved, &bounds(), &mut rng);
        assert!(rolie.position.z > before.z);
    }

    #[test]
    fn test_no_detonation_before_armed() {
        let (mut rolie, mut rng) = spawn(Vec3::ZERO);
        let player = Vec3::new(0.5, 0.5, 0.0);
        let arming = RolieTuning::default().arming_delay;
        let mut t = 0.0;
        while t + 0.05 < arming {
            assert_ne!(
                rolie.update(0.05, player, &bounds(), &mut rng),
                Some(RolieEvent::Detonate)
            );
            t += 0.05;
        }
        assert!(!rolie.is_armed());
        let mut detonated = false;
        for _ in 0..10 {
            if rolie.update(0.05, player, &bounds(), &mut rng) == Some(RolieEvent::Detonate) {
                detonated = true;
                break;
            }
        }
        assert!(detonated);
        assert_eq!(rolie.state(), RolieState::Detonated);
        assert!(!rolie.is_alive());
    }

    #[test]
    fn test_shot_down_is_destroyed_not_detonated() {
        let (mut rolie, mut rng) = spawn(Vec3::ZERO);
        rolie.take_damage(1);
        assert!(rolie.is_alive());
        assert_eq!(rolie.take_damage(1), 0);
        assert_eq!(rolie.state(), RolieState::Destroyed);
        // A destroyed rolie never detonates
        for _ in 0..100 {
            assert_eq!(rolie.update(0.1, Vec3::ZERO, &bounds(), &mut rng), None);
        }
    }

    #[test]
    fn test_wander_stays_inside_arena() {
        let (mut rolie, mut rng) = spawn(Vec3::new(1.5, 0.6, 1.5));
        let small = ArenaBounds::new(2.0, 2.0);
        let far_player = Vec3::new(1000.0, 0.0, 1000.0);
        for _ in 0..2000 {
            rolie.update(0.05, far_player, &small, &mut rng);
            assert!(small.contains_xz(rolie.position, 0.0));
        }
        assert!(!rolie.is_charging());
    }
}
