//! Player actor
//!
//! Owns one dynamic physics body plus gameplay state: health, facing,
//! shot cooldown, bullet damage modifier and the animation phase.

use glam::Vec3;

use super::anim::{AnimClips, AnimEvent, AnimPhase, AnimRequest, Animator};
use super::physics::{BodyHandle, PhysicsWorld};
use super::projectile::{Faction, ShotRequest};
use crate::consts::SHOT_HEIGHT;
use crate::tuning::Tuning;
use crate::{facing_angle, facing_dir, normalize_angle};

/// Keyboard-style input sampled once per frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub shoot: bool,
}

/// Twin-stick input: movement and aim are independent
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TouchInput {
    pub move_x: f32,
    pub move_z: f32,
    pub aim_x: f32,
    pub aim_z: f32,
    pub shoot: bool,
}

/// Stick deflection below this is treated as centered
const STICK_DEADZONE: f32 = 0.1;
/// Horizontal speed above which the run clip plays
const RUN_SPEED: f32 = 0.3;

pub struct Player {
    pub body: BodyHandle,
    /// Radians around +Y, 0 faces +Z
    pub facing: f32,
    health: i32,
    max_health: i32,
    /// Damage dealt by this player's bullets
    pub bullet_damage: i32,
    anim: Animator,
    last_shot: Option<f64>,
    cooldown: f32,
    move_force: f32,
    max_speed: f32,
    turn_rate: f32,
    radius: f32,
    muzzle: f32,
}

impl Player {
    pub fn new(body: BodyHandle, tuning: &Tuning) -> Self {
        let p = &tuning.player;
        Self {
            body,
            facing: 0.0,
            health: p.max_health,
            max_health: p.max_health,
            bullet_damage: tuning.projectile.player_damage,
            anim: Animator::new(AnimClips {
                hit: Some(p.hit_clip),
                death: Some(p.death_clip),
            }),
            last_shot: None,
            cooldown: p.shoot_cooldown,
            move_force: p.move_force,
            max_speed: p.max_speed,
            turn_rate: p.turn_rate,
            radius: p.radius,
            muzzle: p.radius + tuning.projectile.radius + tuning.projectile.muzzle_offset,
        }
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn max_health(&self) -> i32 {
        self.max_health
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }

    pub fn is_alive(&self) -> bool {
        !self.is_dead()
    }

    /// True once the death animation has been started
    pub fn is_dying(&self) -> bool {
        self.anim.phase() == AnimPhase::Death
    }

    pub fn anim_phase(&self) -> AnimPhase {
        self.anim.phase()
    }

    pub fn position(&self, physics: &PhysicsWorld) -> Vec3 {
        physics.position(self.body)
    }

    /// Swap in clip lengths once the real model has loaded
    pub fn set_clips(&mut self, clips: AnimClips) {
        self.anim.set_clips(clips);
    }

    /// Keyboard control: thrust along facing, turn with left/right
    pub fn update_input(
        &mut self,
        input: &InputState,
        dt: f32,
        now: f64,
        physics: &mut PhysicsWorld,
    ) -> Option<ShotRequest> {
        if self.is_dying() {
            physics.set_force(self.body, Vec3::ZERO);
            return None;
        }

        let turn = (input.left as i32 - input.right as i32) as f32;
        self.facing = normalize_angle(self.facing + turn * self.turn_rate * dt);

        let thrust = (input.up as i32 - input.down as i32) as f32;
        physics.set_force(self.body, facing_dir(self.facing) * thrust * self.move_force);
        self.steer(physics);

        if input.shoot {
            self.try_shoot(now, facing_dir(self.facing), physics)
        } else {
            None
        }
    }

    /// Twin-stick control: move along the stick, shoot along the aim stick
    pub fn update_input_from_touch(
        &mut self,
        touch: &TouchInput,
        _dt: f32,
        now: f64,
        physics: &mut PhysicsWorld,
    ) -> Option<ShotRequest> {
        if self.is_dying() {
            physics.set_force(self.body, Vec3::ZERO);
            return None;
        }

        let stick = Vec3::new(touch.move_x, 0.0, touch.move_z);
        let deflection = stick.length();
        if deflection > STICK_DEADZONE {
            self.facing = facing_angle(stick.x, stick.z);
            let force = stick / deflection * deflection.min(1.0) * self.move_force;
            physics.set_force(self.body, force);
        } else {
            physics.set_force(self.body, Vec3::ZERO);
        }
        self.steer(physics);

        if !touch.shoot {
            return None;
        }
        let aim = Vec3::new(touch.aim_x, 0.0, touch.aim_z);
        let dir = if aim.length() > STICK_DEADZONE {
            aim
        } else {
            facing_dir(self.facing)
        };
        self.try_shoot(now, dir, physics)
    }

    /// Fire along an explicit XZ direction, subject to the cooldown
    pub fn shoot_in_direction(
        &mut self,
        now: f64,
        dir_x: f32,
        dir_z: f32,
        physics: &PhysicsWorld,
    ) -> Option<ShotRequest> {
        self.try_shoot(now, Vec3::new(dir_x, 0.0, dir_z), physics)
    }

    fn try_shoot(&mut self, now: f64, dir: Vec3, physics: &PhysicsWorld) -> Option<ShotRequest> {
        if self.is_dead() || self.is_dying() {
            return None;
        }
        if let Some(last) = self.last_shot {
            if now - last < self.cooldown as f64 {
                return None;
            }
        }

        let dir = Vec3::new(dir.x, 0.0, dir.z).try_normalize()?;
        let mut origin = self.position(physics) + dir * self.muzzle;
        origin.y = SHOT_HEIGHT;
        self.last_shot = Some(now);

        Some(ShotRequest {
            origin,
            dir,
            faction: Faction::Player,
            damage: self.bullet_damage,
        })
    }

    /// Cap horizontal speed at `max_speed`, keeping vertical velocity.
    /// Returns the capped horizontal speed.
    pub fn clamp_speed(&self, physics: &mut PhysicsWorld) -> f32 {
        let vel = physics.velocity(self.body);
        let horizontal = Vec3::new(vel.x, 0.0, vel.z);
        let speed = horizontal.length();
        if speed > self.max_speed {
            let clamped = horizontal * (self.max_speed / speed);
            physics.set_velocity(self.body, Vec3::new(clamped.x, vel.y, clamped.z));
        }
        speed.min(self.max_speed)
    }

    fn steer(&mut self, physics: &mut PhysicsWorld) {
        let speed = self.clamp_speed(physics);
        self.anim.request(AnimRequest::Locomotion {
            moving: speed > RUN_SPEED,
        });
    }

    /// Returns the new health. No-op once dead or dying.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        if self.is_dead() || self.is_dying() {
            return self.health;
        }
        self.health = (self.health - amount.max(0)).clamp(0, self.max_health);
        self.health
    }

    /// Returns the new health. No-op once dead or dying.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if self.is_dead() || self.is_dying() {
            return self.health;
        }
        self.health = (self.health + amount.max(0)).clamp(0, self.max_health);
        self.health
    }

    pub fn reset_health(&mut self) {
        self.health = self.max_health;
    }

    /// Non-blocking reaction; ignored while already reacting, waving or dying
    pub fn play_hit_react(&mut self) -> bool {
        if self.is_dying() {
            return false;
        }
        self.anim.request(AnimRequest::Hit)
    }

    /// Enter the terminal death phase. Returns false if already dying.
    pub fn play_death(&mut self) -> bool {
        self.anim.request(AnimRequest::Death)
    }

    pub fn play_wave(&mut self) -> bool {
        self.anim.request(AnimRequest::Wave)
    }

    pub fn stop_wave(&mut self) -> bool {
        self.anim.request(AnimRequest::StopWave)
    }

    /// Advance animation; `DeathFinished` is reported once
    pub fn update_anim(&mut self, dt: f32) -> Option<AnimEvent> {
        self.anim.update(dt)
    }

    /// Place at a level's start, optionally restoring full health
    pub fn respawn_at(&mut self, pos: Vec3, reset_health: bool, physics: &mut PhysicsWorld) {
        physics.teleport(self.body, pos);
        self.facing = 0.0;
        self.last_shot = None;
        if reset_health {
            self.reset_health();
        }
    }
}
