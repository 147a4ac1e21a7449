//! Simulation loop
//!
//! One `frame` call per rendered frame. Input and the intro camera run once
//! per frame; physics, collision resolution and hostile AI run in fixed
//! substeps; removals, culling, pickups and level progression run once after
//! the substeps.

use glam::{Quat, Vec3};
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::anim::{AnimClips, AnimEvent};
use super::arena::ArenaManager;
use super::camera::{CameraIntro, CameraPose};
use super::collision::{
    EntityRef, FrameHits, PendingRemovals, explosion_damage, explosion_impulse,
    segment_hits_sphere, spheres_overlap,
};
use super::effects::{Effects, ExplosionKind};
use super::level::{LevelDef, LevelParseError};
use super::levels::builtin_levels;
use super::physics::{BodyTag, Contact, PhysicsWorld};
use super::pickup::{PickupKind, find_collected};
use super::player::{InputState, Player, TouchInput};
use super::projectile::{Faction, ProjectileRegistry, ShotRequest};
use super::rolie::RolieEvent;
use crate::consts::{BOX_SIZE, MAX_FRAME_DT, MAX_SUBSTEPS, SIM_DT};
use crate::render::{ModelKind, ModelRegistry, ModelStatus, RenderSnapshot, VisualInstance};
use crate::tuning::Tuning;

/// Notifications for the host, drained once per frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    HealthChanged { current: i32, max: i32 },
    LevelStarted { index: usize },
    LevelCleared { index: usize },
    Victory,
    GameOver,
    Explosion { pos: Vec3, kind: ExplosionKind },
    PlayerShot,
    TurretShot,
    PickupCollected { kind: PickupKind },
    /// Some armed rolie is charging (or none is any more)
    SirenChanged { active: bool },
    IntroFinished,
}

/// Input sampled for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Control {
    Keyboard(InputState),
    Touch(TouchInput),
}

impl Default for Control {
    fn default() -> Self {
        Control::Keyboard(InputState::default())
    }
}

pub struct Engine {
    tuning: Tuning,
    physics: PhysicsWorld,
    player: Player,
    projectiles: ProjectileRegistry,
    arena: ArenaManager,
    camera: CameraIntro,
    camera_pose: CameraPose,
    effects: Effects,
    models: ModelRegistry,
    pending: PendingRemovals,
    frame_hits: FrameHits,
    events: Vec<GameEvent>,
    rng: Pcg32,
    accumulator: f32,
    /// Simulated seconds
    time: f64,
    paused: bool,
    disposed: bool,
    game_over: bool,
    victory: bool,
    siren: bool,
    last_health: i32,
}

impl Engine {
    /// Engine over the built-in levels
    pub fn new(tuning: Tuning, seed: u64) -> Result<Self, LevelParseError> {
        let levels = builtin_levels(tuning.arena.cell_size)?;
        Ok(Self::with_levels(tuning, levels, seed))
    }

    pub fn with_levels(tuning: Tuning, levels: Vec<LevelDef>, seed: u64) -> Self {
        let mut physics = PhysicsWorld::new();
        let radius = tuning.player.radius;
        let body = physics.add_player(Vec3::new(0.0, radius, 0.0), radius);
        let player = Player::new(body, &tuning);
        let camera = CameraIntro::new(&tuning.camera);
        let camera_pose = camera.gameplay_pose(Vec3::ZERO);

        let mut engine = Self {
            projectiles: ProjectileRegistry::new(&tuning.projectile),
            arena: ArenaManager::new(levels, &tuning),
            physics,
            player,
            camera,
            camera_pose,
            effects: Effects::default(),
            models: ModelRegistry::default(),
            pending: PendingRemovals::default(),
            frame_hits: FrameHits::default(),
            events: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
            accumulator: 0.0,
            time: 0.0,
            paused: false,
            disposed: false,
            game_over: false,
            victory: false,
            siren: false,
            last_health: 0,
            tuning,
        };

        if engine.arena.level_count() == 0 {
            log::warn!("engine created without levels");
        } else {
            engine.start_level(0, true);
        }
        engine
    }

    /// Advance one rendered frame. Returns false once disposed, telling the
    /// host to stop scheduling frames.
    pub fn frame(&mut self, dt: f32, control: &Control) -> bool {
        if self.disposed {
            return false;
        }
        if self.paused {
            return true;
        }

        let dt = dt.clamp(0.0, MAX_FRAME_DT);
        self.frame_hits.clear();

        self.update_camera(dt);
        self.apply_control(dt, control);

        self.accumulator += dt;
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.fixed_step(SIM_DT);
            self.accumulator -= SIM_DT;
            self.time += SIM_DT as f64;
            substeps += 1;
        }
        // Drop time we could not catch up on
        self.accumulator = self.accumulator.min(SIM_DT);

        self.flush_removals();
        self.cull_projectiles();
        self.collect_pickups();
        self.effects.update(dt);
        self.update_player_anim(dt);
        self.update_siren();
        self.emit_health();
        self.check_level_clear();
        true
    }

    fn update_camera(&mut self, dt: f32) {
        let pos = self.player.position(&self.physics);
        let (pose, finished) = self.camera.update(dt, pos, self.player.facing);
        self.camera_pose = pose;
        if finished {
            self.player.stop_wave();
            self.events.push(GameEvent::IntroFinished);
        }
    }

    fn apply_control(&mut self, dt: f32, control: &Control) {
        if self.camera.is_active() {
            self.physics.set_force(self.player.body, Vec3::ZERO);
            return;
        }

        let shot = match control {
            Control::Keyboard(input) => {
                self.player
                    .update_input(input, dt, self.time, &mut self.physics)
            }
            Control::Touch(touch) => {
                self.player
                    .update_input_from_touch(touch, dt, self.time, &mut self.physics)
            }
        };
        if let Some(shot) = shot {
            self.spawn_shot(&shot);
        }
    }

    /// Fire along an explicit direction (mouse aim). Ignored during the intro.
    pub fn shoot_in_direction(&mut self, dir_x: f32, dir_z: f32) -> bool {
        if self.disposed || self.paused || self.camera.is_active() {
            return false;
        }
        match self
            .player
            .shoot_in_direction(self.time, dir_x, dir_z, &self.physics)
        {
            Some(shot) => {
                self.spawn_shot(&shot);
                true
            }
            None => false,
        }
    }

    fn spawn_shot(&mut self, shot: &ShotRequest) -> u32 {
        let id = self.projectiles.spawn(shot, self.time, &mut self.physics);
        self.events.push(match shot.faction {
            Faction::Player => GameEvent::PlayerShot,
            Faction::Hostile => GameEvent::TurretShot,
        });
        id
    }

    fn fixed_step(&mut self, dt: f32) {
        self.projectiles.record_previous_positions(&self.physics);
        for contact in self.physics.step(dt) {
            self.resolve_contact(contact);
        }
        self.player.clamp_speed(&mut self.physics);
        self.sweep_player_hits();
        self.overlap_rolie_hits();
        if self.camera.is_active() {
            // Arming counts from spawn, intro included
            for rolie in &mut self.arena.rolies {
                rolie.age_by(dt);
            }
        } else {
            self.update_hostiles(dt);
        }
    }

    /// Player is alive and not playing the death clip
    fn player_active(&self) -> bool {
        self.player.is_alive() && !self.player.is_dying()
    }

    fn resolve_contact(&mut self, contact: Contact) {
        if let Some((projectile, target)) = contact.projectile_pair() {
            self.apply_projectile_hit(projectile, target);
        }
    }

    /// Single entry point for projectile damage, whichever test found the hit
    fn apply_projectile_hit(&mut self, projectile: u32, target: BodyTag) {
        if self.pending.contains(EntityRef::Projectile(projectile)) {
            return;
        }
        let Some(p) = self.projectiles.get(projectile) else {
            return;
        };
        let (faction, damage) = (p.faction, p.damage);
        if !faction.can_damage(target) || !self.player_active() {
            return;
        }

        match target {
            BodyTag::Player => {
                if !self.frame_hits.record_player_hit(projectile) {
                    return;
                }
                self.pending.mark(EntityRef::Projectile(projectile));
                self.damage_player(damage);
            }
            BodyTag::Turret(id) => {
                let Some(turret) = self.arena.turret_mut(id) else {
                    return;
                };
                if !turret.is_alive() {
                    return;
                }
                self.pending.mark(EntityRef::Projectile(projectile));
                if turret.take_damage(damage) == 0 {
                    log::debug!("turret {id} down");
                    self.pending.mark(EntityRef::Turret(id));
                }
            }
            BodyTag::Rolie(id) => {
                let Some(rolie) = self.arena.rolie_mut(id) else {
                    return;
                };
                if !rolie.is_alive() {
                    return;
                }
                self.pending.mark(EntityRef::Projectile(projectile));
                if rolie.take_damage(damage) == 0 {
                    log::debug!("rolie {id} shot down");
                    self.pending.mark(EntityRef::Rolie(id));
                }
            }
            BodyTag::World | BodyTag::Obstacle | BodyTag::Projectile(_) => {}
        }
    }

    fn damage_player(&mut self, amount: i32) {
        let before = self.player.health();
        let after = self.player.take_damage(amount);
        if self.player.is_dead() {
            if self.player.play_death() {
                log::info!("player killed");
            }
        } else if after < before {
            self.player.play_hit_react();
        }
    }

    /// Catch hostile bullets that crossed the player within one step
    fn sweep_player_hits(&mut self) {
        let center = self.player.position(&self.physics);
        let reach = self.player.radius() + self.projectiles.radius();
        let hits: Vec<u32> = self
            .projectiles
            .iter()
            .filter(|p| !p.from_player())
            .filter(|p| {
                let now = self.physics.position(p.body);
                segment_hits_sphere(p.prev_pos, now, center, reach)
            })
            .map(|p| p.id)
            .collect();
        for id in hits {
            self.apply_projectile_hit(id, BodyTag::Player);
        }
    }

    /// Player bullets against the enlarged rolie hit sphere
    fn overlap_rolie_hits(&mut self) {
        let radius = self.projectiles.radius();
        let hit_radius = self.tuning.rolie.hit_radius;
        let mut hits = Vec::new();
        for p in self.projectiles.iter().filter(|p| p.from_player()) {
            let pos = self.physics.position(p.body);
            if let Some(rolie) = self
                .arena
                .rolies
                .iter()
                .find(|r| r.is_alive() && spheres_overlap(pos, radius, r.position, hit_radius))
            {
                hits.push((p.id, rolie.id));
            }
        }
        for (projectile, rolie) in hits {
            self.apply_projectile_hit(projectile, BodyTag::Rolie(rolie));
        }
    }

    fn update_hostiles(&mut self, dt: f32) {
        let player_pos = self.player.position(&self.physics);

        let shots: Vec<ShotRequest> = self
            .arena
            .turrets
            .iter_mut()
            .filter_map(|t| t.update(dt, player_pos))
            .collect();
        for shot in &shots {
            self.spawn_shot(shot);
        }

        let bounds = self.arena.bounds();
        let mut detonations = Vec::new();
        for rolie in &mut self.arena.rolies {
            match rolie.update(dt, player_pos, &bounds, &mut self.rng) {
                Some(RolieEvent::Detonate) => detonations.push((rolie.id, rolie.position)),
                Some(RolieEvent::StartedCharging) => log::debug!("rolie {} charging", rolie.id),
                None => {}
            }
            self.physics.set_kinematic_position(rolie.body, rolie.position);
        }
        for (id, pos) in detonations {
            self.detonate(id, pos);
        }
    }

    fn detonate(&mut self, rolie: u32, center: Vec3) {
        log::debug!("rolie {rolie} detonated");
        self.pending.mark(EntityRef::Rolie(rolie));
        self.spawn_explosion(center, ExplosionKind::Rolie);

        let blast = self.tuning.explosion.clone();
        if self.player_active() {
            let distance = center.distance(self.player.position(&self.physics));
            let damage = explosion_damage(distance, blast.radius, blast.max_damage, blast.min_damage);
            if damage > 0.0 {
                self.damage_player((damage.round() as i32).max(1));
            }
        }

        for &b in &self.arena.boxes {
            let pos = self.physics.position(b);
            if let Some(impulse) =
                explosion_impulse(center, pos, blast.radius, blast.impulse, blast.upward)
            {
                self.physics.apply_impulse(b, impulse);
            }
        }
    }

    fn spawn_explosion(&mut self, pos: Vec3, kind: ExplosionKind) {
        self.effects
            .spawn(pos, kind, self.tuning.explosion.duration);
        self.events.push(GameEvent::Explosion { pos, kind });
    }

    /// Apply everything queued during the substeps
    fn flush_removals(&mut self) {
        for entity in self.pending.drain() {
            match entity {
                EntityRef::Projectile(id) => {
                    self.projectiles.remove(id, &mut self.physics);
                }
                EntityRef::Turret(id) => {
                    if let Some(turret) = self.arena.remove_turret(id, &mut self.physics) {
                        log::info!("turret {id} destroyed");
                        self.spawn_explosion(turret.position, ExplosionKind::Turret);
                    }
                }
                EntityRef::Rolie(id) => {
                    if let Some(rolie) = self.arena.remove_rolie(id, &mut self.physics) {
                        log::debug!("rolie {id} removed ({:?})", rolie.state());
                    }
                }
            }
        }
    }

    fn cull_projectiles(&mut self) {
        let bounds = self.arena.bounds();
        for (id, why) in self.projectiles.expired(self.time, &bounds, &self.physics) {
            log::trace!("projectile {id} expired: {why:?}");
            self.projectiles.remove(id, &mut self.physics);
        }
    }

    fn collect_pickups(&mut self) {
        if !self.player_active() {
            return;
        }
        let pos = self.player.position(&self.physics);
        let reach = self.tuning.pickup.collect_radius;
        while let Some(idx) = find_collected(&self.arena.pickups, pos, reach) {
            let Some(pickup) = self.arena.take_pickup(idx) else {
                break;
            };
            match pickup.kind {
                PickupKind::Health => {
                    self.player.heal(self.tuning.pickup.heal_amount);
                }
                PickupKind::WeaponUpgrade => {
                    self.player.bullet_damage = self.tuning.projectile.upgraded_damage;
                }
            }
            log::info!("picked up {:?}", pickup.kind);
            self.events
                .push(GameEvent::PickupCollected { kind: pickup.kind });
        }
    }

    fn update_player_anim(&mut self, dt: f32) {
        if let Some(AnimEvent::DeathFinished) = self.player.update_anim(dt) {
            if !self.game_over {
                self.game_over = true;
                log::info!("game over on level {}", self.arena.current_index() + 1);
                self.events.push(GameEvent::GameOver);
            }
        }
    }

    fn update_siren(&mut self) {
        let active = self
            .arena
            .rolies
            .iter()
            .any(|r| r.is_armed() && r.is_charging());
        if active != self.siren {
            self.siren = active;
            self.events.push(GameEvent::SirenChanged { active });
        }
    }

    fn emit_health(&mut self) {
        let current = self.player.health();
        if current != self.last_health {
            self.last_health = current;
            self.events.push(GameEvent::HealthChanged {
                current,
                max: self.player.max_health(),
            });
        }
    }

    fn check_level_clear(&mut self) {
        if self.victory || !self.arena.is_cleared(self.effects.any_active(), &self.player) {
            return;
        }
        let index = self.arena.current_index();
        log::info!("level {} cleared", index + 1);
        self.events.push(GameEvent::LevelCleared { index });

        if self.arena.is_final_level() {
            self.arena.mark_handled();
            self.victory = true;
            log::info!("victory");
            self.events.push(GameEvent::Victory);
        } else {
            self.start_level(index + 1, false);
        }
    }

    fn start_level(&mut self, index: usize, reset_health: bool) {
        self.projectiles.clear(&mut self.physics);
        self.effects.clear();
        self.pending = PendingRemovals::default();
        self.frame_hits.clear();

        if !self.arena.load_level(
            index,
            reset_health,
            &mut self.physics,
            &mut self.player,
            &mut self.rng,
        ) {
            return;
        }

        self.camera.start();
        self.player.play_wave();
        if self.siren {
            self.siren = false;
            self.events.push(GameEvent::SirenChanged { active: false });
        }
        self.events.push(GameEvent::LevelStarted { index });
        self.last_health = self.player.health();
        self.events.push(GameEvent::HealthChanged {
            current: self.last_health,
            max: self.player.max_health(),
        });
    }

    /// Back to the first level with a fresh player
    pub fn restart(&mut self) {
        if self.disposed {
            return;
        }
        self.projectiles.clear(&mut self.physics);
        self.arena.reset(&mut self.physics);
        self.physics.remove(self.player.body);

        let radius = self.tuning.player.radius;
        let body = self
            .physics
            .add_player(Vec3::new(0.0, radius, 0.0), radius);
        self.player = Player::new(body, &self.tuning);
        if let ModelStatus::Loaded { clips } = self.models.status(ModelKind::Player) {
            self.player.set_clips(*clips);
        }

        self.game_over = false;
        self.victory = false;
        self.paused = false;
        self.accumulator = 0.0;
        log::info!("run restarted");
        self.start_level(0, true);
    }

    /// Drop every body and collection. Later calls are no-ops.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.projectiles.clear(&mut self.physics);
        self.arena.reset(&mut self.physics);
        self.effects.clear();
        self.physics.clear();
        self.pending = PendingRemovals::default();
        self.events.clear();
        self.disposed = true;
        log::info!("engine disposed");
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            log::debug!("paused: {paused}");
        }
        self.paused = paused;
    }

    /// A model finished loading; placeholders switch over on the next snapshot
    pub fn model_loaded(&mut self, kind: ModelKind, clips: AnimClips) {
        log::debug!("model {kind:?} loaded");
        self.models.mark_loaded(kind, clips);
        if kind == ModelKind::Player {
            self.player.set_clips(clips);
        }
    }

    /// A model failed to load; the placeholder stays
    pub fn model_failed(&mut self, kind: ModelKind, reason: &str) {
        log::warn!("model {kind:?} failed to load, keeping placeholder: {reason}");
        self.models.mark_failed(kind, reason);
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Flatten the world into render instances
    pub fn snapshot(&self) -> RenderSnapshot {
        let mut instances = Vec::new();
        if self.disposed {
            return RenderSnapshot {
                camera: self.camera_pose,
                instances,
            };
        }

        instances.push(
            VisualInstance::new(
                ModelKind::Player,
                self.player.position(&self.physics),
                Quat::from_rotation_y(self.player.facing),
                1.0,
            )
            .with_state(self.player.anim_phase().as_u32()),
        );
        for t in &self.arena.turrets {
            instances.push(VisualInstance::new(
                ModelKind::Turret,
                t.position,
                Quat::from_rotation_y(t.facing),
                1.0,
            ));
        }
        for r in &self.arena.rolies {
            let flags = r.is_charging() as u32 | (r.is_armed() as u32) << 1;
            instances.push(
                VisualInstance::new(ModelKind::Rolie, r.position, Quat::IDENTITY, 1.0)
                    .with_state(flags),
            );
        }
        for &b in &self.arena.boxes {
            instances.push(VisualInstance::new(
                ModelKind::Box,
                self.physics.position(b),
                self.physics.rotation(b),
                BOX_SIZE,
            ));
        }
        for p in self.projectiles.iter() {
            instances.push(
                VisualInstance::new(
                    ModelKind::Projectile,
                    self.physics.position(p.body),
                    Quat::IDENTITY,
                    self.projectiles.radius() * 2.0,
                )
                .with_state(!p.from_player() as u32),
            );
        }
        for p in &self.arena.pickups {
            instances.push(
                VisualInstance::new(ModelKind::Pickup, p.pos, Quat::IDENTITY, 1.0)
                    .with_state(p.kind as u32),
            );
        }
        for e in self.effects.iter() {
            instances.push(
                VisualInstance::new(
                    ModelKind::Explosion,
                    e.pos,
                    Quat::IDENTITY,
                    self.tuning.explosion.radius * e.progress(),
                )
                .with_state(e.kind as u32),
            );
        }

        self.models.apply(&mut instances);
        RenderSnapshot {
            camera: self.camera_pose,
            instances,
        }
    }

    pub fn health(&self) -> i32 {
        self.player.health()
    }

    pub fn max_health(&self) -> i32 {
        self.player.max_health()
    }

    pub fn level_index(&self) -> usize {
        self.arena.current_index()
    }

    pub fn level_count(&self) -> usize {
        self.arena.level_count()
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn is_victory(&self) -> bool {
        self.victory
    }

    pub fn intro_active(&self) -> bool {
        self.camera.is_active()
    }

    pub fn player_position(&self) -> Vec3 {
        self.player.position(&self.physics)
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn arena(&self) -> &ArenaManager {
        &self.arena
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::parse_grid;
    use crate::sim::pickup::Pickup;

    fn engine(rows: &[&str]) -> Engine {
        let tuning = Tuning::default();
        let level = parse_grid(rows, tuning.arena.cell_size).unwrap();
        Engine::with_levels(tuning, vec![level], 11)
    }

    fn skip_intro(e: &mut Engine) {
        e.camera = CameraIntro::new(&e.tuning.camera);
        e.player.stop_wave();
    }

    fn fire(e: &mut Engine, faction: Faction, origin: Vec3, damage: i32) -> u32 {
        let shot = ShotRequest {
            origin,
            dir: Vec3::X,
            faction,
            damage,
        };
        e.projectiles.spawn(&shot, e.time, &mut e.physics)
    }

    /// Somewhere no collider reaches
    const PARKED: Vec3 = Vec3::new(0.0, 50.0, 0.0);

    fn count(events: &[GameEvent], pred: impl Fn(&GameEvent) -> bool) -> usize {
        events.iter().filter(|e| pred(e)).count()
    }

    #[test]
    fn test_start_events() {
        let mut e = engine(&["T....", "....P"]);
        let events = e.drain_events();
        assert!(events.contains(&GameEvent::LevelStarted { index: 0 }));
        assert!(events.contains(&GameEvent::HealthChanged { current: 10, max: 10 }));
        assert!(e.intro_active());
        assert!(serde_json::to_string(&events).is_ok());
    }

    #[test]
    fn test_turret_duel_single_explosion() {
        let mut e = engine(&["T....", "....P"]);
        skip_intro(&mut e);
        e.drain_events();
        let turret = e.arena.turrets[0].id;

        for _ in 0..3 {
            let pid = fire(&mut e, Faction::Player, PARKED, 1);
            e.resolve_contact(Contact {
                a: BodyTag::Projectile(pid),
                b: BodyTag::Turret(turret),
            });
        }
        assert_eq!(e.arena.turrets[0].health(), 0);

        // A fourth bullet hitting the wreck changes nothing
        let late = fire(&mut e, Faction::Player, PARKED, 1);
        e.resolve_contact(Contact {
            a: BodyTag::Turret(turret),
            b: BodyTag::Projectile(late),
        });

        e.flush_removals();
        assert!(e.arena.turrets.is_empty());
        assert_eq!(e.effects.len(), 1);
        let events = e.drain_events();
        assert_eq!(
            count(&events, |ev| matches!(
                ev,
                GameEvent::Explosion {
                    kind: ExplosionKind::Turret,
                    ..
                }
            )),
            1
        );
        // The late bullet was not consumed
        assert!(e.projectiles.get(late).is_some());
    }

    #[test]
    fn test_faction_exclusivity() {
        let mut e = engine(&["T....", "....P"]);
        skip_intro(&mut e);
        let turret = e.arena.turrets[0].id;

        let own = fire(&mut e, Faction::Player, PARKED, 1);
        e.resolve_contact(Contact {
            a: BodyTag::Projectile(own),
            b: BodyTag::Player,
        });
        assert_eq!(e.health(), 10);

        let hostile = fire(&mut e, Faction::Hostile, PARKED, 1);
        e.resolve_contact(Contact {
            a: BodyTag::Projectile(hostile),
            b: BodyTag::Turret(turret),
        });
        assert_eq!(e.arena.turrets[0].health(), e.tuning.turret.max_health);
    }

    #[test]
    fn test_event_and_sweep_damage_once() {
        let mut e = engine(&["T....", "....P"]);
        skip_intro(&mut e);
        let player = e.player.position(&e.physics);
        let start = player - Vec3::new(2.0, 0.0, 0.0);
        let pid = fire(&mut e, Faction::Hostile, start, 1);

        e.projectiles.record_previous_positions(&e.physics);
        let body = e.projectiles.get(pid).unwrap().body;
        e.physics.teleport(body, player + Vec3::new(2.0, 0.0, 0.0));

        e.resolve_contact(Contact {
            a: BodyTag::Player,
            b: BodyTag::Projectile(pid),
        });
        e.sweep_player_hits();
        e.apply_projectile_hit(pid, BodyTag::Player);
        assert_eq!(e.health(), 9);
    }

    #[test]
    fn test_tunneling_projectile_is_caught() {
        let mut e = engine(&["T....", "....P"]);
        skip_intro(&mut e);
        let player = e.player.position(&e.physics);
        let pid = fire(&mut e, Faction::Hostile, player - Vec3::new(3.0, 0.0, 0.0), 1);

        e.projectiles.record_previous_positions(&e.physics);
        let body = e.projectiles.get(pid).unwrap().body;
        // Whole sphere crossed within one step, both ends outside
        e.physics.teleport(body, player + Vec3::new(3.0, 0.0, 0.0));

        e.sweep_player_hits();
        assert_eq!(e.health(), 9);
        e.flush_removals();
        assert!(e.projectiles.get(pid).is_none());
    }

    #[test]
    fn test_enlarged_rolie_hit_radius() {
        let mut e = engine(&["R....", "....P"]);
        skip_intro(&mut e);
        let rolie = e.arena.rolies[0].position;
        // Outside the physics sphere, inside the hit sphere
        fire(&mut e, Faction::Player, rolie + Vec3::new(1.0, 0.0, 0.0), 1);
        e.overlap_rolie_hits();
        assert_eq!(e.arena.rolies[0].health(), e.tuning.rolie.max_health - 1);

        // Hostile bullets never hurt rolies
        fire(&mut e, Faction::Hostile, rolie, 1);
        e.overlap_rolie_hits();
        assert_eq!(e.arena.rolies[0].health(), e.tuning.rolie.max_health - 1);
    }

    #[test]
    fn test_level_clear_precondition() {
        let mut e = engine(&["T.T.T", ".....", "R...R", "..P.."]);
        skip_intro(&mut e);
        e.drain_events();

        let mut targets: Vec<BodyTag> = e
            .arena
            .turrets
            .iter()
            .map(|t| BodyTag::Turret(t.id))
            .collect();
        targets.extend(e.arena.rolies.iter().map(|r| BodyTag::Rolie(r.id)));
        assert_eq!(targets.len(), 5);

        for target in targets {
            e.check_level_clear();
            assert_eq!(
                count(&e.events, |ev| matches!(ev, GameEvent::LevelCleared { .. })),
                0
            );
            let pid = fire(&mut e, Faction::Player, PARKED, 10);
            e.resolve_contact(Contact {
                a: BodyTag::Projectile(pid),
                b: target,
            });
            e.flush_removals();
        }

        // Only turrets explode when shot down
        assert_eq!(e.effects.len(), 3);
        e.check_level_clear();
        assert!(!e.is_victory());

        e.effects.update(1.0);
        e.check_level_clear();
        let events = e.drain_events();
        assert!(events.contains(&GameEvent::LevelCleared { index: 0 }));
        assert!(events.contains(&GameEvent::Victory));
    }

    #[test]
    fn test_level_clear_advances() {
        let tuning = Tuning::default();
        let levels = vec![
            parse_grid(&["T....", "....P"], 3.0).unwrap(),
            parse_grid(&["R....", "P...."], 3.0).unwrap(),
        ];
        let mut e = Engine::with_levels(tuning, levels, 2);
        skip_intro(&mut e);
        let turret = e.arena.turrets[0].id;
        let pid = fire(&mut e, Faction::Player, PARKED, 10);
        e.resolve_contact(Contact {
            a: BodyTag::Projectile(pid),
            b: BodyTag::Turret(turret),
        });
        for _ in 0..120 {
            e.frame(SIM_DT, &Control::default());
        }
        assert_eq!(e.level_index(), 1);
        assert_eq!(e.arena.rolies.len(), 1);
        // Same extents, walls kept
        assert_eq!(e.arena.wall_builds(), 1);
        assert!(e.intro_active());
    }

    #[test]
    fn test_rolie_detonation_hurts_player() {
        let mut e = engine(&["R.P"]);
        skip_intro(&mut e);
        e.drain_events();

        let mut exploded = false;
        for _ in 0..300 {
            e.frame(SIM_DT, &Control::default());
            let events = e.drain_events();
            if events.iter().any(|ev| {
                matches!(
                    ev,
                    GameEvent::Explosion {
                        kind: ExplosionKind::Rolie,
                        ..
                    }
                )
            }) {
                exploded = true;
                break;
            }
        }
        assert!(exploded);
        assert!(e.health() < 10);
        assert!(e.arena.rolies.is_empty());
    }

    #[test]
    fn test_death_gating_single_game_over() {
        let mut e = engine(&["T....", "....P"]);
        skip_intro(&mut e);
        e.drain_events();

        let lethal = fire(&mut e, Faction::Hostile, PARKED, 100);
        e.resolve_contact(Contact {
            a: BodyTag::Projectile(lethal),
            b: BodyTag::Player,
        });
        assert_eq!(e.health(), 0);
        assert!(e.player.is_dying());

        let again = fire(&mut e, Faction::Hostile, PARKED, 1);
        e.resolve_contact(Contact {
            a: BodyTag::Projectile(again),
            b: BodyTag::Player,
        });
        e.damage_player(3);
        assert_eq!(e.health(), 0);
        assert!(!e.player.play_hit_react());

        let mut events = Vec::new();
        for _ in 0..240 {
            e.frame(SIM_DT, &Control::default());
            events.extend(e.drain_events());
        }
        assert_eq!(count(&events, |ev| *ev == GameEvent::GameOver), 1);
        assert!(e.is_game_over());
        assert!(!events.contains(&GameEvent::Victory));
    }

    #[test]
    fn test_intro_ignores_input() {
        let mut e = engine(&["T....", "....P"]);
        let start = e.player.position(&e.physics);
        let up = Control::Keyboard(InputState {
            up: true,
            shoot: true,
            ..Default::default()
        });
        for _ in 0..30 {
            e.frame(SIM_DT, &up);
        }
        let now = e.player.position(&e.physics);
        assert!(crate::xz_distance(start, now) < 0.05);
        assert!(e.projectiles.is_empty());
        assert!(!e.shoot_in_direction(1.0, 0.0));
    }

    #[test]
    fn test_intro_finishes_then_input_moves() {
        let mut e = engine(&["T....", ".....", "....P"]);
        let up = Control::Keyboard(InputState {
            up: true,
            ..Default::default()
        });
        let mut events = Vec::new();
        for _ in 0..240 {
            e.frame(SIM_DT, &up);
            events.extend(e.drain_events());
        }
        assert!(events.contains(&GameEvent::IntroFinished));
        assert!(!e.intro_active());
    }

    #[test]
    fn test_pause_freezes_state() {
        let mut e = engine(&["T....", "....P"]);
        e.set_paused(true);
        let t = e.time();
        assert!(e.frame(0.05, &Control::default()));
        assert_eq!(e.time(), t);
        e.set_paused(false);
        e.frame(0.05, &Control::default());
        assert!(e.time() > t);
    }

    #[test]
    fn test_frame_dt_is_clamped() {
        let mut e = engine(&["T....", "....P"]);
        e.frame(10.0, &Control::default());
        assert!(e.time() <= (MAX_SUBSTEPS as f64) * SIM_DT as f64 + 1e-6);
    }

    #[test]
    fn test_dispose_stops_frames() {
        let mut e = engine(&["T....", "....P"]);
        e.dispose();
        assert!(!e.frame(SIM_DT, &Control::default()));
        assert_eq!(e.physics.body_count(), 0);
        assert!(e.snapshot().instances.is_empty());
        e.restart();
        assert!(e.is_disposed());
    }

    #[test]
    fn test_weapon_upgrade_pickup() {
        let mut e = engine(&["T....", "....P"]);
        skip_intro(&mut e);
        e.drain_events();
        let pos = e.player.position(&e.physics);
        e.arena.pickups.push(Pickup {
            kind: PickupKind::WeaponUpgrade,
            pos,
        });
        e.collect_pickups();
        assert_eq!(e.player.bullet_damage, e.tuning.projectile.upgraded_damage);
        assert!(e.arena.pickups.is_empty());
        assert_eq!(
            e.drain_events(),
            vec![GameEvent::PickupCollected {
                kind: PickupKind::WeaponUpgrade
            }]
        );
    }

    #[test]
    fn test_health_pickup_heals_up_to_max() {
        let mut e = engine(&["T....", "....P"]);
        skip_intro(&mut e);
        e.damage_player(6);
        assert_eq!(e.health(), 4);
        let pos = e.player.position(&e.physics);
        let heal = e.tuning.pickup.heal_amount;

        e.arena.pickups.push(Pickup {
            kind: PickupKind::Health,
            pos,
        });
        e.collect_pickups();
        assert_eq!(e.health(), 4 + heal);

        e.arena.pickups.push(Pickup {
            kind: PickupKind::Health,
            pos,
        });
        e.collect_pickups();
        assert_eq!(e.health(), e.max_health());
        assert!(e.arena.pickups.is_empty());
    }

    #[test]
    fn test_player_speed_clamped_every_frame() {
        let mut e = engine(&[
            "T.......",
            "........",
            "........",
            "........",
            "...P....",
        ]);
        skip_intro(&mut e);
        let up = Control::Keyboard(InputState {
            up: true,
            ..Default::default()
        });
        let max = e.tuning.player.max_speed;
        for dt in [SIM_DT, 0.1] {
            for _ in 0..40 {
                e.frame(dt, &up);
                let v = e.physics.velocity(e.player.body);
                let horizontal = Vec3::new(v.x, 0.0, v.z).length();
                assert!(horizontal <= max + 1e-3, "speed {horizontal} above {max}");
            }
        }
    }

    #[test]
    fn test_siren_follows_armed_charge() {
        let mut tuning = Tuning::default();
        tuning.rolie.arming_delay = 0.0;
        tuning.rolie.charge_speed = 0.0;
        let level = parse_grid(&["R.P"], tuning.arena.cell_size).unwrap();
        let mut e = Engine::with_levels(tuning, vec![level], 5);
        skip_intro(&mut e);
        e.drain_events();

        e.frame(SIM_DT, &Control::default());
        assert!(e.arena.rolies[0].is_charging());
        let events = e.drain_events();
        assert_eq!(
            count(&events, |ev| *ev == GameEvent::SirenChanged { active: true }),
            1
        );
        // No repeat while the state holds
        e.frame(SIM_DT, &Control::default());
        assert!(!e
            .drain_events()
            .iter()
            .any(|ev| matches!(ev, GameEvent::SirenChanged { .. })));

        // Loading a level silences it
        e.restart();
        assert!(!e.siren);
        assert!(e
            .drain_events()
            .contains(&GameEvent::SirenChanged { active: false }));
    }

    #[test]
    fn test_rolie_arms_during_intro() {
        let mut e = engine(&["R.....", ".....P"]);
        let start = e.arena.rolies[0].position;
        let frames = (e.tuning.rolie.arming_delay / SIM_DT).ceil() as usize + 2;
        for _ in 0..frames {
            e.frame(SIM_DT, &Control::default());
        }
        assert!(e.intro_active());
        let rolie = &e.arena.rolies[0];
        assert!(rolie.is_armed());
        assert!(!rolie.is_charging());
        assert_eq!(rolie.position, start);
    }

    #[test]
    fn test_detonation_pushes_nearby_boxes() {
        let mut e = engine(&["1......1", "...P...."]);
        skip_intro(&mut e);
        assert_eq!(e.arena.boxes.len(), 2);
        // Settle mass properties before applying impulses
        e.physics.step(SIM_DT);

        let (mut near, mut far) = (e.arena.boxes[0], e.arena.boxes[1]);
        if e.physics.position(near).x > e.physics.position(far).x {
            std::mem::swap(&mut near, &mut far);
        }
        let near_pos = e.physics.position(near);
        let far_before = e.physics.velocity(far);
        let near_before = e.physics.velocity(near);
        let center = near_pos - Vec3::new(1.0, 0.3, 0.0);
        assert!(center.distance(e.physics.position(far)) > e.tuning.explosion.radius);

        e.detonate(999, center);

        let pushed = e.physics.velocity(near) - near_before;
        assert!(pushed.x > 0.0, "pushed away from the blast: {pushed:?}");
        assert!(pushed.y > 0.0, "pushed upward: {pushed:?}");
        assert_eq!(e.physics.velocity(far), far_before);
        assert!(e
            .events
            .iter()
            .any(|ev| matches!(ev, GameEvent::Explosion { kind: ExplosionKind::Rolie, .. })));
    }

    #[test]
    fn test_restart_resets_run() {
        let mut e = engine(&["T....", "....P"]);
        skip_intro(&mut e);
        e.damage_player(4);
        e.player.bullet_damage = 2;
        e.restart();
        assert_eq!(e.health(), 10);
        assert_eq!(e.player.bullet_damage, e.tuning.projectile.player_damage);
        assert_eq!(e.level_index(), 0);
        // The once-per-run upgrade flag only reflects this fresh roll
        let rolled_upgrade = e
            .arena
            .pickups
            .iter()
            .any(|p| p.kind == PickupKind::WeaponUpgrade);
        assert_eq!(e.arena.upgrade_offered(), rolled_upgrade);
        assert!(e.intro_active());
    }

    #[test]
    fn test_model_placeholders_swap() {
        let mut e = engine(&["T....", "....P"]);
        let snap = e.snapshot();
        assert!(snap.instances.iter().all(|i| i.placeholder == 1));

        e.model_failed(ModelKind::Turret, "network");
        e.model_loaded(
            ModelKind::Player,
            AnimClips {
                hit: Some(0.3),
                death: Some(0.5),
            },
        );
        let snap = e.snapshot();
        let player = &snap.instances[0];
        assert_eq!(player.kind, ModelKind::Player.as_u32());
        assert_eq!(player.placeholder, 0);
        assert!(snap
            .instances
            .iter()
            .filter(|i| i.kind == ModelKind::Turret.as_u32())
            .all(|i| i.placeholder == 1));
    }

    #[test]
    fn test_builtin_engine_starts() {
        let e = Engine::new(Tuning::default(), 1).unwrap();
        assert_eq!(e.level_index(), 0);
        assert!(e.level_count() >= 5);
        assert_eq!(e.arena.turrets.len(), 1);
    }
}
