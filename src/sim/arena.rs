//! Level/arena manager
//!
//! Owns the per-level population (boxes, turrets, rolies, pickups) and the
//! static boundary. Walls and floor are only rebuilt when the arena extents
//! change between levels.

use glam::Vec3;
use rand::Rng;

use super::level::{ArenaBounds, LevelDef};
use super::physics::{BodyHandle, PhysicsWorld};
use super::pickup::{Pickup, PickupKind, roll_pickups};
use super::player::Player;
use super::rolie::Rolie;
use super::turret::Turret;
use crate::consts::{BOX_SIZE, WALL_HEIGHT, WALL_THICKNESS};
use crate::tuning::Tuning;

pub struct ArenaManager {
    levels: Vec<LevelDef>,
    current: usize,
    /// Extents the walls were built for
    bounds: Option<ArenaBounds>,
    walls: Vec<BodyHandle>,
    wall_builds: u32,
    pub boxes: Vec<BodyHandle>,
    pub turrets: Vec<Turret>,
    pub rolies: Vec<Rolie>,
    pub pickups: Vec<Pickup>,
    /// The loaded level started with at least one hostile
    had_hostiles: bool,
    /// The weapon upgrade has been offered this run
    upgrade_offered: bool,
    next_id: u32,
    tuning: Tuning,
}

impl ArenaManager {
    pub fn new(levels: Vec<LevelDef>, tuning: &Tuning) -> Self {
        Self {
            levels,
            current: 0,
            bounds: None,
            walls: Vec::new(),
            wall_builds: 0,
            boxes: Vec::new(),
            turrets: Vec::new(),
            rolies: Vec::new(),
            pickups: Vec::new(),
            had_hostiles: false,
            upgrade_offered: false,
            next_id: 1,
            tuning: tuning.clone(),
        }
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_final_level(&self) -> bool {
        self.current + 1 >= self.levels.len()
    }

    /// Extents of the loaded level
    pub fn bounds(&self) -> ArenaBounds {
        self.bounds.unwrap_or(ArenaBounds::new(0.0, 0.0))
    }

    /// How many times walls and floor have been built
    pub fn wall_builds(&self) -> u32 {
        self.wall_builds
    }

    pub fn upgrade_offered(&self) -> bool {
        self.upgrade_offered
    }

    /// Tear down the previous level and build `index`. Returns false for an
    /// unknown index, leaving the world untouched.
    pub fn load_level(
        &mut self,
        index: usize,
        reset_health: bool,
        physics: &mut PhysicsWorld,
        player: &mut Player,
        rng: &mut impl Rng,
    ) -> bool {
        let Some(level) = self.levels.get(index).cloned() else {
            log::warn!("level {index} does not exist ({} loaded)", self.levels.len());
            return false;
        };

        self.clear_population(physics);

        if self.bounds != Some(level.bounds) {
            self.build_walls(level.bounds, physics);
        }

        for pile in &level.piles {
            for i in 0..pile.count {
                let pos = Vec3::new(pile.x, BOX_SIZE * (i as f32 + 0.5), pile.z);
                self.boxes.push(physics.add_box(pos, BOX_SIZE / 2.0));
            }
        }

        let turret_radius = self.tuning.turret.radius;
        for &(x, z) in &level.turrets {
            let id = self.alloc_id();
            let pos = Vec3::new(x, turret_radius, z);
            let body = physics.add_turret(pos, turret_radius, id);
            self.turrets.push(Turret::new(id, body, pos, &self.tuning));
        }

        let rolie_radius = self.tuning.rolie.radius;
        for &(x, z) in &level.rolies {
            let id = self.alloc_id();
            let pos = Vec3::new(x, rolie_radius, z);
            let body = physics.add_rolie(pos, rolie_radius, id);
            self.rolies
                .push(Rolie::new(id, body, pos, &self.tuning.rolie, rng));
        }

        let (sx, sz) = level.start_or_corner(self.tuning.arena.cell_size);
        player.respawn_at(Vec3::new(sx, player.radius(), sz), reset_health, physics);

        self.pickups = roll_pickups(
            index,
            &level,
            !self.upgrade_offered,
            &self.tuning.pickup,
            rng,
        );
        if self
            .pickups
            .iter()
            .any(|p| p.kind == PickupKind::WeaponUpgrade)
        {
            self.upgrade_offered = true;
        }

        self.current = index;
        self.had_hostiles = level.hostile_count() > 0;
        log::info!(
            "level {} loaded: {} turrets, {} rolies, {} boxes, {} pickups",
            index + 1,
            self.turrets.len(),
            self.rolies.len(),
            self.boxes.len(),
            self.pickups.len()
        );
        true
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn build_walls(&mut self, bounds: ArenaBounds, physics: &mut PhysicsWorld) {
        for wall in self.walls.drain(..) {
            physics.remove(wall);
        }

        let t = WALL_THICKNESS / 2.0;
        let h = WALL_HEIGHT / 2.0;
        let outer_x = bounds.half_x + WALL_THICKNESS;
        let outer_z = bounds.half_z + WALL_THICKNESS;

        // Floor
        self.walls.push(physics.add_static_cuboid(
            Vec3::new(0.0, -t, 0.0),
            Vec3::new(outer_x, t, outer_z),
        ));
        // +X / -X
        for sign in [1.0, -1.0] {
            self.walls.push(physics.add_static_cuboid(
                Vec3::new(sign * (bounds.half_x + t), h, 0.0),
                Vec3::new(t, h, outer_z),
            ));
        }
        // +Z / -Z
        for sign in [1.0, -1.0] {
            self.walls.push(physics.add_static_cuboid(
                Vec3::new(0.0, h, sign * (bounds.half_z + t)),
                Vec3::new(bounds.half_x, h, t),
            ));
        }

        self.bounds = Some(bounds);
        self.wall_builds += 1;
        log::debug!(
            "arena walls built for {:.1} x {:.1}",
            bounds.half_x * 2.0,
            bounds.half_z * 2.0
        );
    }

    /// Remove boxes, hostiles and pickups. Walls stay.
    fn clear_population(&mut self, physics: &mut PhysicsWorld) {
        for b in self.boxes.drain(..) {
            physics.remove(b);
        }
        for t in self.turrets.drain(..) {
            physics.remove(t.body);
        }
        for r in self.rolies.drain(..) {
            physics.remove(r.body);
        }
        self.pickups.clear();
        self.had_hostiles = false;
    }

    /// Drop everything including walls and forget the once-per-run state
    pub fn reset(&mut self, physics: &mut PhysicsWorld) {
        self.clear_population(physics);
        for wall in self.walls.drain(..) {
            physics.remove(wall);
        }
        self.bounds = None;
        self.upgrade_offered = false;
        self.current = 0;
    }

    pub fn turret_mut(&mut self, id: u32) -> Option<&mut Turret> {
        self.turrets.iter_mut().find(|t| t.id == id)
    }

    pub fn rolie_mut(&mut self, id: u32) -> Option<&mut Rolie> {
        self.rolies.iter_mut().find(|r| r.id == id)
    }

    pub fn remove_turret(&mut self, id: u32, physics: &mut PhysicsWorld) -> Option<Turret> {
        let idx = self.turrets.iter().position(|t| t.id == id)?;
        let turret = self.turrets.remove(idx);
        physics.remove(turret.body);
        Some(turret)
    }

    pub fn remove_rolie(&mut self, id: u32, physics: &mut PhysicsWorld) -> Option<Rolie> {
        let idx = self.rolies.iter().position(|r| r.id == id)?;
        let rolie = self.rolies.remove(idx);
        physics.remove(rolie.body);
        Some(rolie)
    }

    pub fn take_pickup(&mut self, idx: usize) -> Option<Pickup> {
        (idx < self.pickups.len()).then(|| self.pickups.swap_remove(idx))
    }

    /// Every hostile is gone, explosions have finished and the player is
    /// still standing
    pub fn is_cleared(&self, explosions_active: bool, player: &Player) -> bool {
        self.had_hostiles
            && self.turrets.is_empty()
            && self.rolies.is_empty()
            && !explosions_active
            && player.is_alive()
            && !player.is_dying()
    }

    /// Disarm the clear check until the next load
    pub fn mark_handled(&mut self) {
        self.had_hostiles = false;
    }
}
