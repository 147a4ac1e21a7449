//! Rigid-body world
//!
//! Wraps rapier3d behind a small API in glam types. The physics world is the
//! single source of truth for dynamic body positions; everything else reads
//! from it once per frame.
//!
//! Colliders are mapped back to their owning game object through a side table
//! (`ColliderHandle -> BodyTag`), and collision events raised during a step are
//! buffered and handed back once the step has finished.

use std::collections::HashMap;
use std::sync::Mutex;

use glam::{Quat, Vec3};
use rapier3d::prelude::*;

use crate::consts::GRAVITY;

pub use rapier3d::prelude::RigidBodyHandle as BodyHandle;

/// Owner of a collider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyTag {
    /// Walls and floor
    World,
    /// Movable box
    Obstacle,
    Player,
    Turret(u32),
    Rolie(u32),
    Projectile(u32),
}

/// Collision group memberships
pub mod groups {
    use rapier3d::prelude::Group;

    pub const WORLD: Group = Group::GROUP_1;
    pub const PLAYER: Group = Group::GROUP_2;
    pub const PROJECTILE: Group = Group::GROUP_3;
    pub const TURRET: Group = Group::GROUP_4;
    pub const ROLIE: Group = Group::GROUP_5;
}

/// A collision that started during the last step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub a: BodyTag,
    pub b: BodyTag,
}

impl Contact {
    /// If either side is a projectile, return (projectile id, other side)
    pub fn projectile_pair(&self) -> Option<(u32, BodyTag)> {
        match (self.a, self.b) {
            (BodyTag::Projectile(id), other) => Some((id, other)),
            (other, BodyTag::Projectile(id)) => Some((id, other)),
            _ => None,
        }
    }
}

/// Buffers collision events raised inside `PhysicsPipeline::step`
#[derive(Default)]
struct ContactCollector {
    started: Mutex<Vec<(ColliderHandle, ColliderHandle)>>,
}

impl EventHandler for ContactCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if let CollisionEvent::Started(a, b, _) = event {
            match self.started.lock() {
                Ok(mut started) => started.push((a, b)),
                Err(poisoned) => poisoned.into_inner().push((a, b)),
            }
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

#[inline]
fn to_na(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

#[inline]
fn from_na(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

/// The rigid-body world
pub struct PhysicsWorld {
    gravity: Vector<Real>,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    collector: ContactCollector,
    tags: HashMap<ColliderHandle, BodyTag>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self {
            gravity: vector![0.0, GRAVITY, 0.0],
            params: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            collector: ContactCollector::default(),
            tags: HashMap::new(),
        }
    }

    /// Advance one fixed step and return the collisions that started during it
    pub fn step(&mut self, dt: f32) -> Vec<Contact> {
        self.params.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            &self.collector,
        );

        let started = match self.collector.started.get_mut() {
            Ok(started) => std::mem::take(started),
            Err(poisoned) => std::mem::take(poisoned.into_inner()),
        };

        started
            .into_iter()
            .filter_map(|(a, b)| {
                let a = *self.tags.get(&a)?;
                let b = *self.tags.get(&b)?;
                Some(Contact { a, b })
            })
            .collect()
    }

    fn insert(&mut self, body: RigidBody, collider: Collider, tag: BodyTag) -> BodyHandle {
        let handle = self.bodies.insert(body);
        let collider = self
            .colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        self.tags.insert(collider, tag);
        handle
    }

    /// Dynamic ball with locked rotations, driven by forces
    pub fn add_player(&mut self, pos: Vec3, radius: f32) -> BodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(to_na(pos))
            .lock_rotations()
            .linear_damping(4.0)
            .build();
        let collider = ColliderBuilder::ball(radius)
            .density(1.0)
            .friction(0.0)
            .restitution(0.0)
            .collision_groups(InteractionGroups::new(
                groups::PLAYER,
                groups::WORLD | groups::PROJECTILE | groups::TURRET | groups::ROLIE,
            ))
            .build();
        self.insert(body, collider, BodyTag::Player)
    }

    /// Fixed ball; turrets never move
    pub fn add_turret(&mut self, pos: Vec3, radius: f32, id: u32) -> BodyHandle {
        let body = RigidBodyBuilder::fixed().translation(to_na(pos)).build();
        let collider = ColliderBuilder::ball(radius)
            .collision_groups(InteractionGroups::new(
                groups::TURRET,
                groups::WORLD | groups::PLAYER | groups::PROJECTILE,
            ))
            .build();
        self.insert(body, collider, BodyTag::Turret(id))
    }

    /// Kinematic ball; the rolie AI writes its position directly
    pub fn add_rolie(&mut self, pos: Vec3, radius: f32, id: u32) -> BodyHandle {
        let body = RigidBodyBuilder::kinematic_position_based()
            .translation(to_na(pos))
            .build();
        let collider = ColliderBuilder::ball(radius)
            .collision_groups(InteractionGroups::new(
                groups::ROLIE,
                groups::WORLD | groups::PLAYER | groups::PROJECTILE,
            ))
            .build();
        self.insert(body, collider, BodyTag::Rolie(id))
    }

    /// Dynamic box for obstacle piles
    pub fn add_box(&mut self, pos: Vec3, half_extent: f32) -> BodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(to_na(pos))
            .linear_damping(0.3)
            .angular_damping(0.3)
            .build();
        let collider = ColliderBuilder::cuboid(half_extent, half_extent, half_extent)
            .density(0.5)
            .friction(0.7)
            .collision_groups(InteractionGroups::new(groups::WORLD, Group::ALL))
            .build();
        self.insert(body, collider, BodyTag::Obstacle)
    }

    /// Gravity-free ball with CCD; only projectile colliders raise events
    pub fn add_projectile(&mut self, pos: Vec3, vel: Vec3, radius: f32, id: u32) -> BodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(to_na(pos))
            .linvel(to_na(vel))
            .gravity_scale(0.0)
            .ccd_enabled(true)
            .build();
        let collider = ColliderBuilder::ball(radius)
            .density(0.2)
            .restitution(0.6)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .collision_groups(InteractionGroups::new(
                groups::PROJECTILE,
                groups::WORLD | groups::PLAYER | groups::TURRET | groups::ROLIE,
            ))
            .build();
        self.insert(body, collider, BodyTag::Projectile(id))
    }

    /// Fixed cuboid for walls and floor
    pub fn add_static_cuboid(&mut self, center: Vec3, half: Vec3) -> BodyHandle {
        let body = RigidBodyBuilder::fixed().translation(to_na(center)).build();
        let collider = ColliderBuilder::cuboid(half.x, half.y, half.z)
            .friction(0.6)
            .collision_groups(InteractionGroups::new(groups::WORLD, Group::ALL))
            .build();
        self.insert(body, collider, BodyTag::World)
    }

    /// Remove a body, its colliders and their tags. Unknown handles are ignored.
    pub fn remove(&mut self, handle: BodyHandle) {
        if let Some(body) = self.bodies.get(handle) {
            for collider in body.colliders() {
                self.tags.remove(collider);
            }
        }
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Drop every body and reset solver state
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    #[cfg(test)]
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.get(handle).is_some()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn position(&self, handle: BodyHandle) -> Vec3 {
        self.bodies
            .get(handle)
            .map(|b| from_na(b.translation()))
            .unwrap_or(Vec3::ZERO)
    }

    pub fn rotation(&self, handle: BodyHandle) -> Quat {
        self.bodies
            .get(handle)
            .map(|b| {
                let q = b.rotation();
                Quat::from_xyzw(q.i, q.j, q.k, q.w)
            })
            .unwrap_or(Quat::IDENTITY)
    }

    pub fn velocity(&self, handle: BodyHandle) -> Vec3 {
        self.bodies
            .get(handle)
            .map(|b| from_na(b.linvel()))
            .unwrap_or(Vec3::ZERO)
    }

    pub fn set_velocity(&mut self, handle: BodyHandle, vel: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_linvel(to_na(vel), true);
        }
    }

    /// Replace the persistent force on a body
    pub fn set_force(&mut self, handle: BodyHandle, force: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.reset_forces(true);
            body.add_force(to_na(force), true);
        }
    }

    pub fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.apply_impulse(to_na(impulse), true);
        }
    }

    /// Target position of a kinematic body for the next step
    pub fn set_kinematic_position(&mut self, handle: BodyHandle, pos: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_next_kinematic_translation(to_na(pos));
        }
    }

    /// Move a body instantly and stop it
    pub fn teleport(&mut self, handle: BodyHandle, pos: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_translation(to_na(pos), true);
            body.set_linvel(Vector::zeros(), true);
            body.reset_forces(true);
        }
    }

    #[cfg(test)]
    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;

    fn with_floor() -> PhysicsWorld {
        let mut world = PhysicsWorld::new();
        world.add_static_cuboid(Vec3::new(0.0, -0.5, 0.0), Vec3::new(20.0, 0.5, 20.0));
        world
    }

    #[test]
    fn test_box_falls_and_rests_on_floor() {
        let mut world = with_floor();
        let b = world.add_box(Vec3::new(0.0, 3.0, 0.0), 0.5);
        for _ in 0..180 {
            world.step(SIM_DT);
        }
        let y = world.position(b).y;
        assert!(y < 3.0, "box should fall, y={y}");
        assert!(y > 0.3, "box should rest on the floor, y={y}");
    }

    #[test]
    fn test_projectile_hit_reports_tags() {
        let mut world = with_floor();
        world.add_turret(Vec3::new(0.0, 0.7, 0.0), 0.7, 7);
        world.add_projectile(Vec3::new(-3.0, 0.6, 0.0), Vec3::new(18.0, 0.0, 0.0), 0.15, 42);

        let mut hit = false;
        for _ in 0..30 {
            for contact in world.step(SIM_DT) {
                if contact.projectile_pair() == Some((42, BodyTag::Turret(7))) {
                    hit = true;
                }
            }
        }
        assert!(hit, "projectile should report a turret contact");
    }

    #[test]
    fn test_projectiles_ignore_each_other() {
        let mut world = PhysicsWorld::new();
        world.add_projectile(Vec3::new(-2.0, 1.0, 0.0), Vec3::new(10.0, 0.0, 0.0), 0.15, 1);
        world.add_projectile(Vec3::new(2.0, 1.0, 0.0), Vec3::new(-10.0, 0.0, 0.0), 0.15, 2);
        for _ in 0..40 {
            assert!(world.step(SIM_DT).is_empty());
        }
    }

    #[test]
    fn test_remove_drops_tags() {
        let mut world = PhysicsWorld::new();
        let h = world.add_rolie(Vec3::ZERO, 0.6, 3);
        assert_eq!(world.tag_count(), 1);
        world.remove(h);
        assert_eq!(world.tag_count(), 0);
        assert!(!world.contains(h));
        // Removing twice is harmless
        world.remove(h);
    }

    #[test]
    fn test_kinematic_position_applies_on_step() {
        let mut world = PhysicsWorld::new();
        let h = world.add_rolie(Vec3::ZERO, 0.6, 1);
        world.set_kinematic_position(h, Vec3::new(1.0, 0.0, 2.0));
        world.step(SIM_DT);
        let p = world.position(h);
        assert!((p.x - 1.0).abs() < 1e-4 && (p.z - 2.0).abs() < 1e-4);
    }
}
