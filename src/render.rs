//! One-way visual mirror
//!
//! The simulation never reads anything back from here. Each frame the engine
//! flattens bodies into `VisualInstance` records that a renderer can upload
//! as-is.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::sim::anim::AnimClips;
use crate::sim::camera::CameraPose;

/// Which model a visual instance uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ModelKind {
    Player = 0,
    Turret = 1,
    Rolie = 2,
    Box = 3,
    Projectile = 4,
    Pickup = 5,
    Explosion = 6,
}

impl ModelKind {
    pub const COUNT: usize = 7;

    pub const ALL: [ModelKind; Self::COUNT] = [
        ModelKind::Player,
        ModelKind::Turret,
        ModelKind::Rolie,
        ModelKind::Box,
        ModelKind::Projectile,
        ModelKind::Pickup,
        ModelKind::Explosion,
    ];

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn from_u32(value: u32) -> Option<ModelKind> {
        Self::ALL.get(value as usize).copied()
    }
}

/// GPU-friendly per-instance record
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct VisualInstance {
    pub position: [f32; 3],
    pub scale: f32,
    /// Quaternion (x, y, z, w)
    pub rotation: [f32; 4],
    /// `ModelKind` discriminant
    pub kind: u32,
    /// Animation phase for actors, variant for pickups/explosions/bullets
    pub state: u32,
    /// 1 while the real model has not loaded
    pub placeholder: u32,
    pub _pad: u32,
}

impl VisualInstance {
    /// Number of f32 lanes per instance when viewed as a flat float array
    pub const FLOATS: usize = std::mem::size_of::<VisualInstance>() / 4;

    pub fn new(kind: ModelKind, position: Vec3, rotation: glam::Quat, scale: f32) -> Self {
        Self {
            position: position.to_array(),
            scale,
            rotation: rotation.to_array(),
            kind: kind.as_u32(),
            state: 0,
            placeholder: 0,
            _pad: 0,
        }
    }

    pub fn with_state(mut self, state: u32) -> Self {
        self.state = state;
        self
    }
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone)]
pub struct RenderSnapshot {
    pub camera: CameraPose,
    pub instances: Vec<VisualInstance>,
}

impl RenderSnapshot {
    /// Flat float view for hosts that want a typed array
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.instances)
    }
}

/// Load status of one model kind
#[derive(Debug, Clone, PartialEq)]
pub enum ModelStatus {
    Placeholder,
    Loaded { clips: AnimClips },
    Failed { reason: String },
}

/// Tracks which models have arrived. Models load asynchronously and may land
/// after the actors using them already exist.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    status: [ModelStatus; ModelKind::COUNT],
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self {
            status: std::array::from_fn(|_| ModelStatus::Placeholder),
        }
    }
}

impl ModelRegistry {
    pub fn status(&self, kind: ModelKind) -> &ModelStatus {
        &self.status[kind as usize]
    }

    pub fn is_placeholder(&self, kind: ModelKind) -> bool {
        !matches!(self.status(kind), ModelStatus::Loaded { .. })
    }

    pub fn mark_loaded(&mut self, kind: ModelKind, clips: AnimClips) {
        self.status[kind as usize] = ModelStatus::Loaded { clips };
    }

    /// A failure never replaces a model that already loaded
    pub fn mark_failed(&mut self, kind: ModelKind, reason: &str) {
        if !matches!(self.status(kind), ModelStatus::Loaded { .. }) {
            self.status[kind as usize] = ModelStatus::Failed {
                reason: reason.to_string(),
            };
        }
    }

    /// Stamp placeholder flags onto instances
    pub fn apply(&self, instances: &mut [VisualInstance]) {
        for inst in instances {
            let kind = ModelKind::from_u32(inst.kind);
            inst.placeholder = kind.is_some_and(|k| self.is_placeholder(k)) as u32;
        }
    }
}
