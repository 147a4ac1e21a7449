//! The Mask - top-down arena shooter simulation core
//!
//! Core modules:
//! - `sim`: Fixed-timestep simulation (physics, actors, AI, collisions, levels)
//! - `render`: One-way visual mirror handed to whatever draws the frame
//! - `platform`: Browser host binding
//! - `tuning`: Data-driven game balance

pub mod platform;
pub mod render;
pub mod sim;
pub mod tuning;

pub use render::{RenderSnapshot, VisualInstance};
pub use tuning::{Tuning, TuningError};

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    /// Fixed physics timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum physics substeps per rendered frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 5;
    /// Rendered-frame delta clamp (tab backgrounding, debugger pauses)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Height at which projectiles travel
    pub const SHOT_HEIGHT: f32 = 0.6;
    /// Gravity along Y
    pub const GRAVITY: f32 = -9.81;
    /// Edge length of one obstacle box
    pub const BOX_SIZE: f32 = 1.0;
    /// Arena wall thickness and height
    pub const WALL_THICKNESS: f32 = 1.0;
    pub const WALL_HEIGHT: f32 = 3.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Unit direction on the XZ plane for a facing angle (0 faces +Z)
#[inline]
pub fn facing_dir(angle: f32) -> Vec3 {
    Vec3::new(angle.sin(), 0.0, angle.cos())
}

/// Facing angle pointing along an XZ direction
#[inline]
pub fn facing_angle(dx: f32, dz: f32) -> f32 {
    dx.atan2(dz)
}

/// Euclidean distance ignoring height
#[inline]
pub fn xz_distance(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    (dx * dx + dz * dz).sqrt()
}

/// Smootherstep easing (6t^5 - 15t^4 + 10t^3), input clamped to [0, 1]
#[inline]
pub fn smootherstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}
