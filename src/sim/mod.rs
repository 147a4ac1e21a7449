//! Fixed-timestep combat simulation
//!
//! All gameplay logic lives here:
//! - Fixed timestep only, with frame-level substepping in `engine`
//! - Seeded RNG only
//! - Removals deferred and applied in stable order
//! - No rendering or platform dependencies

pub mod anim;
pub mod arena;
pub mod camera;
pub mod collision;
pub mod effects;
pub mod engine;
pub mod level;
pub mod levels;
pub mod physics;
pub mod pickup;
pub mod player;
pub mod projectile;
pub mod rolie;
pub mod turret;

pub use anim::{AnimClips, AnimPhase};
pub use arena::ArenaManager;
pub use camera::{CameraIntro, CameraPose};
pub use effects::{Explosion, ExplosionKind};
pub use engine::{Control, Engine, GameEvent};
pub use level::{ArenaBounds, BoxPile, LevelDef, LevelParseError, parse_grid};
pub use levels::{LEVEL_GRIDS, builtin_levels};
pub use physics::{BodyTag, PhysicsWorld};
pub use pickup::{Pickup, PickupKind};
pub use player::{InputState, Player, TouchInput};
pub use projectile::{Faction, ShotRequest};
pub use rolie::{Rolie, RolieState};
pub use turret::Turret;
