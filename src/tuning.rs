//! Data-driven game balance
//!
//! Every gameplay constant lives here so levels can be rebalanced from a JSON
//! file without touching simulation code.

use serde::{Deserialize, Serialize};

/// Player actor balance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub max_health: i32,
    /// Force applied along the facing axis while moving
    pub move_force: f32,
    /// Horizontal speed cap (units/s)
    pub max_speed: f32,
    /// Turn rate at full input (rad/s)
    pub turn_rate: f32,
    /// Minimum seconds between shots
    pub shoot_cooldown: f32,
    /// Collision sphere radius
    pub radius: f32,
    /// Hit-react clip length (seconds)
    pub hit_clip: f32,
    /// Death clip length (seconds)
    pub death_clip: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            max_health: 10,
            move_force: 40.0,
            max_speed: 6.0,
            turn_rate: 3.2,
            shoot_cooldown: 0.25,
            radius: 0.5,
            hit_clip: 0.4,
            death_clip: 1.2,
        }
    }
}

/// Stationary turret balance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TurretTuning {
    pub max_health: i32,
    /// Seconds between shots
    pub fire_interval: f32,
    pub radius: f32,
}

impl Default for TurretTuning {
    fn default() -> Self {
        Self {
            max_health: 3,
            fire_interval: 1.6,
            radius: 0.7,
        }
    }
}

/// Rolie ("living mine") balance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RolieTuning {
    pub max_health: i32,
    /// XZ distance at which the rolie starts homing
    pub trigger_distance: f32,
    /// XZ distance at which an armed rolie detonates
    pub explode_distance: f32,
    /// Seconds after spawn before detonation is allowed
    pub arming_delay: f32,
    pub wander_speed: f32,
    pub charge_speed: f32,
    /// Base seconds between wander direction picks
    pub wander_interval: f32,
    /// Random ± spread added to the wander interval
    pub wander_jitter: f32,
    /// Physics collision radius
    pub radius: f32,
    /// Enlarged radius used for player bullet hits
    pub hit_radius: f32,
}

impl Default for RolieTuning {
    fn default() -> Self {
        Self {
            max_health: 2,
            trigger_distance: 8.0,
            explode_distance: 1.5,
            arming_delay: 1.5,
            wander_speed: 1.5,
            charge_speed: 4.5,
            wander_interval: 2.5,
            wander_jitter: 1.0,
            radius: 0.6,
            hit_radius: 1.2,
        }
    }
}

/// Bullet balance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileTuning {
    pub speed: f32,
    pub radius: f32,
    /// Seconds before a bullet expires
    pub lifetime: f32,
    /// Distance past the arena walls before a bullet is culled
    pub bounds_margin: f32,
    /// Damage dealt by player bullets before the upgrade
    pub player_damage: i32,
    /// Damage dealt by player bullets after the weapon upgrade
    pub upgraded_damage: i32,
    /// Damage dealt to the player by hostile bullets
    pub hostile_damage: i32,
    /// Spawn distance ahead of the shooter's collision surface
    pub muzzle_offset: f32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            speed: 18.0,
            radius: 0.15,
            lifetime: 2.0,
            bounds_margin: 4.0,
            player_damage: 1,
            upgraded_damage: 2,
            hostile_damage: 1,
            muzzle_offset: 0.2,
        }
    }
}

/// Explosion balance (rolie detonation and turret destruction)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplosionTuning {
    pub radius: f32,
    /// Damage at the explosion center
    pub max_damage: f32,
    /// Damage at the explosion edge
    pub min_damage: f32,
    /// Seconds the effect keeps animating
    pub duration: f32,
    /// Outward impulse applied to boxes at the center
    pub impulse: f32,
    /// Upward share added to the impulse direction
    pub upward: f32,
}

impl Default for ExplosionTuning {
    fn default() -> Self {
        Self {
            radius: 4.0,
            max_damage: 4.0,
            min_damage: 1.0,
            duration: 0.8,
            impulse: 12.0,
            upward: 0.5,
        }
    }
}

/// Pickup balance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PickupTuning {
    pub heal_amount: i32,
    pub collect_radius: f32,
    /// Chance a level spawns one health pickup
    pub health_chance: f32,
    /// Weapon upgrade chance per level index (level 0 gets this much, level 1 twice, ...)
    pub upgrade_chance_per_level: f32,
}

impl Default for PickupTuning {
    fn default() -> Self {
        Self {
            heal_amount: 3,
            collect_radius: 1.0,
            health_chance: 0.5,
            upgrade_chance_per_level: 0.25,
        }
    }
}

/// Intro camera timing and gameplay framing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraTuning {
    pub closeup_duration: f32,
    pub swoop_duration: f32,
    /// Distance in front of the player during the closeup
    pub closeup_distance: f32,
    pub closeup_height: f32,
    /// Gameplay camera offset from the player
    pub gameplay_offset: [f32; 3],
}

impl Default for CameraTuning {
    fn default() -> Self {
        Self {
            closeup_duration: 1.5,
            swoop_duration: 1.2,
            closeup_distance: 3.0,
            closeup_height: 1.4,
            gameplay_offset: [0.0, 18.0, 12.0],
        }
    }
}

/// Level grid conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaTuning {
    /// World units per grid cell
    pub cell_size: f32,
}

impl Default for ArenaTuning {
    fn default() -> Self {
        Self { cell_size: 3.0 }
    }
}

/// Complete balance sheet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub player: PlayerTuning,
    pub turret: TurretTuning,
    pub rolie: RolieTuning,
    pub projectile: ProjectileTuning,
    pub explosion: ExplosionTuning,
    pub pickup: PickupTuning,
    pub camera: CameraTuning,
    pub arena: ArenaTuning,
}

/// Errors produced while loading tuning data
#[derive(Debug)]
pub enum TuningError {
    /// JSON syntax or shape error
    Json(serde_json::Error),
    /// A value that would break the simulation
    Invalid(String),
}

impl std::fmt::Display for TuningError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TuningError::Json(e) => write!(f, "JSON error: {e}"),
            TuningError::Invalid(msg) => write!(f, "invalid tuning: {msg}"),
        }
    }
}

impl std::error::Error for TuningError {}

impl From<serde_json::Error> for TuningError {
    fn from(e: serde_json::Error) -> Self {
        TuningError::Json(e)
    }
}

impl Tuning {
    /// Parse and validate tuning JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot honour
    pub fn validate(&self) -> Result<(), TuningError> {
        fn positive(name: &str, value: f32) -> Result<(), TuningError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(TuningError::Invalid(format!("{name} must be positive, got {value}")))
            }
        }

        if self.player.max_health <= 0 {
            return Err(TuningError::Invalid("player.max_health must be positive".into()));
        }
        if self.turret.max_health <= 0 || self.rolie.max_health <= 0 {
            return Err(TuningError::Invalid("hostile max_health must be positive".into()));
        }
        positive("player.shoot_cooldown", self.player.shoot_cooldown)?;
        positive("player.radius", self.player.radius)?;
        positive("turret.fire_interval", self.turret.fire_interval)?;
        positive("rolie.explode_distance", self.rolie.explode_distance)?;
        positive("rolie.wander_interval", self.rolie.wander_interval)?;
        positive("projectile.lifetime", self.projectile.lifetime)?;
        positive("projectile.radius", self.projectile.radius)?;
        positive("explosion.radius", self.explosion.radius)?;
        positive("explosion.duration", self.explosion.duration)?;
        positive("arena.cell_size", self.arena.cell_size)?;

        if self.rolie.explode_distance >= self.rolie.trigger_distance {
            return Err(TuningError::Invalid(format!(
                "rolie.explode_distance ({}) must be below trigger_distance ({})",
                self.rolie.explode_distance, self.rolie.trigger_distance
            )));
        }
        if self.explosion.min_damage > self.explosion.max_damage {
            return Err(TuningError::Invalid(
                "explosion.min_damage exceeds max_damage".into(),
            ));
        }
        let jitter = self.rolie.wander_jitter;
        if !jitter.is_finite() || jitter < 0.0 {
            return Err(TuningError::Invalid(format!(
                "rolie.wander_jitter must be zero or positive, got {jitter}"
            )));
        }
        if jitter >= self.rolie.wander_interval {
            return Err(TuningError::Invalid(
                "rolie.wander_jitter must be below wander_interval".into(),
            ));
        }
        if !self.pickup.health_chance.is_finite()
            || !self.pickup.upgrade_chance_per_level.is_finite()
        {
            return Err(TuningError::Invalid("pickup chances must be finite".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let tuning = Tuning::from_json(r#"{ "turret": { "max_health": 5 } }"#).unwrap();
        assert_eq!(tuning.turret.max_health, 5);
        assert_eq!(tuning.turret.fire_interval, TurretTuning::default().fire_interval);
        assert_eq!(tuning.player.max_health, 10);
    }

    #[test]
    fn test_rejects_explode_beyond_trigger() {
        let json = r#"{ "rolie": { "trigger_distance": 2.0, "explode_distance": 3.0 } }"#;
        match Tuning::from_json(json) {
            Err(TuningError::Invalid(msg)) => assert!(msg.contains("explode_distance")),
            other => panic!("expected invalid tuning, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_negative_jitter() {
        match Tuning::from_json(r#"{ "rolie": { "wander_jitter": -0.5 } }"#) {
            Err(TuningError::Invalid(msg)) => assert!(msg.contains("wander_jitter")),
            other => panic!("expected invalid tuning, got {other:?}"),
        }
        let mut tuning = Tuning::default();
        tuning.rolie.wander_jitter = f32::NAN;
        assert!(tuning.validate().is_err());
        tuning.rolie.wander_jitter = 0.0;
        assert!(tuning.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_json() {
        assert!(matches!(Tuning::from_json("{ nope"), Err(TuningError::Json(_))));
    }

    #[test]
    fn test_json_round_trip_keeps_values() {
        let mut tuning = Tuning::default();
        tuning.rolie.arming_delay = 2.25;
        let json = tuning.to_json().unwrap();
        let back = Tuning::from_json(&json).unwrap();
        assert_eq!(back.rolie.arming_delay, 2.25);
    }
}
