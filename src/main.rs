//! The Mask entry point
//!
//! Native builds run a scripted headless session and log every game event.
//! The browser build is driven by `platform::wasm::MaskGame` from the page.
//!
//! Usage: `the-mask [tuning.json] [seed]`

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use glam::Vec3;
    use the_mask::consts::SIM_DT;
    use the_mask::sim::{Control, Engine, GameEvent, TouchInput};
    use the_mask::{Tuning, TuningError};

    /// Simulated seconds before the session gives up
    const SESSION_SECONDS: f32 = 300.0;
    /// Distance the autopilot keeps from turrets
    const STANDOFF: f32 = 6.0;
    /// Rolies closer than this make the autopilot back off
    const PANIC_RANGE: f32 = 4.0;

    pub fn load_tuning(path: &str) -> Result<Tuning, TuningError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| TuningError::Invalid(format!("cannot read {path}: {e}")))?;
        Tuning::from_json(&json)
    }

    /// Twin-stick autopilot: aim at the nearest hostile, close in on turrets,
    /// back away from rolies
    fn autopilot(engine: &Engine) -> Control {
        let me = engine.player_position();
        let arena = engine.arena();

        let nearest = arena
            .turrets
            .iter()
            .map(|t| t.position)
            .chain(arena.rolies.iter().map(|r| r.position))
            .min_by(|a, b| {
                a.distance_squared(me)
                    .partial_cmp(&b.distance_squared(me))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        let Some(target) = nearest else {
            return Control::default();
        };

        let to_target = Vec3::new(target.x - me.x, 0.0, target.z - me.z);
        let threat = arena
            .rolies
            .iter()
            .map(|r| Vec3::new(me.x - r.position.x, 0.0, me.z - r.position.z))
            .find(|away| away.length() < PANIC_RANGE);

        let movement = match threat {
            Some(away) => away.normalize_or_zero(),
            None if to_target.length() > STANDOFF => to_target.normalize_or_zero(),
            None => Vec3::ZERO,
        };

        Control::Touch(TouchInput {
            move_x: movement.x,
            move_z: movement.z,
            aim_x: to_target.x,
            aim_z: to_target.z,
            shoot: true,
        })
    }

    pub fn run(tuning: Tuning, seed: u64) {
        let mut engine = match Engine::new(tuning, seed) {
            Ok(engine) => engine,
            Err(e) => {
                log::error!("built-in levels failed to parse: {e}");
                std::process::exit(1);
            }
        };
        log::info!(
            "headless session: {} levels, seed {seed}",
            engine.level_count()
        );

        let frames = (SESSION_SECONDS / SIM_DT) as u32;
        let mut shots = 0u32;
        for _ in 0..frames {
            let control = autopilot(&engine);
            engine.frame(SIM_DT, &control);

            let mut finished = false;
            for event in engine.drain_events() {
                match event {
                    GameEvent::PlayerShot | GameEvent::TurretShot => shots += 1,
                    GameEvent::GameOver | GameEvent::Victory => {
                        log::info!("{event:?}");
                        finished = true;
                    }
                    other => log::info!("{other:?}"),
                }
            }
            if finished {
                break;
            }
        }

        println!(
            "t={:.1}s level={}/{} health={}/{} shots={} victory={} game_over={}",
            engine.time(),
            engine.level_index() + 1,
            engine.level_count(),
            engine.health(),
            engine.max_health(),
            shots,
            engine.is_victory(),
            engine.is_game_over()
        );
        engine.dispose();
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    the_mask::platform::init_logging();
    log::info!("The Mask (native) starting...");

    let mut args = std::env::args().skip(1);
    let tuning = match args.next() {
        Some(path) => match headless::load_tuning(&path) {
            Ok(tuning) => {
                log::info!("tuning loaded from {path}");
                tuning
            }
            Err(e) => {
                log::error!("{e}");
                std::process::exit(1);
            }
        },
        None => the_mask::Tuning::default(),
    };
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(1);

    headless::run(tuning, seed);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The page constructs `MaskGame` itself; nothing to do here
}
