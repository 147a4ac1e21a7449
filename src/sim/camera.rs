//! Level intro camera
//!
//! Closeup (held, in front of the player) then a smootherstep swoop out to the
//! gameplay framing. Player input is ignored while either phase runs.

use glam::Vec3;

use crate::tuning::CameraTuning;
use crate::{facing_dir, smootherstep};

/// Height of the point the camera looks at above the player's center
const LOOK_HEIGHT: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub look_at: Vec3,
}

impl CameraPose {
    pub fn lerp(&self, other: &CameraPose, t: f32) -> CameraPose {
        CameraPose {
            position: self.position.lerp(other.position, t),
            look_at: self.look_at.lerp(other.look_at, t),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum IntroPhase {
    Closeup { elapsed: f32 },
    Swoop { elapsed: f32, from: CameraPose },
}

#[derive(Debug, Clone)]
pub struct CameraIntro {
    /// `None` once the intro is done
    phase: Option<IntroPhase>,
    tuning: CameraTuning,
}

impl CameraIntro {
    pub fn new(tuning: &CameraTuning) -> Self {
        Self {
            phase: None,
            tuning: tuning.clone(),
        }
    }

    /// Restart from the closeup
    pub fn start(&mut self) {
        self.phase = Some(IntroPhase::Closeup { elapsed: 0.0 });
    }

    pub fn is_active(&self) -> bool {
        self.phase.is_some()
    }

    #[cfg(test)]
    pub fn is_closeup(&self) -> bool {
        matches!(self.phase, Some(IntroPhase::Closeup { .. }))
    }

    pub fn gameplay_pose(&self, player_pos: Vec3) -> CameraPose {
        CameraPose {
            position: player_pos + Vec3::from_array(self.tuning.gameplay_offset),
            look_at: player_pos,
        }
    }

    pub fn closeup_pose(&self, player_pos: Vec3, facing: f32) -> CameraPose {
        CameraPose {
            position: player_pos
                + facing_dir(facing) * self.tuning.closeup_distance
                + Vec3::Y * self.tuning.closeup_height,
            look_at: player_pos + Vec3::Y * LOOK_HEIGHT,
        }
    }

    /// Advance the intro. Returns the pose to render and whether the intro just finished.
    pub fn update(&mut self, dt: f32, player_pos: Vec3, facing: f32) -> (CameraPose, bool) {
        match self.phase {
            None => (self.gameplay_pose(player_pos), false),
            Some(IntroPhase::Closeup { elapsed }) => {
                let elapsed = elapsed + dt;
                let pose = self.closeup_pose(player_pos, facing);
                if elapsed >= self.tuning.closeup_duration {
                    self.phase = Some(IntroPhase::Swoop {
                        elapsed: 0.0,
                        from: pose,
                    });
                } else {
                    self.phase = Some(IntroPhase::Closeup { elapsed });
                }
                (pose, false)
            }
            Some(IntroPhase::Swoop { elapsed, from }) => {
                let elapsed = elapsed + dt;
                let target = self.gameplay_pose(player_pos);
                if elapsed >= self.tuning.swoop_duration {
                    self.phase = None;
                    log::debug!("camera intro finished");
                    return (target, true);
                }
                self.phase = Some(IntroPhase::Swoop { elapsed, from });
                let t = smootherstep(elapsed / self.tuning.swoop_duration);
                (from.lerp(&target, t), false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intro_sequence() {
        let tuning = CameraTuning::default();
        let mut cam = CameraIntro::new(&tuning);
        let player = Vec3::new(1.0, 0.5, 2.0);
        assert!(!cam.is_active());

        cam.start();
        assert!(cam.is_closeup());
        let (pose, done) = cam.update(0.1, player, 0.0);
        assert!(!done);
        assert_eq!(pose, cam.closeup_pose(player, 0.0));

        // Hold until the closeup duration elapses
        let mut t = 0.1;
        while cam.is_closeup() {
            cam.update(0.1, player, 0.0);
            t += 0.1;
        }
        assert!(t >= tuning.closeup_duration - 1e-3);

        // Swoop ends at the gameplay pose
        let mut finished = false;
        for _ in 0..100 {
            let (pose, done) = cam.update(0.05, player, 0.0);
            if done {
                assert_eq!(pose, cam.gameplay_pose(player));
                finished = true;
                break;
            }
        }
        assert!(finished);
        assert!(!cam.is_active());
        // Finished is reported once
        assert!(!cam.update(0.05, player, 0.0).1);
    }

    #[test]
    fn test_swoop_moves_monotonically_toward_target() {
        let tuning = CameraTuning {
            closeup_duration: 0.0,
            ..Default::default()
        };
        let mut cam = CameraIntro::new(&tuning);
        cam.start();
        let player = Vec3::ZERO;
        cam.update(0.0, player, 0.0);
        let target = cam.gameplay_pose(player).position;
        let mut last = f32::MAX;
        for _ in 0..10 {
            let (pose, done) = cam.update(0.1, player, 0.0);
            let d = pose.position.distance(target);
            assert!(d <= last + 1e-5);
            last = d;
            if done {
                break;
            }
        }
    }
}
