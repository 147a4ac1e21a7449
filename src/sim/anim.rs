//! Player animation phase machine
//!
//! One authoritative phase instead of per-clip blend weights. Transient phases
//! (`Hit`) return to locomotion when their clip ends; `Wave` holds until it is
//! stopped; `Death` is terminal.

use serde::{Deserialize, Serialize};

/// Mutually exclusive animation phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnimPhase {
    #[default]
    Idle,
    Run,
    Hit,
    Wave,
    Death,
}

impl AnimPhase {
    /// Numeric id for the render mirror
    pub fn as_u32(self) -> u32 {
        match self {
            AnimPhase::Idle => 0,
            AnimPhase::Run => 1,
            AnimPhase::Hit => 2,
            AnimPhase::Wave => 3,
            AnimPhase::Death => 4,
        }
    }

    fn priority(self) -> u8 {
        match self {
            AnimPhase::Idle | AnimPhase::Run => 0,
            AnimPhase::Hit => 1,
            AnimPhase::Wave => 2,
            AnimPhase::Death => 3,
        }
    }
}

/// Requested transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimRequest {
    Locomotion { moving: bool },
    Hit,
    Wave,
    StopWave,
    Death,
}

/// Something worth telling the owner about after `update`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimEvent {
    DeathFinished,
}

/// Clip lengths; `None` means the model has no such clip
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AnimClips {
    pub hit: Option<f32>,
    pub death: Option<f32>,
}

/// Phase machine with clip timing
#[derive(Debug, Clone, Default)]
pub struct Animator {
    phase: AnimPhase,
    /// Seconds spent in the current phase
    elapsed: f32,
    clips: AnimClips,
    moving: bool,
    death_reported: bool,
}

impl Animator {
    pub fn new(clips: AnimClips) -> Self {
        Self {
            clips,
            ..Default::default()
        }
    }

    pub fn phase(&self) -> AnimPhase {
        self.phase
    }

    pub fn set_clips(&mut self, clips: AnimClips) {
        self.clips = clips;
    }

    /// Apply a transition request. Returns true if the phase changed.
    pub fn request(&mut self, req: AnimRequest) -> bool {
        let next = match (self.phase, req) {
            (AnimPhase::Death, _) => None,
            (_, AnimRequest::Death) => Some(AnimPhase::Death),

            (AnimPhase::Wave, AnimRequest::StopWave) => Some(self.locomotion()),
            (_, AnimRequest::StopWave) => None,
            (_, AnimRequest::Wave) => Some(AnimPhase::Wave),

            // Already reacting, or a higher-priority phase owns the body
            (current, AnimRequest::Hit) if current.priority() >= AnimPhase::Hit.priority() => None,
            (_, AnimRequest::Hit) => match self.clips.hit {
                Some(_) => Some(AnimPhase::Hit),
                None => None,
            },

            (current, AnimRequest::Locomotion { moving }) => {
                self.moving = moving;
                if current.priority() == 0 {
                    Some(self.locomotion())
                } else {
                    None
                }
            }
        };

        match next {
            Some(phase) if phase != self.phase => {
                self.phase = phase;
                self.elapsed = 0.0;
                true
            }
            _ => false,
        }
    }

    fn locomotion(&self) -> AnimPhase {
        if self.moving {
            AnimPhase::Run
        } else {
            AnimPhase::Idle
        }
    }

    /// Advance clip time; reports the end of the death clip exactly once
    pub fn update(&mut self, dt: f32) -> Option<AnimEvent> {
        self.elapsed += dt;
        match self.phase {
            AnimPhase::Hit => {
                let len = self.clips.hit.unwrap_or(0.0);
                if self.elapsed >= len {
                    self.phase = self.locomotion();
                    self.elapsed = 0.0;
                }
                None
            }
            AnimPhase::Death if !self.death_reported => {
                let len = self.clips.death.unwrap_or(0.0);
                if self.elapsed >= len {
                    self.death_reported = true;
                    Some(AnimEvent::DeathFinished)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// True once the death clip has completed
    #[cfg(test)]
    pub fn death_finished(&self) -> bool {
        self.death_reported
    }
}
