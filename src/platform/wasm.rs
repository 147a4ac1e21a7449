//! Browser host binding
//!
//! The page owns the animation loop, input devices and rendering. It calls
//! `frame` once per `requestAnimationFrame`, then reads `instances()` and
//! `events_json()` to draw and drive the HUD.

use wasm_bindgen::prelude::*;

use crate::render::{ModelKind, VisualInstance};
use crate::sim::anim::AnimClips;
use crate::sim::engine::{Control, Engine};
use crate::sim::player::{InputState, TouchInput};
use crate::tuning::Tuning;

#[wasm_bindgen]
pub struct MaskGame {
    engine: Engine,
}

#[wasm_bindgen]
impl MaskGame {
    /// New run over the built-in levels. `tuning_json` may override balance.
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64, tuning_json: Option<String>) -> Result<MaskGame, JsValue> {
        super::init_logging();

        let tuning = match tuning_json {
            Some(json) => Tuning::from_json(&json).map_err(|e| JsValue::from_str(&e.to_string()))?,
            None => Tuning::default(),
        };
        let engine = Engine::new(tuning, seed).map_err(|e| JsValue::from_str(&e.to_string()))?;
        log::info!("The Mask started with seed {seed}");
        Ok(MaskGame { engine })
    }

    /// Keyboard frame. `dt` in seconds. Returns false once disposed.
    pub fn frame(
        &mut self,
        dt: f32,
        up: bool,
        down: bool,
        left: bool,
        right: bool,
        shoot: bool,
    ) -> bool {
        let control = Control::Keyboard(InputState {
            up,
            down,
            left,
            right,
            shoot,
        });
        self.engine.frame(dt, &control)
    }

    /// Twin-stick frame from the virtual joysticks
    pub fn frame_touch(
        &mut self,
        dt: f32,
        move_x: f32,
        move_z: f32,
        aim_x: f32,
        aim_z: f32,
        shoot: bool,
    ) -> bool {
        let control = Control::Touch(TouchInput {
            move_x,
            move_z,
            aim_x,
            aim_z,
            shoot,
        });
        self.engine.frame(dt, &control)
    }

    /// Mouse-aimed shot
    pub fn shoot_at(&mut self, dir_x: f32, dir_z: f32) -> bool {
        self.engine.shoot_in_direction(dir_x, dir_z)
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.engine.set_paused(paused);
    }

    pub fn dispose(&mut self) {
        self.engine.dispose();
    }

    pub fn restart(&mut self) {
        self.engine.restart();
    }

    /// Events since the last call, as a JSON array
    pub fn events_json(&mut self) -> String {
        let events = self.engine.drain_events();
        match serde_json::to_string(&events) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("failed to serialize events: {e}");
                "[]".to_string()
            }
        }
    }

    /// Flat instance buffer, `instance_stride()` floats per instance
    pub fn instances(&self) -> js_sys::Float32Array {
        let snapshot = self.engine.snapshot();
        js_sys::Float32Array::from(snapshot.as_floats())
    }

    pub fn instance_stride(&self) -> usize {
        VisualInstance::FLOATS
    }

    /// Camera position then look-at, six floats
    pub fn camera(&self) -> Vec<f32> {
        let pose = self.engine.snapshot().camera;
        let mut out = pose.position.to_array().to_vec();
        out.extend_from_slice(&pose.look_at.to_array());
        out
    }

    pub fn health(&self) -> i32 {
        self.engine.health()
    }

    pub fn max_health(&self) -> i32 {
        self.engine.max_health()
    }

    pub fn level_index(&self) -> usize {
        self.engine.level_index()
    }

    /// A model finished loading. Unknown kinds are ignored.
    pub fn model_loaded(&mut self, kind: u32, hit_clip: Option<f32>, death_clip: Option<f32>) {
        match ModelKind::from_u32(kind) {
            Some(kind) => self.engine.model_loaded(
                kind,
                AnimClips {
                    hit: hit_clip,
                    death: death_clip,
                },
            ),
            None => log::warn!("model_loaded: unknown model kind {kind}"),
        }
    }

    pub fn model_failed(&mut self, kind: u32, reason: &str) {
        match ModelKind::from_u32(kind) {
            Some(kind) => self.engine.model_failed(kind, reason),
            None => log::warn!("model_failed: unknown model kind {kind}"),
        }
    }
}
