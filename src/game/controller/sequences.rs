// Timed sequences: what each one animates per frame and what it hands off to when done

use std::f32::consts::PI;

use bevy_ecs::prelude::Entity;
use glam::Vec3;
use rand::Rng;

use crate::engine::camera::portrait_pull;
use crate::engine::components::hex_to_rgb;
use crate::engine::tween::{Millis, ease_out_cubic, ease_out_quad};
use crate::game::audio::AudioCue;
use crate::game::factory::{
    DOG_HEAD_Y, DOG_REST_X, DOG_START, DOG_TAIL_BASE_Z, palette, spawn_big_bubble, spawn_fart_cloud,
    spawn_small_bubble,
};
use crate::game::phase::{GamePhase, PhaseEvent};
use crate::game::ui::{CursorHint, Hint};

use super::GameController;

pub const UNSCREW_MS: Millis = 800.0;
pub const OPEN_SHELL_MS: Millis = 1400.0;
pub const CUT_FLESH_MS: Millis = 600.0;
pub const LIFT_MS: Millis = 1000.0;
pub const DOG_ENTRY_MS: Millis = 1200.0;
pub const FLESH_READY_MS: Millis = 600.0;
pub const SNAP_BACK_MS: Millis = 400.0;
pub const FEED_MS: Millis = 1500.0;
pub const HAPPY_BOUNCE_MS: Millis = 1200.0;
pub const SQUAT_MS: Millis = 500.0;
pub const FART_CLOUD_MS: Millis = 1500.0;
pub const BIG_BUBBLE_MS: Millis = 1200.0;

const CHOMPS: usize = 6;
const CHOMP_SPACING_MS: Millis = 220.0;
const REVEAL_BUBBLES: usize = 15;
const BUBBLE_SPACING_MS: Millis = 80.0;

/// Where the flesh is presented to the player before feeding.
pub const FLESH_PRESENT: Vec3 = Vec3::new(0.0, 2.5, 2.0);
const LIFT_HEIGHT: f32 = 2.5;
/// Dog-local point the reveal cloud and bubbles come out of.
const DOG_BUTT: Vec3 = Vec3::new(-1.5, 0.1, 0.0);
const DOG_MOUTH_OFFSET: Vec3 = Vec3::new(1.5, 0.6, 0.0);

/// Everything a running sequence needs to know, captured when it starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SequenceKind {
    Unscrew { screw: usize, start_y: f32, start_rot: f32 },
    OpenShell,
    CutFlesh,
    Lift { from: Vec3, to: Vec3 },
    DogEntry,
    FleshReady { from: Vec3 },
    SnapBack { from: Vec3, to: Vec3 },
    Feed { from: Vec3, mouth: Vec3 },
    HappyBounce,
    Squat { start_y: f32 },
    FartCloud { entity: Entity, origin: Vec3 },
    BigBubble { entity: Entity, origin: Vec3 },
}

/// One-shot actions scheduled on the ticker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimedAction {
    Audio(AudioCue),
    SpawnBubble { origin: Vec3 },
    GrowBigBubble { origin: Vec3 },
    SettleDog { y: f32 },
    BeginSquat,
}

impl GameController {
    // ========================================================================
    // STARTERS
    // ========================================================================

    pub(super) fn unscrew(&mut self, index: usize) {
        let Some(screw) = self.rig.screws.get_mut(index) else {
            return;
        };
        if screw.removed {
            return;
        }
        screw.removed = true;
        let root = screw.root;
        log::debug!("unscrewing {} #{}", self.scene.name(root), index);
        self.screws.record_removal();
        self.audio.play(AudioCue::ScrewTap);
        self.rebuild_picks();

        let t = self.scene.transform(root).unwrap_or_default();
        self.run(
            SequenceKind::Unscrew { screw: index, start_y: t.position.y, start_rot: t.rotation.y },
            UNSCREW_MS,
            true,
        );
    }

    pub(super) fn open_shell(&mut self) {
        if !self.advance(PhaseEvent::ShellClicked) {
            return;
        }
        self.ui.hint = None;
        self.audio.play(AudioCue::ShellOpen);
        self.run(SequenceKind::OpenShell, OPEN_SHELL_MS, true);
    }

    pub(super) fn cut_flesh(&mut self) {
        if self.flags.flesh_cut {
            return;
        }
        self.flags.flesh_cut = true;
        self.flags.is_cutting = false;
        self.ui.hint = None;
        self.audio.play(AudioCue::Cut);
        self.set_blade_glow(false, false);
        self.run(SequenceKind::CutFlesh, CUT_FLESH_MS, true);
    }

    pub(super) fn lift_flesh(&mut self) {
        if self.flags.flesh_lifted {
            return;
        }
        self.flags.flesh_lifted = true;
        self.ui.hint = None;
        self.audio.play(AudioCue::Lift);

        let flesh = self.rig.flesh;
        self.scene.reparent_preserving_world_transform(flesh, None);
        self.flesh_rest = self.scene.transform(flesh).unwrap_or_default();
        let from = self.flesh_rest.position;
        let to = from + Vec3::new(0.0, LIFT_HEIGHT, 0.0);
        self.run(SequenceKind::Lift { from, to }, LIFT_MS, true);
    }

    fn bring_dog(&mut self) {
        self.scene.set_visible(self.rig.dog, true);
        self.advance(PhaseEvent::FleshRaised);
        self.audio.play(AudioCue::DogEnter);
        self.run(SequenceKind::DogEntry, DOG_ENTRY_MS, true);
    }

    pub(super) fn snap_back(&mut self) {
        if let Some(hover) = self.flesh_hover {
            let from = self.scene.position(self.rig.flesh);
            self.run(SequenceKind::SnapBack { from, to: hover }, SNAP_BACK_MS, true);
        }
    }

    pub(super) fn feed_dog(&mut self) {
        if !self.advance(PhaseEvent::FleshFed) {
            return;
        }
        self.ui.hint = None;
        for i in 0..CHOMPS {
            let at = i as Millis * CHOMP_SPACING_MS;
            self.schedule(at, TimedAction::Audio(AudioCue::Chomp), None);
        }
        self.scene.set_visible(self.rig.dog_tongue, true);

        let from = self.scene.position(self.rig.flesh);
        let mouth = self.scene.position(self.rig.dog) + DOG_MOUTH_OFFSET;
        self.run(SequenceKind::Feed { from, mouth }, FEED_MS, true);
    }

    fn happy_bounce(&mut self) {
        self.audio.play(AudioCue::HappyBark);
        self.schedule(300.0, TimedAction::Audio(AudioCue::HappyBark), None);
        self.run(SequenceKind::HappyBounce, HAPPY_BOUNCE_MS, true);
    }

    fn squat(&mut self) {
        let start_y = self.scene.position(self.rig.dog).y;
        self.run(SequenceKind::Squat { start_y }, SQUAT_MS, true);
    }

    fn reveal(&mut self, settle_y: f32) {
        if !self.advance(PhaseEvent::DogSquatted) {
            return;
        }
        let dog = self.rig.dog;
        let butt = self.scene.local_to_world(dog, DOG_BUTT);
        self.audio.play(AudioCue::Fart);

        // Little hop from the force of it
        self.scene.update_transform(dog, |t| t.position.y += 0.15);
        self.schedule(150.0, TimedAction::SettleDog { y: settle_y }, Some(GamePhase::Reveal));

        let cloud = spawn_fart_cloud(&mut self.scene, butt);
        self.run(SequenceKind::FartCloud { entity: cloud, origin: butt }, FART_CLOUD_MS, false);

        for i in 0..REVEAL_BUBBLES {
            self.schedule(
                i as Millis * BUBBLE_SPACING_MS,
                TimedAction::SpawnBubble { origin: butt },
                Some(GamePhase::Reveal),
            );
        }
        self.schedule(1000.0, TimedAction::GrowBigBubble { origin: butt }, Some(GamePhase::Reveal));
    }

    // ========================================================================
    // TIMED ACTIONS
    // ========================================================================

    pub(super) fn fire(&mut self, action: TimedAction) {
        match action {
            TimedAction::Audio(cue) => self.audio.play(cue),
            TimedAction::SpawnBubble { origin } => {
                spawn_small_bubble(&mut self.scene, &mut self.rng, origin);
                self.audio.play(AudioCue::BubblePop);
            }
            TimedAction::GrowBigBubble { origin } => {
                let entity = spawn_big_bubble(&mut self.scene, origin);
                self.big_bubble = Some(entity);
                self.run(SequenceKind::BigBubble { entity, origin }, BIG_BUBBLE_MS, false);
            }
            TimedAction::SettleDog { y } => {
                self.scene.update_transform(self.rig.dog, |t| t.position.y = y);
            }
            TimedAction::BeginSquat => self.squat(),
        }
    }

    // ========================================================================
    // FRAMES
    // ========================================================================

    pub(super) fn apply(&mut self, kind: SequenceKind, t: f32) {
        let e = ease_out_cubic(t);
        let now = self.now as f32;
        let rig = &self.rig;
        let scene = &mut self.scene;

        match kind {
            SequenceKind::Unscrew { screw, start_y, start_rot } => {
                let Some(root) = rig.screws.get(screw).map(|s| s.root) else {
                    return;
                };
                scene.update_transform(root, |tr| {
                    tr.position.y = start_y + e * 2.5;
                    tr.rotation.y = start_rot + e * PI * 6.0;
                    tr.rotation.z = e * 0.3;
                    if t > 0.6 {
                        tr.scale = Vec3::splat(1.0 - (t - 0.6) / 0.4);
                    }
                });
            }
            SequenceKind::OpenShell => {
                scene.update_transform(rig.top_pivot, |tr| tr.rotation.z = e * PI * 0.45);
                let pull = portrait_pull(self.camera.aspect());
                let eye = Vec3::new(self.camera.position.x, 5.0 - e * 1.5, 9.0 + pull - e * 2.0);
                self.camera.drive(eye, Vec3::new(0.0, -0.2 * e, 0.0));
                if t > 0.4 && !scene.is_visible(rig.flesh) {
                    scene.set_visible(rig.flesh, true);
                }
            }
            SequenceKind::CutFlesh => {
                scene.update_transform(rig.knife, |tr| {
                    if t < 0.5 {
                        let jab = t / 0.5;
                        tr.position.z = 2.0 - jab * 2.5;
                        tr.rotation.z = -0.2 - jab * 0.1;
                    } else {
                        let back = (t - 0.5) / 0.5;
                        tr.position.z = -0.5 + back * 2.5;
                        tr.rotation.z = -0.3 + back * 0.1;
                    }
                });
                let shudder = if t > 0.3 && t < 0.7 {
                    ((t - 0.3) * 50.0).sin() * 0.03 * (1.0 - (t - 0.3) / 0.4)
                } else {
                    0.0
                };
                scene.update_transform(rig.flesh, |tr| tr.position.x = shudder);
            }
            SequenceKind::Lift { from, to } => {
                let rest = self.flesh_rest.rotation;
                scene.update_transform(rig.flesh, |tr| {
                    tr.position = from.lerp(to, e);
                    tr.rotation.z = rest.z + (t * PI * 4.0).sin() * 0.05 * (1.0 - t);
                });
            }
            SequenceKind::DogEntry => {
                scene.update_transform(rig.dog, |tr| {
                    tr.position.x = DOG_START.x - e * (DOG_START.x - DOG_REST_X);
                    tr.position.y = DOG_START.y + (t * PI * 6.0).sin().abs() * 0.08;
                });
                let wag = (now * 0.015).sin() * 0.5;
                scene.update_transform(rig.dog_tail, |tr| tr.rotation.x = wag);
            }
            SequenceKind::FleshReady { from } => {
                let rest = self.flesh_rest;
                scene.update_transform(rig.flesh, |tr| {
                    tr.position = from.lerp(FLESH_PRESENT, e);
                    tr.scale = rest.scale * (1.0 - e * 0.2);
                    tr.rotation.z = rest.rotation.z + (t * PI * 3.0).sin() * 0.04;
                });
            }
            SequenceKind::SnapBack { from, to } => {
                scene.update_transform(rig.flesh, |tr| tr.position = from.lerp(to, e));
            }
            SequenceKind::Feed { from, mouth } => {
                let rest_scale = self.flesh_rest.scale;
                scene.update_transform(rig.flesh, |tr| {
                    tr.position = from.lerp(mouth, e);
                    tr.scale = rest_scale * (1.0 - e) * 0.7;
                });
                scene.update_transform(rig.dog_head, |tr| {
                    tr.position.y = DOG_HEAD_Y + (t * PI * 8.0).sin() * 0.05;
                });
                scene.update_transform(rig.dog_tail, |tr| tr.rotation.x = (now * 0.03).sin() * 0.7);
                scene.update_transform(rig.dog_tongue, |tr| {
                    tr.rotation.z = 0.5 + (now * 0.02).sin() * 0.3;
                });
            }
            SequenceKind::HappyBounce => {
                scene.update_transform(rig.dog, |tr| {
                    tr.position.y = DOG_START.y + (t * PI * 4.0).sin().abs() * 0.2 * (1.0 - t);
                });
                scene.update_transform(rig.dog_tail, |tr| tr.rotation.x = (now * 0.04).sin() * 0.8);
            }
            SequenceKind::Squat { start_y } => {
                let dip = (t * PI).sin();
                scene.update_transform(rig.dog, |tr| {
                    tr.rotation.x = dip * 0.15;
                    tr.position.y = start_y - dip * 0.12;
                });
                scene.update_transform(rig.dog_tail, |tr| {
                    tr.rotation.z = DOG_TAIL_BASE_Z + t * 0.6;
                    tr.rotation.x = (now * 0.05).sin() * 0.3;
                });
            }
            SequenceKind::FartCloud { entity, origin } => {
                let e = ease_out_quad(t);
                let s = (0.3 + e * 2.0) * 0.3;
                scene.update_transform(entity, |tr| {
                    tr.scale = Vec3::new(s, s * 0.7, s);
                    tr.position.y = origin.y + e * 0.5;
                });
                scene.update_material(entity, |m| m.opacity = 0.5 * (1.0 - t));
            }
            SequenceKind::BigBubble { entity, origin } => {
                scene.update_transform(entity, |tr| {
                    tr.scale = Vec3::splat(0.01 + e * 1.8);
                    tr.position.y = origin.y + 0.3 + e * 1.5;
                });
                scene.update_material(entity, |m| m.opacity = e * 0.35);
            }
        }
    }

    // ========================================================================
    // COMPLETION
    // ========================================================================

    pub(super) fn finish(&mut self, kind: SequenceKind) {
        match kind {
            SequenceKind::Unscrew { screw, .. } => {
                if let Some(root) = self.rig.screws.get(screw).map(|s| s.root) {
                    self.scene.detach(root);
                }
                self.audio.play(AudioCue::ScrewOut);
                if self.screws.is_complete() && self.advance(PhaseEvent::ScrewsCleared) {
                    self.ui.hint = Some(Hint::Knife);
                    self.ui.sidebar_visible = true;
                    self.audio.play(AudioCue::AllScrewsDone);
                }
            }
            SequenceKind::OpenShell => {
                if self.advance(PhaseEvent::HingeOpened) {
                    self.ui.hint = Some(Hint::Cut);
                }
            }
            SequenceKind::CutFlesh => {
                self.scene.update_transform(self.rig.knife, |tr| tr.position.z = 2.0);
                self.scene.update_transform(self.rig.flesh, |tr| tr.position.x = 0.0);
                self.advance(PhaseEvent::FleshCut);
                self.scene.set_visible(self.rig.knife, false);
                self.flags.knife_selected = false;
                self.ui.knife_selected = false;
                self.ui.sidebar_visible = false;
                self.ui.cursor = CursorHint::Default;
                self.ui.hint = Some(Hint::Lift);
            }
            SequenceKind::Lift { .. } => self.bring_dog(),
            SequenceKind::DogEntry => {
                self.ui.hint = Some(Hint::Feed);
                let from = self.scene.position(self.rig.flesh);
                self.run(SequenceKind::FleshReady { from }, FLESH_READY_MS, true);
            }
            SequenceKind::FleshReady { .. } => {
                self.flesh_hover = Some(self.scene.position(self.rig.flesh));
            }
            SequenceKind::SnapBack { .. } => {}
            SequenceKind::Feed { .. } => {
                self.scene.set_visible(self.rig.flesh, false);
                self.happy_bounce();
            }
            SequenceKind::HappyBounce => {
                self.scene.set_visible(self.rig.dog_tongue, false);
                self.schedule(400.0, TimedAction::BeginSquat, Some(GamePhase::Eating));
            }
            SequenceKind::Squat { start_y } => {
                self.scene.update_transform(self.rig.dog, |tr| {
                    tr.rotation.x = 0.0;
                    tr.position.y = start_y;
                });
                let tail = self.rig.dog_tail;
                self.scene.update_transform(tail, |tr| tr.rotation.z = DOG_TAIL_BASE_Z);
                self.reveal(start_y);
            }
            SequenceKind::FartCloud { entity, .. } => self.scene.despawn_recursive(entity),
            SequenceKind::BigBubble { .. } => {
                self.ui.overlay_visible = true;
                self.audio.play(AudioCue::RevealChime);
            }
        }
    }

    // ========================================================================
    // KNIFE FEEDBACK
    // ========================================================================

    /// Blade glow while the knife hovers over (and saws into) the meat.
    pub(super) fn set_blade_glow(&mut self, over: bool, cutting: bool) {
        let (hex, intensity) = match (over, cutting) {
            (true, true) => (0xff2244, 0.6),
            (true, false) => (0xff4466, 0.3),
            _ => (palette::BLADE, 0.0),
        };
        for &metal in &self.rig.knife_metal {
            self.scene.update_material(metal, |m| {
                m.emissive = hex_to_rgb(hex);
                m.emissive_intensity = intensity;
            });
        }
    }

    /// Small random jolt for the knife and flesh on every counted saw stroke.
    pub(super) fn saw_jitter(&mut self, progress: f32) {
        let dx = self.rng.gen_range(-0.015..0.015);
        let dy = self.rng.gen_range(-0.01..0.01);
        self.scene.update_transform(self.rig.knife, |tr| {
            tr.position.x += dx;
            tr.position.y += dy;
        });
        let shake = self.rng.gen_range(-0.01..0.01) * progress;
        self.scene.update_transform(self.rig.flesh, |tr| tr.position.x = shake);
        if self.rng.gen_bool(0.08) {
            self.audio.play(AudioCue::Cut);
        }
    }
}
