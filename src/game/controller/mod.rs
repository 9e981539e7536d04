// Phase controller
//
// Owns the scene, the rig handles, the camera and every piece of interaction state.
// All mutation funnels through here: the window loop feeds it gestures and clock
// ticks, the HUD reads `UiState` back out.

mod handlers;
mod idle;
mod sequences;
#[cfg(test)]
mod tests;

use bevy_ecs::prelude::Entity;
use glam::{Vec2, Vec3};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::GameConfig;
use crate::engine::camera::PhaseCamera;
use crate::engine::components::Transform;
use crate::engine::input::{Gesture, screen_to_ndc};
use crate::engine::scene::{Ray, Scene};
use crate::engine::tween::{Millis, Ticker};

use super::audio::AudioSink;
use super::factory::{OYSTER_YAW, OysterRig, build_rig};
use super::phase::{Flags, GamePhase, PhaseEvent};
use super::progress::{CutMeter, ScrewCounter};
use super::ui::{Hint, UiState};

pub use sequences::{SequenceKind, TimedAction};

/// One reference frame at 60 Hz. Idle motion constants are tuned per reference frame.
pub const FRAME_MS: Millis = 1000.0 / 60.0;
/// Upper bound on frames folded into one tick, so a stalled window doesn't fling things.
const MAX_FRAMES: f32 = 10.0;

/// Hit-test candidates for the current phase. Rebuilt on phase change and screw removal.
#[derive(Debug, Default)]
struct PickIndex {
    /// Mesh entity and the index of the screw it belongs to.
    screws: Vec<(Entity, usize)>,
    shell: Vec<Entity>,
    meat: Vec<Entity>,
    flesh: Vec<Entity>,
    dog: Vec<Entity>,
}

impl PickIndex {
    fn rebuild(&mut self, scene: &Scene, rig: &OysterRig, phase: GamePhase) {
        *self = PickIndex::default();
        match phase {
            GamePhase::Screws => {
                for screw in rig.screws.iter().filter(|s| !s.removed) {
                    for mesh in scene.mesh_descendants(screw.root, &[]) {
                        self.screws.push((mesh, screw.index));
                    }
                }
            }
            GamePhase::Knife => {
                let mut exclude = rig.screw_roots();
                exclude.push(rig.flesh);
                self.shell = scene.mesh_descendants(rig.oyster, &exclude);
            }
            GamePhase::Cut => self.meat = vec![rig.flesh_blob, rig.adductor],
            GamePhase::Lift => self.flesh = scene.mesh_descendants(rig.flesh, &[]),
            GamePhase::Feed => {
                self.flesh = scene.mesh_descendants(rig.flesh, &[]);
                self.dog = scene.mesh_descendants(rig.dog, &[]);
            }
            GamePhase::Opening | GamePhase::Eating | GamePhase::Reveal => {}
        }
    }

    fn screw_meshes(&self) -> Vec<Entity> {
        self.screws.iter().map(|(e, _)| *e).collect()
    }

    fn screw_of(&self, mesh: Entity) -> Option<usize> {
        self.screws.iter().find(|(e, _)| *e == mesh).map(|(_, i)| *i)
    }
}

pub struct GameController {
    scene: Scene,
    rig: OysterRig,
    camera: PhaseCamera,
    phase: GamePhase,
    flags: Flags,
    screws: ScrewCounter,
    cut: CutMeter,
    ticker: Ticker<SequenceKind, TimedAction>,
    picks: PickIndex,
    ui: UiState,
    audio: Box<dyn AudioSink>,
    rng: StdRng,
    viewport: Vec2,
    now: Millis,
    last_frame: Option<Millis>,

    // Screws-phase yaw drag
    drag_start_x: f32,
    drag_start_rot: f32,
    rotation_velocity: f32,
    target_rot_y: f32,

    last_saw_pos: Option<Vec2>,

    /// Flesh transform right after it left the shell; later motion is relative to it.
    flesh_rest: Transform,
    /// Where the flesh floats while waiting to be fed. Set once it is presented.
    flesh_hover: Option<Vec3>,

    pinch_start_distance: f32,
    pinch_start_zoom: f32,

    big_bubble: Option<Entity>,
}

impl GameController {
    pub fn new(config: &GameConfig, audio: Box<dyn AudioSink>, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut scene = Scene::new();
        let rig = build_rig(&mut scene, &mut rng);

        let mut camera = PhaseCamera::new();
        config.camera.apply(&mut camera);
        let viewport = Vec2::new(config.window.width as f32, config.window.height as f32);
        camera.set_aspect(viewport.x / viewport.y);

        let mut controller = Self {
            scene,
            rig,
            camera,
            phase: GamePhase::Screws,
            flags: Flags::default(),
            screws: ScrewCounter::default(),
            cut: CutMeter::default(),
            ticker: Ticker::new(),
            picks: PickIndex::default(),
            ui: UiState::default(),
            audio,
            rng,
            viewport,
            now: 0.0,
            last_frame: None,
            drag_start_x: 0.0,
            drag_start_rot: OYSTER_YAW,
            rotation_velocity: 0.0,
            target_rot_y: OYSTER_YAW,
            last_saw_pos: None,
            flesh_rest: Transform::default(),
            flesh_hover: None,
            pinch_start_distance: 0.0,
            pinch_start_zoom: 1.0,
            big_bubble: None,
        };
        controller.frame_camera();
        controller.camera.snap_to_targets();
        controller.rebuild_picks();
        controller
    }

    /// Dismiss the title card and hand control to the player.
    pub fn start(&mut self) {
        if self.ui.started {
            return;
        }
        self.ui.started = true;
        self.ui.hint = Some(Hint::Screws);
        log::info!("game started");
    }

    // ------------------------------------------------------------------------
    // Frame loop
    // ------------------------------------------------------------------------

    /// Advance the world to `now`: idle effects, due timers and sequence frames,
    /// then the camera follow.
    pub fn tick(&mut self, now: Millis) {
        let frames = match self.last_frame {
            Some(prev) => ((now - prev) / FRAME_MS).clamp(0.0, MAX_FRAMES as f64) as f32,
            None => 1.0,
        };
        self.last_frame = Some(now);
        self.now = now;

        idle::update(self, now, frames);

        let step = self.ticker.step(now);
        for action in step.fired {
            self.fire(action);
        }
        for (kind, t) in step.frames {
            self.apply(kind, t);
        }
        for kind in step.completed {
            self.finish(kind);
        }
        self.flags.animating = self.ticker.has_blocking();

        if self.phase != GamePhase::Opening {
            self.camera.follow(frames);
        }
    }

    /// Apply a phase event. Returns false, and changes nothing, if it is illegal here.
    pub fn advance(&mut self, event: PhaseEvent) -> bool {
        let next = self.phase.next(event);
        if next == self.phase {
            log::warn!("ignored {:?} in phase {}", event, self.phase.label());
            return false;
        }
        let dropped = self.ticker.cancel_batch(self.phase.batch());
        if dropped > 0 {
            log::debug!("dropped {} timers owned by {}", dropped, self.phase.label());
        }
        log::info!("phase {} -> {}", self.phase.label(), next.label());
        self.phase = next;
        self.rebuild_picks();
        self.frame_camera();
        true
    }

    pub fn on_resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.viewport = Vec2::new(width as f32, height as f32);
        self.camera.set_aspect(self.viewport.x / self.viewport.y);
        self.frame_camera();
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    pub fn handle_gesture(&mut self, gesture: Gesture) {
        match gesture {
            Gesture::PointerDown { position } => self.handle_pointer_down(position),
            Gesture::PointerMove { position } => self.handle_pointer_move(position),
            Gesture::PointerUp { position } => self.handle_pointer_up(position),
            Gesture::PinchStart { distance } => {
                self.flags.is_pinching = true;
                self.pinch_start_distance = distance;
                self.pinch_start_zoom = self.camera.zoom();
            }
            Gesture::PinchMove { distance } => {
                if self.flags.is_pinching && self.pinch_start_distance > 0.0 {
                    self.camera
                        .set_zoom(self.pinch_start_zoom * distance / self.pinch_start_distance);
                }
            }
            Gesture::PinchEnd => self.flags.is_pinching = false,
            Gesture::Wheel { delta_y } => self.handle_wheel(delta_y),
        }
    }

    pub fn handle_wheel(&mut self, delta_y: f32) {
        self.camera.zoom_wheel(delta_y);
    }

    /// Sidebar knife button. Only honoured while the knife is useful.
    pub fn select_knife(&mut self) -> bool {
        if !self.phase.accepts_knife() || self.flags.knife_selected {
            return false;
        }
        self.flags.knife_selected = true;
        self.ui.knife_selected = true;
        self.scene.set_visible(self.rig.knife, true);
        self.audio.play(super::audio::AudioCue::KnifeSelect);
        true
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    #[cfg(test)]
    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn camera(&self) -> &PhaseCamera {
        &self.camera
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    #[cfg(test)]
    pub fn rig(&self) -> &OysterRig {
        &self.rig
    }

    pub fn screws_removed(&self) -> usize {
        self.screws.removed()
    }

    #[cfg(test)]
    pub fn cut_progress(&self) -> f32 {
        self.cut.progress()
    }

    #[cfg(test)]
    pub fn flesh_hover(&self) -> Option<Vec3> {
        self.flesh_hover
    }

    pub fn running_sequences(&self) -> usize {
        self.ticker.active().count()
    }

    /// Scheduled one-shots still waiting to fire.
    pub fn pending_timers(&self) -> usize {
        self.ticker.pending_events()
    }

    #[cfg(test)]
    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    // ------------------------------------------------------------------------
    // Internals shared by the submodules
    // ------------------------------------------------------------------------

    fn frame_camera(&mut self) {
        if let Some((eye, look)) = self.phase.framing(self.camera.aspect()) {
            self.camera.set_framing(eye, look);
        }
    }

    fn rebuild_picks(&mut self) {
        self.picks.rebuild(&self.scene, &self.rig, self.phase);
    }

    fn pointer_ray(&self, position: Vec2) -> Ray {
        self.camera.ray_from_ndc(screen_to_ndc(position, self.viewport))
    }

    fn hits_any(&self, ray: &Ray, candidates: &[Entity]) -> bool {
        !self.scene.intersect(ray, candidates).is_empty()
    }

    /// Start a sequence at the current time and refresh the animating flag.
    fn run(&mut self, kind: SequenceKind, duration: Millis, blocking: bool) {
        log::debug!("sequence {:?} for {}ms", kind, duration);
        self.ticker.start(kind, self.now, duration, blocking);
        self.flags.animating = self.ticker.has_blocking();
    }

    fn schedule(&mut self, delay: Millis, action: TimedAction, batch: Option<GamePhase>) {
        self.ticker
            .schedule(self.now + delay, action, batch.map(GamePhase::batch));
    }
}
