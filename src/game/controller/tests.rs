use std::cell::RefCell;
use std::rc::Rc;

use glam::{Vec2, Vec3};

use super::*;
use crate::game::audio::AudioCue;
use crate::game::progress::TOTAL_SCREWS;
use crate::game::ui::CursorHint;

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<AudioCue>>>);

impl AudioSink for Recorder {
    fn play(&mut self, cue: AudioCue) {
        self.0.borrow_mut().push(cue);
    }
}

struct Harness {
    game: GameController,
    cues: Recorder,
    now: Millis,
}

impl Harness {
    fn unstarted() -> Self {
        let cues = Recorder::default();
        let mut game = GameController::new(&GameConfig::default(), Box::new(cues.clone()), 42);
        game.tick(0.0);
        Self { game, cues, now: 0.0 }
    }

    fn new() -> Self {
        let mut h = Self::unstarted();
        h.game.start();
        h
    }

    fn run_for(&mut self, ms: Millis) {
        let end = self.now + ms;
        while self.now < end {
            self.now = (self.now + 16.0).min(end);
            self.game.tick(self.now);
        }
    }

    fn heard(&self, cue: AudioCue) -> usize {
        self.cues.0.borrow().iter().filter(|c| **c == cue).count()
    }

    fn screen_of(&self, world: Vec3) -> Vec2 {
        self.game
            .camera()
            .project_to_screen(world, self.game.viewport())
            .expect("point is in front of the camera")
    }

    fn entity_on_screen(&self, entity: Entity) -> Vec2 {
        self.screen_of(self.game.scene().world_position(entity))
    }

    fn screw_head(&self, index: usize) -> Vec2 {
        let root = self.game.rig().screws[index].root;
        self.screen_of(self.game.scene().local_to_world(root, Vec3::new(0.0, 0.42, 0.0)))
    }

    fn down(&mut self, position: Vec2) {
        self.game.handle_gesture(Gesture::PointerDown { position });
    }

    fn drag_to(&mut self, position: Vec2) {
        self.game.handle_gesture(Gesture::PointerMove { position });
    }

    fn up(&mut self, position: Vec2) {
        self.game.handle_gesture(Gesture::PointerUp { position });
    }

    fn click(&mut self, position: Vec2) {
        self.down(position);
        self.up(position);
    }

    fn running(&self, matches: impl Fn(&SequenceKind) -> bool) -> usize {
        self.game.ticker.active().filter(|s| matches(&s.kind)).count()
    }

    // Walkthrough steps, each leaving the game idle in the next phase

    fn clear_screws(&mut self) {
        for i in 0..TOTAL_SCREWS {
            let head = self.screw_head(i);
            self.click(head);
            self.run_for(900.0);
        }
        assert_eq!(self.game.phase(), GamePhase::Knife);
    }

    fn pry_open(&mut self) {
        self.clear_screws();
        assert!(self.game.select_knife());
        let oyster = self.game.rig().oyster;
        let lid = self.game.scene().local_to_world(oyster, Vec3::new(0.9, 0.3, 0.0));
        let lid = self.screen_of(lid);
        self.click(lid);
        assert_eq!(self.game.phase(), GamePhase::Opening);
        self.run_for(1500.0);
        assert_eq!(self.game.phase(), GamePhase::Cut);
    }

    /// Saw back and forth over the meat until the cut triggers.
    fn saw_through(&mut self) -> usize {
        let centre = self.entity_on_screen(self.game.rig().flesh_blob);
        self.down(centre);
        let mut strokes = 0;
        while !self.game.flags().flesh_cut && strokes < 40 {
            let dx = if strokes % 2 == 0 { 20.0 } else { -20.0 };
            self.drag_to(centre + Vec2::new(dx, 0.0));
            strokes += 1;
        }
        strokes
    }

    fn present_flesh(&mut self) {
        self.pry_open();
        self.saw_through();
        self.up(Vec2::ZERO);
        self.run_for(700.0);
        assert_eq!(self.game.phase(), GamePhase::Lift);
        let flesh = self.entity_on_screen(self.game.rig().flesh_blob);
        self.click(flesh);
        self.run_for(3000.0);
        assert_eq!(self.game.phase(), GamePhase::Feed);
        assert!(!self.game.flags().animating);
    }
}

// ============================================================================
// SCREWS
// ============================================================================

#[test]
fn removing_all_screws_unlocks_the_knife() {
    let mut h = Harness::new();
    assert_eq!(h.game.ui().hint, Some(Hint::Screws));

    h.clear_screws();

    assert_eq!(h.game.screws_removed(), TOTAL_SCREWS);
    for screw in &h.game.rig().screws {
        assert!(screw.removed);
        assert!(!h.game.scene().is_world_visible(screw.root));
        assert_eq!(h.game.scene().parent(screw.root), None);
    }
    assert_eq!(h.game.ui().hint, Some(Hint::Knife));
    assert!(h.game.ui().sidebar_visible);
    assert_eq!(h.heard(AudioCue::ScrewOut), TOTAL_SCREWS);
    assert_eq!(h.heard(AudioCue::AllScrewsDone), 1);
}

#[test]
fn clicks_during_an_unscrew_are_ignored() {
    let mut h = Harness::new();
    let first = h.screw_head(0);
    let second = h.screw_head(1);

    h.click(first);
    assert!(h.game.flags().animating);
    h.click(second);
    assert_eq!(h.game.screws_removed(), 1);
    assert!(!h.game.rig().screws[1].removed);

    h.run_for(900.0);
    assert!(!h.game.flags().animating);
    let second = h.screw_head(1);
    h.click(second);
    assert_eq!(h.game.screws_removed(), 2);
}

#[test]
fn nothing_happens_before_start() {
    let mut h = Harness::unstarted();
    let head = h.screw_head(0);
    h.click(head);
    assert_eq!(h.game.screws_removed(), 0);
    assert_eq!(h.game.ui().hint, None);
}

#[test]
fn dragging_spins_the_oyster() {
    let mut h = Harness::new();
    h.down(Vec2::new(40.0, 40.0));
    assert!(h.game.flags().is_dragging);
    h.drag_to(Vec2::new(140.0, 40.0));
    assert_eq!(h.game.ui().cursor, CursorHint::Grabbing);
    h.up(Vec2::new(140.0, 40.0));
    assert!(!h.game.flags().is_dragging);

    h.run_for(1000.0);
    let yaw = h.game.scene().transform(h.game.rig().oyster).expect("oyster").rotation.y;
    assert!(yaw > OYSTER_YAW + 0.8, "yaw {yaw}");
}

// ============================================================================
// KNIFE & OPENING
// ============================================================================

#[test]
fn shell_needs_the_knife() {
    let mut h = Harness::new();
    assert!(!h.game.select_knife());
    assert_eq!(h.heard(AudioCue::KnifeSelect), 0);

    h.clear_screws();
    let lid = h.game.scene().local_to_world(h.game.rig().oyster, Vec3::new(0.9, 0.3, 0.0));
    let lid = h.screen_of(lid);
    h.click(lid);
    assert_eq!(h.game.phase(), GamePhase::Knife);

    assert!(h.game.select_knife());
    assert!(h.game.scene().is_visible(h.game.rig().knife));
    h.click(lid);
    assert_eq!(h.game.phase(), GamePhase::Opening);
    assert_eq!(h.game.ui().hint, None);

    h.run_for(1500.0);
    assert_eq!(h.game.phase(), GamePhase::Cut);
    assert_eq!(h.game.ui().hint, Some(Hint::Cut));
    assert!(h.game.scene().is_visible(h.game.rig().flesh));
    assert!(!h.game.flags().animating);
}

// ============================================================================
// CUT
// ============================================================================

#[test]
fn hovering_without_pressing_does_not_cut() {
    let mut h = Harness::new();
    h.pry_open();
    let centre = h.entity_on_screen(h.game.rig().flesh_blob);
    for k in 0..10 {
        let dx = if k % 2 == 0 { 30.0 } else { -30.0 };
        h.drag_to(centre + Vec2::new(dx, 0.0));
    }
    assert_eq!(h.game.cut_progress(), 0.0);
    assert_eq!(h.game.ui().cursor, CursorHint::Hidden);
}

#[test]
fn sawing_off_the_meat_makes_no_progress() {
    let mut h = Harness::new();
    h.pry_open();
    let corner = Vec2::new(30.0, 30.0);
    h.down(corner);
    assert!(h.game.flags().is_cutting);
    for k in 0..20 {
        let dx = if k % 2 == 0 { 60.0 } else { 0.0 };
        h.drag_to(corner + Vec2::new(dx, 0.0));
    }
    assert_eq!(h.game.cut_progress(), 0.0);
    assert_eq!(h.game.ui().cut_progress_percent, 0.0);
    assert_eq!(h.game.phase(), GamePhase::Cut);
}

#[test]
fn jitter_over_the_meat_does_not_count() {
    let mut h = Harness::new();
    h.pry_open();
    let centre = h.entity_on_screen(h.game.rig().flesh_blob);
    h.down(centre);
    for k in 0..50 {
        let dx = if k % 2 == 0 { 2.0 } else { 0.0 };
        h.drag_to(centre + Vec2::new(dx, 0.0));
    }
    assert_eq!(h.game.cut_progress(), 0.0);

    // A real stroke from the same spot registers
    h.drag_to(centre + Vec2::new(20.0, 0.0));
    assert!(h.game.cut_progress() > 0.0);
}

#[test]
fn sawing_cuts_the_flesh_free_once() {
    let mut h = Harness::new();
    h.pry_open();

    let strokes = h.saw_through();
    assert_eq!(strokes, 9);
    assert!(h.game.cut_progress() >= 1.0);
    assert_eq!(h.game.ui().cut_progress_percent, 100.0);
    assert!(h.game.flags().animating);
    assert_eq!(h.running(|k| *k == SequenceKind::CutFlesh), 1);

    // Further strokes while the cut plays change nothing
    let centre = h.entity_on_screen(h.game.rig().flesh_blob);
    h.drag_to(centre + Vec2::new(60.0, 0.0));
    h.drag_to(centre);
    assert_eq!(h.running(|k| *k == SequenceKind::CutFlesh), 1);

    h.up(centre);
    h.run_for(700.0);
    assert_eq!(h.game.phase(), GamePhase::Lift);
    assert!(!h.game.flags().knife_selected);
    assert!(!h.game.scene().is_visible(h.game.rig().knife));
    assert!(!h.game.ui().sidebar_visible);
    assert_eq!(h.game.ui().hint, Some(Hint::Lift));
    assert!(!h.game.select_knife());
}

// ============================================================================
// LIFT & FEED
// ============================================================================

#[test]
fn lifted_flesh_leaves_the_shell_and_is_presented() {
    let mut h = Harness::new();
    h.present_flesh();

    let flesh = h.game.rig().flesh;
    assert_eq!(h.game.scene().parent(flesh), None);
    assert!(h.game.flags().flesh_lifted);
    assert!(h.game.scene().is_visible(h.game.rig().dog));
    assert_eq!(h.game.ui().hint, Some(Hint::Feed));
    let hover = h.game.flesh_hover().expect("hover cached once presented");
    assert!(hover.distance(Vec3::new(0.0, 2.5, 2.0)) < 1e-4);
}

#[test]
fn missed_drop_snaps_back() {
    let mut h = Harness::new();
    h.present_flesh();
    let hover = h.game.flesh_hover().expect("hover");

    let grab = h.entity_on_screen(h.game.rig().flesh_blob);
    h.down(grab);
    assert!(h.game.flags().is_dragging_flesh);
    let away = Vec2::new(40.0, 40.0);
    h.drag_to(away);
    assert!(h.game.scene().position(h.game.rig().flesh).distance(hover) > 0.5);
    h.up(away);
    assert!(!h.game.flags().is_dragging_flesh);
    assert!(h.game.flags().animating);

    let started = h.now;
    while h.game.flags().animating {
        h.run_for(16.0);
        assert!(h.now - started <= 400.0 + 16.0);
    }
    assert!(h.game.scene().position(h.game.rig().flesh).distance(hover) < 1e-4);
    assert_eq!(h.game.phase(), GamePhase::Feed);
}

#[test]
fn feeding_the_dog_runs_through_to_the_reveal() {
    let mut h = Harness::new();
    h.present_flesh();

    let grab = h.entity_on_screen(h.game.rig().flesh_blob);
    let dog = h.game.scene().local_to_world(h.game.rig().dog, Vec3::new(0.0, 0.2, 0.0));
    let dog = h.screen_of(dog);
    h.down(grab);
    h.drag_to(dog);
    assert_eq!(h.game.ui().cursor, CursorHint::Copy);
    h.up(dog);
    assert_eq!(h.game.phase(), GamePhase::Eating);

    h.run_for(4000.0);
    assert_eq!(h.game.phase(), GamePhase::Reveal);
    assert!(!h.game.scene().is_visible(h.game.rig().flesh));
    assert_eq!(h.heard(AudioCue::Chomp), 6);
    assert_eq!(h.heard(AudioCue::HappyBark), 2);
    assert_eq!(h.heard(AudioCue::Fart), 1);

    // Poking the dog afterwards starts nothing new
    h.click(dog);
    h.click(grab);
    h.run_for(2500.0);
    assert_eq!(h.game.phase(), GamePhase::Reveal);
    assert_eq!(h.heard(AudioCue::Fart), 1);
    assert_eq!(h.heard(AudioCue::BubblePop), 15);
    assert_eq!(h.heard(AudioCue::RevealChime), 1);
    assert!(h.game.ui().overlay_visible);
}

// ============================================================================
// CAMERA
// ============================================================================

#[test]
fn pinch_and_wheel_zoom_within_bounds() {
    let mut h = Harness::new();
    h.game.handle_gesture(Gesture::PinchStart { distance: 100.0 });
    h.game.handle_gesture(Gesture::PinchMove { distance: 150.0 });
    assert!((h.game.camera().zoom() - 1.5).abs() < 1e-5);
    h.game.handle_gesture(Gesture::PinchMove { distance: 1000.0 });
    assert_eq!(h.game.camera().zoom(), 2.0);

    // No drags start mid-pinch
    h.down(Vec2::new(40.0, 40.0));
    assert!(!h.game.flags().is_dragging);

    h.game.handle_gesture(Gesture::PinchEnd);
    h.game.handle_wheel(1.0);
    assert!((h.game.camera().zoom() - 1.92).abs() < 1e-5);
}

#[test]
fn portrait_resize_pulls_the_camera_back() {
    let mut h = Harness::new();
    h.game.on_resize(600, 1200);
    assert!((h.game.camera().target_position().z - 11.0).abs() < 1e-5);
    h.game.on_resize(0, 0);
    assert_eq!(h.game.viewport(), Vec2::new(600.0, 1200.0));
}
