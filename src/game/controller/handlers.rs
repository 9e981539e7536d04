// Pointer routing: what a press, move or release means in each phase

use glam::{Vec2, Vec3};

use crate::engine::scene::Ray;
use crate::game::factory::KNIFE_REST_TILT;
use crate::game::phase::GamePhase;
use crate::game::ui::CursorHint;

use super::GameController;

/// Oyster yaw per pixel of horizontal drag.
const DRAG_SENSITIVITY: f32 = 0.008;
/// The knife handle sits toward the camera, so the blade tip lands under the pointer.
const KNIFE_GRIP: Vec3 = Vec3::new(0.8, 0.0, 2.0);

impl GameController {
    pub fn handle_pointer_down(&mut self, position: Vec2) {
        if !self.ui.started || self.flags.animating || self.flags.is_pinching {
            return;
        }
        let ray = self.pointer_ray(position);

        match self.phase {
            GamePhase::Screws => {
                if let Some(index) = self.pick_screw(&ray) {
                    self.unscrew(index);
                    return;
                }
                self.flags.is_dragging = true;
                self.drag_start_x = position.x;
                self.drag_start_rot = self.target_rot_y;
                self.rotation_velocity = 0.0;
            }
            GamePhase::Knife if self.flags.knife_selected => {
                self.move_knife(&ray);
                if self.hits_any(&ray, &self.picks.shell) {
                    self.open_shell();
                }
            }
            GamePhase::Cut if self.flags.knife_selected && !self.flags.flesh_cut => {
                self.move_knife(&ray);
                self.flags.is_cutting = true;
                self.last_saw_pos = Some(position);
            }
            GamePhase::Lift => {
                if self.hits_any(&ray, &self.picks.flesh) {
                    self.lift_flesh();
                }
            }
            GamePhase::Feed => {
                if self.flesh_hover.is_some() && self.hits_any(&ray, &self.picks.flesh) {
                    self.flags.is_dragging_flesh = true;
                    self.ui.cursor = CursorHint::Grabbing;
                }
            }
            _ => {}
        }
    }

    pub fn handle_pointer_move(&mut self, position: Vec2) {
        if self.flags.is_pinching {
            return;
        }
        if self.flags.is_dragging && self.phase == GamePhase::Screws {
            let rot = self.drag_start_rot + (position.x - self.drag_start_x) * DRAG_SENSITIVITY;
            self.rotation_velocity = (rot - self.target_rot_y) * 0.5;
            self.target_rot_y = rot;
            self.ui.cursor = CursorHint::Grabbing;
            return;
        }
        if self.flags.animating || !self.ui.started {
            return;
        }
        let ray = self.pointer_ray(position);

        match self.phase {
            GamePhase::Screws => {
                self.ui.cursor = if self.pick_screw(&ray).is_some() {
                    CursorHint::Pointer
                } else {
                    CursorHint::Grab
                };
            }
            GamePhase::Knife | GamePhase::Cut if self.flags.knife_selected => {
                self.move_knife(&ray);
                if self.phase == GamePhase::Cut && !self.flags.flesh_cut {
                    self.saw(&ray, position);
                }
                self.ui.cursor = CursorHint::Hidden;
            }
            GamePhase::Lift => {
                self.ui.cursor = if self.hits_any(&ray, &self.picks.flesh) {
                    CursorHint::Grab
                } else {
                    CursorHint::Default
                };
            }
            GamePhase::Feed if self.flags.is_dragging_flesh => {
                if let Some(p) = ray.intersect_plane(Vec3::Z, 0.0) {
                    // Flatten depth so the flesh stays between the camera and the dog
                    self.scene.set_position(self.rig.flesh, Vec3::new(p.x, p.y, p.z * 0.3));
                }
                self.ui.cursor = if self.hits_any(&ray, &self.picks.dog) {
                    CursorHint::Copy
                } else {
                    CursorHint::Grabbing
                };
            }
            GamePhase::Feed => {
                self.ui.cursor = if self.hits_any(&ray, &self.picks.flesh) {
                    CursorHint::Grab
                } else {
                    CursorHint::Default
                };
            }
            _ => {}
        }
    }

    pub fn handle_pointer_up(&mut self, position: Vec2) {
        self.flags.is_dragging = false;
        self.flags.is_cutting = false;
        self.last_saw_pos = None;

        if self.flags.is_dragging_flesh && self.phase == GamePhase::Feed {
            self.flags.is_dragging_flesh = false;
            self.ui.cursor = CursorHint::Default;
            let ray = self.pointer_ray(position);
            if let Some(hit) = self.scene.intersect(&ray, &self.picks.dog).first() {
                log::debug!("flesh dropped on {}", self.scene.name(hit.entity));
                self.feed_dog();
            } else {
                self.snap_back();
            }
        }
    }

    // ------------------------------------------------------------------------

    fn pick_screw(&self, ray: &Ray) -> Option<usize> {
        let meshes = self.picks.screw_meshes();
        let hit = self.scene.intersect(ray, &meshes).into_iter().next()?;
        let index = self.picks.screw_of(hit.entity)?;
        self.rig.screws.get(index).filter(|s| !s.removed).map(|s| s.index)
    }

    /// Put the knife where the pointer ray crosses the z = 0 plane.
    fn move_knife(&mut self, ray: &Ray) {
        if !self.scene.is_visible(self.rig.knife) {
            return;
        }
        if let Some(p) = ray.intersect_plane(Vec3::Z, 0.0) {
            self.scene
                .set_position(self.rig.knife, Vec3::new(p.x + KNIFE_GRIP.x, p.y, KNIFE_GRIP.z));
        }
    }

    /// One sawing sample: glow and tilt feedback, then progress from pointer travel.
    fn saw(&mut self, ray: &Ray, position: Vec2) {
        let over = self.hits_any(ray, &self.picks.meat);
        let cutting = self.flags.is_cutting;
        self.set_blade_glow(over, cutting);

        let tilt = match (over, cutting) {
            (true, true) => -0.4,
            (true, false) => -0.3,
            _ => KNIFE_REST_TILT,
        };
        self.scene.update_transform(self.rig.knife, |t| t.rotation.z = tilt);

        if cutting && over {
            if let Some(last) = self.last_saw_pos {
                if self.cut.saw(position.distance(last)) {
                    let progress = self.cut.progress();
                    self.saw_jitter(progress);
                    self.ui.cut_progress_percent = self.cut.percent();
                    if self.cut.is_full() {
                        log::info!("adductor cut through");
                        self.cut_flesh();
                    }
                }
            }
        }
        self.last_saw_pos = Some(position);
    }
}
