// Phase-framed perspective camera
//
// Camera model:
//   - A target eye position and a look target, set discretely when the game changes phase
//   - A zoom factor that scales the look→eye vector by 1/zoom, independent of the targets
//   - The eye eases toward the zoomed target every frame; the view always aims at the look target
//   - Sequences that own the camera bypass the easing with drive()

use glam::{Mat4, Vec2, Vec3};

use super::scene::Ray;

/// Extra depth pull-back for portrait viewports so the whole oyster stays in frame.
pub fn portrait_pull(aspect: f32) -> f32 {
    if aspect < 1.0 { (1.0 - aspect) * 4.0 } else { 0.0 }
}

pub struct PhaseCamera {
    /// Current eye position.
    pub position: Vec3,
    look_at: Vec3,

    target_position: Vec3,
    look_target: Vec3,

    /// Private: always clamped to [zoom_min, zoom_max]. Use zoom() to read.
    zoom: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,

    /// Zoom change per wheel notch.
    pub wheel_step: f32,

    /// Fraction of the remaining distance covered per reference frame (1/60 s).
    pub follow_rate: f32,

    aspect: f32,
    /// Vertical field of view in radians
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for PhaseCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseCamera {
    pub fn new() -> Self {
        Self {
            position: Vec3::new(0.0, 5.0, 9.0),
            look_at: Vec3::ZERO,
            target_position: Vec3::new(0.0, 5.0, 9.0),
            look_target: Vec3::ZERO,
            zoom: 1.0,
            zoom_min: 0.5,
            zoom_max: 2.0,
            wheel_step: 0.08,
            follow_rate: 0.04,
            aspect: 16.0 / 9.0,
            fov: 50.0_f32.to_radians(),
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Set the framing the camera eases toward.
    pub fn set_framing(&mut self, position: Vec3, look: Vec3) {
        self.target_position = position;
        self.look_target = look;
    }

    /// Jump straight to the current framing (used once at startup).
    pub fn snap_to_targets(&mut self) {
        self.position = self.zoomed_target();
        self.look_at = self.look_target;
    }

    /// Place the eye directly, bypassing the follow. For sequences that own the camera.
    pub fn drive(&mut self, position: Vec3, look: Vec3) {
        self.position = position;
        self.look_at = look;
    }

    /// Target eye position with zoom applied along the look→eye axis.
    pub fn zoomed_target(&self) -> Vec3 {
        self.look_target + (self.target_position - self.look_target) / self.zoom
    }

    /// Ease toward the zoomed target. `frames` is elapsed time in reference frames.
    pub fn follow(&mut self, frames: f32) {
        let k = 1.0 - (1.0 - self.follow_rate).powf(frames.max(0.0));
        self.position = self.position.lerp(self.zoomed_target(), k);
        self.look_at = self.look_target;
    }

    // ------------------------------------------------------------------------
    // Zoom
    // ------------------------------------------------------------------------

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_nan() {
            return;
        }
        self.zoom = zoom.clamp(self.zoom_min, self.zoom_max);
    }

    /// One wheel notch. Positive delta scrolls toward the user and zooms out.
    pub fn zoom_wheel(&mut self, delta_y: f32) {
        if delta_y == 0.0 {
            return;
        }
        let step = if delta_y > 0.0 { -self.wheel_step } else { self.wheel_step };
        self.set_zoom(self.zoom + step);
    }

    // ------------------------------------------------------------------------
    // Projection
    // ------------------------------------------------------------------------

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    #[cfg(test)]
    pub fn target_position(&self) -> Vec3 {
        self.target_position
    }

    #[cfg(test)]
    pub fn look_at(&self) -> Vec3 {
        self.look_at
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.look_at, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    /// Combined view-projection matrix ready to upload to the GPU.
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space ray from the eye through a point in normalized device coordinates.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_projection().inverse();
        let far_point = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        Ray::new(self.position, far_point - self.position)
    }

    /// Project a world point to pixel coordinates (origin top-left).
    /// `None` when the point is behind the eye.
    #[cfg(test)]
    pub fn project_to_screen(&self, world: Vec3, viewport: Vec2) -> Option<Vec2> {
        let clip = self.view_projection() * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * viewport.x,
            (1.0 - ndc.y) * 0.5 * viewport.y,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_stays_in_bounds_under_extreme_input() {
        let mut camera = PhaseCamera::new();
        for _ in 0..1000 {
            camera.zoom_wheel(-120.0);
        }
        assert_eq!(camera.zoom(), camera.zoom_max);
        for _ in 0..1000 {
            camera.zoom_wheel(1e9);
        }
        assert_eq!(camera.zoom(), camera.zoom_min);

        camera.set_zoom(f32::INFINITY);
        assert_eq!(camera.zoom(), camera.zoom_max);
        camera.set_zoom(-50.0);
        assert_eq!(camera.zoom(), camera.zoom_min);
        camera.set_zoom(f32::NAN);
        assert_eq!(camera.zoom(), camera.zoom_min);
    }

    #[test]
    fn zoom_scales_along_look_axis() {
        let mut camera = PhaseCamera::new();
        camera.set_framing(Vec3::new(0.0, 5.0, 9.0), Vec3::ZERO);
        camera.set_zoom(2.0);
        assert!((camera.zoomed_target() - Vec3::new(0.0, 2.5, 4.5)).length() < 1e-5);

        camera.set_framing(Vec3::new(1.5, 3.5, 8.0), Vec3::new(1.5, 0.5, 0.0));
        camera.set_zoom(0.5);
        assert!((camera.zoomed_target() - Vec3::new(1.5, 6.5, 16.0)).length() < 1e-5);
    }

    #[test]
    fn follow_converges_and_aims_at_look_target() {
        let mut camera = PhaseCamera::new();
        camera.set_framing(Vec3::new(2.0, 2.5, 6.0), Vec3::new(2.0, 0.2, 0.0));
        camera.follow(1.0);
        assert_eq!(camera.look_at(), Vec3::new(2.0, 0.2, 0.0));
        let after_one = camera.position;
        let goal = Vec3::new(2.0, 2.5, 6.0);
        assert!(after_one.distance(goal) < Vec3::new(0.0, 5.0, 9.0).distance(goal));

        for _ in 0..600 {
            camera.follow(1.0);
        }
        assert!(camera.position.distance(Vec3::new(2.0, 2.5, 6.0)) < 1e-3);
    }

    #[test]
    fn follow_is_frame_rate_independent() {
        let mut a = PhaseCamera::new();
        let mut b = PhaseCamera::new();
        a.set_framing(Vec3::new(0.0, 3.5, 7.0), Vec3::ZERO);
        b.set_framing(Vec3::new(0.0, 3.5, 7.0), Vec3::ZERO);
        a.follow(1.0);
        a.follow(1.0);
        b.follow(2.0);
        assert!(a.position.distance(b.position) < 1e-5);
    }

    #[test]
    fn portrait_pull_only_for_tall_viewports() {
        assert_eq!(portrait_pull(16.0 / 9.0), 0.0);
        assert_eq!(portrait_pull(1.0), 0.0);
        assert!((portrait_pull(0.5) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn center_ray_points_at_look_target() {
        let mut camera = PhaseCamera::new();
        camera.snap_to_targets();
        let ray = camera.ray_from_ndc(Vec2::ZERO);
        let expected = (Vec3::ZERO - camera.position).normalize();
        assert!(ray.direction.distance(expected) < 1e-4);
    }

    #[test]
    fn projection_round_trips_through_ray() {
        let mut camera = PhaseCamera::new();
        camera.snap_to_targets();
        let viewport = Vec2::new(1280.0, 720.0);
        let point = Vec3::new(0.7, -0.2, 0.4);
        let screen = camera.project_to_screen(point, viewport).expect("in front");
        let ndc = Vec2::new(screen.x / viewport.x * 2.0 - 1.0, 1.0 - screen.y / viewport.y * 2.0);
        let ray = camera.ray_from_ndc(ndc);
        let to_point = (point - ray.origin).normalize();
        assert!(ray.direction.distance(to_point) < 1e-3);
    }
}
