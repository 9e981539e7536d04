// Pointer, touch and wheel input normalized into gestures
// Abstracts winit events into a small stream the game controller can route by phase

use std::collections::BTreeMap;

use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent};

/// Normalized input, in physical pixels with the origin at the top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    PointerDown { position: Vec2 },
    PointerMove { position: Vec2 },
    PointerUp { position: Vec2 },
    PinchStart { distance: f32 },
    PinchMove { distance: f32 },
    PinchEnd,
    /// Positive scrolls toward the user (zoom out).
    Wheel { delta_y: f32 },
}

/// Convert a pixel position to normalized device coordinates (y up, [-1, 1]).
pub fn screen_to_ndc(position: Vec2, viewport: Vec2) -> Vec2 {
    if viewport.x <= 0.0 || viewport.y <= 0.0 {
        return Vec2::ZERO;
    }
    Vec2::new(
        position.x / viewport.x * 2.0 - 1.0,
        -(position.y / viewport.y) * 2.0 + 1.0,
    )
}

pub fn pinch_distance(a: Vec2, b: Vec2) -> f32 {
    a.distance(b)
}

#[derive(Default)]
pub struct InputMapper {
    cursor: Vec2,
    touches: BTreeMap<u64, Vec2>,
    /// The touch acting as the pointer.
    primary_touch: Option<u64>,
    pinching: bool,
}

impl InputMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a winit WindowEvent, returning the gestures it produced.
    pub fn process_event(&mut self, event: &WindowEvent) -> Vec<Gesture> {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(Vec2::new(position.x as f32, position.y as f32))
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                self.mouse_button(*state == ElementState::Pressed)
            }
            WindowEvent::CursorLeft { .. } => self.cursor_left(),
            WindowEvent::MouseWheel { delta, .. } => {
                // winit reports "away from the user" as positive
                let y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                self.wheel(-y)
            }
            WindowEvent::Touch(touch) => self.touch(
                touch.id,
                touch.phase,
                Vec2::new(touch.location.x as f32, touch.location.y as f32),
            ),
            _ => Vec::new(),
        }
    }

    pub fn cursor_moved(&mut self, position: Vec2) -> Vec<Gesture> {
        self.cursor = position;
        vec![Gesture::PointerMove { position }]
    }

    pub fn mouse_button(&mut self, pressed: bool) -> Vec<Gesture> {
        let position = self.cursor;
        if pressed {
            vec![Gesture::PointerDown { position }]
        } else {
            vec![Gesture::PointerUp { position }]
        }
    }

    /// Leaving the window ends any drag.
    pub fn cursor_left(&mut self) -> Vec<Gesture> {
        vec![Gesture::PointerUp { position: self.cursor }]
    }

    pub fn wheel(&mut self, delta_y: f32) -> Vec<Gesture> {
        if delta_y == 0.0 {
            return Vec::new();
        }
        vec![Gesture::Wheel { delta_y }]
    }

    pub fn touch(&mut self, id: u64, phase: TouchPhase, position: Vec2) -> Vec<Gesture> {
        let mut out = Vec::new();
        match phase {
            TouchPhase::Started => {
                self.touches.insert(id, position);
                match self.touches.len() {
                    1 => {
                        self.primary_touch = Some(id);
                        self.cursor = position;
                        out.push(Gesture::PointerDown { position });
                    }
                    2 => {
                        self.pinching = true;
                        if let Some(distance) = self.two_finger_distance() {
                            out.push(Gesture::PinchStart { distance });
                        }
                    }
                    _ => {}
                }
            }
            TouchPhase::Moved => {
                self.touches.insert(id, position);
                if self.pinching {
                    if let Some(distance) = self.two_finger_distance() {
                        out.push(Gesture::PinchMove { distance });
                    }
                } else if self.primary_touch == Some(id) {
                    self.cursor = position;
                    out.push(Gesture::PointerMove { position });
                }
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                self.touches.remove(&id);
                if self.pinching && self.touches.len() < 2 {
                    self.pinching = false;
                    out.push(Gesture::PinchEnd);
                }
                if self.primary_touch == Some(id) {
                    self.primary_touch = None;
                    out.push(Gesture::PointerUp { position });
                }
            }
        }
        out
    }

    fn two_finger_distance(&self) -> Option<f32> {
        let mut points = self.touches.values();
        let a = *points.next()?;
        let b = *points.next()?;
        Some(pinch_distance(a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ndc_corners() {
        let viewport = Vec2::new(800.0, 600.0);
        assert_eq!(screen_to_ndc(Vec2::ZERO, viewport), Vec2::new(-1.0, 1.0));
        assert_eq!(screen_to_ndc(viewport, viewport), Vec2::new(1.0, -1.0));
        assert_eq!(screen_to_ndc(Vec2::new(400.0, 300.0), viewport), Vec2::ZERO);
        assert_eq!(screen_to_ndc(Vec2::new(10.0, 10.0), Vec2::ZERO), Vec2::ZERO);
    }

    #[test]
    fn mouse_press_uses_last_cursor_position() {
        let mut input = InputMapper::new();
        input.cursor_moved(Vec2::new(120.0, 40.0));
        assert_eq!(
            input.mouse_button(true),
            vec![Gesture::PointerDown { position: Vec2::new(120.0, 40.0) }]
        );
        assert_eq!(
            input.cursor_left(),
            vec![Gesture::PointerUp { position: Vec2::new(120.0, 40.0) }]
        );
    }

    #[test]
    fn two_fingers_pinch_instead_of_drag() {
        let mut input = InputMapper::new();
        let down = input.touch(1, TouchPhase::Started, Vec2::new(100.0, 100.0));
        assert_eq!(down, vec![Gesture::PointerDown { position: Vec2::new(100.0, 100.0) }]);

        let pinch = input.touch(2, TouchPhase::Started, Vec2::new(100.0, 200.0));
        assert_eq!(pinch, vec![Gesture::PinchStart { distance: 100.0 }]);

        let moved = input.touch(2, TouchPhase::Moved, Vec2::new(100.0, 300.0));
        assert_eq!(moved, vec![Gesture::PinchMove { distance: 200.0 }]);

        let lifted = input.touch(2, TouchPhase::Ended, Vec2::new(100.0, 300.0));
        assert_eq!(lifted, vec![Gesture::PinchEnd]);

        let up = input.touch(1, TouchPhase::Ended, Vec2::new(100.0, 100.0));
        assert_eq!(up, vec![Gesture::PointerUp { position: Vec2::new(100.0, 100.0) }]);
    }

    #[test]
    fn zero_wheel_is_dropped() {
        let mut input = InputMapper::new();
        assert!(input.wheel(0.0).is_empty());
        assert_eq!(input.wheel(1.5), vec![Gesture::Wheel { delta_y: 1.5 }]);
    }
}
