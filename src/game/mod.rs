// Game layer: phase machine, progress tracking, the oyster rig and the controller that drives them.

pub mod audio;
pub mod controller;
pub mod factory;
pub mod hud;
pub mod phase;
pub mod progress;
pub mod ui;
