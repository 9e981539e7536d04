// Engine: scene graph, camera, tweens, input mapping and unit meshes.
// Nothing in here knows about oysters or dogs.

pub mod camera;
pub mod components;
pub mod input;
pub mod mesh;
pub mod scene;
pub mod systems;
pub mod tween;
