// ECS systems for per-frame particle and ambient motion
// `frames` is elapsed time in 1/60 s reference frames, so per-frame constants stay meaningful

use bevy_ecs::prelude::*;

use super::components::*;

/// Life lost per reference frame. A bubble lasts 125 frames.
pub const BUBBLE_DECAY: f32 = 0.008;
/// Scale growth per reference frame.
pub const BUBBLE_GROWTH: f32 = 1.005;

/// Integrate reveal bubbles: drift, wobble, fade, grow, and despawn when spent.
/// Returns how many bubbles were despawned.
pub fn bubble_system(world: &mut World, time: f32, frames: f32) -> usize {
    let mut spent = Vec::new();
    let growth = BUBBLE_GROWTH.powf(frames);

    let mut query = world.query::<(Entity, &mut Transform, &mut Bubble, &mut Material)>();
    for (i, (entity, mut transform, mut bubble, mut material)) in
        query.iter_mut(world).enumerate()
    {
        transform.position += bubble.velocity * frames;
        // Side to side wobble
        transform.position.x += (time * 3.0 + i as f32).sin() * 0.002 * frames;
        transform.scale *= growth;

        bubble.life -= BUBBLE_DECAY * frames;
        material.opacity = (bubble.life * bubble.base_opacity).max(0.0);

        if bubble.life <= 0.0 {
            spent.push(entity);
        }
    }

    for entity in &spent {
        world.despawn(*entity);
    }
    spent.len()
}

/// Slow float and spin for the decorative hearts.
pub fn drift_system(world: &mut World, time: f32, frames: f32) {
    let mut query = world.query::<(&mut Transform, &Drift)>();
    for (mut transform, drift) in query.iter_mut(world) {
        transform.position.y += (time * drift.speed + drift.offset).sin() * 0.002 * frames;
        transform.rotation.y += 0.004 * frames;
        transform.rotation.x += 0.002 * frames;
    }
}
