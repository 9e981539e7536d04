// Per-frame ambient motion that runs regardless of sequences

use glam::Vec3;

use crate::engine::components::hex_to_rgb;
use crate::engine::systems::{bubble_system, drift_system};
use crate::engine::tween::Millis;
use crate::game::factory::{ADDUCTOR_SCALE, OYSTER_Y, palette};
use crate::game::phase::GamePhase;

use super::GameController;

/// Per-frame damping of the released yaw spin.
const SPIN_FRICTION: f32 = 0.92;
/// Fraction of the remaining yaw covered per frame.
const YAW_FOLLOW: f32 = 0.15;

pub(super) fn update(ctl: &mut GameController, now: Millis, frames: f32) {
    let time = (now / 1000.0) as f32;

    if matches!(ctl.phase, GamePhase::Screws | GamePhase::Knife) {
        spin_oyster(ctl, time, frames);
    }
    drift_system(ctl.scene.world_mut(), time, frames);
    glow_screws(ctl, time);

    if ctl.phase == GamePhase::Cut {
        pulse_adductor(ctl, time);
    }
    if ctl.phase == GamePhase::Feed && ctl.scene.is_visible(ctl.rig.dog) {
        wag_and_hover(ctl, time);
    }

    let popped = bubble_system(ctl.scene.world_mut(), time, frames);
    if popped > 0 {
        log::trace!("{} bubbles popped", popped);
    }

    if let Some(bubble) = ctl.big_bubble {
        ctl.scene.update_transform(bubble, |t| {
            t.rotation.y = time * 0.3;
            t.position.x += (time * 1.5).sin() * 0.001 * frames;
            t.position.y += (time * 0.8).sin() * 0.0005 * frames;
        });
    }
}

/// Inertial yaw after a drag, eased toward the target, plus a gentle bob.
fn spin_oyster(ctl: &mut GameController, time: f32, frames: f32) {
    if !ctl.flags.is_dragging {
        // Closed form of `v *= f; target += v` repeated once per frame
        let decay = SPIN_FRICTION.powf(frames);
        ctl.target_rot_y +=
            ctl.rotation_velocity * SPIN_FRICTION * (1.0 - decay) / (1.0 - SPIN_FRICTION);
        ctl.rotation_velocity *= decay;
    }
    let target = ctl.target_rot_y;
    let k = 1.0 - (1.0 - YAW_FOLLOW).powf(frames);
    ctl.scene.update_transform(ctl.rig.oyster, |t| {
        t.rotation.y += (target - t.rotation.y) * k;
        t.position.y = OYSTER_Y + (time * 0.5).sin() * 0.04;
    });
}

fn glow_screws(ctl: &mut GameController, time: f32) {
    let accent = hex_to_rgb(palette::ACCENT);
    for &(mesh, index) in &ctl.picks.screws {
        let intensity = 0.08 + (time * 3.0 + index as f32).sin() * 0.08;
        ctl.scene.update_material(mesh, |m| {
            m.emissive = accent;
            m.emissive_intensity = intensity;
        });
    }
}

/// The adductor reddens and throbs faster as it gets cut.
fn pulse_adductor(ctl: &mut GameController, time: f32) {
    let p = ctl.cut.progress();
    let pulse = 1.0 + (time * (4.0 + p * 6.0)).sin() * (0.04 + p * 0.06);
    let adductor = ctl.rig.adductor;
    ctl.scene.update_material(adductor, |m| {
        m.emissive = Vec3::new(1.0, 0.4 * (1.0 - p), 0.5 * (1.0 - p));
        m.emissive_intensity = 0.15 + p * 0.35 + (time * 4.0).sin() * 0.1;
    });
    ctl.scene.update_transform(adductor, |t| {
        t.scale = Vec3::new(ADDUCTOR_SCALE.x * pulse, ADDUCTOR_SCALE.y, ADDUCTOR_SCALE.z * pulse);
    });
}

fn wag_and_hover(ctl: &mut GameController, time: f32) {
    ctl.scene
        .update_transform(ctl.rig.dog_tail, |t| t.rotation.x = (time * 5.0).sin() * 0.4);

    if ctl.flags.is_dragging_flesh || ctl.flags.animating || !ctl.scene.is_visible(ctl.rig.flesh) {
        return;
    }
    let Some(hover) = ctl.flesh_hover else {
        return;
    };
    let rest_z = ctl.flesh_rest.rotation.z;
    ctl.scene.update_transform(ctl.rig.flesh, |t| {
        t.position.y = hover.y + (time * 2.0).sin() * 0.1;
        t.rotation.z = rest_z + (time * 1.5).sin() * 0.05;
    });
}
