// Builds the oyster, screws, flesh, knife, dachshund and decorations out of unit primitives.
// The controller only needs the entity handles collected in `OysterRig`.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_3, PI, TAU};

use bevy_ecs::prelude::*;
use glam::Vec3;
use rand::Rng;

use crate::engine::components::{Bubble, Drift, Material, MeshShape, Transform};
use crate::engine::scene::Scene;

use super::progress::TOTAL_SCREWS;

pub mod palette {
    pub const SHELL_OUTER: u32 = 0x8b7d6b;
    pub const SHELL_INNER: u32 = 0xe8ddd0;
    pub const HINGE: u32 = 0x5a4e40;
    pub const SCREW: u32 = 0xd4af37;
    pub const SCREW_HEAD: u32 = 0xc5981a;
    pub const SCREW_SLOT: u32 = 0x8b7320;
    pub const FLESH: u32 = 0xd4b896;
    pub const FLESH_WET: u32 = 0xc8a882;
    pub const ADDUCTOR: u32 = 0xbfa07a;
    pub const BLADE_TIP: u32 = 0xc0c0c0;
    pub const BLADE: u32 = 0xa8a8a8;
    pub const HANDLE: u32 = 0x5c3a1e;
    pub const DOG_BODY: u32 = 0x8b4513;
    pub const DOG_DARK: u32 = 0x6b3410;
    pub const DOG_BELLY: u32 = 0xa0652e;
    pub const DOG_NOSE: u32 = 0x1a1a1a;
    pub const TONGUE: u32 = 0xe85880;
    pub const SURFACE: u32 = 0x2a1a25;
    pub const BACKGROUND: u32 = 0x2d1520;
    pub const ACCENT: u32 = 0xe8587a;
    pub const HIGHLIGHT: u32 = 0xff7e9d;
}

/// Oyster group rest height.
pub const OYSTER_Y: f32 = -0.3;
/// Oyster group rest yaw: wide lip facing the camera.
pub const OYSTER_YAW: f32 = -FRAC_PI_2;
/// Flesh group offset inside the oyster.
pub const FLESH_Y: f32 = -0.15;
pub const DOG_START: Vec3 = Vec3::new(5.5, -0.65, 1.0);
pub const DOG_REST_X: f32 = 2.8;
pub const DOG_TAIL_BASE_Z: f32 = -0.8;
pub const DOG_HEAD_Y: f32 = 0.45;
pub const KNIFE_START: Vec3 = Vec3::new(6.0, 2.0, 0.0);
pub const KNIFE_REST_TILT: f32 = -0.2;
pub const ADDUCTOR_SCALE: Vec3 = Vec3::new(0.275, 0.1, 0.275);

/// Shell rim radius around the seam: a teardrop with a narrow hinge at `angle = PI`
/// and a wide, slightly lopsided, ruffled lip at `angle = 0`.
pub fn rim_radius(angle: f32) -> f32 {
    let base = 1.7 + 0.9 * angle.cos();
    let asym = angle.sin() * 0.15;
    let ruffle = (angle * 6.0).sin() * 0.08 + (angle * 10.0 + 1.0).sin() * 0.04;
    base + asym + ruffle
}

/// Hinge position on the oyster's local x axis.
pub fn hinge_x() -> f32 {
    -rim_radius(PI)
}

#[derive(Debug, Clone, Copy)]
pub struct Screw {
    pub index: usize,
    /// One-way: set when the unscrew sequence starts.
    pub removed: bool,
    pub root: Entity,
}

/// Handles to everything the game animates or picks.
#[derive(Debug, Clone)]
pub struct OysterRig {
    pub oyster: Entity,
    pub top_pivot: Entity,
    pub screws: Vec<Screw>,
    pub flesh: Entity,
    pub flesh_blob: Entity,
    pub adductor: Entity,
    pub knife: Entity,
    pub knife_metal: Vec<Entity>,
    pub dog: Entity,
    pub dog_head: Entity,
    pub dog_tail: Entity,
    pub dog_tongue: Entity,
    pub hearts: Vec<Entity>,
}

impl OysterRig {
    pub fn screw_roots(&self) -> Vec<Entity> {
        self.screws.iter().map(|s| s.root).collect()
    }
}

pub fn build_rig(scene: &mut Scene, rng: &mut impl Rng) -> OysterRig {
    surface(scene);
    let (oyster, top_pivot) = oyster(scene, rng);
    let screws = screws(scene, oyster);
    let (flesh, flesh_blob, adductor) = flesh(scene, oyster, rng);
    let (knife, knife_metal) = knife(scene);
    let (dog, dog_head, dog_tail, dog_tongue) = dachshund(scene);
    let hearts = hearts(scene, rng);

    log::debug!("rig built: {} entities", scene.entity_count());

    OysterRig {
        oyster,
        top_pivot,
        screws,
        flesh,
        flesh_blob,
        adductor,
        knife,
        knife_metal,
        dog,
        dog_head,
        dog_tail,
        dog_tongue,
        hearts,
    }
}

// ============================================================================
// OYSTER
// ============================================================================

fn surface(scene: &mut Scene) -> Entity {
    scene.spawn_mesh(
        "surface",
        MeshShape::Cube,
        Transform::from_position(Vec3::new(0.0, -1.21, 0.0))
            .with_scale(Vec3::new(20.0, 0.02, 20.0)),
        Material::from_hex(palette::SURFACE),
        None,
    )
}

fn oyster(scene: &mut Scene, rng: &mut impl Rng) -> (Entity, Entity) {
    let oyster = scene.spawn_group(
        "oyster",
        Transform::from_position(Vec3::new(0.0, OYSTER_Y, 0.0))
            .with_rotation(Vec3::new(0.0, OYSTER_YAW, 0.0)),
        None,
    );
    let hinge = hinge_x();

    let bottom = scene.spawn_group(
        "bottom shell",
        Transform::default().with_rotation(Vec3::new(PI, 0.0, 0.0)),
        Some(oyster),
    );
    shell_half(scene, bottom, 0.45, rng);

    // The lid rotates about the hinge, so it hangs off a pivot placed there
    let pivot_at = Transform::from_position(Vec3::new(hinge, 0.0, 0.0));
    let top_pivot = scene.spawn_group("top pivot", pivot_at, Some(oyster));
    let top_at = Transform::from_position(Vec3::new(-hinge, 0.08, 0.0));
    let top = scene.spawn_group("top shell", top_at, Some(top_pivot));
    shell_half(scene, top, 0.35, rng);

    let nub = Material::from_hex(palette::HINGE);
    scene.spawn_mesh(
        "hinge",
        MeshShape::Sphere,
        Transform::from_position(Vec3::new(hinge, 0.0, 0.0))
            .with_scale(Vec3::new(0.28, 0.12, 0.24)),
        nub,
        Some(oyster),
    );
    scene.spawn_mesh(
        "hinge knob",
        MeshShape::Sphere,
        Transform::from_position(Vec3::new(hinge - 0.15, 0.05, 0.0))
            .with_scale(Vec3::new(0.2, 0.08, 0.16)),
        nub,
        Some(oyster),
    );

    (oyster, top_pivot)
}

/// Rough outer dome, nacre lining and a scatter of barnacle lumps.
fn shell_half(scene: &mut Scene, parent: Entity, depth: f32, rng: &mut impl Rng) {
    // Centre of the teardrop rim and its half extents
    let centre = Vec3::new(0.9, 0.0, 0.0);
    scene.spawn_mesh(
        "shell outer",
        MeshShape::Dome,
        Transform::from_position(centre).with_scale(Vec3::new(1.75, depth, 1.65)),
        Material::from_hex(palette::SHELL_OUTER),
        Some(parent),
    );
    scene.spawn_mesh(
        "shell nacre",
        MeshShape::Dome,
        Transform::from_position(centre).with_scale(Vec3::new(1.65, depth * 0.85, 1.55)),
        Material::from_hex(palette::SHELL_INNER).with_emissive(palette::SHELL_INNER, 0.05),
        Some(parent),
    );

    const LUMPS: [u32; 4] = [0x8a7e6e, 0x6b6050, 0x9a9080, 0x5e5545];
    for i in 0..8 {
        let a = rng.gen_range(0.0..TAU);
        let r = rim_radius(a) * rng.gen_range(0.3..0.8);
        let size = rng.gen_range(0.06..0.16);
        let lift = depth * 0.6 + rng.gen_range(0.0..0.08);
        scene.spawn_mesh(
            "barnacle",
            MeshShape::Sphere,
            Transform::from_position(Vec3::new(a.cos() * r, lift, a.sin() * r))
                .with_scale(Vec3::new(
                    size * rng.gen_range(1.0..1.5),
                    size * rng.gen_range(0.3..0.7),
                    size * rng.gen_range(1.0..1.5),
                )),
            Material::from_hex(LUMPS[i % LUMPS.len()]),
            Some(parent),
        );
    }
}

// ============================================================================
// SCREWS
// ============================================================================

fn screws(scene: &mut Scene, oyster: Entity) -> Vec<Screw> {
    (0..TOTAL_SCREWS)
        .map(|index| {
            // Spread over the lip and sides, away from the hinge
            let angle = -PI * 0.6 + index as f32 / (TOTAL_SCREWS - 1) as f32 * PI * 1.2;
            let r = rim_radius(angle) * 0.95;
            let root = scene.spawn_group(
                "screw",
                Transform::from_position(Vec3::new(angle.cos() * r, -0.18, angle.sin() * r))
                    .with_rotation(Vec3::new(0.0, -angle, 0.0)),
                Some(oyster),
            );
            screw_assembly(scene, root);
            Screw { index, removed: false, root }
        })
        .collect()
}

fn screw_assembly(scene: &mut Scene, root: Entity) {
    let body = Material::from_hex(palette::SCREW);
    let slot = Material::from_hex(palette::SCREW_SLOT);

    scene.spawn_mesh(
        "screw shaft",
        MeshShape::Cylinder,
        Transform::from_position(Vec3::new(0.0, 0.1, 0.0)).with_scale(Vec3::new(0.07, 0.55, 0.07)),
        body,
        Some(root),
    );
    scene.spawn_mesh(
        "screw head",
        MeshShape::Cylinder,
        Transform::from_position(Vec3::new(0.0, 0.42, 0.0)).with_scale(Vec3::new(0.15, 0.1, 0.15)),
        Material::from_hex(palette::SCREW_HEAD),
        Some(root),
    );
    for yaw in [0.0, FRAC_PI_2] {
        scene.spawn_mesh(
            "screw slot",
            MeshShape::Cube,
            Transform::from_position(Vec3::new(0.0, 0.48, 0.0))
                .with_rotation(Vec3::new(0.0, yaw, 0.0))
                .with_scale(Vec3::new(0.2, 0.11, 0.025)),
            slot,
            Some(root),
        );
    }
    for t in 0..4 {
        scene.spawn_mesh(
            "screw thread",
            MeshShape::Cylinder,
            Transform::from_position(Vec3::new(0.0, -0.05 + t as f32 * 0.1, 0.0))
                .with_scale(Vec3::new(0.092, 0.024, 0.092)),
            body,
            Some(root),
        );
    }
}

// ============================================================================
// FLESH
// ============================================================================

fn flesh(scene: &mut Scene, oyster: Entity, rng: &mut impl Rng) -> (Entity, Entity, Entity) {
    let flesh_at = Transform::from_position(Vec3::new(0.0, FLESH_Y, 0.0));
    let flesh = scene.spawn_group("flesh", flesh_at, Some(oyster));
    scene.set_visible(flesh, false);

    let blob = scene.spawn_mesh(
        "flesh blob",
        MeshShape::Sphere,
        Transform::from_position(Vec3::new(0.6, 0.04, 0.0)).with_scale(Vec3::new(1.15, 0.2, 1.1)),
        Material::from_hex(palette::FLESH),
        Some(flesh),
    );
    scene.spawn_mesh(
        "flesh sheen",
        MeshShape::Sphere,
        Transform::from_position(Vec3::new(0.6, 0.05, 0.0)).with_scale(Vec3::new(1.12, 0.22, 1.07)),
        Material::from_hex(palette::FLESH_WET).with_opacity(0.4),
        Some(flesh),
    );

    const FRILLS: [u32; 4] = [0xb89a70, 0xa08860, 0xc4a67a, 0x9a8560];
    for i in 0..20 {
        let a = i as f32 / 20.0 * TAU;
        let r = rim_radius(a) * 0.62;
        let size = rng.gen_range(0.1..0.16);
        scene.spawn_mesh(
            "mantle frill",
            MeshShape::Sphere,
            Transform::from_position(Vec3::new(a.cos() * r, -0.02, a.sin() * r))
                .with_scale(Vec3::new(size * 1.3, size * 0.3, size * 1.3)),
            Material::from_hex(FRILLS[i % FRILLS.len()]),
            Some(flesh),
        );
    }

    let adductor = scene.spawn_mesh(
        "adductor",
        MeshShape::Cylinder,
        Transform::from_position(Vec3::new(0.6, 0.1, -0.15)).with_scale(ADDUCTOR_SCALE),
        Material::from_hex(palette::ADDUCTOR),
        Some(flesh),
    );

    (flesh, blob, adductor)
}

// ============================================================================
// KNIFE
// ============================================================================

fn knife(scene: &mut Scene) -> (Entity, Vec<Entity>) {
    let knife = scene.spawn_group(
        "knife",
        Transform::from_position(KNIFE_START)
            .with_rotation(Vec3::new(0.0, 0.0, KNIFE_REST_TILT))
            .with_uniform_scale(1.2),
        None,
    );
    scene.set_visible(knife, false);

    let wood = Material::from_hex(palette::HANDLE);
    scene.spawn_mesh(
        "knife handle",
        MeshShape::Cylinder,
        Transform::from_position(Vec3::new(-0.7, 0.0, 0.0))
            .with_rotation(Vec3::new(0.0, 0.0, FRAC_PI_2))
            .with_scale(Vec3::new(0.13, 1.1, 0.13)),
        wood,
        Some(knife),
    );
    scene.spawn_mesh(
        "knife cap",
        MeshShape::Sphere,
        Transform::from_position(Vec3::new(-1.25, 0.0, 0.0)).with_uniform_scale(0.14),
        wood,
        Some(knife),
    );
    let bolster = scene.spawn_mesh(
        "knife bolster",
        MeshShape::Cylinder,
        Transform::from_position(Vec3::new(-0.1, 0.0, 0.0))
            .with_rotation(Vec3::new(0.0, 0.0, FRAC_PI_2))
            .with_scale(Vec3::new(0.115, 0.15, 0.115)),
        Material::from_hex(palette::BLADE),
        Some(knife),
    );
    let blade = scene.spawn_mesh(
        "knife blade",
        MeshShape::Cube,
        Transform::from_position(Vec3::new(0.55, 0.0, 0.0)).with_scale(Vec3::new(1.1, 0.12, 0.03)),
        Material::from_hex(palette::BLADE_TIP),
        Some(knife),
    );

    (knife, vec![bolster, blade])
}

// ============================================================================
// DACHSHUND
// ============================================================================

/// Translate-and-scale transform for the dog's round parts.
fn blob(position: [f32; 3], scale: [f32; 3]) -> Transform {
    Transform::from_position(Vec3::from_array(position)).with_scale(Vec3::from_array(scale))
}

fn dachshund(scene: &mut Scene) -> (Entity, Entity, Entity, Entity) {
    let dog = scene.spawn_group(
        "dachshund",
        Transform::from_position(DOG_START)
            .with_rotation(Vec3::new(0.0, -FRAC_PI_3, 0.0))
            .with_uniform_scale(0.9),
        None,
    );
    scene.set_visible(dog, false);

    let body = Material::from_hex(palette::DOG_BODY);
    let dark = Material::from_hex(palette::DOG_DARK);
    let part = |scene: &mut Scene, name: &'static str, shape, transform, material| {
        scene.spawn_mesh(name, shape, transform, material, Some(dog))
    };

    // Long body, the whole point of a dachshund
    let belly = Material::from_hex(palette::DOG_BELLY);
    part(scene, "dog body", MeshShape::Sphere, blob([0.0, 0.2, 0.0], [1.4, 0.5, 0.5]), body);
    part(scene, "dog belly", MeshShape::Sphere, blob([0.0, 0.05, 0.0], [1.15, 0.42, 0.42]), belly);
    let head_at = blob([1.3, DOG_HEAD_Y, 0.0], [0.45, 0.405, 0.405]);
    let head = part(scene, "dog head", MeshShape::Sphere, head_at, body);
    part(scene, "dog snout", MeshShape::Sphere, blob([1.75, 0.35, 0.0], [0.38, 0.18, 0.18]), dark);
    let nose = Material::from_hex(palette::DOG_NOSE);
    part(scene, "dog nose", MeshShape::Sphere, blob([2.0, 0.38, 0.0], [0.08; 3]), nose);

    for side in [-1.0, 1.0] {
        let white = Material::from_hex(0xffffff);
        let pupil = Material::from_hex(0x111111);
        let eye_white = blob([1.55, 0.58, side * 0.28], [0.09; 3]);
        part(scene, "dog eye white", MeshShape::Sphere, eye_white, white);
        let eye = blob([1.58, 0.58, side * 0.28], [0.06; 3]);
        part(scene, "dog eye", MeshShape::Sphere, eye, pupil);
        let ear = Transform::from_position(Vec3::new(1.1, 0.25, side * 0.4))
            .with_rotation(Vec3::new(side * 0.3, 0.0, 0.0))
            .with_scale(Vec3::new(0.132, 0.264, 0.22));
        part(scene, "dog ear", MeshShape::Sphere, ear, dark);
    }

    for (x, z) in [(0.7, 0.3), (0.7, -0.3), (-0.7, 0.3), (-0.7, -0.3)] {
        part(scene, "dog leg", MeshShape::Cylinder, blob([x, -0.3, z], [0.1, 0.5, 0.1]), body);
        part(scene, "dog paw", MeshShape::Sphere, blob([x, -0.55, z], [0.1, 0.06, 0.12]), dark);
    }

    let tail_at = Transform::from_position(Vec3::new(-1.3, 0.4, 0.0))
        .with_rotation(Vec3::new(0.0, 0.0, DOG_TAIL_BASE_Z))
        .with_scale(Vec3::new(0.05, 0.6, 0.05));
    let tail = part(scene, "dog tail", MeshShape::Cylinder, tail_at, body);
    let tongue_at = Transform::from_position(Vec3::new(1.95, 0.25, 0.05))
        .with_rotation(Vec3::new(0.0, 0.0, 0.5))
        .with_scale(Vec3::new(0.05, 0.125, 0.05));
    let tongue_mat = Material::from_hex(palette::TONGUE);
    let tongue = part(scene, "dog tongue", MeshShape::Sphere, tongue_at, tongue_mat);
    scene.set_visible(tongue, false);

    (dog, head, tail, tongue)
}

// ============================================================================
// DECORATIONS & PARTICLES
// ============================================================================

fn hearts(scene: &mut Scene, rng: &mut impl Rng) -> Vec<Entity> {
    (0..15)
        .map(|_| {
            let color = if rng.gen_bool(0.5) { palette::ACCENT } else { palette::HIGHLIGHT };
            let heart = scene.spawn_mesh(
                "heart",
                MeshShape::Heart,
                Transform::from_position(Vec3::new(
                    rng.gen_range(-8.0..8.0),
                    rng.gen_range(-4.0..4.0),
                    rng.gen_range(-9.0..1.0),
                ))
                .with_rotation(Vec3::new(
                    rng.gen_range(0.0..PI),
                    rng.gen_range(0.0..PI),
                    rng.gen_range(0.0..PI),
                ))
                .with_uniform_scale(0.18 * rng.gen_range(0.4..1.6)),
                Material::from_hex(color).with_emissive(palette::ACCENT, 0.2).with_opacity(0.5),
                None,
            );
            scene.world_mut().entity_mut(heart).insert(Drift {
                speed: rng.gen_range(0.3..0.9),
                offset: rng.gen_range(0.0..TAU),
            });
            heart
        })
        .collect()
}

/// Squashed green puff. The cloud sequence drives its scale and opacity.
pub fn spawn_fart_cloud(scene: &mut Scene, origin: Vec3) -> Entity {
    scene.spawn_mesh(
        "fart cloud",
        MeshShape::Sphere,
        Transform::from_position(origin).with_uniform_scale(0.09),
        Material::from_hex(0xb8e8a0).with_emissive(0x88cc66, 0.3).with_opacity(0.5),
        None,
    )
}

pub fn spawn_small_bubble(scene: &mut Scene, rng: &mut impl Rng, origin: Vec3) -> Entity {
    let stinky = rng.gen_bool(0.4);
    let (color, glow) = if stinky { (0xcceeaa, 0x99cc77) } else { (0xffddee, 0xffaacc) };
    let position = origin + Vec3::new(rng.gen_range(-0.2..0.2), 0.0, rng.gen_range(-0.2..0.2));
    let bubble = scene.spawn_mesh(
        "bubble",
        MeshShape::Sphere,
        Transform::from_position(position).with_uniform_scale(rng.gen_range(0.12..0.3)),
        Material::from_hex(color).with_emissive(glow, 0.2).with_opacity(0.55),
        None,
    );
    // Drift slightly away from the dog
    let velocity = Vec3::new(
        -0.005 + rng.gen_range(-0.0075..0.0075),
        rng.gen_range(0.018..0.033),
        rng.gen_range(-0.0075..0.0075),
    );
    scene.world_mut().entity_mut(bubble).insert(Bubble { velocity, life: 1.0, base_opacity: 0.55 });
    bubble
}

pub fn spawn_big_bubble(scene: &mut Scene, origin: Vec3) -> Entity {
    scene.spawn_mesh(
        "big bubble",
        MeshShape::Sphere,
        Transform::from_position(origin + Vec3::new(0.0, 0.3, 0.0)).with_uniform_scale(0.01),
        Material::from_hex(0xffe0ee).with_emissive(0xffbbdd, 0.2).with_opacity(0.0),
        None,
    )
}
