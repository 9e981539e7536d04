// Core ECS components for the scene graph
// Every drawable or animatable thing in the game is an entity carrying these

use bevy_ecs::prelude::*;
use glam::{EulerRot, Mat4, Quat, Vec3};

/// Local transform relative to the entity's parent (or the world for roots).
///
/// Rotation is stored as XYZ Euler angles in radians so sequences can drive
/// one axis at a time (hinge angle, tail wag, spin) without quaternion math.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self { position, ..Default::default() }
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_uniform_scale(self, s: f32) -> Self {
        self.with_scale(Vec3::splat(s))
    }

    pub fn quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quat(), self.position)
    }

    /// Decompose an affine matrix back into position / Euler rotation / scale.
    /// Shear is lost; the scene never produces any.
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
        Self {
            position,
            rotation: Vec3::new(x, y, z),
            scale,
        }
    }
}

/// Hierarchy link to the parent entity.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent(pub Entity);

/// Ordered child list, kept in sync with `Parent` by `Scene`.
#[derive(Component, Debug, Clone, Default)]
pub struct Children(pub Vec<Entity>);

/// Local visibility flag. An entity is drawn only if it and all ancestors are visible.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visible(pub bool);

/// Debug name, shown in logs.
#[derive(Component, Debug, Clone, Copy)]
pub struct Name(pub &'static str);

/// Unit shapes shared by every mesh instance. Scale the transform to size them.
///
/// - `Cube`: edge length 1, centred.
/// - `Sphere`: radius 1.
/// - `Dome`: upper hemisphere of radius 1 (y in [0, 1]).
/// - `Cylinder`: radius 1, height 1, centred.
/// - `Heart`: flat extruded heart roughly spanning [-1, 1] in x/y.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshShape {
    Cube,
    Sphere,
    Dome,
    Cylinder,
    Heart,
}

impl MeshShape {
    pub const ALL: [MeshShape; 5] = [
        MeshShape::Cube,
        MeshShape::Sphere,
        MeshShape::Dome,
        MeshShape::Cylinder,
        MeshShape::Heart,
    ];

    /// Local-space bounding box used for picking.
    pub fn local_bounds(self) -> (Vec3, Vec3) {
        match self {
            MeshShape::Cube => (Vec3::splat(-0.5), Vec3::splat(0.5)),
            MeshShape::Cylinder => (Vec3::new(-1.0, -0.5, -1.0), Vec3::new(1.0, 0.5, 1.0)),
            MeshShape::Sphere => (Vec3::splat(-1.0), Vec3::splat(1.0)),
            MeshShape::Dome => (Vec3::new(-1.0, 0.0, -1.0), Vec3::ONE),
            MeshShape::Heart => (Vec3::new(-1.0, -1.0, -0.1), Vec3::new(1.0, 1.0, 0.1)),
        }
    }
}

/// Surface parameters consumed by the renderer.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: Vec3,
    pub emissive: Vec3,
    pub emissive_intensity: f32,
    pub opacity: f32,
}

impl Material {
    pub fn from_hex(hex: u32) -> Self {
        Self {
            color: hex_to_rgb(hex),
            emissive: Vec3::ZERO,
            emissive_intensity: 0.0,
            opacity: 1.0,
        }
    }

    pub fn with_emissive(mut self, hex: u32, intensity: f32) -> Self {
        self.emissive = hex_to_rgb(hex);
        self.emissive_intensity = intensity;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}

/// 0xRRGGBB → linear-ish RGB in [0, 1].
pub fn hex_to_rgb(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    )
}

/// Ambient float parameters for the decorative 3D hearts.
#[derive(Component, Debug, Clone, Copy)]
pub struct Drift {
    pub speed: f32,
    pub offset: f32,
}

/// Short-lived reveal bubble. Velocity is in world units per reference frame.
#[derive(Component, Debug, Clone, Copy)]
pub struct Bubble {
    pub velocity: Vec3,
    pub life: f32,
    pub base_opacity: f32,
}
