// Retained scene graph on top of a bevy_ecs World
// Hierarchy, world transforms, visibility and ray picking

use bevy_ecs::prelude::*;
use glam::{Mat4, Vec3};

use super::components::*;

// ============================================================================
// RAYS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length. Hit distances are measured along it in world units.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction: direction.normalize_or_zero() }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Intersect with the plane `normal · p + constant = 0`.
    /// Returns `None` when parallel or when the plane is behind the origin.
    pub fn intersect_plane(&self, normal: Vec3, constant: f32) -> Option<Vec3> {
        let denom = normal.dot(self.direction);
        if denom.abs() < 1e-6 {
            return None;
        }
        let t = -(normal.dot(self.origin) + constant) / denom;
        if t < 0.0 {
            return None;
        }
        Some(self.at(t))
    }
}

/// One ray hit, nearest-first ordering is by `distance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub entity: Entity,
    pub distance: f32,
}

/// Everything the renderer needs for one instance.
#[derive(Debug, Clone, Copy)]
pub struct DrawItem {
    pub shape: MeshShape,
    pub model: Mat4,
    pub material: Material,
}

// ============================================================================
// SCENE
// ============================================================================

pub struct Scene {
    world: World,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self { world: World::new() }
    }

    #[cfg(test)]
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Debug name given at spawn, for logs.
    pub fn name(&self, entity: Entity) -> &'static str {
        self.world.get::<Name>(entity).map_or("?", |n| n.0)
    }

    pub fn entity_count(&self) -> usize {
        self.world.iter_entities().count()
    }

    // ------------------------------------------------------------------------
    // Spawning
    // ------------------------------------------------------------------------

    /// Spawn a transform-only node (no mesh).
    pub fn spawn_group(
        &mut self,
        name: &'static str,
        transform: Transform,
        parent: Option<Entity>,
    ) -> Entity {
        let entity = self
            .world
            .spawn((transform, Visible(true), Name(name), Children::default()))
            .id();
        if parent.is_some() {
            self.set_parent(entity, parent);
        }
        entity
    }

    /// Spawn a drawable, pickable node.
    pub fn spawn_mesh(
        &mut self,
        name: &'static str,
        shape: MeshShape,
        transform: Transform,
        material: Material,
        parent: Option<Entity>,
    ) -> Entity {
        let entity = self.spawn_group(name, transform, parent);
        self.world.entity_mut(entity).insert((shape, material));
        entity
    }

    /// Despawn an entity and its whole subtree.
    pub fn despawn_recursive(&mut self, entity: Entity) {
        let doomed = self.descendants(entity);
        self.set_parent(entity, None);
        for e in doomed {
            self.world.despawn(e);
        }
    }

    // ------------------------------------------------------------------------
    // Hierarchy
    // ------------------------------------------------------------------------

    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        self.world.get::<Parent>(entity).map(|p| p.0)
    }

    pub fn children(&self, entity: Entity) -> Vec<Entity> {
        self.world
            .get::<Children>(entity)
            .map(|c| c.0.clone())
            .unwrap_or_default()
    }

    /// Move `child` under `parent` (or to the root). Keeps the *local* transform.
    pub fn set_parent(&mut self, child: Entity, parent: Option<Entity>) {
        if let Some(old) = self.parent(child) {
            if let Some(mut siblings) = self.world.get_mut::<Children>(old) {
                siblings.0.retain(|&e| e != child);
            }
        }
        match parent {
            Some(p) => {
                self.world.entity_mut(child).insert(Parent(p));
                if let Some(mut children) = self.world.get_mut::<Children>(p) {
                    children.0.push(child);
                }
            }
            None => {
                self.world.entity_mut(child).remove::<Parent>();
            }
        }
    }

    /// Re-parent while keeping the rendered world transform unchanged.
    ///
    /// The entity's new local transform is `inverse(parent_world) * old_world`,
    /// so nothing visibly jumps when it changes coordinate spaces.
    pub fn reparent_preserving_world_transform(
        &mut self,
        entity: Entity,
        new_parent: Option<Entity>,
    ) {
        let world = self.world_matrix(entity);
        let parent_world = new_parent
            .map(|p| self.world_matrix(p))
            .unwrap_or(Mat4::IDENTITY);
        let local = Transform::from_matrix(parent_world.inverse() * world);
        self.update_transform(entity, |t| *t = local);
        self.set_parent(entity, new_parent);
    }

    /// Detach from the hierarchy and hide. Used for parts that leave play for good.
    pub fn detach(&mut self, entity: Entity) {
        self.set_parent(entity, None);
        self.set_visible(entity, false);
    }

    /// Depth-first list of `root` and everything below it.
    pub fn descendants(&self, root: Entity) -> Vec<Entity> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(e) = stack.pop() {
            out.push(e);
            stack.extend(self.children(e).into_iter().rev());
        }
        out
    }

    /// Mesh-bearing entities under `root`, skipping the subtrees rooted at `exclude`.
    pub fn mesh_descendants(&self, root: Entity, exclude: &[Entity]) -> Vec<Entity> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(e) = stack.pop() {
            if exclude.contains(&e) {
                continue;
            }
            if self.world.get::<MeshShape>(e).is_some() {
                out.push(e);
            }
            stack.extend(self.children(e).into_iter().rev());
        }
        out
    }

    // ------------------------------------------------------------------------
    // Transforms
    // ------------------------------------------------------------------------

    pub fn transform(&self, entity: Entity) -> Option<Transform> {
        self.world.get::<Transform>(entity).copied()
    }

    pub fn update_transform(&mut self, entity: Entity, f: impl FnOnce(&mut Transform)) {
        if let Some(mut t) = self.world.get_mut::<Transform>(entity) {
            f(&mut t);
        }
    }

    pub fn position(&self, entity: Entity) -> Vec3 {
        self.transform(entity).map(|t| t.position).unwrap_or(Vec3::ZERO)
    }

    pub fn set_position(&mut self, entity: Entity, position: Vec3) {
        self.update_transform(entity, |t| t.position = position);
    }

    pub fn local_matrix(&self, entity: Entity) -> Mat4 {
        self.transform(entity)
            .map(|t| t.local_matrix())
            .unwrap_or(Mat4::IDENTITY)
    }

    pub fn world_matrix(&self, entity: Entity) -> Mat4 {
        let mut matrix = self.local_matrix(entity);
        let mut current = self.parent(entity);
        while let Some(p) = current {
            matrix = self.local_matrix(p) * matrix;
            current = self.parent(p);
        }
        matrix
    }

    #[cfg(test)]
    pub fn world_position(&self, entity: Entity) -> Vec3 {
        self.world_matrix(entity).transform_point3(Vec3::ZERO)
    }

    /// Convert a point in `entity`'s local space to world space.
    pub fn local_to_world(&self, entity: Entity, point: Vec3) -> Vec3 {
        self.world_matrix(entity).transform_point3(point)
    }

    // ------------------------------------------------------------------------
    // Visibility & materials
    // ------------------------------------------------------------------------

    pub fn is_visible(&self, entity: Entity) -> bool {
        self.world.get::<Visible>(entity).is_some_and(|v| v.0)
    }

    pub fn set_visible(&mut self, entity: Entity, visible: bool) {
        if let Some(mut v) = self.world.get_mut::<Visible>(entity) {
            v.0 = visible;
        }
    }

    /// Visible itself and through every ancestor.
    pub fn is_world_visible(&self, entity: Entity) -> bool {
        let mut current = Some(entity);
        while let Some(e) = current {
            if !self.is_visible(e) {
                return false;
            }
            current = self.parent(e);
        }
        true
    }

    pub fn update_material(&mut self, entity: Entity, f: impl FnOnce(&mut Material)) {
        if let Some(mut m) = self.world.get_mut::<Material>(entity) {
            f(&mut m);
        }
    }

    // ------------------------------------------------------------------------
    // Picking
    // ------------------------------------------------------------------------

    /// Intersect a ray against `candidates`, nearest hit first.
    /// Hidden entities and entities without a mesh never hit.
    pub fn intersect(&self, ray: &Ray, candidates: &[Entity]) -> Vec<Hit> {
        let mut hits: Vec<Hit> = candidates
            .iter()
            .filter_map(|&e| self.intersect_entity(ray, e))
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn intersect_entity(&self, ray: &Ray, entity: Entity) -> Option<Hit> {
        let shape = *self.world.get::<MeshShape>(entity)?;
        if !self.is_world_visible(entity) {
            return None;
        }
        let world = self.world_matrix(entity);
        // A screw shrunk to nothing has no inverse.
        if world.determinant().abs() < 1e-9 {
            return None;
        }
        let inverse = world.inverse();
        let origin = inverse.transform_point3(ray.origin);
        let direction = inverse.transform_vector3(ray.direction);

        let t = match shape {
            MeshShape::Sphere => ray_unit_sphere(origin, direction)?,
            _ => {
                let (min, max) = shape.local_bounds();
                ray_aabb(origin, direction, min, max)?
            }
        };
        Some(Hit { entity, distance: t })
    }

    /// Flattened, world-space draw list of every visible mesh.
    pub fn draw_list(&mut self) -> Vec<DrawItem> {
        let mut query = self.world.query::<(Entity, &MeshShape, &Material)>();
        let items: Vec<(Entity, MeshShape, Material)> = query
            .iter(&self.world)
            .map(|(e, shape, material)| (e, *shape, *material))
            .collect();
        items
            .into_iter()
            .filter(|(e, _, _)| self.is_world_visible(*e))
            .map(|(e, shape, material)| DrawItem {
                shape,
                model: self.world_matrix(e),
                material,
            })
            .collect()
    }
}

// ============================================================================
// INTERSECTION PRIMITIVES (local space, un-normalized direction)
// ============================================================================

/// Parameter `t` of the first hit with the unit sphere, or the exit hit if the
/// origin is inside. `t` is in units of `direction`, which matches world
/// distance because the world-space direction was unit length.
fn ray_unit_sphere(origin: Vec3, direction: Vec3) -> Option<f32> {
    let a = direction.length_squared();
    if a < 1e-12 {
        return None;
    }
    let b = 2.0 * origin.dot(direction);
    let c = origin.length_squared() - 1.0;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    let t0 = (-b - sq) / (2.0 * a);
    let t1 = (-b + sq) / (2.0 * a);
    if t0 >= 0.0 {
        Some(t0)
    } else if t1 >= 0.0 {
        Some(t1)
    } else {
        None
    }
}

/// Slab test against an axis-aligned box.
fn ray_aabb(origin: Vec3, direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let inv = direction.recip();
    let t1 = (min - origin) * inv;
    let t2 = (max - origin) * inv;
    let t_near = t1.min(t2).max_element();
    let t_far = t1.max(t2).min_element();
    if t_far < 0.0 || t_near > t_far {
        return None;
    }
    Some(if t_near >= 0.0 { t_near } else { t_far })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn assert_vec_close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-4, "{a:?} != {b:?}");
    }

    #[test]
    fn world_matrix_composes_parent_chain() {
        let mut scene = Scene::new();
        let root = scene.spawn_group(
            "root",
            Transform::from_position(Vec3::new(1.0, 0.0, 0.0))
                .with_rotation(Vec3::new(0.0, FRAC_PI_2, 0.0)),
            None,
        );
        let child_at = Transform::from_position(Vec3::new(0.0, 0.0, 2.0));
        let child = scene.spawn_group("child", child_at, Some(root));

        // +Z rotated a quarter turn about Y lands on +X.
        assert_vec_close(scene.world_position(child), Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(scene.children(root), vec![child]);
        assert_eq!(scene.name(child), "child");
    }

    #[test]
    fn reparent_keeps_world_transform() {
        let mut scene = Scene::new();
        let oyster = scene.spawn_group(
            "oyster",
            Transform::from_position(Vec3::new(0.0, -0.3, 0.0))
                .with_rotation(Vec3::new(0.0, -FRAC_PI_2, 0.0)),
            None,
        );
        let flesh = scene.spawn_group(
            "flesh",
            Transform::from_position(Vec3::new(0.6, -0.15, 0.2))
                .with_rotation(Vec3::new(0.0, 0.0, 0.1)),
            Some(oyster),
        );
        let before = scene.world_matrix(flesh);

        scene.reparent_preserving_world_transform(flesh, None);

        assert_eq!(scene.parent(flesh), None);
        assert!(scene.children(oyster).is_empty());
        let after = scene.world_matrix(flesh);
        assert_vec_close(after.transform_point3(Vec3::ZERO), before.transform_point3(Vec3::ZERO));
        assert_vec_close(after.transform_point3(Vec3::X), before.transform_point3(Vec3::X));
        assert_vec_close(after.transform_point3(Vec3::Y), before.transform_point3(Vec3::Y));
    }

    #[test]
    fn reparent_into_rotated_parent() {
        let mut scene = Scene::new();
        let a = scene.spawn_group("a", Transform::from_position(Vec3::new(2.0, 1.0, 0.0)), None);
        let b = scene.spawn_group(
            "b",
            Transform::from_position(Vec3::new(-1.0, 0.0, 3.0))
                .with_rotation(Vec3::new(0.3, PI / 3.0, 0.0))
                .with_uniform_scale(2.0),
            None,
        );
        let before = scene.world_position(a);
        scene.reparent_preserving_world_transform(a, Some(b));
        assert_eq!(scene.parent(a), Some(b));
        assert_vec_close(scene.world_position(a), before);
    }

    #[test]
    fn intersect_orders_nearest_first_and_skips_hidden() {
        let mut scene = Scene::new();
        let far = scene.spawn_mesh(
            "far",
            MeshShape::Sphere,
            Transform::from_position(Vec3::new(0.0, 0.0, -10.0)),
            Material::from_hex(0xffffff),
            None,
        );
        let near = scene.spawn_mesh(
            "near",
            MeshShape::Cube,
            Transform::from_position(Vec3::new(0.0, 0.0, -5.0)),
            Material::from_hex(0xffffff),
            None,
        );
        let group = scene.spawn_group("hidden group", Transform::default(), None);
        let hidden = scene.spawn_mesh(
            "hidden",
            MeshShape::Sphere,
            Transform::from_position(Vec3::new(0.0, 0.0, -2.0)),
            Material::from_hex(0xffffff),
            Some(group),
        );
        scene.set_visible(group, false);

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let hits = scene.intersect(&ray, &[far, hidden, near]);
        let order: Vec<Entity> = hits.iter().map(|h| h.entity).collect();
        assert_eq!(order, vec![near, far]);
        assert!((hits[0].distance - 4.5).abs() < 1e-4);
        assert!((hits[1].distance - 9.0).abs() < 1e-4);
    }

    #[test]
    fn scaled_sphere_hit_respects_scale() {
        let mut scene = Scene::new();
        let blob = scene.spawn_mesh(
            "blob",
            MeshShape::Sphere,
            Transform::from_position(Vec3::new(0.0, 0.0, -5.0))
                .with_scale(Vec3::new(2.0, 0.2, 1.0)),
            Material::from_hex(0xffffff),
            None,
        );
        // Passes 1.5 units to the side: inside the stretched x radius.
        let side = Ray::new(Vec3::new(1.5, 0.0, 0.0), Vec3::NEG_Z);
        assert_eq!(scene.intersect(&side, &[blob]).len(), 1);
        // Passes 0.5 above: outside the squashed y radius.
        let above = Ray::new(Vec3::new(0.0, 0.5, 0.0), Vec3::NEG_Z);
        assert!(scene.intersect(&above, &[blob]).is_empty());
    }

    #[test]
    fn zero_scale_entity_is_not_pickable() {
        let mut scene = Scene::new();
        let screw = scene.spawn_mesh(
            "screw",
            MeshShape::Cylinder,
            Transform::from_position(Vec3::new(0.0, 0.0, -3.0)).with_uniform_scale(0.0),
            Material::from_hex(0xd4af37),
            None,
        );
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert!(scene.intersect(&ray, &[screw]).is_empty());
    }

    #[test]
    fn plane_intersection() {
        let ray = Ray::new(Vec3::new(0.0, 5.0, 9.0), Vec3::new(0.0, -5.0, -9.0));
        let p = ray.intersect_plane(Vec3::Z, 0.0).expect("plane in front");
        assert_vec_close(p, Vec3::ZERO);
        let away = Ray::new(Vec3::new(0.0, 0.0, 1.0), Vec3::Z);
        assert!(away.intersect_plane(Vec3::Z, 0.0).is_none());
    }

    #[test]
    fn mesh_descendants_excludes_subtrees() {
        let mut scene = Scene::new();
        let mat = Material::from_hex(0x888888);
        let root = scene.spawn_group("root", Transform::default(), None);
        let here = Transform::default();
        let shell = scene.spawn_mesh("shell", MeshShape::Dome, here, mat, Some(root));
        let screw = scene.spawn_group("screw", here, Some(root));
        let _head = scene.spawn_mesh("head", MeshShape::Cylinder, here, mat, Some(screw));

        assert_eq!(scene.mesh_descendants(root, &[screw]), vec![shell]);
        assert_eq!(scene.mesh_descendants(root, &[]).len(), 2);

        scene.despawn_recursive(screw);
        assert_eq!(scene.children(root), vec![shell]);
        assert_eq!(scene.entity_count(), 2);
    }
}
