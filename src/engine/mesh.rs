// Procedural mesh primitives and triangulation.
//
// Every MeshShape is built once at startup as a unit-sized RenderMesh and shared by
// all instances; per-entity size comes from the transform scale.
//
//   builder → PolyMesh → triangulate_smooth() → RenderMesh → GPU

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::{Vec2, Vec3};

use super::components::MeshShape;

// ============================================================================
// GPU VERTEX
// ============================================================================

/// GPU-ready vertex with position and normal.
///   @location(0) position: vec3<f32>
///   @location(1) normal:   vec3<f32>
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl GpuVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

// ============================================================================
// POLY MESH
// ============================================================================

/// Intermediate polygon mesh. Faces are CCW when viewed from outside.
/// Faces that should shade flat get their own vertices; shared vertices shade smooth.
#[derive(Default)]
pub struct PolyMesh {
    pub positions: Vec<Vec3>,
    pub faces:     Vec<Vec<usize>>,
}

impl PolyMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, pos: Vec3) -> usize {
        let idx = self.positions.len();
        self.positions.push(pos);
        idx
    }

    pub fn add_face(&mut self, indices: Vec<usize>) {
        debug_assert!(indices.len() >= 3, "Face must have at least 3 vertices");
        self.faces.push(indices);
    }

    /// Add a face with its own copies of the given corner positions.
    pub fn add_flat_face(&mut self, corners: &[Vec3]) {
        let indices = corners.iter().map(|&p| self.add_vertex(p)).collect();
        self.add_face(indices);
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

// ============================================================================
// RENDER MESH
// ============================================================================

/// GPU-ready triangulated mesh.
/// Upload vertex_bytes() to a VERTEX buffer, index_bytes() to an INDEX buffer.
pub struct RenderMesh {
    pub vertices: Vec<GpuVertex>,
    pub indices:  Vec<u32>,
}

impl RenderMesh {
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

// ============================================================================
// TRIANGULATION + SMOOTH NORMALS
// ============================================================================

/// Fan-triangulate every face and give each vertex the area-weighted average
/// of its adjacent face normals. Degenerate vertices (sphere poles) fall back to +Y.
pub fn triangulate_smooth(poly: &PolyMesh) -> RenderMesh {
    let mut normal_accum = vec![Vec3::ZERO; poly.vertex_count()];
    let mut indices: Vec<u32> = Vec::new();

    for face in &poly.faces {
        for i in 1..(face.len() - 1) {
            let (a, b, c) = (face[0], face[i], face[i + 1]);
            // Unnormalized: magnitude is twice the triangle area
            let n = (poly.positions[b] - poly.positions[a])
                .cross(poly.positions[c] - poly.positions[a]);
            normal_accum[a] += n;
            normal_accum[b] += n;
            normal_accum[c] += n;
            indices.extend([a as u32, b as u32, c as u32]);
        }
    }

    let vertices = poly.positions.iter()
        .zip(normal_accum)
        .map(|(pos, n)| GpuVertex {
            position: pos.to_array(),
            normal:   n.try_normalize().unwrap_or(Vec3::Y).to_array(),
        })
        .collect();

    RenderMesh { vertices, indices }
}

// ============================================================================
// PRIMITIVES
// ============================================================================

pub fn build(shape: MeshShape) -> RenderMesh {
    let poly = match shape {
        MeshShape::Cube => cube(),
        MeshShape::Sphere => uv_sphere(32, 20, PI),
        MeshShape::Dome => uv_sphere(40, 14, FRAC_PI_2),
        MeshShape::Cylinder => cylinder(24),
        MeshShape::Heart => heart(10),
    };
    triangulate_smooth(&poly)
}

/// Unit cube centred on the origin, flat shaded.
pub fn cube() -> PolyMesh {
    let mut poly = PolyMesh::new();
    let h = 0.5;
    // (normal, up) per face; right = up × normal keeps the corners CCW from outside
    let faces = [
        (Vec3::X, Vec3::Y),
        (Vec3::NEG_X, Vec3::Y),
        (Vec3::Y, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::Z),
        (Vec3::Z, Vec3::Y),
        (Vec3::NEG_Z, Vec3::Y),
    ];
    for (normal, up) in faces {
        let right = up.cross(normal);
        let c = normal * h;
        poly.add_flat_face(&[
            c - right * h - up * h,
            c + right * h - up * h,
            c + right * h + up * h,
            c - right * h + up * h,
        ]);
    }
    poly
}

/// Unit sphere cap from the +Y pole down to polar angle `max_polar`.
/// `max_polar = PI` is a full sphere; `PI / 2` is an open upper hemisphere.
pub fn uv_sphere(segments: usize, rings: usize, max_polar: f32) -> PolyMesh {
    let mut poly = PolyMesh::new();
    let columns = segments + 1;
    for i in 0..=rings {
        let phi = i as f32 / rings as f32 * max_polar;
        for j in 0..columns {
            let theta = j as f32 / segments as f32 * TAU;
            poly.add_vertex(Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin()));
        }
    }
    let at = |i: usize, j: usize| i * columns + j;
    for i in 0..rings {
        for j in 0..segments {
            poly.add_face(vec![at(i, j), at(i, j + 1), at(i + 1, j + 1), at(i + 1, j)]);
        }
    }
    poly
}

/// Radius 1, height 1, centred, with flat caps.
pub fn cylinder(segments: usize) -> PolyMesh {
    let mut poly = PolyMesh::new();
    let ring = |y: f32| -> Vec<Vec3> {
        (0..segments)
            .map(|j| {
                let theta = j as f32 / segments as f32 * TAU;
                Vec3::new(theta.cos(), y, theta.sin())
            })
            .collect()
    };
    let bottom = ring(-0.5);
    let top = ring(0.5);

    let b: Vec<usize> = bottom.iter().map(|&p| poly.add_vertex(p)).collect();
    let t: Vec<usize> = top.iter().map(|&p| poly.add_vertex(p)).collect();
    for j in 0..segments {
        let k = (j + 1) % segments;
        poly.add_face(vec![b[j], t[j], t[k], b[k]]);
    }

    let top_cap: Vec<Vec3> = top.iter().rev().copied().collect();
    poly.add_flat_face(&top_cap);
    poly.add_flat_face(&bottom);
    poly
}

/// Heart outline in the XY plane, extruded ±0.1 along Z.
pub fn heart(samples_per_curve: usize) -> PolyMesh {
    let outline = heart_outline(samples_per_curve);
    let mut poly = PolyMesh::new();
    let depth = 0.1;
    let n = outline.len();

    let front: Vec<Vec3> = outline.iter().map(|p| p.extend(depth)).collect();
    let back: Vec<Vec3> = outline.iter().map(|p| p.extend(-depth)).collect();

    // Outline is star-shaped around the origin: fan from the centre
    for i in 0..n {
        let k = (i + 1) % n;
        poly.add_flat_face(&[Vec3::new(0.0, 0.0, depth), front[i], front[k]]);
        poly.add_flat_face(&[Vec3::new(0.0, 0.0, -depth), back[k], back[i]]);
    }

    let f: Vec<usize> = front.iter().map(|&p| poly.add_vertex(p)).collect();
    let b: Vec<usize> = back.iter().map(|&p| poly.add_vertex(p)).collect();
    for i in 0..n {
        let k = (i + 1) % n;
        poly.add_face(vec![f[i], b[i], b[k], f[k]]);
    }
    poly
}

/// Counter-clockwise heart outline spanning [-1, 1] in x, starting at the top notch.
fn heart_outline(samples_per_curve: usize) -> Vec<Vec2> {
    let s = 1.0 / 3.0;
    let v = |x: f32, y: f32| Vec2::new(x * s, y * s);
    let curves = [
        [v(0.0, 2.0), v(0.0, 3.0), v(-3.0, 3.0), v(-3.0, 1.0)],
        [v(-3.0, 1.0), v(-3.0, -1.0), v(0.0, -2.0), v(0.0, -3.0)],
        [v(0.0, -3.0), v(0.0, -2.0), v(3.0, -1.0), v(3.0, 1.0)],
        [v(3.0, 1.0), v(3.0, 3.0), v(0.0, 3.0), v(0.0, 2.0)],
    ];
    let mut points = Vec::with_capacity(curves.len() * samples_per_curve);
    for [p0, p1, p2, p3] in curves {
        // Last sample of each curve is the first of the next
        for step in 0..samples_per_curve {
            let t = step as f32 / samples_per_curve as f32;
            let u = 1.0 - t;
            points.push(
                p0 * u * u * u + p1 * 3.0 * u * u * t + p2 * 3.0 * u * t * t + p3 * t * t * t,
            );
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_well_formed(mesh: &RenderMesh) {
        assert!(!mesh.indices.is_empty());
        assert_eq!(mesh.index_count() % 3, 0);
        let n = mesh.vertices.len() as u32;
        assert!(mesh.indices.iter().all(|&i| i < n));
        for v in &mesh.vertices {
            let len = Vec3::from_array(v.normal).length();
            assert!((len - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn every_shape_builds() {
        for shape in MeshShape::ALL {
            assert_well_formed(&build(shape));
        }
    }

    #[test]
    fn cube_faces_point_outward() {
        let mesh = build(MeshShape::Cube);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.index_count(), 36);
        for v in &mesh.vertices {
            let p = Vec3::from_array(v.position);
            let n = Vec3::from_array(v.normal);
            assert!(p.dot(n) > 0.0);
        }
    }

    #[test]
    fn meshes_fit_their_picking_bounds() {
        for shape in MeshShape::ALL {
            let (min, max) = shape.local_bounds();
            for v in build(shape).vertices {
                let p = Vec3::from_array(v.position);
                assert!(p.cmpge(min - 1e-4).all() && p.cmple(max + 1e-4).all(), "{shape:?} {p:?}");
            }
        }
    }

    #[test]
    fn sphere_vertices_on_unit_sphere() {
        for v in build(MeshShape::Sphere).vertices {
            assert!((Vec3::from_array(v.position).length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn heart_outline_is_counter_clockwise() {
        let outline = heart_outline(8);
        // Shoelace: positive area means CCW
        let area: f32 = (0..outline.len())
            .map(|i| {
                let a = outline[i];
                let b = outline[(i + 1) % outline.len()];
                a.x * b.y - b.x * a.y
            })
            .sum();
        assert!(area > 0.0);
    }
}
