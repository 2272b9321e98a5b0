//! Unit meshes shared by every instance: an icosphere for atoms and an
//! open-ended cylinder for bonds.

use glam::Vec3;
use rustc_hash::FxHashMap;

/// Vertex of a unit mesh. Must match `VertexInput` locations 0-1.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    /// Position on the unit mesh.
    pub position: [f32; 3],
    /// Outward unit normal.
    pub normal: [f32; 3],
}

/// Indexed triangle list.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Vertices.
    pub vertices: Vec<MeshVertex>,
    /// Counter-clockwise triangle indices.
    pub indices: Vec<u32>,
}

/// Generate an icosphere mesh with the given subdivision level.
/// Level 0 = icosahedron (20 triangles, 12 vertices)
/// Level 1 = 80 triangles, 42 vertices
/// Level 2 = 320 triangles, 162 vertices
pub fn icosphere(subdivisions: u32) -> Mesh {
    // Golden ratio for icosahedron vertices
    let phi = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let inv_len = 1.0 / (1.0 + phi * phi).sqrt();

    let mut positions: Vec<Vec3> = vec![
        Vec3::new(-1.0, phi, 0.0) * inv_len,
        Vec3::new(1.0, phi, 0.0) * inv_len,
        Vec3::new(-1.0, -phi, 0.0) * inv_len,
        Vec3::new(1.0, -phi, 0.0) * inv_len,
        Vec3::new(0.0, -1.0, phi) * inv_len,
        Vec3::new(0.0, 1.0, phi) * inv_len,
        Vec3::new(0.0, -1.0, -phi) * inv_len,
        Vec3::new(0.0, 1.0, -phi) * inv_len,
        Vec3::new(phi, 0.0, -1.0) * inv_len,
        Vec3::new(phi, 0.0, 1.0) * inv_len,
        Vec3::new(-phi, 0.0, -1.0) * inv_len,
        Vec3::new(-phi, 0.0, 1.0) * inv_len,
    ];

    #[rustfmt::skip]
    let mut indices: Vec<u32> = vec![
        0, 11, 5,   0, 5, 1,    0, 1, 7,    0, 7, 10,   0, 10, 11,
        1, 5, 9,    5, 11, 4,   11, 10, 2,  10, 7, 6,   7, 1, 8,
        3, 9, 4,    3, 4, 2,    3, 2, 6,    3, 6, 8,    3, 8, 9,
        4, 9, 5,    2, 4, 11,   6, 2, 10,   8, 6, 7,    9, 8, 1,
    ];

    let mut midpoint_cache: FxHashMap<(u32, u32), u32> = FxHashMap::default();
    for _ in 0..subdivisions {
        let mut new_indices = Vec::with_capacity(indices.len() * 4);
        for tri in indices.chunks_exact(3) {
            let (v0, v1, v2) = (tri[0], tri[1], tri[2]);
            let a = midpoint(&mut positions, &mut midpoint_cache, v0, v1);
            let b = midpoint(&mut positions, &mut midpoint_cache, v1, v2);
            let c = midpoint(&mut positions, &mut midpoint_cache, v2, v0);
            new_indices.extend_from_slice(&[v0, a, c, v1, b, a, v2, c, b, a, b, c]);
        }
        indices = new_indices;
    }

    // unit sphere: normal = position
    let vertices = positions
        .iter()
        .map(|p| MeshVertex {
            position: p.to_array(),
            normal: p.to_array(),
        })
        .collect();

    Mesh { vertices, indices }
}

fn midpoint(
    positions: &mut Vec<Vec3>,
    cache: &mut FxHashMap<(u32, u32), u32>,
    v0: u32,
    v1: u32,
) -> u32 {
    let key = if v0 < v1 { (v0, v1) } else { (v1, v0) };
    if let Some(&idx) = cache.get(&key) {
        return idx;
    }

    let mid = ((positions[v0 as usize] + positions[v1 as usize]) * 0.5).normalize();
    let idx = positions.len() as u32;
    positions.push(mid);
    let _ = cache.insert(key, idx);
    idx
}

/// Open cylinder of radius 1 along +Y from `y = 0` to `y = 1`, with a ring
/// at `y = 0.5` so the two bond colours meet on a vertex row.
pub fn cylinder(segments: u32) -> Mesh {
    let segments = segments.max(3);
    let rings = [0.0f32, 0.5, 1.0];
    let mut vertices = Vec::with_capacity(rings.len() * segments as usize);
    for &y in &rings {
        for s in 0..segments {
            let theta = std::f32::consts::TAU * s as f32 / segments as f32;
            let (sin, cos) = theta.sin_cos();
            vertices.push(MeshVertex {
                position: [cos, y, sin],
                normal: [cos, 0.0, sin],
            });
        }
    }

    let mut indices = Vec::with_capacity((rings.len() - 1) * segments as usize * 6);
    for ring in 0..(rings.len() as u32 - 1) {
        let base = ring * segments;
        let next = base + segments;
        for s in 0..segments {
            let s1 = (s + 1) % segments;
            // counter-clockwise seen from outside
            indices.extend_from_slice(&[
                base + s,
                next + s,
                base + s1,
                base + s1,
                next + s,
                next + s1,
            ]);
        }
    }

    Mesh { vertices, indices }
}
