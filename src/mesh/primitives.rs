//! Procedural meshes for tests, benchmarks and the command-line driver

use crate::core::types::{Vec2, Vec3};
use super::mesh::Mesh;

/// Planar grid of `nx * ny` quads in the XY plane with one UV layer.
pub fn grid(nx: u32, ny: u32) -> Mesh {
    let nx = nx.max(1);
    let ny = ny.max(1);
    let mut positions = Vec::with_capacity(((nx + 1) * (ny + 1)) as usize);
    for j in 0..=ny {
        for i in 0..=nx {
            positions.push(Vec3::new(i as f32, j as f32, 0.0));
        }
    }
    let idx = |i: u32, j: u32| j * (nx + 1) + i;
    let mut faces = Vec::with_capacity((nx * ny) as usize);
    for j in 0..ny {
        for i in 0..nx {
            faces.push(vec![idx(i, j), idx(i + 1, j), idx(i + 1, j + 1), idx(i, j + 1)]);
        }
    }
    let mut mesh = match Mesh::from_polygons(&positions, &faces) {
        Ok(mesh) => mesh,
        Err(_) => return Mesh::default(),
    };
    let uvs: Vec<Vec2> = mesh
        .loops
        .iter()
        .map(|l| {
            let co = positions[l.v as usize];
            Vec2::new(co.x / nx as f32, co.y / ny as f32)
        })
        .collect();
    // Sizes match by construction
    let _ = mesh.add_uv_layer("UVMap", uvs);
    mesh
}

/// Unit cube centered at the origin, faces wound outward.
pub fn cube() -> Mesh {
    let positions = [
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
        Vec3::new(1.0, 1.0, -1.0),
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(-1.0, 1.0, 1.0),
    ];
    let faces = [
        vec![0, 3, 2, 1],
        vec![4, 5, 6, 7],
        vec![0, 1, 5, 4],
        vec![3, 7, 6, 2],
        vec![0, 4, 7, 3],
        vec![1, 2, 6, 5],
    ];
    Mesh::from_polygons(&positions, &faces).unwrap_or_default()
}

/// Closed fan of `count` triangles around a center vertex.
pub fn triangle_fan(count: u32) -> Mesh {
    let count = count.max(3);
    let mut positions = vec![Vec3::ZERO];
    for i in 0..count {
        let a = i as f32 / count as f32 * std::f32::consts::TAU;
        positions.push(Vec3::new(a.cos(), a.sin(), 0.0));
    }
    let faces: Vec<Vec<u32>> = (0..count)
        .map(|i| vec![0, 1 + i, 1 + (i + 1) % count])
        .collect();
    Mesh::from_polygons(&positions, &faces).unwrap_or_default()
}

/// `count` disconnected triangles laid out along X.
pub fn triangles(count: u32) -> Mesh {
    let mut positions = Vec::with_capacity(count as usize * 3);
    let mut faces = Vec::with_capacity(count as usize);
    for i in 0..count {
        let x = i as f32 * 2.0;
        positions.push(Vec3::new(x, 0.0, 0.0));
        positions.push(Vec3::new(x + 1.0, 0.0, 0.0));
        positions.push(Vec3::new(x, 1.0, 0.0));
        faces.push(vec![i * 3, i * 3 + 1, i * 3 + 2]);
    }
    Mesh::from_polygons(&positions, &faces).unwrap_or_default()
}

/// Append `edges` loose edges (each with two new vertices) and `verts` loose vertices.
pub fn add_loose(mesh: &mut Mesh, edges: u32, verts: u32) {
    for i in 0..edges {
        let z = 10.0 + i as f32;
        let a = mesh.add_loose_vert(Vec3::new(0.0, 0.0, z));
        let b = mesh.add_loose_vert(Vec3::new(1.0, 0.0, z));
        mesh.add_loose_edge(a, b);
    }
    for i in 0..verts {
        mesh.add_loose_vert(Vec3::new(0.0, 0.0, -10.0 - i as f32));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_counts() {
        let mesh = grid(3, 2);
        assert_eq!(mesh.vert_len(), 12);
        assert_eq!(mesh.poly_len(), 6);
        assert_eq!(mesh.loop_len(), 24);
        // 3*3 horizontal + 4*2 vertical
        assert_eq!(mesh.edge_len(), 17);
        assert_eq!(mesh.uv_layers.len(), 1);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_cube_counts() {
        let mesh = cube();
        assert_eq!((mesh.vert_len(), mesh.edge_len(), mesh.poly_len()), (8, 12, 6));
    }

    #[test]
    fn test_triangle_fan() {
        let mesh = triangle_fan(4);
        assert_eq!(mesh.poly_len(), 4);
        assert_eq!(mesh.vert_len(), 5);
        assert_eq!(mesh.edge_len(), 8);
    }

    #[test]
    fn test_add_loose() {
        let mut mesh = triangles(10);
        add_loose(&mut mesh, 3, 2);
        assert_eq!(mesh.vert_len(), 30 + 6 + 2);
        assert_eq!(mesh.edge_len(), 30 + 3);
        assert!(mesh.validate().is_ok());
    }
}
