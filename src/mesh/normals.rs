//! Face, vertex and corner normals

use crate::core::types::Vec3;
use super::elements::ElemFlags;
use super::mesh::Mesh;

/// Newell normal of a closed polygon.
///
/// Degenerate polygons return `Vec3::Z` rather than NaN.
pub fn newell_normal(points: impl Iterator<Item = Vec3> + Clone) -> Vec3 {
    let mut n = Vec3::ZERO;
    let mut next = points.clone().cycle().skip(1);
    for cur in points {
        let Some(nx) = next.next() else { break };
        n.x += (cur.y - nx.y) * (cur.z + nx.z);
        n.y += (cur.z - nx.z) * (cur.x + nx.x);
        n.z += (cur.x - nx.x) * (cur.y + nx.y);
    }
    n.try_normalize().unwrap_or(Vec3::Z)
}

/// Area of a planar polygon (half the Newell vector length).
pub fn polygon_area(points: impl Iterator<Item = Vec3> + Clone) -> f32 {
    let first = points.clone().next().unwrap_or(Vec3::ZERO);
    let mut prev: Option<Vec3> = None;
    let mut cross = Vec3::ZERO;
    for p in points {
        if let Some(q) = prev {
            cross += (q - first).cross(p - first);
        }
        prev = Some(p);
    }
    cross.length() * 0.5
}

/// Per-polygon normals of a final mesh.
pub fn poly_normals(mesh: &Mesh) -> Vec<Vec3> {
    mesh.polys
        .iter()
        .map(|poly| newell_normal(poly.loops().map(|l| mesh.verts[mesh.loops[l].v as usize].co)))
        .collect()
}

/// Per-vertex normals: normalized sum of adjacent face normals.
///
/// Vertices without faces fall back to their normalized position.
pub fn vert_normals(mesh: &Mesh, poly_nors: &[Vec3]) -> Vec<Vec3> {
    let mut nors = vec![Vec3::ZERO; mesh.verts.len()];
    for (poly, no) in mesh.polys.iter().zip(poly_nors) {
        for l in poly.loops() {
            nors[mesh.loops[l].v as usize] += *no;
        }
    }
    nors.iter()
        .zip(&mesh.verts)
        .map(|(n, v)| n.try_normalize().or_else(|| v.co.try_normalize()).unwrap_or(Vec3::Z))
        .collect()
}

/// Per-loop normals honoring smooth flags, sharp edges and the auto-smooth angle.
///
/// A corner of a flat face, or one touching a sharp edge, takes the face normal.
/// Other corners average the normals of smooth faces around the vertex whose
/// angle to this face is within `mesh.smooth_angle`.
pub fn loop_normals(mesh: &Mesh, poly_nors: &[Vec3]) -> Vec<Vec3> {
    let mut vert_polys: Vec<Vec<u32>> = vec![Vec::new(); mesh.verts.len()];
    for (p, poly) in mesh.polys.iter().enumerate() {
        for l in poly.loops() {
            vert_polys[mesh.loops[l].v as usize].push(p as u32);
        }
    }

    let cos_split = mesh.smooth_angle.cos();
    let mut nors = vec![Vec3::Z; mesh.loops.len()];
    for (p, poly) in mesh.polys.iter().enumerate() {
        let no = poly_nors[p];
        let range = poly.loops();
        for l in range.clone() {
            let prev = if l == range.start { range.end - 1 } else { l - 1 };
            let sharp_corner = [mesh.loops[l].e, mesh.loops[prev].e]
                .iter()
                .any(|&e| mesh.edges[e as usize].flag.contains(ElemFlags::SHARP));

            if !poly.flag.contains(ElemFlags::SMOOTH) || sharp_corner {
                nors[l] = no;
                continue;
            }
            let sum: Vec3 = vert_polys[mesh.loops[l].v as usize]
                .iter()
                .map(|&q| (&mesh.polys[q as usize], poly_nors[q as usize]))
                .filter(|(q, qno)| q.flag.contains(ElemFlags::SMOOTH) && qno.dot(no) >= cos_split)
                .map(|(_, qno)| qno)
                .sum();
            nors[l] = sum.try_normalize().unwrap_or(no);
        }
    }
    nors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newell_square() {
        let pts = [Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y];
        let n = newell_normal(pts.iter().copied());
        assert!((n - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_newell_degenerate() {
        let pts = [Vec3::ZERO, Vec3::ZERO, Vec3::ZERO];
        assert_eq!(newell_normal(pts.iter().copied()), Vec3::Z);
    }

    #[test]
    fn test_polygon_area() {
        let pts = [Vec3::ZERO, Vec3::X * 2.0, Vec3::new(2.0, 3.0, 0.0), Vec3::Y * 3.0];
        assert!((polygon_area(pts.iter().copied()) - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_flat_faces_use_face_normal() {
        let mesh = crate::mesh::primitives::cube();
        let pnors = poly_normals(&mesh);
        let lnors = loop_normals(&mesh, &pnors);
        for (p, poly) in mesh.polys.iter().enumerate() {
            for l in poly.loops() {
                assert!((lnors[l] - pnors[p]).length() < 1e-6);
            }
        }
    }

    #[test]
    fn test_smooth_cube_corners_average() {
        let mut mesh = crate::mesh::primitives::cube();
        for poly in &mut mesh.polys {
            poly.flag.insert(ElemFlags::SMOOTH);
        }
        let pnors = poly_normals(&mesh);
        let lnors = loop_normals(&mesh, &pnors);
        // Every cube corner averages three axis normals
        for n in &lnors {
            let expected = 1.0 / 3.0_f32.sqrt();
            assert!((n.x.abs() - expected).abs() < 1e-5);
        }

        // A split angle below 90 degrees keeps the cube flat
        mesh.smooth_angle = 0.5;
        let lnors = loop_normals(&mesh, &pnors);
        assert!((lnors[0] - pnors[0]).length() < 1e-6);
    }

    #[test]
    fn test_vert_normals_unit_length() {
        let mesh = crate::mesh::primitives::cube();
        let vnors = vert_normals(&mesh, &poly_normals(&mesh));
        assert!(vnors.iter().all(|n| (n.length() - 1.0).abs() < 1e-5));
    }
}
